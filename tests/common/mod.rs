//! Common test utilities for varinfo integration tests
//!
//! Granule fixtures, a sample configuration, and log capture.

#![allow(dead_code)]

pub mod config;
pub mod granules;

pub use config::{sample_rules, SAMPLE_CONFIG_YAML};
pub use granules::{atl03_like, gedi_like, gpm_imerg_like, GranuleBuilder};

/// Route `tracing` output through the test harness (visible with `--nocapture`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
