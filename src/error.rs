//! Crate-wide error type

use crate::graph::GraphError;
use crate::rules::ConfigError;
use thiserror::Error;

/// Any error the crate can return
#[derive(Debug, Error)]
pub enum VarInfoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Result type for crate-level entry points
pub type Result<T> = std::result::Result<T, VarInfoError>;
