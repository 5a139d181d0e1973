//! Configuration-driven rules: mission resolution, required and excluded
//! variables, and metadata overrides.

mod config;
mod engine;

pub use config::{
    ApplicabilityEntry, AttributeEntry, ConfigDocument, ConfigError, ConfigResult,
    DocumentVersion, OverrideEntry, PatternEntry,
};
pub use engine::{
    Applicability, GranuleContext, OverrideRule, Pattern, PatternRule, RuleEngine, RuleSet,
};
