//! varinfo: variable relationship graphs for Earth-observation granules
//!
//! Builds an in-memory model of every variable in one granule, resolves
//! the CF-Convention references between them, and answers questions about
//! that model: which variables are science data, which support variables a
//! request needs, and which dimensions are spatial or temporal.
//!
//! # Core Concepts
//!
//! - **RelationshipGraph**: groups, variables and dimensions of one granule,
//!   keyed by absolute namespace path
//! - **RuleSet**: mission and collection specific configuration that
//!   overrides metadata and adds required or excluded variables
//! - **NodeSource**: the already-parsed node tree a graph is built from
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use varinfo::{GraphBuilder, RuleSet, SourceNode};
//!
//! let tree = SourceNode::group("/")
//!     .child(SourceNode::variable("/lat").shape(["lat"]).attribute("units", "degrees_north"))
//!     .child(SourceNode::variable("/lon").shape(["lon"]).attribute("units", "degrees_east"))
//!     .child(SourceNode::variable("/sst").shape(["lat", "lon"]));
//!
//! let graph = GraphBuilder::new(Arc::new(RuleSet::empty())).build(&tree).unwrap();
//! assert!(graph.get_science_variable_paths().contains("/sst"));
//! assert_eq!(graph.required_variables(&["/sst"]).len(), 3);
//! ```

mod error;
pub mod graph;
pub mod query;
pub mod rules;
pub mod source;

use std::path::Path;
use std::sync::Arc;

pub use error::{Result, VarInfoError};
pub use graph::{
    AttributeValue, Attributes, Dimension, DimensionRef, GraphBuilder, GraphError, GraphResult,
    Group, PathResolver, ReferenceKind, RelationshipGraph, Resolution, SpatialKind, Variable,
    VariableClass,
};
pub use query::{ClassificationEngine, ClosureEngine, DimensionGroups};
pub use rules::{ConfigError, GranuleContext, RuleEngine, RuleSet};
pub use source::{NodeSource, NodeTree, SourceNode};

/// Load a configuration file and build the graph for one granule
///
/// The short name is discovered from the granule's attributes unless
/// `short_name` is given.
pub fn build_graph(
    config_path: impl AsRef<Path>,
    source: &dyn NodeSource,
    short_name: Option<&str>,
) -> Result<RelationshipGraph> {
    let rules = Arc::new(RuleSet::from_file(config_path)?);
    let mut builder = GraphBuilder::new(rules);
    if let Some(short_name) = short_name {
        builder = builder.short_name(short_name);
    }
    Ok(builder.build(source)?)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
