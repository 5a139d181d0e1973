//! Core graph data structures

mod node;
mod path;
mod references;
mod relationship;


pub use node::{
    AttributeValue, Attributes, Dimension, DimensionRef, Group, ReferenceKind, References,
    SpatialKind, Variable, VariableClass,
};
pub use path::{PathResolver, Resolution};
pub use references::{Extracted, ReferenceExtractor, DIMENSIONS_ATTRIBUTE};
pub use relationship::{GraphBuilder, GraphError, GraphResult, RelationshipGraph};
