//! RelationshipGraph: every group, variable and dimension of one granule

use super::node::{
    split_path, AttributeValue, Dimension, DimensionRef, Group, ReferenceKind, Variable,
    VariableClass,
};
use super::path::{self, PathResolver};
use super::references::ReferenceExtractor;
use crate::query::ClassificationEngine;
use crate::rules::{GranuleContext, RuleEngine, RuleSet};
use crate::source::{DimensionToken, NodeSource, SourceDimension, SourceNode};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Errors that can occur while building a graph
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Duplicate node path: {0}")]
    DuplicatePath(String),

    #[error("Invalid node path: {0}")]
    InvalidNodePath(String),

    #[error("Node source error: {0}")]
    Source(String),
}

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Builds a [`RelationshipGraph`] from a [`NodeSource`]
///
/// ```
/// use std::sync::Arc;
/// use varinfo::{GraphBuilder, RuleSet, SourceNode};
///
/// let tree = SourceNode::group("/")
///     .child(SourceNode::variable("/lat").attribute("units", "degrees_north"));
/// let graph = GraphBuilder::new(Arc::new(RuleSet::empty()))
///     .short_name("EXAMPLE")
///     .build(&tree)
///     .unwrap();
/// assert!(graph.get_variable("/lat").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    rules: Arc<RuleSet>,
    short_name: Option<String>,
}

impl GraphBuilder {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            short_name: None,
        }
    }

    /// Use this collection short name instead of searching the granule for one
    pub fn short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    /// Build the graph in one pass over the source tree
    ///
    /// Nodes are registered pre-order, then overrides are applied, then
    /// references are resolved against the complete namespace and finally
    /// variables are classified.
    pub fn build(self, source: &dyn NodeSource) -> GraphResult<RelationshipGraph> {
        let mut graph = RelationshipGraph {
            groups: IndexMap::new(),
            variables: IndexMap::new(),
            dimensions: IndexMap::new(),
            rules: self.rules,
            context: GranuleContext::default(),
        };

        let root = source.root()?;
        graph.groups.insert("/".to_string(), Group::new("/"));
        match root {
            SourceNode::Group {
                path,
                attributes,
                dimensions,
                children,
            } if path == "/" => {
                if let Some(group) = graph.groups.get_mut("/") {
                    group.attributes = attributes;
                }
                graph.register_dimensions("/", dimensions);
                for child in children {
                    graph.register(child, "/")?;
                }
            }
            other => graph.register(other, "/")?,
        }

        let short_name = self.short_name.or_else(|| graph.discover_short_name());
        if short_name.is_none() && !graph.rules.short_name_paths().is_empty() {
            warn!("collection short name unknown; only path-keyed rules can apply");
        }
        graph.context = graph.rules.context_for(short_name.as_deref());

        graph.apply_overrides();
        graph.resolve_references();
        graph.classify();

        debug!(
            groups = graph.groups.len(),
            variables = graph.variables.len(),
            dimensions = graph.dimensions.len(),
            mission = graph.context.mission.as_deref().unwrap_or("-"),
            short_name = graph.context.short_name.as_deref().unwrap_or("-"),
            "relationship graph built"
        );

        Ok(graph)
    }
}

/// The built, read-only model of one granule
///
/// Nodes are held in path-keyed tables; references between them are
/// paths, so reference cycles carry no ownership.
#[derive(Debug, Clone)]
pub struct RelationshipGraph {
    groups: IndexMap<String, Group>,
    variables: IndexMap<String, Variable>,
    dimensions: IndexMap<String, Dimension>,
    rules: Arc<RuleSet>,
    context: GranuleContext,
}

impl RelationshipGraph {
    // ------------------------------------------------------------------
    // Build phases
    // ------------------------------------------------------------------

    fn register(&mut self, node: SourceNode, parent: &str) -> GraphResult<()> {
        let node_path = canonical_path(node.path(), parent)?;
        if self.groups.contains_key(&node_path) || self.variables.contains_key(&node_path) {
            return Err(GraphError::DuplicatePath(node_path));
        }

        match node {
            SourceNode::Group {
                attributes,
                dimensions,
                children,
                ..
            } => {
                let mut group = Group::new(node_path.as_str());
                group.attributes = attributes;
                self.groups.insert(node_path.clone(), group);
                if let Some(parent_group) = self.groups.get_mut(parent) {
                    parent_group.groups.push(node_path.clone());
                }
                self.register_dimensions(&node_path, dimensions);
                for child in children {
                    self.register(child, &node_path)?;
                }
            }
            SourceNode::Variable {
                data_type,
                dimensions,
                attributes,
                ..
            } => {
                let mut variable = Variable::new(node_path.as_str());
                variable.data_type = data_type;
                variable.attributes = attributes;
                variable.shape = dimensions
                    .into_iter()
                    .map(|token| match token {
                        DimensionToken::Named(token) => DimensionRef::Unresolved { token },
                        DimensionToken::Anonymous { size } => DimensionRef::Anonymous { size },
                    })
                    .collect();
                self.variables.insert(node_path.clone(), variable);
                if let Some(parent_group) = self.groups.get_mut(parent) {
                    parent_group.variables.push(node_path);
                }
            }
        }
        Ok(())
    }

    fn register_dimensions(&mut self, group_path: &str, dimensions: Vec<SourceDimension>) {
        for declared in dimensions {
            let dim_path = path::join(group_path, &declared.name);
            if let Some(group) = self.groups.get_mut(group_path) {
                group.dimensions.push(dim_path.clone());
            }
            self.dimensions.insert(
                dim_path.clone(),
                Dimension {
                    path: dim_path,
                    name: declared.name,
                    size: declared.size,
                },
            );
        }
    }

    /// First configured short-name attribute present in the granule
    fn discover_short_name(&self) -> Option<String> {
        self.rules.short_name_paths().iter().find_map(|attribute_path| {
            let normalized = if attribute_path.starts_with('/') {
                attribute_path.clone()
            } else {
                format!("/{}", attribute_path)
            };
            let (group_path, name) = split_path(&normalized);
            self.groups
                .get(group_path)
                .and_then(|group| group.attributes.get_str(name))
                .map(str::to_string)
        })
    }

    fn apply_overrides(&mut self) {
        let rules = Arc::clone(&self.rules);
        let engine = rules.engine(&self.context);

        for group in self.groups.values_mut() {
            for (name, value) in engine.overrides_for(&group.path) {
                trace!(path = %group.path, attribute = %name, "applying override");
                group.attributes.insert(name, value);
            }
        }
        for variable in self.variables.values_mut() {
            for (name, value) in engine.overrides_for(&variable.path) {
                trace!(path = %variable.path, attribute = %name, "applying override");
                variable.attributes.insert(name, value);
            }
        }
    }

    fn resolve_references(&mut self) {
        let known: HashSet<String> = self
            .variables
            .keys()
            .chain(self.dimensions.keys())
            .cloned()
            .collect();

        let extracted: Vec<_> = {
            let extractor =
                ReferenceExtractor::new(PathResolver::new(&known), &self.variables, &self.groups);
            self.variables
                .values()
                .map(|variable| extractor.extract(variable))
                .collect()
        };

        for (variable, extracted) in self.variables.values_mut().zip(extracted) {
            variable.shape = extracted.shape;
            variable.references = extracted.references;
        }
    }

    fn classify(&mut self) {
        let classes = ClassificationEngine::new(self).classify();
        for (path, class) in classes {
            if let Some(variable) = self.variables.get_mut(&path) {
                variable.class = class;
            }
        }
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn get_variable(&self, path: &str) -> Option<&Variable> {
        self.variables.get(path)
    }

    pub fn get_group(&self, path: &str) -> Option<&Group> {
        self.groups.get(path)
    }

    pub fn get_dimension(&self, path: &str) -> Option<&Dimension> {
        self.dimensions.get(path)
    }

    pub fn root(&self) -> Option<&Group> {
        self.groups.get("/")
    }

    /// Global (root group) attribute
    pub fn global_attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.root().and_then(|root| root.attributes.get(name))
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.values()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// True if `path` names a variable or a declared dimension
    pub fn contains(&self, path: &str) -> bool {
        self.variables.contains_key(path) || self.dimensions.contains_key(path)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// The rule engine bound to this granule's mission and short name
    pub fn rule_engine(&self) -> RuleEngine<'_> {
        self.rules.engine(&self.context)
    }

    pub fn context(&self) -> &GranuleContext {
        &self.context
    }

    pub fn mission(&self) -> Option<&str> {
        self.context.mission.as_deref()
    }

    pub fn short_name(&self) -> Option<&str> {
        self.context.short_name.as_deref()
    }

    pub fn get_all_variable_paths(&self) -> IndexSet<String> {
        self.variables.keys().cloned().collect()
    }

    pub fn get_science_variable_paths(&self) -> IndexSet<String> {
        self.paths_of_class(VariableClass::Science)
    }

    /// Variables neither science nor referenced by any other variable
    pub fn get_metadata_variable_paths(&self) -> IndexSet<String> {
        self.paths_of_class(VariableClass::Metadata)
    }

    fn paths_of_class(&self, class: VariableClass) -> IndexSet<String> {
        self.variables
            .values()
            .filter(|v| v.class == class)
            .map(|v| v.path.clone())
            .collect()
    }

    /// Variables with a non-empty `coordinates` reference that no
    /// excluded-science-variable rule matches
    pub fn variables_with_coordinates(&self) -> IndexSet<String> {
        let engine = self.rule_engine();
        self.variables
            .values()
            .filter(|v| v.references.has(ReferenceKind::Coordinates))
            .filter(|v| !engine.is_excluded(&v.path))
            .map(|v| v.path.clone())
            .collect()
    }

    /// Union of one reference kind across the given variables
    ///
    /// Dangling paths are kept; absent variables contribute nothing.
    pub fn references_for_attribute<S: AsRef<str>>(
        &self,
        paths: &[S],
        kind: ReferenceKind,
    ) -> IndexSet<String> {
        paths
            .iter()
            .filter_map(|p| self.variables.get(p.as_ref()))
            .flat_map(|v| v.references_of(kind).map(str::to_string))
            .collect()
    }

    /// Configured overrides for a path that has no variable in this granule
    ///
    /// Returns `None` if the variable exists or no override applies.
    pub fn missing_variable_attributes(
        &self,
        path: &str,
    ) -> Option<IndexMap<String, AttributeValue>> {
        if self.variables.contains_key(path) {
            return None;
        }
        let overrides = self.rule_engine().overrides_for(path);
        (!overrides.is_empty()).then_some(overrides)
    }
}

/// Normalize a node path and check it sits directly inside `parent`
fn canonical_path(raw: &str, parent: &str) -> GraphResult<String> {
    if !raw.starts_with('/') {
        return Err(GraphError::InvalidNodePath(raw.to_string()));
    }
    let normalized =
        path::normalize(raw).ok_or_else(|| GraphError::InvalidNodePath(raw.to_string()))?;
    if normalized == "/" || path::parent(&normalized).as_deref() != Some(parent) {
        return Err(GraphError::InvalidNodePath(raw.to_string()));
    }
    Ok(normalized)
}
