//! Required-variable closure

use crate::graph::{RelationshipGraph, SpatialKind, Variable};
use indexmap::IndexSet;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Placeholder axes invented by some metadata producers (`.../FakeDim0`)
fn is_fake_dimension(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .and_then(|name| name.strip_prefix("FakeDim"))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Computes the variables and dimensions needed to interpret a request
///
/// Results are sets in first-discovered order.
#[derive(Debug, Clone, Copy)]
pub struct ClosureEngine<'g> {
    graph: &'g RelationshipGraph,
}

impl<'g> ClosureEngine<'g> {
    pub fn new(graph: &'g RelationshipGraph) -> Self {
        Self { graph }
    }

    /// Breadth-first closure over references and dimensions
    ///
    /// Seeded with the requested paths plus every variable matching an
    /// applicable required-variable rule. Only paths naming an existing
    /// variable or dimension are kept, and fake dimensions are dropped.
    pub fn required_variables<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        let engine = self.graph.rule_engine();

        let mut queue: VecDeque<String> = requested.iter().map(|p| p.as_ref().to_string()).collect();
        queue.extend(
            self.graph
                .variables()
                .filter(|v| engine.is_required(&v.path))
                .map(|v| v.path.clone()),
        );

        let mut visited: HashSet<String> = HashSet::new();
        let mut result: IndexSet<String> = IndexSet::new();

        while let Some(path) = queue.pop_front() {
            if !visited.insert(path.clone()) {
                continue;
            }
            if !self.graph.contains(&path) {
                continue;
            }
            if !is_fake_dimension(&path) {
                result.insert(path.clone());
            }

            if let Some(variable) = self.graph.get_variable(&path) {
                for reference in variable.all_references() {
                    if !visited.contains(reference) {
                        queue.push_back(reference.to_string());
                    }
                }
            }
        }

        debug!(
            requested = requested.len(),
            required = result.len(),
            "computed required-variable closure"
        );
        result
    }

    /// Named dimensions of every variable in the closure that exist in the graph
    pub fn required_dimensions<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        let closure = self.required_variables(requested);
        closure
            .iter()
            .filter_map(|path| self.graph.get_variable(path))
            .flat_map(Variable::dimension_paths)
            .filter(|dim| self.graph.contains(dim) && !is_fake_dimension(dim))
            .map(str::to_string)
            .collect()
    }

    pub fn geographic_spatial_dimensions<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        self.dimensions_where(requested, Variable::is_geographic)
    }

    pub fn projected_spatial_dimensions<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        self.dimensions_where(requested, Variable::is_projected)
    }

    pub fn temporal_dimensions<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        self.dimensions_where(requested, Variable::is_temporal)
    }

    /// Horizontal dimensions: geographic or projected
    pub fn spatial_dimensions<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        self.dimensions_where(requested, |v| {
            matches!(
                v.spatial_kind(),
                Some(SpatialKind::Geographic) | Some(SpatialKind::Projected)
            )
        })
    }

    /// Required dimensions whose dimension-scale variable satisfies `predicate`
    fn dimensions_where<S, F>(&self, requested: &[S], predicate: F) -> IndexSet<String>
    where
        S: AsRef<str>,
        F: Fn(&Variable) -> bool,
    {
        self.required_dimensions(requested)
            .into_iter()
            .filter(|dim| self.graph.get_variable(dim).is_some_and(&predicate))
            .collect()
    }
}

impl RelationshipGraph {
    /// See [`ClosureEngine::required_variables`]
    pub fn required_variables<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        ClosureEngine::new(self).required_variables(requested)
    }

    pub fn required_dimensions<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        ClosureEngine::new(self).required_dimensions(requested)
    }

    pub fn geographic_spatial_dimensions<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        ClosureEngine::new(self).geographic_spatial_dimensions(requested)
    }

    pub fn projected_spatial_dimensions<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        ClosureEngine::new(self).projected_spatial_dimensions(requested)
    }

    pub fn temporal_dimensions<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        ClosureEngine::new(self).temporal_dimensions(requested)
    }

    pub fn spatial_dimensions<S: AsRef<str>>(&self, requested: &[S]) -> IndexSet<String> {
        ClosureEngine::new(self).spatial_dimensions(requested)
    }
}
