//! Variable classification

use crate::graph::{ReferenceKind, RelationshipGraph, Variable, VariableClass};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Assigns a [`VariableClass`] to every variable of a graph
///
/// - **Excluded**: matches an applicable excluded-science-variable rule.
/// - **Science**: a candidate that no other variable references and that is
///   not a support variable. A candidate has a spatial or temporal dimension
///   scale other than itself, or a non-empty `coordinates` or `grid_mapping`
///   reference.
/// - **Reference**: a support variable (dimension scale, bounds or
///   geometry target, or any `*_bnds` array) or anything another variable
///   references.
/// - **Metadata**: everything else.
pub struct ClassificationEngine<'g> {
    graph: &'g RelationshipGraph,
}

impl<'g> ClassificationEngine<'g> {
    pub fn new(graph: &'g RelationshipGraph) -> Self {
        Self { graph }
    }

    pub fn classify(&self) -> IndexMap<String, VariableClass> {
        let engine = self.graph.rule_engine();
        let dimension_scales = self.dimension_scales();
        let support = self.support_variables(&dimension_scales);
        let referenced = self.referenced_by_others();

        self.graph
            .variables()
            .map(|variable| {
                let path = variable.path.as_str();
                let class = if engine.is_excluded(path) {
                    VariableClass::Excluded
                } else if support.contains(path) || referenced.contains(path) {
                    VariableClass::Reference
                } else if self.is_candidate(variable) {
                    VariableClass::Science
                } else {
                    VariableClass::Metadata
                };
                (variable.path.clone(), class)
            })
            .collect()
    }

    /// Variables that serve as the coordinate array of a dimension
    fn dimension_scales(&self) -> HashSet<&'g str> {
        let declared = self
            .graph
            .dimensions()
            .map(|d| d.path.as_str())
            .filter(|p| self.graph.get_variable(p).is_some());

        let used = self
            .graph
            .variables()
            .flat_map(Variable::dimension_paths)
            .filter(|p| self.graph.get_variable(p).is_some());

        declared.chain(used).collect()
    }

    fn support_variables(&self, dimension_scales: &HashSet<&'g str>) -> HashSet<&'g str> {
        let mut support = dimension_scales.clone();
        for variable in self.graph.variables() {
            if variable.path.ends_with("_bnds") {
                support.insert(variable.path.as_str());
            }
            for kind in [ReferenceKind::Bounds, ReferenceKind::Geometry] {
                support.extend(
                    variable
                        .references_of(kind)
                        .filter(|target| *target != variable.path),
                );
            }
        }
        support
    }

    fn referenced_by_others(&self) -> HashSet<&'g str> {
        self.graph
            .variables()
            .flat_map(|variable| {
                variable
                    .all_references()
                    .into_iter()
                    .filter(move |target| *target != variable.path)
            })
            .collect()
    }

    fn is_candidate(&self, variable: &Variable) -> bool {
        let has_spatial_dimension = !variable.path.ends_with("_bnds")
            && variable
                .dimension_paths()
                .filter(|dim| *dim != variable.path)
                .filter_map(|dim| self.graph.get_variable(dim))
                .any(|scale| scale.spatial_kind().is_some());

        has_spatial_dimension
            || variable.references.has(ReferenceKind::Coordinates)
            || variable.references.has(ReferenceKind::GridMapping)
    }
}
