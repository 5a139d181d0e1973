//! Grouping variables by shape

use crate::graph::{RelationshipGraph, SpatialKind};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

/// Ordered dimension paths mapped to the variables sharing them
pub type DimensionGroups = IndexMap<Vec<String>, IndexSet<String>>;

impl RelationshipGraph {
    /// Group every variable by its ordered named dimensions
    ///
    /// Anonymous and unresolved axes do not contribute to the key.
    pub fn group_variables_by_dimensions(&self) -> DimensionGroups {
        let mut groups = DimensionGroups::new();
        for variable in self.variables() {
            let key: Vec<String> = variable.dimension_paths().map(str::to_string).collect();
            groups.entry(key).or_default().insert(variable.path.clone());
        }
        groups
    }

    /// Group variables by their horizontal (geographic or projected)
    /// dimensions only, keeping axis order
    ///
    /// `(time, lat, lon)` and `(lat, lon)` share a group; `(lon, lat)` does not.
    pub fn group_variables_by_horizontal_dimensions(&self) -> DimensionGroups {
        let mut horizontal = DimensionGroups::new();
        for (dimensions, variables) in self.group_variables_by_dimensions() {
            let key: Vec<String> = dimensions
                .into_iter()
                .filter(|dim| self.is_horizontal(dim))
                .collect();
            horizontal.entry(key).or_default().extend(variables);
        }
        horizontal
    }

    /// Variables whose dimensions include every one of `dimensions`
    pub fn variables_with_dimensions<S: AsRef<str>>(&self, dimensions: &[S]) -> IndexSet<String> {
        self.variables()
            .filter(|variable| {
                let own: HashSet<&str> = variable.dimension_paths().collect();
                dimensions.iter().all(|dim| own.contains(dim.as_ref()))
            })
            .map(|variable| variable.path.clone())
            .collect()
    }

    fn is_horizontal(&self, dimension: &str) -> bool {
        self.get_variable(dimension).is_some_and(|scale| {
            matches!(
                scale.spatial_kind(),
                Some(SpatialKind::Geographic) | Some(SpatialKind::Projected)
            )
        })
    }
}
