//! Extraction of CF-Convention cross-references from variable attributes

use super::node::{DimensionRef, Group, ReferenceKind, References, Variable};
use super::path::{PathResolver, Resolution};
use indexmap::IndexMap;
use tracing::{debug, trace};

/// Attributes holding whitespace- or comma-separated variable references
const LIST_ATTRIBUTES: &[(&str, ReferenceKind)] = &[
    ("coordinates", ReferenceKind::Coordinates),
    ("bounds", ReferenceKind::Bounds),
    ("ancillary_variables", ReferenceKind::AncillaryVariables),
    ("grid_mapping", ReferenceKind::GridMapping),
    ("cell_measures", ReferenceKind::CellMeasures),
    ("subset_control_variables", ReferenceKind::SubsetControlVariables),
];

/// Attributes of a geometry container that name further variables
const GEOMETRY_FAMILY: &[&str] = &[
    "interior_ring",
    "node_coordinates",
    "node_count",
    "nodes",
    "part_node_count",
];

/// Attribute that replaces the declared dimension list
pub const DIMENSIONS_ATTRIBUTE: &str = "dimensions";

/// Output of extracting one variable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    /// Declared shape with every named axis resolved
    pub shape: Vec<DimensionRef>,
    pub references: References,
}

/// Produces typed references for variables of one granule
///
/// Tokens are resolved in the referring variable's own group, except for
/// geometry-container members, which resolve in the container's group.
pub struct ReferenceExtractor<'a> {
    resolver: PathResolver<'a>,
    variables: &'a IndexMap<String, Variable>,
    groups: &'a IndexMap<String, Group>,
}

impl<'a> ReferenceExtractor<'a> {
    pub fn new(
        resolver: PathResolver<'a>,
        variables: &'a IndexMap<String, Variable>,
        groups: &'a IndexMap<String, Group>,
    ) -> Self {
        Self {
            resolver,
            variables,
            groups,
        }
    }

    /// Resolve the shape and every reference-bearing attribute of `variable`
    pub fn extract(&self, variable: &Variable) -> Extracted {
        let mut references = References::new();
        let shape = self.extract_shape(variable);

        let named: Vec<&str> = shape.iter().filter_map(DimensionRef::path).collect();
        if !named.is_empty() {
            references.touch(ReferenceKind::Dimensions);
            for path in named {
                references.add(ReferenceKind::Dimensions, path);
            }
        }

        for (attribute, kind) in LIST_ATTRIBUTES {
            if !variable.attributes.contains(attribute) {
                continue;
            }
            references.touch(*kind);
            for token in attribute_tokens(variable, attribute) {
                // `cell_measures` pairs are "measure: variable"
                if *kind == ReferenceKind::CellMeasures && token.ends_with(':') {
                    continue;
                }
                if let Some(path) = self.resolve(token, variable) {
                    references.add(*kind, path);
                }
            }
        }

        self.extract_geometry(variable, &mut references);

        Extracted { shape, references }
    }

    fn extract_shape(&self, variable: &Variable) -> Vec<DimensionRef> {
        if variable.attributes.contains(DIMENSIONS_ATTRIBUTE) {
            return attribute_tokens(variable, DIMENSIONS_ATTRIBUTE)
                .into_iter()
                .map(|token| self.resolve_dimension(token, variable))
                .collect();
        }

        variable
            .shape
            .iter()
            .map(|axis| match axis {
                DimensionRef::Unresolved { token } => self.resolve_dimension(token, variable),
                other => other.clone(),
            })
            .collect()
    }

    fn resolve_dimension(&self, token: &str, variable: &Variable) -> DimensionRef {
        match self.resolve(token, variable) {
            Some(path) if self.groups.contains_key(&path) => {
                debug!(
                    variable = %variable.path,
                    token,
                    "dimension names a group, left unresolved"
                );
                DimensionRef::Unresolved {
                    token: token.to_string(),
                }
            }
            Some(path) => DimensionRef::Named { path },
            None => DimensionRef::Unresolved {
                token: token.to_string(),
            },
        }
    }

    fn extract_geometry(&self, variable: &Variable, references: &mut References) {
        let has_family = std::iter::once("geometry")
            .chain(GEOMETRY_FAMILY.iter().copied())
            .any(|name| variable.attributes.contains(name));
        if !has_family {
            return;
        }
        references.touch(ReferenceKind::Geometry);

        for token in attribute_tokens(variable, "geometry") {
            let Some(container_path) = self.resolve(token, variable) else {
                continue;
            };
            references.add(ReferenceKind::Geometry, container_path.as_str());

            // Follow the container one level
            if let Some(container) = self.variables.get(&container_path) {
                for name in GEOMETRY_FAMILY {
                    for member in attribute_tokens(container, name) {
                        if let Some(path) = self.resolve(member, container) {
                            references.add(ReferenceKind::Geometry, path);
                        }
                    }
                }
            }
        }

        for name in GEOMETRY_FAMILY {
            for token in attribute_tokens(variable, name) {
                if let Some(path) = self.resolve(token, variable) {
                    references.add(ReferenceKind::Geometry, path);
                }
            }
        }
    }

    fn resolve(&self, token: &str, variable: &Variable) -> Option<String> {
        let resolution = self.resolver.resolve(token, &variable.group_path);
        if resolution.is_unresolved() {
            debug!(variable = %variable.path, token, "dropping unresolvable reference");
        }
        if let Resolution::Fallback(path) = &resolution {
            trace!(
                variable = %variable.path,
                token,
                fallback = %path,
                "reference not found in any enclosing group"
            );
        }
        resolution.into_path()
    }
}

/// Split every string value of an attribute on whitespace and commas
fn attribute_tokens<'v>(variable: &'v Variable, attribute: &str) -> Vec<&'v str> {
    variable
        .attributes
        .get_strings(attribute)
        .into_iter()
        .flat_map(|value| value.split(|c: char| c.is_whitespace() || c == ','))
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{AttributeValue, Attributes};
    use std::collections::HashSet;

    struct Fixture {
        known: HashSet<String>,
        variables: IndexMap<String, Variable>,
        groups: IndexMap<String, Group>,
    }

    impl Fixture {
        fn new(groups: &[&str]) -> Self {
            Self {
                known: HashSet::new(),
                variables: IndexMap::new(),
                groups: groups
                    .iter()
                    .map(|g| (g.to_string(), Group::new(*g)))
                    .collect(),
            }
        }

        fn variable(mut self, path: &str, attributes: Attributes) -> Self {
            let mut var = Variable::new(path);
            var.attributes = attributes;
            self.known.insert(path.to_string());
            self.variables.insert(path.to_string(), var);
            self
        }

        fn dimension(mut self, path: &str) -> Self {
            self.known.insert(path.to_string());
            self
        }

        fn extract(&self, path: &str) -> Extracted {
            let extractor = ReferenceExtractor::new(
                PathResolver::new(&self.known),
                &self.variables,
                &self.groups,
            );
            extractor.extract(&self.variables[path])
        }
    }

    fn paths(refs: &References, kind: ReferenceKind) -> Vec<String> {
        refs.get(kind)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_coordinates_split_on_whitespace_and_commas() {
        let fixture = Fixture::new(&["/", "/Grid"])
            .variable("/Grid/time", Attributes::new())
            .variable("/Grid/lat", Attributes::new())
            .variable("/Grid/lon", Attributes::new())
            .variable(
                "/Grid/precip",
                Attributes::new().with("coordinates", "time, lon  lat"),
            );

        let extracted = fixture.extract("/Grid/precip");
        assert_eq!(
            paths(&extracted.references, ReferenceKind::Coordinates),
            vec!["/Grid/time", "/Grid/lon", "/Grid/lat"]
        );
    }

    #[test]
    fn test_cell_measures_skip_measure_names() {
        let fixture = Fixture::new(&["/"])
            .variable("/cell_area", Attributes::new())
            .variable("/tas", Attributes::new().with("cell_measures", "area: cell_area"));

        let extracted = fixture.extract("/tas");
        assert_eq!(
            paths(&extracted.references, ReferenceKind::CellMeasures),
            vec!["/cell_area"]
        );
    }

    #[test]
    fn test_grid_mapping_strips_colons() {
        let fixture = Fixture::new(&["/"])
            .variable("/crs", Attributes::new())
            .variable("/ssh", Attributes::new().with("grid_mapping", "crs:"));

        let extracted = fixture.extract("/ssh");
        assert_eq!(
            paths(&extracted.references, ReferenceKind::GridMapping),
            vec!["/crs"]
        );
    }

    #[test]
    fn test_geometry_container_followed_one_level() {
        let fixture = Fixture::new(&["/", "/shapes"])
            .variable("/shapes/x", Attributes::new())
            .variable("/shapes/y", Attributes::new())
            .variable("/shapes/node_count", Attributes::new())
            .variable(
                "/shapes/container",
                Attributes::new()
                    .with("node_coordinates", "x y")
                    .with("node_count", "node_count"),
            )
            .variable(
                "/shapes/someData",
                Attributes::new().with("geometry", "container"),
            );

        let extracted = fixture.extract("/shapes/someData");
        assert_eq!(
            paths(&extracted.references, ReferenceKind::Geometry),
            vec![
                "/shapes/container",
                "/shapes/x",
                "/shapes/y",
                "/shapes/node_count"
            ]
        );
    }

    #[test]
    fn test_array_attribute_tokenized_per_element() {
        let fixture = Fixture::new(&["/"])
            .variable("/a", Attributes::new())
            .variable("/b", Attributes::new())
            .variable(
                "/data",
                Attributes::new().with(
                    "ancillary_variables",
                    AttributeValue::Array(vec!["a".into(), "b".into()]),
                ),
            );

        let extracted = fixture.extract("/data");
        assert_eq!(
            paths(&extracted.references, ReferenceKind::AncillaryVariables),
            vec!["/a", "/b"]
        );
    }

    #[test]
    fn test_unresolvable_tokens_dropped_but_kind_present() {
        let fixture = Fixture::new(&["/", "/gt1l"])
            .variable("/gt1l/h", Attributes::new().with("coordinates", "../../lat"));

        let extracted = fixture.extract("/gt1l/h");
        assert!(extracted.references.get(ReferenceKind::Coordinates).is_some());
        assert!(!extracted.references.has(ReferenceKind::Coordinates));
    }

    #[test]
    fn test_declared_shape_resolved() {
        let mut fixture = Fixture::new(&["/", "/Grid"]).dimension("/Grid/lat");
        let mut var = Variable::new("/Grid/precip");
        var.shape = vec![
            DimensionRef::Unresolved {
                token: "lat".to_string(),
            },
            DimensionRef::Anonymous { size: 3 },
            DimensionRef::Unresolved {
                token: "Grid".to_string(),
            },
        ];
        fixture.variables.insert(var.path.clone(), var);

        let extracted = fixture.extract("/Grid/precip");
        assert_eq!(
            extracted.shape,
            vec![
                DimensionRef::Named {
                    path: "/Grid/lat".to_string()
                },
                DimensionRef::Anonymous { size: 3 },
                DimensionRef::Unresolved {
                    token: "Grid".to_string()
                },
            ]
        );
        assert_eq!(
            paths(&extracted.references, ReferenceKind::Dimensions),
            vec!["/Grid/lat"]
        );
    }

    #[test]
    fn test_dimensions_attribute_replaces_shape() {
        let mut fixture = Fixture::new(&["/"])
            .dimension("/time")
            .dimension("/lat")
            .variable("/v", Attributes::new().with("dimensions", "time lat"));
        if let Some(var) = fixture.variables.get_mut("/v") {
            var.shape = vec![DimensionRef::Anonymous { size: 10 }];
        }

        let extracted = fixture.extract("/v");
        let named: Vec<&str> = extracted
            .shape
            .iter()
            .filter_map(DimensionRef::path)
            .collect();
        assert_eq!(named, vec!["/time", "/lat"]);
        assert_eq!(extracted.shape.len(), 2);
    }
}
