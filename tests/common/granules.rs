//! Granule fixtures
//!
//! Built with [`GranuleBuilder`], which takes nodes in any order by
//! absolute path and nests them into a source tree.

use std::sync::Arc;
use varinfo::{GraphBuilder, RelationshipGraph, RuleSet, SourceNode};

/// Flat, path-keyed granule description
#[derive(Debug, Clone, Default)]
pub struct GranuleBuilder {
    root: Vec<(String, varinfo::AttributeValue)>,
    root_dimensions: Vec<(String, Option<u64>)>,
    nodes: Vec<SourceNode>,
}

impl GranuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Global (root group) attribute
    pub fn global(mut self, name: &str, value: impl Into<varinfo::AttributeValue>) -> Self {
        self.root.push((name.to_string(), value.into()));
        self
    }

    /// Dimension declared on the root group
    pub fn root_dimension(mut self, name: &str, size: Option<u64>) -> Self {
        self.root_dimensions.push((name.to_string(), size));
        self
    }

    /// A group; `configure` may add attributes and dimensions
    pub fn group(mut self, path: &str, configure: impl FnOnce(SourceNode) -> SourceNode) -> Self {
        self.nodes.push(configure(SourceNode::group(path)));
        self
    }

    /// A variable; `configure` may add a shape and attributes
    pub fn variable(
        mut self,
        path: &str,
        configure: impl FnOnce(SourceNode) -> SourceNode,
    ) -> Self {
        self.nodes.push(configure(SourceNode::variable(path)));
        self
    }

    /// Nest the nodes under an explicit root group
    pub fn tree(&self) -> SourceNode {
        let mut root = SourceNode::group("/");
        for (name, value) in &self.root {
            root = root.attribute(name.as_str(), value.clone());
        }
        for (name, size) in &self.root_dimensions {
            root = root.dimension(name.as_str(), *size);
        }
        self.attach_children(root, "/")
    }

    fn attach_children(&self, mut group: SourceNode, group_path: &str) -> SourceNode {
        for node in self.nodes.iter().filter(|n| parent_of(n.path()) == group_path) {
            let child = if node.is_group() {
                self.attach_children(node.clone(), node.path())
            } else {
                node.clone()
            };
            group = group.child(child);
        }
        group
    }

    /// Build with the given rules and an explicit short name
    pub fn build(&self, rules: Arc<RuleSet>, short_name: Option<&str>) -> RelationshipGraph {
        let mut builder = GraphBuilder::new(rules);
        if let Some(short_name) = short_name {
            builder = builder.short_name(short_name);
        }
        builder.build(&self.tree()).expect("fixture granule builds")
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

/// GPM IMERG half-hourly layout: a `/Grid` group whose precipitation
/// variable names `time lon lat` as coordinates, each with bounds.
pub fn gpm_imerg_like() -> GranuleBuilder {
    GranuleBuilder::new()
        .global("FileHeader", "DOI=10.5067/GPM/IMERG/3B-HH/06;")
        .group("/Grid", |g| g)
        .variable("/Grid/time", |v| {
            v.shape(["time"])
                .attribute("units", "seconds since 1970-01-01 00:00:00 UTC")
                .attribute("bounds", "time_bnds")
        })
        .variable("/Grid/lon", |v| {
            v.shape(["lon"])
                .attribute("units", "degrees_east")
                .attribute("bounds", "lon_bnds")
        })
        .variable("/Grid/lat", |v| {
            v.shape(["lat"])
                .attribute("units", "degrees_north")
                .attribute("bounds", "lat_bnds")
        })
        .variable("/Grid/time_bnds", |v| v.shape(["time", "nv"]))
        .variable("/Grid/lon_bnds", |v| v.shape(["lon", "nv"]))
        .variable("/Grid/lat_bnds", |v| v.shape(["lat", "nv"]))
        .variable("/Grid/precipitationCal", |v| {
            v.data_type("float32")
                .shape(["time", "lon", "lat"])
                .attribute("coordinates", "time lon lat")
                .attribute("units", "mm/hr")
        })
        .variable("/Grid/HQprecipitation", |v| {
            v.data_type("float32")
                .shape(["time", "lon", "lat"])
                .attribute("coordinates", "time lon lat")
        })
}

/// GEDI L2A-like layout: per-beam groups, each with a `shot_number`, and
/// the collection short name stored in `/METADATA/DatasetIdentification`.
pub fn gedi_like() -> GranuleBuilder {
    let mut builder = GranuleBuilder::new()
        .group("/METADATA", |g| g)
        .group("/METADATA/DatasetIdentification", |g| {
            g.attribute("shortName", "GEDI_L2A")
        });

    for beam in ["BEAM0000", "BEAM0101"] {
        let group = format!("/{}", beam);
        builder = builder
            .group(&group, |g| g)
            .variable(&format!("{}/shot_number", group), |v| v.shape([10u64]))
            .variable(&format!("{}/lat_lowestmode", group), |v| {
                v.shape([10u64]).attribute("units", "degrees_north")
            })
            .variable(&format!("{}/lon_lowestmode", group), |v| {
                v.shape([10u64]).attribute("units", "degrees_east")
            })
            .variable(&format!("{}/elev_lowestmode", group), |v| {
                v.shape([10u64])
                    .attribute("coordinates", "lat_lowestmode lon_lowestmode")
            });
    }
    builder
}

/// ATL03-like layout: photon heights whose coordinates live in a sibling
/// geolocation group and are only declared by configuration overrides.
pub fn atl03_like() -> GranuleBuilder {
    GranuleBuilder::new()
        .global("short_name", "ATL03")
        .group("/gt1l", |g| g)
        .group("/gt1l/geolocation", |g| g)
        .group("/gt1l/heights", |g| g)
        .variable("/gt1l/geolocation/reference_photon_lat", |v| {
            v.shape([100u64]).attribute("units", "degrees_north")
        })
        .variable("/gt1l/geolocation/reference_photon_lon", |v| {
            v.shape([100u64]).attribute("units", "degrees_east")
        })
        .variable("/gt1l/heights/h_ph", |v| {
            v.shape([1000u64]).attribute("units", "meters")
        })
        .variable("/gt1l/heights/signal_conf_ph", |v| v.shape([1000u64, 5u64]))
        .group("/quality_assessment", |g| g)
        .variable("/quality_assessment/qa_granule_pass_fail", |v| {
            v.attribute("coordinates", "delta_time")
        })
}
