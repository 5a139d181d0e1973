//! Node-tree input contract
//!
//! Format adapters (structural-metadata documents, native array
//! containers) turn a granule into a tree of [`SourceNode`]s with attribute
//! values already decoded. The graph builder depends only on
//! [`NodeSource`].

use crate::graph::{AttributeValue, Attributes, GraphError};
use serde::{Deserialize, Serialize};

/// Anything that can produce a granule's node tree
pub trait NodeSource {
    /// The tree's top node, normally the root group `/`
    fn root(&self) -> Result<SourceNode, GraphError>;
}

/// A dimension declared by a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDimension {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// One axis of a variable's declared shape, before resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimensionToken {
    /// A dimension name or path, resolved like any other reference
    Named(String),
    /// An unnamed axis
    Anonymous { size: u64 },
}

impl From<&str> for DimensionToken {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<u64> for DimensionToken {
    fn from(size: u64) -> Self {
        Self::Anonymous { size }
    }
}

/// A node of the input tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceNode {
    Group {
        path: String,
        #[serde(default)]
        attributes: Attributes,
        #[serde(default)]
        dimensions: Vec<SourceDimension>,
        #[serde(default)]
        children: Vec<SourceNode>,
    },
    Variable {
        path: String,
        #[serde(default)]
        data_type: Option<String>,
        #[serde(default)]
        dimensions: Vec<DimensionToken>,
        #[serde(default)]
        attributes: Attributes,
    },
}

impl SourceNode {
    /// An empty group
    pub fn group(path: impl Into<String>) -> Self {
        Self::Group {
            path: path.into(),
            attributes: Attributes::new(),
            dimensions: Vec::new(),
            children: Vec::new(),
        }
    }

    /// A scalar variable with no attributes
    pub fn variable(path: impl Into<String>) -> Self {
        Self::Variable {
            path: path.into(),
            data_type: None,
            dimensions: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Group { path, .. } | Self::Variable { path, .. } => path,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group { .. })
    }

    /// Set an attribute on either kind of node
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        match &mut self {
            Self::Group { attributes, .. } | Self::Variable { attributes, .. } => {
                attributes.insert(name, value);
            }
        }
        self
    }

    /// Add a child node. Ignored for variables.
    pub fn child(mut self, node: SourceNode) -> Self {
        if let Self::Group { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    /// Declare a dimension on a group. Ignored for variables.
    pub fn dimension(mut self, name: impl Into<String>, size: Option<u64>) -> Self {
        if let Self::Group { dimensions, .. } = &mut self {
            dimensions.push(SourceDimension {
                name: name.into(),
                size,
            });
        }
        self
    }

    /// Set a variable's declared shape. Ignored for groups.
    pub fn shape<I, T>(mut self, axes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<DimensionToken>,
    {
        if let Self::Variable { dimensions, .. } = &mut self {
            *dimensions = axes.into_iter().map(Into::into).collect();
        }
        self
    }

    pub fn data_type(mut self, name: impl Into<String>) -> Self {
        if let Self::Variable { data_type, .. } = &mut self {
            *data_type = Some(name.into());
        }
        self
    }
}

/// In-memory node tree, deserializable from JSON or YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeTree {
    root: SourceNode,
}

impl NodeTree {
    pub fn new(root: SourceNode) -> Self {
        Self { root }
    }

    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        serde_json::from_str(json).map_err(|e| GraphError::Source(e.to_string()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, GraphError> {
        serde_yaml::from_str(yaml).map_err(|e| GraphError::Source(e.to_string()))
    }
}

impl NodeSource for NodeTree {
    fn root(&self) -> Result<SourceNode, GraphError> {
        Ok(self.root.clone())
    }
}

impl NodeSource for SourceNode {
    fn root(&self) -> Result<SourceNode, GraphError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_tree_parses() {
        let yaml = r#"
kind: group
path: /
attributes:
  short_name: GPM_3IMERGHH
children:
  - kind: group
    path: /Grid
    dimensions:
      - { name: lat, size: 1800 }
      - { name: nv }
    children:
      - kind: variable
        path: /Grid/precipitationCal
        data_type: float32
        dimensions: [time, lon, lat, { size: 2 }]
        attributes:
          coordinates: time lon lat
          _FillValue: -9999.9
"#;
        let tree = NodeTree::from_yaml_str(yaml).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(root.path(), "/");

        let SourceNode::Group { children, attributes, .. } = root else {
            panic!("expected root group");
        };
        assert_eq!(attributes.get_str("short_name"), Some("GPM_3IMERGHH"));

        let SourceNode::Group { dimensions, children, .. } = &children[0] else {
            panic!("expected /Grid group");
        };
        assert_eq!(dimensions[0].size, Some(1800));
        assert_eq!(dimensions[1].size, None);

        let SourceNode::Variable { dimensions, attributes, .. } = &children[0] else {
            panic!("expected variable");
        };
        assert_eq!(
            dimensions,
            &vec![
                DimensionToken::from("time"),
                DimensionToken::from("lon"),
                DimensionToken::from("lat"),
                DimensionToken::Anonymous { size: 2 },
            ]
        );
        assert_eq!(attributes.get_f64("_FillValue"), Some(-9999.9));
    }

    #[test]
    fn test_json_tree_parses() {
        let json = r#"{
            "kind": "variable",
            "path": "/lat",
            "attributes": {"units": "degrees_north", "valid_range": [-90, 90]}
        }"#;
        let tree = NodeTree::from_json_str(json).unwrap();
        let root = tree.root().unwrap();
        assert!(!root.is_group());
        assert_eq!(root.path(), "/lat");
    }

    #[test]
    fn test_malformed_tree_is_source_error() {
        let err = NodeTree::from_json_str(r#"{"kind": "table", "path": "/"}"#).unwrap_err();
        assert!(matches!(err, GraphError::Source(_)));
    }

    #[test]
    fn test_builder_ignores_mismatched_kinds() {
        let var = SourceNode::variable("/v")
            .child(SourceNode::variable("/w"))
            .dimension("x", Some(1))
            .shape(["x"])
            .data_type("int32");
        assert_eq!(
            var,
            SourceNode::Variable {
                path: "/v".to_string(),
                data_type: Some("int32".to_string()),
                dimensions: vec![DimensionToken::from("x")],
                attributes: Attributes::new(),
            }
        );
    }
}
