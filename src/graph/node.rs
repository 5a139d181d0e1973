//! Node representation for a granule's namespace

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accepted latitude `units` values, compared case-insensitively
const LATITUDE_UNITS: &[&str] = &[
    "degrees_north",
    "degree_north",
    "degrees_n",
    "degree_n",
    "degreesn",
    "degreen",
];

const LONGITUDE_UNITS: &[&str] = &[
    "degrees_east",
    "degree_east",
    "degrees_e",
    "degree_e",
    "degreese",
    "degreee",
];

const PROJECTED_STANDARD_NAMES: &[&str] = &[
    "projection_x_coordinate",
    "projection_y_coordinate",
    "projection_x_angular_coordinate",
    "projection_y_angular_coordinate",
];

/// Typed attribute values, already decoded by the node source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<AttributeValue>),
    Object(IndexMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Borrow the value as a string, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value. Integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Every string held by the value: the string itself, or each string
    /// element of an array.
    pub fn strings(&self) -> Vec<&str> {
        match self {
            Self::String(s) => vec![s.as_str()],
            Self::Array(items) => items.iter().filter_map(|v| v.as_str()).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Self::Object(map) => {
                let rendered: Vec<String> =
                    map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
        }
    }
}

/// Sparse attribute mapping, kept in declaration order
///
/// Accessors return `None` for an absent attribute instead of a sentinel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(IndexMap<String, AttributeValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set an attribute, returning the value it replaced
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttributeValue::as_str)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(AttributeValue::as_f64)
    }

    /// String contents of an attribute, scalar or sequence. Empty when absent.
    pub fn get_strings(&self, name: &str) -> Vec<&str> {
        self.get(name).map(AttributeValue::strings).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, AttributeValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The kinds of cross-reference a variable can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Dimensions,
    Coordinates,
    Bounds,
    AncillaryVariables,
    GridMapping,
    CellMeasures,
    /// `geometry` and the geometry-container family (`interior_ring`,
    /// `node_coordinates`, `node_count`, `nodes`, `part_node_count`)
    Geometry,
    SubsetControlVariables,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dimensions => "dimensions",
            Self::Coordinates => "coordinates",
            Self::Bounds => "bounds",
            Self::AncillaryVariables => "ancillary_variables",
            Self::GridMapping => "grid_mapping",
            Self::CellMeasures => "cell_measures",
            Self::Geometry => "geometry",
            Self::SubsetControlVariables => "subset_control_variables",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved references of one variable, keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct References(IndexMap<ReferenceKind, IndexSet<String>>);

impl References {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved path under a kind
    pub fn add(&mut self, kind: ReferenceKind, path: impl Into<String>) {
        self.0.entry(kind).or_default().insert(path.into());
    }

    /// Ensure a kind is present even if nothing under it resolved
    pub fn touch(&mut self, kind: ReferenceKind) {
        self.0.entry(kind).or_default();
    }

    pub fn get(&self, kind: ReferenceKind) -> Option<&IndexSet<String>> {
        self.0.get(&kind)
    }

    /// True if the kind holds at least one path
    pub fn has(&self, kind: ReferenceKind) -> bool {
        self.get(kind).is_some_and(|paths| !paths.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ReferenceKind, &IndexSet<String>)> {
        self.0.iter()
    }

    /// Every referenced path across all kinds, first-seen order
    pub fn all_paths(&self) -> IndexSet<&str> {
        self.0
            .values()
            .flat_map(|paths| paths.iter().map(String::as_str))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(IndexSet::is_empty)
    }
}

/// One axis of a variable's declared shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DimensionRef {
    /// A named dimension, resolved to an absolute path
    Named { path: String },
    /// An unnamed axis known only by its size
    Anonymous { size: u64 },
    /// A dimension token that could not be resolved, or that names a group
    Unresolved { token: String },
}

impl DimensionRef {
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Named { path } => Some(path),
            _ => None,
        }
    }
}

/// A dimension declared within a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Absolute path (`<group path>/<name>`)
    pub path: String,
    /// Name, only unique within the declaring group
    pub name: String,
    /// Size, if fixed
    pub size: Option<u64>,
}

/// Classification of a variable, assigned once the graph is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableClass {
    /// Primary observational or retrieved data
    Science,
    /// Supports another variable: coordinate, dimension scale, bounds, etc.
    Reference,
    /// Neither science nor referenced by anything
    #[default]
    Metadata,
    /// Matched an excluded-science-variable rule
    Excluded,
}

/// Spatial or temporal role of a coordinate variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpatialKind {
    Geographic,
    Projected,
    Temporal,
}

/// A variable within the granule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Absolute namespace path
    pub path: String,
    /// Final path segment
    pub name: String,
    /// Path of the containing group
    pub group_path: String,
    /// Data type as reported by the source, if any
    pub data_type: Option<String>,
    /// Declared shape, axis order preserved
    pub shape: Vec<DimensionRef>,
    /// Attributes with configuration overrides applied
    pub attributes: Attributes,
    /// Resolved cross-references
    pub references: References,
    /// Derived classification
    pub class: VariableClass,
}

impl Variable {
    /// Create a variable at an absolute path with no shape or attributes
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let (group_path, name) = split_path(&path);
        Self {
            group_path: group_path.to_string(),
            name: name.to_string(),
            path,
            data_type: None,
            shape: Vec::new(),
            attributes: Attributes::new(),
            references: References::new(),
            class: VariableClass::default(),
        }
    }

    /// Named dimension paths in axis order
    pub fn dimension_paths(&self) -> impl Iterator<Item = &str> {
        self.shape.iter().filter_map(DimensionRef::path)
    }

    pub fn get_attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Paths held under one reference kind
    pub fn references_of(&self, kind: ReferenceKind) -> impl Iterator<Item = &str> {
        self.references
            .get(kind)
            .into_iter()
            .flat_map(|paths| paths.iter().map(String::as_str))
    }

    /// Every reference plus every named dimension
    pub fn all_references(&self) -> IndexSet<&str> {
        let mut all: IndexSet<&str> = self.dimension_paths().collect();
        all.extend(self.references.all_paths());
        all
    }

    pub fn is_latitude(&self) -> bool {
        units_in(self.attributes.get_str("units"), LATITUDE_UNITS)
    }

    pub fn is_longitude(&self) -> bool {
        units_in(self.attributes.get_str("units"), LONGITUDE_UNITS)
    }

    pub fn is_geographic(&self) -> bool {
        self.is_latitude() || self.is_longitude()
    }

    /// Projected x/y coordinate, including geostationary angular coordinates
    pub fn is_projected(&self) -> bool {
        self.attributes
            .get_str("standard_name")
            .is_some_and(|name| PROJECTED_STANDARD_NAMES.contains(&name))
    }

    pub fn is_temporal(&self) -> bool {
        self.attributes
            .get_str("units")
            .is_some_and(|units| units.contains(" since "))
    }

    pub fn spatial_kind(&self) -> Option<SpatialKind> {
        if self.is_geographic() {
            Some(SpatialKind::Geographic)
        } else if self.is_projected() {
            Some(SpatialKind::Projected)
        } else if self.is_temporal() {
            Some(SpatialKind::Temporal)
        } else {
            None
        }
    }

    /// `valid_range`, falling back to `[valid_min, valid_max]`
    pub fn valid_range(&self) -> Option<(f64, f64)> {
        match self.range_pair() {
            Some(range) => Some(range),
            None => Some((
                self.attributes.get_f64("valid_min")?,
                self.attributes.get_f64("valid_max")?,
            )),
        }
    }

    /// `valid_min`, falling back to the first element of `valid_range`
    pub fn valid_min(&self) -> Option<f64> {
        self.attributes
            .get_f64("valid_min")
            .or_else(|| self.range_pair().map(|(min, _)| min))
    }

    /// `valid_max`, falling back to the second element of `valid_range`
    pub fn valid_max(&self) -> Option<f64> {
        self.attributes
            .get_f64("valid_max")
            .or_else(|| self.range_pair().map(|(_, max)| max))
    }

    fn range_pair(&self) -> Option<(f64, f64)> {
        match self.attributes.get("valid_range")? {
            AttributeValue::Array(items) if items.len() == 2 => {
                Some((items[0].as_f64()?, items[1].as_f64()?))
            }
            _ => None,
        }
    }
}

/// A group (namespace) within the granule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Absolute namespace path, `/` for the root
    pub path: String,
    /// Attributes with configuration overrides applied. For the root group
    /// these are the granule's global attributes.
    pub attributes: Attributes,
    /// Child variable paths, in source order
    pub variables: Vec<String>,
    /// Child group paths, in source order
    pub groups: Vec<String>,
    /// Paths of dimensions declared in this group
    pub dimensions: Vec<String>,
}

impl Group {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            attributes: Attributes::new(),
            variables: Vec::new(),
            groups: Vec::new(),
            dimensions: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    pub fn get_attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

/// Split an absolute path into (group path, name). The root's parent is
/// the root itself.
pub(crate) fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("/", path),
    }
}

fn units_in(units: Option<&str>, accepted: &[&str]) -> bool {
    units.is_some_and(|u| accepted.contains(&u.trim().to_ascii_lowercase().as_str()))
}
