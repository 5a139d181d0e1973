//! Rule matching and override precedence

use super::config::{
    ApplicabilityEntry, ConfigDocument, ConfigError, ConfigResult, OverrideEntry, PatternEntry,
};
use crate::graph::AttributeValue;
use indexmap::IndexMap;
use regex::Regex;
use std::fmt;
use std::path::Path;

/// A configuration regular expression, matched from the start of the input
///
/// Anchoring is at the start only, so `/Grid/lat` also matches
/// `/Grid/lat_bnds`. Use `$` to anchor the end.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> ConfigResult<Self> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{})", source)).map_err(|e| {
            ConfigError::InvalidPattern {
                pattern: source.clone(),
                source: e,
            }
        })?;
        Ok(Self { source, regex })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Namespace depth implied by the pattern: its number of `/` characters
    pub fn depth(&self) -> usize {
        self.source.matches('/').count()
    }

    /// Length of the pattern text
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Mission and collection short name for one granule
///
/// Resolved once per granule and passed explicitly to every rule query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GranuleContext {
    pub mission: Option<String>,
    pub short_name: Option<String>,
}

impl GranuleContext {
    pub fn new(mission: Option<String>, short_name: Option<String>) -> Self {
        Self {
            mission,
            short_name,
        }
    }
}

/// Compiled applicability predicate
///
/// A mission or short-name predicate never holds when the corresponding
/// context value is unknown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applicability {
    pub mission: Option<Pattern>,
    pub short_name: Option<Pattern>,
    pub variable: Option<Pattern>,
}

impl Applicability {
    fn compile(entry: &ApplicabilityEntry) -> ConfigResult<Self> {
        Ok(Self {
            mission: entry.mission.as_deref().map(Pattern::new).transpose()?,
            short_name: entry.short_name_path.as_deref().map(Pattern::new).transpose()?,
            variable: entry.variable_pattern.as_deref().map(Pattern::new).transpose()?,
        })
    }

    /// Mission and short-name predicates only
    pub fn matches_granule(&self, context: &GranuleContext) -> bool {
        predicate_holds(self.mission.as_ref(), context.mission.as_deref())
            && predicate_holds(self.short_name.as_ref(), context.short_name.as_deref())
    }

    /// Full predicate, including the namespace path
    pub fn matches(&self, context: &GranuleContext, path: &str) -> bool {
        self.matches_granule(context)
            && self.variable.as_ref().map_or(true, |p| p.is_match(path))
    }

    /// Precedence key: (depth, pattern length). A global rule ranks lowest.
    pub fn specificity(&self) -> (usize, usize) {
        self.variable
            .as_ref()
            .map_or((0, 0), |p| (p.depth(), p.len()))
    }
}

fn predicate_holds(pattern: Option<&Pattern>, value: Option<&str>) -> bool {
    match (pattern, value) {
        (None, _) => true,
        (Some(pattern), Some(value)) => pattern.is_match(value),
        (Some(_), None) => false,
    }
}

/// A `MetadataOverrides` rule
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRule {
    pub applicability: Applicability,
    /// Attribute assignments, in declaration order
    pub attributes: Vec<(String, AttributeValue)>,
}

impl OverrideRule {
    fn compile(entry: &OverrideEntry) -> ConfigResult<Self> {
        Ok(Self {
            applicability: Applicability::compile(&entry.applicability)?,
            attributes: entry
                .attributes
                .iter()
                .filter_map(|a| Some((a.name.clone()?, a.value.clone()?)))
                .collect(),
        })
    }
}

/// A `RequiredVariables` or `ExcludedScienceVariables` rule
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRule {
    pub applicability: Applicability,
    pub patterns: Vec<Pattern>,
}

impl PatternRule {
    fn compile(entry: &PatternEntry) -> ConfigResult<Self> {
        Ok(Self {
            applicability: Applicability::compile(&entry.applicability)?,
            patterns: entry
                .variable_pattern
                .iter()
                .map(Pattern::new)
                .collect::<ConfigResult<_>>()?,
        })
    }
}

/// Validated, compiled configuration
///
/// Immutable once loaded and shared across every granule of the
/// collections it describes.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    identification: Option<String>,
    short_name_paths: Vec<String>,
    missions: Vec<(Pattern, String)>,
    excluded: Vec<PatternRule>,
    required: Vec<PatternRule>,
    overrides: Vec<OverrideRule>,
}

impl RuleSet {
    /// A ruleset with no rules at all
    pub fn empty() -> Self {
        Self::default()
    }

    /// Validate and compile a parsed document
    pub fn from_document(document: &ConfigDocument) -> ConfigResult<Self> {
        document.validate()?;

        let missions = document
            .mission
            .iter()
            .map(|(pattern, mission)| {
                Ok::<_, ConfigError>((Pattern::new(pattern.as_str())?, mission.clone()))
            })
            .collect::<ConfigResult<_>>()?;

        Ok(Self {
            identification: document.identification.clone(),
            short_name_paths: document.collection_short_name_path.clone(),
            missions,
            excluded: document
                .excluded_science_variables
                .iter()
                .map(PatternRule::compile)
                .collect::<ConfigResult<_>>()?,
            required: document
                .required_variables
                .iter()
                .map(PatternRule::compile)
                .collect::<ConfigResult<_>>()?,
            overrides: document
                .metadata_overrides
                .iter()
                .map(OverrideRule::compile)
                .collect::<ConfigResult<_>>()?,
        })
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Self::from_document(&ConfigDocument::from_json_str(json)?)
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Self::from_document(&ConfigDocument::from_yaml_str(yaml)?)
    }

    /// Load from a `.json`, `.yml` or `.yaml` file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::from_document(&ConfigDocument::from_file(path)?)
    }

    pub fn identification(&self) -> Option<&str> {
        self.identification.as_deref()
    }

    /// Attribute paths to search for a granule's collection short name
    pub fn short_name_paths(&self) -> &[String] {
        &self.short_name_paths
    }

    pub fn overrides(&self) -> &[OverrideRule] {
        &self.overrides
    }

    /// Mission for a short name: the first matching pattern in declaration order
    pub fn resolve_mission(&self, short_name: &str) -> Option<&str> {
        self.missions
            .iter()
            .find(|(pattern, _)| pattern.is_match(short_name))
            .map(|(_, mission)| mission.as_str())
    }

    /// Build the granule context for a short name
    pub fn context_for(&self, short_name: Option<&str>) -> GranuleContext {
        GranuleContext {
            mission: short_name
                .and_then(|name| self.resolve_mission(name))
                .map(str::to_string),
            short_name: short_name.map(str::to_string),
        }
    }

    /// Bind the ruleset to one granule
    pub fn engine<'a>(&'a self, context: &'a GranuleContext) -> RuleEngine<'a> {
        RuleEngine {
            rules: self,
            context,
        }
    }

    /// Precedence-resolved overrides for `path`
    ///
    /// Matching rules are ranked by [`Applicability::specificity`] and
    /// folded in ascending order, so the most specific value of an
    /// attribute wins. Equal rank keeps declaration order, so the
    /// last-declared rule wins.
    pub fn overrides_for(
        &self,
        context: &GranuleContext,
        path: &str,
    ) -> IndexMap<String, AttributeValue> {
        let mut matching: Vec<&OverrideRule> = self
            .overrides
            .iter()
            .filter(|rule| rule.applicability.matches(context, path))
            .collect();
        matching.sort_by_key(|rule| rule.applicability.specificity());

        let mut resolved = IndexMap::new();
        for rule in matching {
            for (name, value) in &rule.attributes {
                resolved.insert(name.clone(), value.clone());
            }
        }
        resolved
    }

    /// Required-variable patterns applicable to the granule
    pub fn required_patterns<'a>(
        &'a self,
        context: &'a GranuleContext,
    ) -> impl Iterator<Item = &'a Pattern> + 'a {
        applicable_patterns(&self.required, context)
    }

    /// Excluded-science-variable patterns applicable to the granule
    pub fn excluded_patterns<'a>(
        &'a self,
        context: &'a GranuleContext,
    ) -> impl Iterator<Item = &'a Pattern> + 'a {
        applicable_patterns(&self.excluded, context)
    }
}

fn applicable_patterns<'a>(
    rules: &'a [PatternRule],
    context: &'a GranuleContext,
) -> impl Iterator<Item = &'a Pattern> + 'a {
    rules
        .iter()
        .filter(move |rule| rule.applicability.matches_granule(context))
        .flat_map(|rule| rule.patterns.iter())
}

/// A [`RuleSet`] bound to one granule's context
#[derive(Debug, Clone, Copy)]
pub struct RuleEngine<'a> {
    rules: &'a RuleSet,
    context: &'a GranuleContext,
}

impl<'a> RuleEngine<'a> {
    pub fn context(&self) -> &GranuleContext {
        self.context
    }

    pub fn overrides_for(&self, path: &str) -> IndexMap<String, AttributeValue> {
        self.rules.overrides_for(self.context, path)
    }

    pub fn is_required(&self, path: &str) -> bool {
        self.rules
            .required_patterns(self.context)
            .any(|p| p.is_match(path))
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.rules
            .excluded_patterns(self.context)
            .any(|p| p.is_match(path))
    }
}
