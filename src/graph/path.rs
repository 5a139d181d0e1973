//! Namespace path resolution
//!
//! References found in metadata may be absolute (`/Grid/lat`), relative to
//! the containing group (`./lat`, `../geolocation/lat`) or bare names
//! (`lat`). [`PathResolver`] turns each of these into an absolute path.

use std::collections::HashSet;

/// Outcome of resolving one reference token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The token named this absolute path, either structurally or by
    /// finding an existing node in an enclosing group
    Resolved(String),
    /// A bare token that matched nothing; resolved as if it lived at the root
    Fallback(String),
    /// Malformed token, e.g. `..` above the root. Treated as no reference.
    Unresolved,
}

impl Resolution {
    /// The resolved path, if any. Fallback paths are kept.
    pub fn into_path(self) -> Option<String> {
        match self {
            Self::Resolved(path) | Self::Fallback(path) => Some(path),
            Self::Unresolved => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }
}

/// Resolves reference tokens against a set of known node paths
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    known: &'a HashSet<String>,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver over the paths that bare tokens may bind to
    pub fn new(known: &'a HashSet<String>) -> Self {
        Self { known }
    }

    /// Resolve `token` as written inside the group at `group_path`
    ///
    /// Surrounding whitespace and a trailing `:` (CF `grid_mapping` and
    /// `cell_measures` syntax) are ignored.
    pub fn resolve(&self, token: &str, group_path: &str) -> Resolution {
        let token = token.trim().trim_end_matches(':');
        if token.is_empty() {
            return Resolution::Unresolved;
        }

        if token.starts_with('/') {
            return normalize(token).map_or(Resolution::Unresolved, Resolution::Resolved);
        }

        if is_relative(token) {
            return normalize(&join(group_path, token))
                .map_or(Resolution::Unresolved, Resolution::Resolved);
        }

        // Bare name: nearest enclosing scope wins
        let mut scope = Some(group_path.to_string());
        while let Some(group) = scope {
            if let Some(candidate) = normalize(&join(&group, token)) {
                if self.known.contains(&candidate) {
                    return Resolution::Resolved(candidate);
                }
            }
            scope = parent(&group);
        }

        normalize(&join("/", token)).map_or(Resolution::Unresolved, Resolution::Fallback)
    }
}

fn is_relative(token: &str) -> bool {
    token == "." || token == ".." || token.starts_with("./") || token.starts_with("../")
}

/// Collapse `.`, `..` and repeated separators in an absolute path
///
/// Returns `None` if `..` climbs above the root.
pub fn normalize(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(format!("/{}", segments.join("/")))
}

/// Join a relative path onto a group path
pub fn join(group_path: &str, relative: &str) -> String {
    if group_path.ends_with('/') {
        format!("{}{}", group_path, relative)
    } else {
        format!("{}/{}", group_path, relative)
    }
}

/// Parent group of a path; `None` for the root
pub fn parent(path: &str) -> Option<String> {
    if path == "/" || path.is_empty() {
        return None;
    }
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => Some("/".to_string()),
        Some(idx) => Some(trimmed[..idx].to_string()),
    }
}
