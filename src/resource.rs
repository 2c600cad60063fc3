//! Nested resource paths.
//!
//! A path below a mount prefix alternates resource names and IDs:
//!
//! ```text
//! /api/users/42/posts/7/comments
//!      ───── ── ───── ─ ────────
//!      name  id name  id name      (no id: a collection request)
//! ```
//!
//! The names alone, joined by `/`, form the **skeleton** (`users/posts/comments`).
//! The router resolves on the skeleton; IDs never take part in routing.

use std::fmt;

/// One `name/id` pair of a nested path. `id` is `None` for a trailing name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resource {
    pub name: String,
    pub id: Option<String>,
}

/// The ordered resources of one request path.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResourcePath(Vec<Resource>);

impl ResourcePath {
    /// Parses `path` below `prefix`.
    ///
    /// The prefix is stripped with or without its trailing slash, but only at
    /// a segment boundary: `/api` strips from `/api/users` and `/api`, never
    /// from `/apiary`. A path outside the prefix is parsed as a whole. Empty
    /// segments (`//`, leading or trailing `/`) are dropped before pairing.
    ///
    /// ```rust
    /// use strata::ResourcePath;
    ///
    /// let path = ResourcePath::parse("/api/foo/123/bar/9", "/api/");
    /// assert_eq!(path.skeleton(), "foo/bar");
    /// assert_eq!(path.id_of("foo"), Some("123"));
    /// ```
    pub fn parse(path: &str, prefix: &str) -> Self {
        let rest = strip_prefix(path, prefix).unwrap_or(path);
        let mut resources = Vec::new();
        let mut segments = rest.split('/').filter(|s| !s.is_empty());
        while let Some(name) = segments.next() {
            resources.push(Resource {
                name: name.to_owned(),
                id: segments.next().map(str::to_owned),
            });
        }
        Self(resources)
    }

    /// Resource names joined by `/`, IDs discarded. Empty for the mount point.
    pub fn skeleton(&self) -> String {
        let names: Vec<&str> = self.0.iter().map(|r| r.name.as_str()).collect();
        names.join("/")
    }

    /// The id of the first resource called `name`, if it has one.
    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.0.iter()
            .find(|r| r.name == name)
            .and_then(|r| r.id.as_deref())
    }

    /// The innermost resource, i.e. the one the request addresses.
    pub fn last(&self) -> Option<&Resource> { self.0.last() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> std::slice::Iter<'_, Resource> { self.0.iter() }
}

impl<'a> IntoIterator for &'a ResourcePath {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.0 {
            write!(f, "/{}", r.name)?;
            if let Some(id) = &r.id {
                write!(f, "/{id}")?;
            }
        }
        Ok(())
    }
}

/// Returns what follows `prefix` in `path`, or `None` when `path` is not
/// below it. A prefix of `""` or `"/"` contains every path.
pub(crate) fn strip_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
