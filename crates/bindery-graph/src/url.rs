//! URL algebra shared by every rewriting step.
//!
//! Resources are identified by [`ResolvedUrl`]: either a root-absolute path
//! (`/src/app.html`) or a scheme-qualified URL (`https://host/app.html`).
//! Everything else in bindery (dependency discovery, bundle assignment,
//! inlining) only ever compares these identifiers by exact string match.
//!
//! The relative math is path based and treats a trailing slash as meaningful:
//! a path ending in `/` names a directory, anything else names a file.
//!
//! ```
//! use bindery_graph::url::relativize;
//!
//! assert_eq!(relativize("/a", "/b/"), "b/");
//! assert_eq!(relativize("/a/", "/b"), "../b");
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Origin used to resolve root-absolute identifiers with the `url` crate.
const PLACEHOLDER_ORIGIN: &str = "https://bindery.invalid";

static SCHEME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:").expect("valid scheme regex"));

/// Canonical, absolute identifier of a resource.
///
/// Fragments are dropped on construction; queries are kept.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedUrl(String);

impl ResolvedUrl {
    /// Build an identifier, dropping any `#fragment`.
    pub fn new(url: impl Into<String>) -> Self {
        let mut url = url.into();
        if let Some(index) = url.find('#') {
            url.truncate(index);
        }
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File extension of the path component, lowercased, without the dot.
    pub fn extension(&self) -> Option<String> {
        let parts = UrlParts::split(&self.0);
        let file = parts.path.rsplit('/').next().unwrap_or_default();
        file.rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    /// Last path segment (empty for directory urls).
    pub fn file_name(&self) -> &str {
        let parts = UrlParts::split(&self.0);
        parts.path.rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Display for ResolvedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResolvedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResolvedUrl {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResolvedUrl {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A url split into origin (`scheme://authority`), path and `?query#hash` tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UrlParts<'a> {
    origin: Option<&'a str>,
    path: &'a str,
    suffix: &'a str,
}

impl<'a> UrlParts<'a> {
    fn split(url: &'a str) -> Self {
        let (origin, rest) = match SCHEME_PREFIX.find(url) {
            Some(scheme) => {
                let after_scheme = &url[scheme.end()..];
                match after_scheme.strip_prefix("//") {
                    Some(authority_and_path) => {
                        let authority_len = authority_and_path
                            .find(['/', '?', '#'])
                            .unwrap_or(authority_and_path.len());
                        let origin_end = scheme.end() + 2 + authority_len;
                        (Some(&url[..origin_end]), &url[origin_end..])
                    }
                    None => (Some(&url[..scheme.end()]), after_scheme),
                }
            }
            None => (None, url),
        };

        let suffix_start = rest.find(['?', '#']).unwrap_or(rest.len());
        Self {
            origin,
            path: &rest[..suffix_start],
            suffix: &rest[suffix_start..],
        }
    }
}

/// Returns true for references that must never be rewritten: scheme-qualified,
/// protocol-relative, root-absolute, fragment-only and templated values.
pub fn is_absolute_or_external(reference: &str) -> bool {
    let reference = reference.trim();
    reference.starts_with('/')
        || reference.starts_with('#')
        || SCHEME_PREFIX.is_match(reference)
        || is_templated(reference)
}

/// Data-binding expressions are resolved at runtime, not by the bundler.
pub fn is_templated(reference: &str) -> bool {
    reference.contains("{{") || reference.contains("[[")
}

/// Resolve `reference` against `base`.
///
/// Root-absolute bases stay root-absolute; scheme-qualified bases follow
/// normal URL resolution. Returns `None` when the reference cannot be parsed.
pub fn resolve(base: &str, reference: &str) -> Option<ResolvedUrl> {
    let reference = reference.trim();
    if UrlParts::split(base).origin.is_some() {
        let joined = Url::parse(base).ok()?.join(reference).ok()?;
        return Some(ResolvedUrl::new(joined.to_string()));
    }

    let base = if base.starts_with('/') {
        base.to_string()
    } else {
        format!("/{base}")
    };
    let placeholder = Url::parse(PLACEHOLDER_ORIGIN).ok()?;
    let joined = placeholder.join(&base).ok()?.join(reference).ok()?;
    let serialized = joined.to_string();
    match serialized.strip_prefix(PLACEHOLDER_ORIGIN) {
        Some(path) => Some(ResolvedUrl::new(path)),
        None => Some(ResolvedUrl::new(serialized)),
    }
}

/// Directory form of `url`: query, hash and file segment removed, trailing
/// slash guaranteed.
pub fn strip_file_search_hash(url: &str) -> ResolvedUrl {
    let parts = UrlParts::split(url);
    let directory = match parts.path.rfind('/') {
        Some(index) => &parts.path[..=index],
        None => "/",
    };
    ResolvedUrl::new(format!("{}{}", parts.origin.unwrap_or_default(), directory))
}

/// Relative reference that leads from `from` to `to`.
///
/// - identical inputs produce `""`
/// - query and hash of `to` are preserved
/// - differing scheme or host returns `to` unchanged
/// - a trailing slash marks a directory on either side
pub fn relativize(from: &str, to: &str) -> String {
    if from == to {
        return String::new();
    }

    let from_parts = UrlParts::split(from);
    let to_parts = UrlParts::split(to);
    if from_parts.origin != to_parts.origin {
        return to.to_string();
    }

    let from_dir = directory_segments(from_parts.path);
    let (to_dir, to_file) = match to_parts.path.rsplit_once('/') {
        Some((dir, file)) => (segments(dir), file),
        None => (Vec::new(), to_parts.path),
    };

    let common = from_dir
        .iter()
        .zip(to_dir.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = "../".repeat(from_dir.len() - common);
    for segment in &to_dir[common..] {
        relative.push_str(segment);
        relative.push('/');
    }
    relative.push_str(to_file);

    if relative.is_empty() && from_parts.path != to_parts.path {
        relative.push_str("./");
    }
    // `a:b` would otherwise read as a scheme.
    let first_segment = relative.split('/').next().unwrap_or_default();
    if first_segment.contains(':') {
        relative.insert_str(0, "./");
    }

    relative.push_str(to_parts.suffix);
    relative
}

/// Move a reference written relative to `old_base` so it stays correct when
/// read relative to `new_base`. Absolute and external references are
/// returned untouched, and so are references that cannot be resolved.
pub fn rebase_href(href: &str, old_base: &str, new_base: &str) -> String {
    if is_absolute_or_external(href) {
        return href.to_string();
    }

    let (reference, fragment) = match href.find('#') {
        Some(index) => (&href[..index], &href[index..]),
        None => (href, ""),
    };

    let Some(absolute) = resolve(old_base, reference) else {
        return href.to_string();
    };

    let mut rebased = relativize(new_base, absolute.as_str());
    if rebased.is_empty() && !reference.is_empty() {
        rebased = match absolute.file_name() {
            "" => "./".to_string(),
            file => file.to_string(),
        };
    }
    rebased.push_str(fragment);
    rebased
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn directory_segments(path: &str) -> Vec<&str> {
    match path.rsplit_once('/') {
        Some((dir, _)) => segments(dir),
        None => Vec::new(),
    }
}
