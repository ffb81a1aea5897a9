//! Exclude patterns: resources that are never loaded, followed or inlined.
//!
//! Patterns are globs over resolved urls. `**` crosses directories, `*` and
//! `?` do not. A pattern without a leading `/` matches at any directory
//! depth, and every pattern also matches everything below it, so `/vendor`
//! excludes `/vendor/lib/a.js`.

use regex::Regex;

use crate::url::ResolvedUrl;

#[derive(Debug, thiserror::Error)]
pub enum ExcludeError {
    #[error("invalid exclude pattern '{pattern}': {reason}")]
    Malformed { pattern: String, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct ExcludePatterns {
    patterns: Vec<(String, Regex)>,
}

impl ExcludePatterns {
    pub fn new<I, S>(patterns: I) -> Result<Self, ExcludeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                compile(pattern).map(|regex| (pattern.to_string(), regex))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(pattern, _)| pattern.as_str())
    }

    pub fn matches(&self, url: &ResolvedUrl) -> bool {
        let path = url.as_str().split(['?', '#']).next().unwrap_or_default();
        self.patterns.iter().any(|(_, regex)| regex.is_match(path))
    }
}

fn compile(pattern: &str) -> Result<Regex, ExcludeError> {
    let malformed = |reason: &str| ExcludeError::Malformed {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(malformed("pattern is empty"));
    }
    if trimmed.contains("***") {
        return Err(malformed("'***' is not a valid wildcard"));
    }
    if let Some(bad) = trimmed.chars().find(|c| matches!(c, '[' | ']' | '{' | '}')) {
        return Err(malformed(&format!("unsupported glob character '{}'", bad)));
    }

    let body = trimmed.trim_end_matches('/');
    let mut regex = String::from("^");
    let glob = match body.strip_prefix('/') {
        Some(rest) => {
            regex.push('/');
            rest
        }
        None => {
            regex.push_str("(?:.*/)?");
            body
        }
    };

    let mut chars = glob.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                regex.push_str(".*");
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push_str("(?:/.*)?$");

    Regex::new(&regex).map_err(|err| malformed(&err.to_string()))
}
