//! Bundler options.
//!
//! One [`BundlerOptions`] value is threaded through every step of a build;
//! there is no process-wide state.

use bindery_graph::ExcludePatterns;
use serde::{Deserialize, Serialize};

use crate::error::{BundleError, Result};

/// Where a link injected into a bundle document goes when several existing
/// links depend on the injected file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InjectionPolicy {
    /// Before the earliest dependent link in source order.
    #[default]
    FirstDependent,
    /// Before the latest dependent link in source order.
    LastDependent,
    /// Always appended to the hidden container.
    Container,
}

impl std::str::FromStr for InjectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "first-dependent" => Ok(Self::FirstDependent),
            "last-dependent" => Ok(Self::LastDependent),
            "container" => Ok(Self::Container),
            other => Err(format!("Invalid injection policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BundlerOptions {
    pub excludes: ExcludePatterns,
    /// Replace `<script src>` of in-bundle scripts with their contents.
    pub inline_scripts: bool,
    /// Replace stylesheet links of in-bundle styles with `<style>`.
    pub inline_css: bool,
    /// Drop comments, keeping one copy of each `@license` comment.
    pub strip_comments: bool,
    /// Rebase urls inside `<template>` too.
    pub rewrite_urls_in_templates: bool,
    pub injection_policy: InjectionPolicy,
    /// Concurrent bundle jobs; defaults to the CPU count, at most 8.
    pub max_parallel: Option<usize>,
}

impl Default for BundlerOptions {
    fn default() -> Self {
        Self {
            excludes: ExcludePatterns::default(),
            inline_scripts: true,
            inline_css: true,
            strip_comments: false,
            rewrite_urls_in_templates: false,
            injection_policy: InjectionPolicy::default(),
            max_parallel: None,
        }
    }
}

impl BundlerOptions {
    /// Compile exclude globs. Malformed patterns are rejected here, before
    /// any graph work starts.
    pub fn with_excludes<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excludes = ExcludePatterns::new(patterns)?;
        Ok(self)
    }

    pub fn with_inline_scripts(mut self, inline: bool) -> Self {
        self.inline_scripts = inline;
        self
    }

    pub fn with_inline_css(mut self, inline: bool) -> Self {
        self.inline_css = inline;
        self
    }

    pub fn with_strip_comments(mut self, strip: bool) -> Self {
        self.strip_comments = strip;
        self
    }

    pub fn with_rewrite_urls_in_templates(mut self, rewrite: bool) -> Self {
        self.rewrite_urls_in_templates = rewrite;
        self
    }

    pub fn with_injection_policy(mut self, policy: InjectionPolicy) -> Self {
        self.injection_policy = policy;
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = Some(max_parallel);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_parallel == Some(0) {
            return Err(BundleError::Options(
                "max_parallel must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn parallelism(&self) -> usize {
        self.max_parallel
            .unwrap_or_else(|| num_cpus::get().min(8))
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_excludes_fail_early() {
        let err = BundlerOptions::default()
            .with_excludes(["/ok", "/bad/[x]"])
            .unwrap_err();
        assert!(matches!(err, BundleError::Exclude(_)));
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        assert!(BundlerOptions::default().with_max_parallel(0).validate().is_err());
        assert!(BundlerOptions::default().validate().is_ok());
        assert!(BundlerOptions::default().parallelism() >= 1);
    }

    #[test]
    fn injection_policy_parses() {
        assert_eq!(
            "last-dependent".parse::<InjectionPolicy>().unwrap(),
            InjectionPolicy::LastDependent
        );
        assert!("sideways".parse::<InjectionPolicy>().is_err());
    }
}
