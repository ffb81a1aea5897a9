//! Configuration with multi-source loading.
//!
//! Priority: CLI flags > `BINDERY_*` environment variables > config file >
//! defaults.

mod conversions;
mod defaults;
mod loading;
mod tests;
mod validation;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use bindery_bundler::InjectionPolicy;

use crate::cli::StrategyKind;

pub use defaults::*;
pub use conversions::entrypoint_url;
pub use loading::{CONFIG_FILE, ConfigOverrides};
pub use validation::validate_entrypoint;

/// Bindery configuration, loaded from `bindery.config.json`, the
/// environment and flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BinderyConfig {
    /// Entrypoint urls (e.g. `["/index.html"]`)
    pub entrypoints: Vec<String>,

    /// Project root that urls resolve against
    pub root: PathBuf,

    /// Output directory
    pub out_dir: PathBuf,

    /// Bundle assignment strategy
    pub strategy: StrategyKind,

    /// Shell entrypoint, required by the `shell` strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// Sharing threshold of the `merged` strategy
    pub min_entrypoints: usize,

    /// Url globs that are never followed or inlined
    pub excludes: Vec<String>,

    pub inline_scripts: bool,
    pub inline_css: bool,
    pub strip_comments: bool,
    pub rewrite_urls_in_templates: bool,

    /// Placement of injected links
    pub injection_policy: InjectionPolicy,

    /// Url prefix of shared bundles
    pub shared_bundle_prefix: String,

    /// Where to write the manifest JSON, if anywhere
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_out: Option<PathBuf>,

    /// Bundle jobs run at once (default: number of CPUs, at most 8)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
}

impl Default for BinderyConfig {
    fn default() -> Self {
        Self {
            entrypoints: Vec::new(),
            root: default_root(),
            out_dir: default_out_dir(),
            strategy: StrategyKind::default(),
            shell: None,
            min_entrypoints: default_min_entrypoints(),
            excludes: Vec::new(),
            inline_scripts: true,
            inline_css: true,
            strip_comments: false,
            rewrite_urls_in_templates: false,
            injection_policy: InjectionPolicy::default(),
            shared_bundle_prefix: default_shared_bundle_prefix(),
            manifest_out: None,
            max_parallel: None,
        }
    }
}
