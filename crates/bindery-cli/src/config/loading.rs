use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use bindery_bundler::InjectionPolicy;

use crate::cli::StrategyKind;
use crate::commands::utils::resolve_path;
use crate::config::BinderyConfig;
use crate::error::{ConfigError, Result};

/// Config file picked up from the working directory when `--config` is not
/// given.
pub const CONFIG_FILE: &str = "bindery.config.json";

const ENV_PREFIX: &str = "BINDERY_";

/// Values given on the command line. Only fields that are set override the
/// other sources.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoints: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_entrypoints: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excludes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_scripts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_css: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_comments: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite_urls_in_templates: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injection_policy: Option<InjectionPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_bundle_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_out: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
}

impl BinderyConfig {
    /// Load configuration from every source.
    ///
    /// `config_path` must exist when given; otherwise `bindery.config.json`
    /// in `cwd` is used if present. Relative paths resolve against `cwd`.
    pub fn load(
        overrides: &ConfigOverrides,
        config_path: Option<&Path>,
        cwd: &Path,
    ) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match config_path {
            Some(path) => {
                let path = resolve_path(path, cwd);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => {
                let path = cwd.join(CONFIG_FILE);
                path.is_file().then_some(path)
            }
        };
        if let Some(path) = config_file {
            debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }

        // BINDERY_OUT_DIR -> outDir
        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .lowercase(false)
                .map(|key| env_key(key.as_str()).into()),
        );

        figment = figment.merge(Serialized::defaults(overrides));

        figment
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()).into())
    }
}

/// `SHARED_BUNDLE_PREFIX` -> `sharedBundlePrefix`.
fn env_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key() {
        assert_eq!(env_key("OUT_DIR"), "outDir");
        assert_eq!(env_key("ENTRYPOINTS"), "entrypoints");
        assert_eq!(env_key("REWRITE_URLS_IN_TEMPLATES"), "rewriteUrlsInTemplates");
    }
}
