use bindery_bundler::{
    BundleStrategy, BundlerOptions, ExcludePatterns, MaximalSharing, PerEntrypoint,
    ResolvedUrl, SharedByEntrypointSet, Shell,
};

use crate::cli::{BuildArgs, DepsArgs, ProjectArgs, StrategyKind};
use crate::config::{BinderyConfig, ConfigOverrides};
use crate::error::{ConfigError, Result};

fn project_overrides(project: &ProjectArgs) -> ConfigOverrides {
    ConfigOverrides {
        entrypoints: (!project.entrypoints.is_empty()).then(|| project.entrypoints.clone()),
        root: project.root.clone(),
        excludes: (!project.excludes.is_empty()).then(|| project.excludes.clone()),
        ..ConfigOverrides::default()
    }
}

impl From<&BuildArgs> for ConfigOverrides {
    fn from(args: &BuildArgs) -> Self {
        Self {
            out_dir: args.out_dir.clone(),
            strategy: args.strategy,
            shell: args.shell.clone(),
            min_entrypoints: args.min_entrypoints,
            inline_scripts: args.no_inline_scripts.then_some(false),
            inline_css: args.no_inline_css.then_some(false),
            strip_comments: args.strip_comments.then_some(true),
            rewrite_urls_in_templates: args.rewrite_urls_in_templates.then_some(true),
            injection_policy: args.injection,
            shared_bundle_prefix: args.shared_bundle_prefix.clone(),
            manifest_out: args.manifest_out.clone(),
            max_parallel: args.max_parallel,
            ..project_overrides(&args.project)
        }
    }
}

impl From<&DepsArgs> for ConfigOverrides {
    fn from(args: &DepsArgs) -> Self {
        project_overrides(&args.project)
    }
}

/// Root-absolute url of an entrypoint given as `index.html`, `./index.html`
/// or `/index.html`.
pub fn entrypoint_url(entrypoint: &str) -> ResolvedUrl {
    let path = entrypoint.trim().replace('\\', "/");
    let path = path.trim_start_matches("./");
    if path.starts_with('/') {
        ResolvedUrl::new(path)
    } else {
        ResolvedUrl::new(format!("/{path}"))
    }
}

impl BinderyConfig {
    pub fn entrypoint_urls(&self) -> Vec<ResolvedUrl> {
        self.entrypoints
            .iter()
            .map(|entrypoint| entrypoint_url(entrypoint))
            .collect()
    }

    pub fn exclude_patterns(&self) -> Result<ExcludePatterns> {
        ExcludePatterns::new(&self.excludes).map_err(|e| {
            ConfigError::InvalidValue {
                field: "excludes".to_string(),
                value: e.to_string(),
                hint: "Use globs such as /vendor/** or *.map".to_string(),
            }
            .into()
        })
    }

    pub fn bundler_options(&self) -> Result<BundlerOptions> {
        let mut options = BundlerOptions {
            excludes: self.exclude_patterns()?,
            ..BundlerOptions::default()
        }
        .with_inline_scripts(self.inline_scripts)
        .with_inline_css(self.inline_css)
        .with_strip_comments(self.strip_comments)
        .with_rewrite_urls_in_templates(self.rewrite_urls_in_templates)
        .with_injection_policy(self.injection_policy);
        if let Some(max_parallel) = self.max_parallel {
            options = options.with_max_parallel(max_parallel);
        }
        options.validate()?;
        Ok(options)
    }

    pub fn bundle_strategy(&self) -> Result<Box<dyn BundleStrategy>> {
        let shared_prefix = self.shared_bundle_prefix.clone();
        Ok(match self.strategy {
            StrategyKind::Shared => Box::new(SharedByEntrypointSet { shared_prefix }),
            StrategyKind::PerEntrypoint => Box::new(PerEntrypoint),
            StrategyKind::Merged => Box::new(MaximalSharing {
                min_entrypoints: self.min_entrypoints,
                shared_prefix,
            }),
            StrategyKind::Shell => {
                let shell = self.shell.as_deref().ok_or_else(|| ConfigError::MissingField {
                    field: "shell".to_string(),
                    hint: "The shell strategy needs --shell <URL>".to_string(),
                })?;
                Box::new(Shell {
                    shell: entrypoint_url(shell),
                })
            }
        })
    }
}
