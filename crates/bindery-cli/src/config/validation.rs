use crate::cli::StrategyKind;
use crate::config::{BinderyConfig, entrypoint_url};
use crate::error::{ConfigError, Result};

/// Check that an entrypoint names a file inside the project.
pub fn validate_entrypoint(entrypoint: &str) -> Result<()> {
    let invalid = |hint: &str| -> Result<()> {
        Err(ConfigError::InvalidValue {
            field: "entrypoints".to_string(),
            value: entrypoint.to_string(),
            hint: hint.to_string(),
        }
        .into())
    };

    let trimmed = entrypoint.trim();
    if trimmed.is_empty() {
        return invalid("Entrypoints cannot be empty");
    }
    if trimmed.contains('\0') {
        return invalid("Entrypoints cannot contain null bytes");
    }
    if trimmed.contains("://") || trimmed.starts_with("//") {
        return invalid("Entrypoints are urls relative to the project root, not external urls");
    }
    if trimmed.ends_with('/') {
        return invalid("Entrypoints must name a file, not a directory");
    }
    Ok(())
}

impl BinderyConfig {
    /// Validate configuration for logical consistency. Runs before any file
    /// is read.
    pub fn validate(&self) -> Result<()> {
        if self.entrypoints.is_empty() {
            return Err(ConfigError::MissingField {
                field: "entrypoints".to_string(),
                hint: "Pass entrypoints on the command line or list them in bindery.config.json"
                    .to_string(),
            }
            .into());
        }
        for entrypoint in &self.entrypoints {
            validate_entrypoint(entrypoint)?;
        }

        match self.strategy {
            StrategyKind::Shell => {
                let Some(shell) = &self.shell else {
                    return Err(ConfigError::MissingField {
                        field: "shell".to_string(),
                        hint: "The shell strategy needs --shell <URL>".to_string(),
                    }
                    .into());
                };
                if !self.entrypoint_urls().contains(&entrypoint_url(shell)) {
                    return Err(ConfigError::InvalidValue {
                        field: "shell".to_string(),
                        value: shell.clone(),
                        hint: "The shell must also be one of the entrypoints".to_string(),
                    }
                    .into());
                }
            }
            StrategyKind::Merged if self.min_entrypoints < 2 => {
                return Err(ConfigError::InvalidValue {
                    field: "minEntrypoints".to_string(),
                    value: self.min_entrypoints.to_string(),
                    hint: "A file is only shared when at least 2 entrypoints need it".to_string(),
                }
                .into());
            }
            _ => {}
        }

        if !self.shared_bundle_prefix.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "sharedBundlePrefix".to_string(),
                value: self.shared_bundle_prefix.clone(),
                hint: "Use a root-absolute prefix such as /shared_bundle_".to_string(),
            }
            .into());
        }

        if self.max_parallel == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "maxParallel".to_string(),
                value: "0".to_string(),
                hint: "Use at least 1".to_string(),
            }
            .into());
        }

        self.exclude_patterns()?;

        if self.root.components().eq(self.out_dir.components()) {
            return Err(ConfigError::ConflictingOptions(format!(
                "outDir and root are both '{}'; bundles would overwrite their sources",
                self.root.display()
            ))
            .into());
        }

        Ok(())
    }
}
