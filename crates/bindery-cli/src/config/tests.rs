#[cfg(test)]
mod tests {
    use crate::cli::StrategyKind;
    use crate::config::*;
    use bindery_bundler::{InjectionPolicy, ResolvedUrl};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn config(entrypoints: &[&str]) -> BinderyConfig {
        BinderyConfig {
            entrypoints: entrypoints.iter().map(|e| e.to_string()).collect(),
            ..BinderyConfig::default()
        }
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_value(BinderyConfig::default()).unwrap();
        assert_eq!(json["outDir"], "dist");
        assert_eq!(json["strategy"], "shared");
        assert_eq!(json["injectionPolicy"], "first-dependent");
        assert_eq!(json["sharedBundlePrefix"], "/shared_bundle_");
        assert!(json.get("shell").is_none());
        assert!(json.get("out_dir").is_none());

        let parsed: BinderyConfig =
            serde_json::from_str(r#"{"entrypoints": ["/a.html"], "strategy": "per-entrypoint"}"#)
                .unwrap();
        assert_eq!(parsed.strategy, StrategyKind::PerEntrypoint);
        assert!(parsed.inline_scripts);
    }

    #[test]
    fn test_load_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            entrypoints: Some(vec!["index.html".to_string()]),
            ..ConfigOverrides::default()
        };
        let loaded = BinderyConfig::load(&overrides, None, temp.path()).unwrap();
        assert_eq!(loaded, config(&["index.html"]));
    }

    #[test]
    fn test_file_then_flags() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            r#"{
                "entrypoints": ["/index.html"],
                "outDir": "build",
                "strategy": "merged",
                "minEntrypoints": 3,
                "excludes": ["/vendor/**"],
                "stripComments": true
            }"#,
        )
        .unwrap();

        let loaded = BinderyConfig::load(&ConfigOverrides::default(), None, temp.path()).unwrap();
        assert_eq!(loaded.entrypoints, vec!["/index.html"]);
        assert_eq!(loaded.out_dir, PathBuf::from("build"));
        assert_eq!(loaded.strategy, StrategyKind::Merged);
        assert_eq!(loaded.min_entrypoints, 3);
        assert!(loaded.strip_comments);

        let overrides = ConfigOverrides {
            out_dir: Some(PathBuf::from("cli-dist")),
            injection_policy: Some(InjectionPolicy::Container),
            ..ConfigOverrides::default()
        };
        let loaded = BinderyConfig::load(&overrides, None, temp.path()).unwrap();
        assert_eq!(loaded.out_dir, PathBuf::from("cli-dist"));
        assert_eq!(loaded.injection_policy, InjectionPolicy::Container);
        // Untouched by the flags.
        assert_eq!(loaded.excludes, vec!["/vendor/**"]);
        assert_eq!(loaded.min_entrypoints, 3);
    }

    #[test]
    fn test_explicit_config_path() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("conf")).unwrap();
        fs::write(
            temp.path().join("conf/site.json"),
            r#"{"entrypoints": ["/site.html"]}"#,
        )
        .unwrap();

        let loaded = BinderyConfig::load(
            &ConfigOverrides::default(),
            Some(Path::new("conf/site.json")),
            temp.path(),
        )
        .unwrap();
        assert_eq!(loaded.entrypoints, vec!["/site.html"]);

        let missing = BinderyConfig::load(
            &ConfigOverrides::default(),
            Some(Path::new("nope.json")),
            temp.path(),
        );
        assert!(matches!(
            missing,
            Err(crate::CliError::Config(crate::ConfigError::NotFound(_)))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), r#"{"strategy": "sometimes"}"#).unwrap();
        let result = BinderyConfig::load(&ConfigOverrides::default(), None, temp.path());
        assert!(matches!(
            result,
            Err(crate::CliError::Config(crate::ConfigError::Load(_)))
        ));
    }

    #[test]
    fn test_validation() {
        assert!(config(&["index.html"]).validate().is_ok());
        assert!(config(&[]).validate().is_err());
        assert!(config(&["https://example.com/a.html"]).validate().is_err());
        assert!(config(&["views/"]).validate().is_err());

        let shell_missing = BinderyConfig {
            strategy: StrategyKind::Shell,
            ..config(&["/a.html"])
        };
        assert!(shell_missing.validate().is_err());

        let shell_ok = BinderyConfig {
            strategy: StrategyKind::Shell,
            shell: Some("a.html".to_string()),
            ..config(&["/a.html", "/b.html"])
        };
        assert!(shell_ok.validate().is_ok());

        let shell_unknown = BinderyConfig {
            shell: Some("/c.html".to_string()),
            ..shell_ok.clone()
        };
        assert!(shell_unknown.validate().is_err());

        let merged = BinderyConfig {
            strategy: StrategyKind::Merged,
            min_entrypoints: 1,
            ..config(&["/a.html"])
        };
        assert!(merged.validate().is_err());

        let bad_prefix = BinderyConfig {
            shared_bundle_prefix: "shared_".to_string(),
            ..config(&["/a.html"])
        };
        assert!(bad_prefix.validate().is_err());

        let no_jobs = BinderyConfig {
            max_parallel: Some(0),
            ..config(&["/a.html"])
        };
        assert!(no_jobs.validate().is_err());

        let overwrite = BinderyConfig {
            out_dir: PathBuf::from("."),
            ..config(&["/a.html"])
        };
        assert!(overwrite.validate().is_err());
    }

    #[test]
    fn test_entrypoint_urls() {
        let config = config(&["index.html", "./admin/index.html", "/about.html"]);
        assert_eq!(
            config.entrypoint_urls(),
            vec![
                ResolvedUrl::new("/index.html"),
                ResolvedUrl::new("/admin/index.html"),
                ResolvedUrl::new("/about.html"),
            ]
        );
    }

    #[test]
    fn test_strategy_and_options() {
        let config = BinderyConfig {
            excludes: vec!["/vendor/**".to_string()],
            inline_css: false,
            max_parallel: Some(2),
            ..config(&["/a.html"])
        };
        let options = config.bundler_options().unwrap();
        assert!(!options.inline_css);
        assert!(options.excludes.matches(&ResolvedUrl::new("/vendor/x.js")));
        assert_eq!(options.parallelism(), 2);

        let shell = BinderyConfig {
            strategy: StrategyKind::Shell,
            ..config.clone()
        };
        assert!(shell.bundle_strategy().is_err());
        assert!(config.bundle_strategy().is_ok());
    }
}
