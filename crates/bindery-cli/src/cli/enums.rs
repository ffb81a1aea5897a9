use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How files are assigned to bundles
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// One shared bundle per exact set of entrypoints needing a file
    #[default]
    #[value(name = "shared")]
    Shared,

    /// No sharing; every file goes to the first entrypoint that needs it
    #[value(name = "per-entrypoint")]
    PerEntrypoint,

    /// Files needed by at least `minEntrypoints` entrypoints share one bundle
    #[value(name = "merged")]
    Merged,

    /// Shared files go into the shell entrypoint's bundle
    #[value(name = "shell")]
    Shell,
}
