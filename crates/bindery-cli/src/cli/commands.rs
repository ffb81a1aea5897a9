use clap::{Args, Subcommand};
use std::path::PathBuf;

use bindery_bundler::InjectionPolicy;

use crate::cli::enums::*;

/// Available bindery subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build bundles and write them to the output directory
    ///
    /// Follows every import from the entrypoints, assigns files to bundles
    /// with the selected strategy and writes one file per bundle. Files that
    /// are referenced but not inlined are copied alongside.
    Build(BuildArgs),

    /// Print the dependency index of the entrypoints as JSON
    ///
    /// Runs discovery only; nothing is written.
    Deps(DepsArgs),
}

/// Options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Entrypoint documents, as urls relative to the project root
    ///
    /// Examples:
    ///   bindery build index.html
    ///   bindery build /index.html /admin/index.html
    #[arg(value_name = "ENTRYPOINT")]
    pub entrypoints: Vec<String>,

    /// Path to the config file (default: ./bindery.config.json if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root that urls are resolved against
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Glob of urls that are never followed or inlined (repeatable)
    ///
    /// `*` matches within a directory, `**` across directories.
    #[arg(short = 'x', long = "exclude", value_name = "GLOB")]
    pub excludes: Vec<String>,
}

/// Arguments for the build command
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output directory
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Bundle assignment strategy
    #[arg(short, long, value_enum)]
    pub strategy: Option<StrategyKind>,

    /// Shell entrypoint for `--strategy shell`
    #[arg(long, value_name = "URL")]
    pub shell: Option<String>,

    /// Minimum number of entrypoints for `--strategy merged`
    #[arg(long, value_name = "N")]
    pub min_entrypoints: Option<usize>,

    /// Keep external scripts as `<script src>`
    #[arg(long)]
    pub no_inline_scripts: bool,

    /// Keep external stylesheets as `<link rel="stylesheet">`
    #[arg(long)]
    pub no_inline_css: bool,

    /// Remove comments, keeping `@license` comments once
    #[arg(long)]
    pub strip_comments: bool,

    /// Also rewrite urls inside `<template>` content
    #[arg(long)]
    pub rewrite_urls_in_templates: bool,

    /// Placement of injected links: first-dependent, last-dependent or container
    #[arg(long, value_name = "POLICY")]
    pub injection: Option<InjectionPolicy>,

    /// Url prefix of shared bundles
    #[arg(long, value_name = "PREFIX")]
    pub shared_bundle_prefix: Option<String>,

    /// Also write the bundle manifest as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub manifest_out: Option<PathBuf>,

    /// Maximum number of bundles built at once
    #[arg(short = 'j', long, value_name = "N")]
    pub max_parallel: Option<usize>,
}

/// Arguments for the deps command
#[derive(Args, Debug, Clone, Default)]
pub struct DepsArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}
