#![cfg_attr(docsrs, feature(doc_cfg))]

//! # bindery-bundler
//!
//! Builds the bundles of a [`BundleManifest`]: Html bundles get their
//! imports, scripts and styles inlined into one document, Style bundles are
//! concatenated and Script bundles go through a [`ModuleBundler`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use bindery_bundler::{Bundler, BundlerOptions};
//! use bindery_graph::{FsAnalyzer, NativeRuntime, ResolvedUrl, SharedByEntrypointSet};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = Arc::new(NativeRuntime::new());
//! let analyzer = Arc::new(FsAnalyzer::new(runtime.clone(), "./app"));
//! let options = BundlerOptions::default().with_excludes(["/node_modules/**"])?;
//!
//! let output = Bundler::new(analyzer, options)
//!     .build(
//!         &[ResolvedUrl::new("/index.html"), ResolvedUrl::new("/admin.html")],
//!         &SharedByEntrypointSet::default(),
//!     )
//!     .await?;
//!
//! output.write_to(runtime.as_ref(), Path::new("./app"), Path::new("./dist")).await?;
//! for url in &output.missing {
//!     eprintln!("missing: {url}");
//! }
//! # Ok(()) }
//! ```

pub use bindery_graph::*;

mod assembler;
mod inliner;

pub mod bundler;
pub mod error;
pub mod module_entry;
pub mod options;
pub mod output;
pub mod rebase;

#[cfg(feature = "logging")]
pub mod logging;

pub use assembler::HIDDEN_CONTAINER_ATTR;
pub use bundler::{BuildOutput, BundleOutput, Bundler};
pub use error::{BundleError, Result};
pub use module_entry::{ConcatModuleBundler, ModuleBundler, ModuleSources, SyntheticEntry};
pub use options::{BundlerOptions, InjectionPolicy};
pub use output::{WrittenFiles, output_path};
