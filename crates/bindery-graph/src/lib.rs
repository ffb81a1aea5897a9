//! # bindery-graph
//!
//! Graph side of the bindery document linker: everything needed to decide
//! *what* goes into which bundle, without producing any output.
//!
//! ## Overview
//!
//! - [`url`]: the URL algebra (resolve, relativize, rebase) every rewrite
//!   step is built on.
//! - [`document`]: an arena document tree with an html5ever parser adapter
//!   and an HTML serializer.
//! - [`analysis`]: the [`Analyzer`] seam that loads resources and reports
//!   their edges, plus [`FsAnalyzer`] over a [`Runtime`].
//! - [`deps`]: dependency discovery into a [`DepsIndex`].
//! - [`manifest`]: partitioning files into bundles under a pluggable
//!   [`BundleStrategy`].
//!
//! ## Pipeline
//!
//! ```text
//! entrypoints ──► build_deps_index ──► DepsIndex ──► BundleStrategy ──► BundleManifest
//!                     │                                                    │
//!                     └──────── Analyzer (edges_of / content_of) ◄─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bindery_graph::{
//!     BundleStrategy, ExcludePatterns, FsAnalyzer, NativeRuntime, SharedByEntrypointSet,
//!     build_deps_index,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let analyzer = FsAnalyzer::new(Arc::new(NativeRuntime::new()), "./site");
//! let deps = build_deps_index(
//!     &["/index.html".into()],
//!     &analyzer,
//!     &ExcludePatterns::default(),
//! )
//! .await?;
//! let manifest = SharedByEntrypointSet::default().assign(&deps)?;
//! println!("{}", manifest.to_json());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod deps;
pub mod document;
pub mod edge;
pub mod excludes;
pub mod manifest;
pub mod runtime;
pub mod url;

pub use analysis::{Analyzer, AnalyzerError, FsAnalyzer, ParsedContent};
pub use deps::{DependencyRecord, DepsError, DepsIndex, build_deps_index};
pub use document::{Document, NodeData, NodeId};
pub use edge::{Edge, EdgeKind, LinkRef, ResourceKind};
pub use excludes::{ExcludeError, ExcludePatterns};
pub use manifest::strategy::{
    BundleStrategy, CountingUrlMapper, MaximalSharing, PerEntrypoint, SharedByEntrypointSet, Shell,
};
pub use manifest::{AssignedBundle, Bundle, BundleKind, BundleManifest, ManifestError};
pub use url::ResolvedUrl;

// Re-export runtime types
pub use runtime::{Runtime, RuntimeError, RuntimeResult};

#[cfg(not(target_family = "wasm"))]
pub use runtime::native::NativeRuntime;

// Test utilities (available in test builds)
#[cfg(any(test, feature = "test-utils"))]
pub use runtime::memory::MemoryRuntime;

/// Error types for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Deps(#[from] DepsError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Exclude(#[from] ExcludeError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
