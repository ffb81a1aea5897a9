use std::path::PathBuf;

use bindery_graph::{AnalyzerError, DepsError, ExcludeError, ManifestError, ResolvedUrl};

/// Errors that abort a build.
///
/// Unloadable or unresolvable references are not errors: they are recorded
/// in the bundle's `missing_imports` and the build carries on.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// A document uses a construct that cannot be bundled correctly.
    #[error("{url} uses <polymer-element>, which bindery cannot bundle; port it to <dom-module> first")]
    LegacyConstruct { url: ResolvedUrl },

    #[error("Invalid options: {0}")]
    Options(String),

    #[error(transparent)]
    Exclude(#[from] ExcludeError),

    #[error(transparent)]
    Deps(#[from] DepsError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The primary document of a bundle could not be loaded.
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error("Module bundling failed for {url}: {reason}")]
    ModuleBundler { url: ResolvedUrl, reason: String },

    #[error("Cannot write {url}: {reason}")]
    InvalidOutputPath { url: ResolvedUrl, reason: String },

    #[error("Failed to write '{}': {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error("Bundle task failed: {0}")]
    TaskPanicked(String),
}

/// Result type alias for bundler operations.
pub type Result<T> = std::result::Result<T, BundleError>;
