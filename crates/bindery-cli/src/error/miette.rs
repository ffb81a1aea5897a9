//! Miette diagnostic conversion for CLI errors.

use bindery_bundler::{BundleError, DepsError};
use miette::Report;

use crate::error::CliError;

/// Convert a `CliError` into a miette `Report`, attaching a hint where one
/// helps.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => miette::miette!("{}", e),
        CliError::Bundle(e) => bundle_error_to_miette(e),
        CliError::Graph(bindery_graph::Error::Deps(e)) => deps_error_to_miette(e),
        CliError::OutputNotWritable(path) => miette::miette!(
            help = "Choose an output directory inside or next to the project",
            "Output directory is not writable: {}",
            path.display()
        ),
        _ => miette::miette!("{}", err),
    }
}

fn bundle_error_to_miette(err: BundleError) -> Report {
    match err {
        BundleError::LegacyConstruct { url } => miette::miette!(
            help = "Replace <polymer-element> with <dom-module>, or exclude the file",
            "{} uses <polymer-element>, which cannot be bundled",
            url
        ),
        BundleError::Deps(e) => deps_error_to_miette(e),
        BundleError::InvalidOutputPath { url, reason } => miette::miette!(
            help = "Bundle urls must be root-absolute file paths",
            "Cannot write {}: {}",
            url,
            reason
        ),
        other => miette::miette!("{}", other),
    }
}

fn deps_error_to_miette(err: DepsError) -> Report {
    match err {
        DepsError::NoEntrypoints => miette::miette!(
            help = "Pass entrypoints on the command line or set 'entrypoints' in bindery.config.json",
            "No entrypoints given"
        ),
        DepsError::NoneLoaded(urls) => miette::miette!(
            help = "Entrypoints are urls relative to --root; check the root and the file names",
            "None of the entrypoints could be loaded: {}",
            urls.join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_construct_has_help() {
        let report = cli_error_to_miette(CliError::Bundle(BundleError::LegacyConstruct {
            url: "/old.html".into(),
        }));
        assert!(report.to_string().contains("/old.html"));
        assert!(report.help().is_some());
    }

    #[test]
    fn test_plain_errors_keep_their_message() {
        let report = cli_error_to_miette(CliError::InvalidArgument("nope".into()));
        assert_eq!(report.to_string(), "Invalid argument: nope");
    }
}
