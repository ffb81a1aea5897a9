//! Bundle manifests: which output bundle every discovered file belongs to.
//!
//! A [`BundleManifest`] is a partition. Every file lives in exactly one
//! [`Bundle`], and [`BundleManifest::new`] refuses anything else. Manifests are
//! produced by a [`strategy::BundleStrategy`] from a
//! [`DepsIndex`](crate::deps::DepsIndex) and never change afterwards; the
//! bookkeeping sets on a bundle are filled in on an [`AssignedBundle`] copy
//! while that bundle is being built.

pub mod strategy;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::deps::DepsIndex;
use crate::edge::ResourceKind;
use crate::url::ResolvedUrl;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("bundle {url} has no files")]
    EmptyBundle { url: ResolvedUrl },

    #[error("bundle url {url} is used twice")]
    DuplicateBundle { url: ResolvedUrl },

    #[error("{file} is assigned to both {first} and {second}")]
    Overlap {
        file: ResolvedUrl,
        first: ResolvedUrl,
        second: ResolvedUrl,
    },

    #[error("{file} is not assigned to any bundle")]
    Uncovered { file: ResolvedUrl },

    #[error("shell {shell} is not an entrypoint")]
    UnknownShell { shell: ResolvedUrl },

    #[error("{0}")]
    Strategy(String),
}

/// Output format of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleKind {
    Html,
    Script,
    Style,
}

impl BundleKind {
    pub fn extension(self) -> &'static str {
        match self {
            BundleKind::Html => "html",
            BundleKind::Script => "js",
            BundleKind::Style => "css",
        }
    }
}

impl From<ResourceKind> for BundleKind {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Document => BundleKind::Html,
            ResourceKind::Script => BundleKind::Script,
            ResourceKind::Style => BundleKind::Style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub url: ResolvedUrl,
    pub kind: BundleKind,
    /// Entrypoints this bundle serves.
    pub entrypoints: IndexSet<ResolvedUrl>,
    pub files: IndexSet<ResolvedUrl>,
    /// Aggregates files of more than one entrypoint.
    pub is_merged: bool,

    // Bookkeeping, filled in while the bundle is built.
    pub inlined_imports: IndexSet<ResolvedUrl>,
    pub inlined_scripts: IndexSet<ResolvedUrl>,
    pub inlined_styles: IndexSet<ResolvedUrl>,
    pub missing_imports: IndexSet<ResolvedUrl>,
    /// Every target already handled; links to these are dropped.
    pub strip_imports: IndexSet<ResolvedUrl>,
}

impl Bundle {
    pub fn new<I>(url: impl Into<ResolvedUrl>, kind: BundleKind, files: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ResolvedUrl>,
    {
        Self {
            url: url.into(),
            kind,
            entrypoints: IndexSet::new(),
            files: files.into_iter().map(Into::into).collect(),
            is_merged: false,
            inlined_imports: IndexSet::new(),
            inlined_scripts: IndexSet::new(),
            inlined_styles: IndexSet::new(),
            missing_imports: IndexSet::new(),
            strip_imports: IndexSet::new(),
        }
    }

    pub fn with_entrypoints<I>(mut self, entrypoints: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<ResolvedUrl>,
    {
        self.entrypoints = entrypoints.into_iter().map(Into::into).collect();
        self.is_merged = self.entrypoints.len() > 1;
        self
    }

    /// The bundle is written to the location of one of its own files.
    pub fn is_file_backed(&self) -> bool {
        self.files.contains(&self.url)
    }

    /// Copy with empty bookkeeping sets.
    pub fn fresh(&self) -> Self {
        Self {
            inlined_imports: IndexSet::new(),
            inlined_scripts: IndexSet::new(),
            inlined_styles: IndexSet::new(),
            missing_imports: IndexSet::new(),
            strip_imports: IndexSet::new(),
            ..self.clone()
        }
    }
}

/// A bundle being built for one document url.
#[derive(Debug, Clone)]
pub struct AssignedBundle {
    pub url: ResolvedUrl,
    pub bundle: Bundle,
}

#[derive(Debug, Clone, Default)]
pub struct BundleManifest {
    bundles: IndexMap<ResolvedUrl, Bundle>,
    owners: FxHashMap<ResolvedUrl, ResolvedUrl>,
}

impl BundleManifest {
    /// Build a manifest, checking that bundles are non-empty, have distinct
    /// urls and hold disjoint sets of files.
    pub fn new(bundles: impl IntoIterator<Item = Bundle>) -> Result<Self, ManifestError> {
        let mut manifest = Self::default();
        for bundle in bundles {
            if bundle.files.is_empty() {
                return Err(ManifestError::EmptyBundle { url: bundle.url });
            }
            if manifest.bundles.contains_key(&bundle.url) {
                return Err(ManifestError::DuplicateBundle { url: bundle.url });
            }
            for file in &bundle.files {
                if let Some(first) = manifest.owners.get(file) {
                    return Err(ManifestError::Overlap {
                        file: file.clone(),
                        first: first.clone(),
                        second: bundle.url.clone(),
                    });
                }
                manifest.owners.insert(file.clone(), bundle.url.clone());
            }
            manifest.bundles.insert(bundle.url.clone(), bundle);
        }
        Ok(manifest)
    }

    /// Check that every eagerly needed file of `deps` has a bundle.
    pub fn check_covers(&self, deps: &DepsIndex) -> Result<(), ManifestError> {
        match deps
            .eager_files()
            .into_iter()
            .find(|file| !self.owners.contains_key(file))
        {
            Some(file) => Err(ManifestError::Uncovered { file }),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn bundles(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.values()
    }

    pub fn bundle(&self, url: &ResolvedUrl) -> Option<&Bundle> {
        self.bundles.get(url)
    }

    pub fn bundle_for_file(&self, file: &ResolvedUrl) -> Option<&Bundle> {
        self.owners.get(file).and_then(|url| self.bundles.get(url))
    }

    /// Processing context for the output at `url`: the bundle owning `url`
    /// (or the bundle whose url it is), with fresh bookkeeping.
    pub fn assign(&self, url: &ResolvedUrl) -> Option<AssignedBundle> {
        let bundle = self.bundle(url).or_else(|| self.bundle_for_file(url))?;
        Some(AssignedBundle {
            url: bundle.url.clone(),
            bundle: bundle.fresh(),
        })
    }

    /// `{bundleUrl: [files…]}`.
    pub fn to_json(&self) -> serde_json::Value {
        let map: IndexMap<&str, Vec<&str>> = self
            .bundles
            .values()
            .map(|bundle| {
                (
                    bundle.url.as_str(),
                    bundle.files.iter().map(ResolvedUrl::as_str).collect(),
                )
            })
            .collect();
        serde_json::to_value(map).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::DependencyRecord;

    #[test]
    fn rejects_overlapping_and_empty_bundles() {
        let overlap = BundleManifest::new([
            Bundle::new("/a.html", BundleKind::Html, ["/a.html", "/x.html"]),
            Bundle::new("/b.html", BundleKind::Html, ["/b.html", "/x.html"]),
        ]);
        assert!(matches!(overlap, Err(ManifestError::Overlap { .. })));

        let empty = BundleManifest::new([Bundle::new(
            "/a.html",
            BundleKind::Html,
            Vec::<&str>::new(),
        )]);
        assert!(matches!(empty, Err(ManifestError::EmptyBundle { .. })));

        let duplicate = BundleManifest::new([
            Bundle::new("/a.html", BundleKind::Html, ["/a.html"]),
            Bundle::new("/a.html", BundleKind::Html, ["/b.html"]),
        ]);
        assert!(matches!(duplicate, Err(ManifestError::DuplicateBundle { .. })));
    }

    #[test]
    fn lookups_and_assignment() {
        let manifest = BundleManifest::new([
            Bundle::new("/a.html", BundleKind::Html, ["/a.html", "/x.html"]),
            Bundle::new("/shared_bundle_1.html", BundleKind::Html, ["/s.html"])
                .with_entrypoints(["/a.html", "/b.html"]),
        ])
        .unwrap();

        assert_eq!(
            manifest.bundle_for_file(&"/x.html".into()).map(|b| b.url.as_str()),
            Some("/a.html")
        );
        let shared = manifest.bundle(&"/shared_bundle_1.html".into()).unwrap();
        assert!(shared.is_merged);
        assert!(!shared.is_file_backed());

        let mut assigned = manifest.assign(&"/a.html".into()).unwrap();
        assigned.bundle.strip_imports.insert("/x.html".into());
        // The manifest copy is untouched.
        assert!(manifest.assign(&"/a.html".into()).unwrap().bundle.strip_imports.is_empty());

        assert_eq!(
            manifest.to_json(),
            serde_json::json!({
                "/a.html": ["/a.html", "/x.html"],
                "/shared_bundle_1.html": ["/s.html"],
            })
        );
    }

    #[test]
    fn coverage_check_finds_unassigned_files() {
        let deps = DepsIndex::from_records([DependencyRecord::eager("/a.html", ["/x.html"])]);
        let manifest =
            BundleManifest::new([Bundle::new("/a.html", BundleKind::Html, ["/a.html"])]).unwrap();
        assert!(matches!(
            manifest.check_covers(&deps),
            Err(ManifestError::Uncovered { .. })
        ));
    }
}
