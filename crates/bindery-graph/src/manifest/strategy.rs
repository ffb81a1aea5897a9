//! Bundle assignment strategies.
//!
//! Every strategy starts from the same grouping: each eagerly needed file is
//! keyed by the exact, ordered set of entrypoints that need it. Entrypoint
//! files are always pinned to their own bundle, so an entrypoint imported by
//! another entrypoint is still written to its own location. Strategies
//! differ only in how they turn groups into bundles.

use indexmap::{IndexMap, IndexSet};

use super::{Bundle, BundleKind, BundleManifest, ManifestError};
use crate::deps::DepsIndex;
use crate::url::ResolvedUrl;

/// Turns a [`DepsIndex`] into a [`BundleManifest`]. Any
/// `Fn(&DepsIndex) -> Result<BundleManifest, ManifestError>` is a strategy.
pub trait BundleStrategy: Send + Sync {
    fn assign(&self, deps: &DepsIndex) -> Result<BundleManifest, ManifestError>;
}

impl<F> BundleStrategy for F
where
    F: Fn(&DepsIndex) -> Result<BundleManifest, ManifestError> + Send + Sync,
{
    fn assign(&self, deps: &DepsIndex) -> Result<BundleManifest, ManifestError> {
        self(deps)
    }
}

/// Names shared bundles `{prefix}{n}.{ext}`, counting from 1.
#[derive(Debug, Clone)]
pub struct CountingUrlMapper {
    prefix: String,
    next: usize,
}

impl Default for CountingUrlMapper {
    fn default() -> Self {
        Self::new(DEFAULT_SHARED_PREFIX)
    }
}

pub const DEFAULT_SHARED_PREFIX: &str = "/shared_bundle_";

impl CountingUrlMapper {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    pub fn next_url(&mut self, kind: BundleKind) -> ResolvedUrl {
        let url = ResolvedUrl::new(format!("{}{}.{}", self.prefix, self.next, kind.extension()));
        self.next += 1;
        url
    }
}

/// Files grouped by the entrypoints that need them.
#[derive(Debug, Clone)]
struct Group {
    dependents: Vec<ResolvedUrl>,
    kind: BundleKind,
    files: IndexSet<ResolvedUrl>,
}

impl Group {
    fn is_shared(&self) -> bool {
        self.dependents.len() > 1
    }
}

/// Group every eager file, in discovery order. Groups owned by a single
/// entrypoint take the entrypoint's kind; shared groups are split by the
/// kind of their files.
fn group_files(deps: &DepsIndex) -> Vec<Group> {
    let mut groups: IndexMap<(Vec<ResolvedUrl>, BundleKind), IndexSet<ResolvedUrl>> =
        IndexMap::new();

    for entrypoint in deps.entrypoints() {
        let kind = BundleKind::from(deps.kind_of(entrypoint));
        groups
            .entry((vec![entrypoint.clone()], kind))
            .or_default()
            .insert(entrypoint.clone());
    }

    for file in deps.eager_files() {
        if deps.contains(&file) {
            continue;
        }
        let dependents = deps.dependents_of(&file);
        let kind = match dependents.as_slice() {
            [only] => BundleKind::from(deps.kind_of(only)),
            _ => BundleKind::from(deps.kind_of(&file)),
        };
        groups.entry((dependents, kind)).or_default().insert(file);
    }

    groups
        .into_iter()
        .map(|((dependents, kind), files)| Group {
            dependents,
            kind,
            files,
        })
        .collect()
}

fn entrypoint_bundle(group: Group) -> Bundle {
    let url = group.dependents[0].clone();
    Bundle::new(url.clone(), group.kind, group.files).with_entrypoints([url])
}

/// Default strategy: one bundle per entrypoint with its exclusive files, and
/// one shared bundle for each exact set of two or more entrypoints.
#[derive(Debug, Clone)]
pub struct SharedByEntrypointSet {
    pub shared_prefix: String,
}

impl Default for SharedByEntrypointSet {
    fn default() -> Self {
        Self {
            shared_prefix: DEFAULT_SHARED_PREFIX.to_string(),
        }
    }
}

impl BundleStrategy for SharedByEntrypointSet {
    fn assign(&self, deps: &DepsIndex) -> Result<BundleManifest, ManifestError> {
        let mut mapper = CountingUrlMapper::new(self.shared_prefix.clone());
        let bundles = group_files(deps).into_iter().map(|group| {
            if group.is_shared() {
                Bundle::new(mapper.next_url(group.kind), group.kind, group.files)
                    .with_entrypoints(group.dependents)
            } else {
                entrypoint_bundle(group)
            }
        });
        let bundles: Vec<Bundle> = bundles.collect();
        finish(bundles, deps)
    }
}

/// No sharing: each file goes to the first entrypoint, in discovery order,
/// that needs it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerEntrypoint;

impl BundleStrategy for PerEntrypoint {
    fn assign(&self, deps: &DepsIndex) -> Result<BundleManifest, ManifestError> {
        let mut bundles: IndexMap<ResolvedUrl, Bundle> = IndexMap::new();
        for group in group_files(deps) {
            let owner = group.dependents[0].clone();
            match bundles.get_mut(&owner) {
                Some(bundle) => bundle.files.extend(group.files),
                None => {
                    let kind = BundleKind::from(deps.kind_of(&owner));
                    let bundle =
                        Bundle::new(owner.clone(), kind, group.files).with_entrypoints([owner.clone()]);
                    bundles.insert(owner, bundle);
                }
            }
        }
        finish(bundles.into_values().collect(), deps)
    }
}

/// Every group needed by at least `min_entrypoints` entrypoints is merged
/// into a single shared bundle per kind. Smaller shared groups keep their
/// own bundles.
#[derive(Debug, Clone)]
pub struct MaximalSharing {
    pub min_entrypoints: usize,
    pub shared_prefix: String,
}

impl Default for MaximalSharing {
    fn default() -> Self {
        Self {
            min_entrypoints: 2,
            shared_prefix: DEFAULT_SHARED_PREFIX.to_string(),
        }
    }
}

impl BundleStrategy for MaximalSharing {
    fn assign(&self, deps: &DepsIndex) -> Result<BundleManifest, ManifestError> {
        if self.min_entrypoints < 2 {
            return Err(ManifestError::Strategy(format!(
                "min_entrypoints must be at least 2, got {}",
                self.min_entrypoints
            )));
        }

        let mut mapper = CountingUrlMapper::new(self.shared_prefix.clone());
        let mut merged: IndexMap<BundleKind, (IndexSet<ResolvedUrl>, IndexSet<ResolvedUrl>)> =
            IndexMap::new();
        let mut bundles = Vec::new();

        for group in group_files(deps) {
            if group.dependents.len() >= self.min_entrypoints {
                let (entrypoints, files) = merged.entry(group.kind).or_default();
                entrypoints.extend(group.dependents);
                files.extend(group.files);
            } else if group.is_shared() {
                bundles.push(
                    Bundle::new(mapper.next_url(group.kind), group.kind, group.files)
                        .with_entrypoints(group.dependents),
                );
            } else {
                bundles.push(entrypoint_bundle(group));
            }
        }

        for (kind, (entrypoints, files)) in merged {
            let mut bundle =
                Bundle::new(mapper.next_url(kind), kind, files).with_entrypoints(entrypoints);
            bundle.is_merged = true;
            bundles.push(bundle);
        }
        finish(bundles, deps)
    }
}

/// Every shared file is merged into the shell entrypoint's bundle.
#[derive(Debug, Clone)]
pub struct Shell {
    pub shell: ResolvedUrl,
}

impl BundleStrategy for Shell {
    fn assign(&self, deps: &DepsIndex) -> Result<BundleManifest, ManifestError> {
        if !deps.contains(&self.shell) {
            return Err(ManifestError::UnknownShell {
                shell: self.shell.clone(),
            });
        }

        let mut shell_files: IndexSet<ResolvedUrl> = IndexSet::new();
        let mut shell_entrypoints: IndexSet<ResolvedUrl> = IndexSet::new();
        let mut bundles = Vec::new();
        for group in group_files(deps) {
            if group.is_shared() || group.dependents[0] == self.shell {
                shell_entrypoints.extend(group.dependents);
                shell_files.extend(group.files);
            } else {
                bundles.push(entrypoint_bundle(group));
            }
        }

        let kind = BundleKind::from(deps.kind_of(&self.shell));
        let mut shell = Bundle::new(self.shell.clone(), kind, shell_files)
            .with_entrypoints(shell_entrypoints);
        shell.is_merged = shell.entrypoints.len() > 1;
        bundles.insert(0, shell);
        finish(bundles, deps)
    }
}

fn finish(bundles: Vec<Bundle>, deps: &DepsIndex) -> Result<BundleManifest, ManifestError> {
    let manifest = BundleManifest::new(bundles)?;
    manifest.check_covers(deps)?;
    Ok(manifest)
}
