//! Script bundles: synthetic entry modules and the module bundler seam.
//!
//! A script bundle is produced by handing a [`SyntheticEntry`] (a module made
//! only of `import`/`export * from` statements, one per bundled module) to a
//! [`ModuleBundler`]. Before that, dynamic `import()` specifiers are swapped
//! for `bindery-lazy:` placeholders so the module bundler leaves them alone;
//! [`restore_dynamic_imports`] puts them back afterwards.

use indexmap::{IndexMap, IndexSet};

use bindery_graph::analysis::scan::{module_specifiers, remove_statements, rewrite_specifiers};
use bindery_graph::{Bundle, ResolvedUrl};

use crate::error::Result;

/// Scheme prefixed to dynamic import specifiers while module bundling runs.
pub const LAZY_PLACEHOLDER_SCHEME: &str = "bindery-lazy:";

/// Entry module for one script bundle.
///
/// Specifiers are the resolved urls of the bundled modules. Entrypoints of
/// the bundle are re-exported, everything else is imported for effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticEntry {
    pub url: ResolvedUrl,
    pub modules: Vec<ResolvedUrl>,
    pub source: String,
}

impl SyntheticEntry {
    pub fn for_bundle(bundle: &Bundle) -> Self {
        let mut source = String::new();
        for module in &bundle.files {
            if bundle.entrypoints.contains(module) {
                source.push_str(&format!("export * from '{}';\n", module));
            } else {
                source.push_str(&format!("import '{}';\n", module));
            }
        }
        Self {
            url: bundle.url.clone(),
            modules: bundle.files.iter().cloned().collect(),
            source,
        }
    }
}

/// Module sources keyed by url, ready for bundling: in-bundle imports use
/// resolved urls as specifiers, everything else is already relative to the
/// bundle.
pub type ModuleSources = IndexMap<ResolvedUrl, String>;

/// Swap every `import('x')` specifier for a placeholder. `rewrite` may
/// retarget the specifier first (for example to the bundle that owns it).
pub fn protect_dynamic_imports(
    source: &str,
    mut rewrite: impl FnMut(&str) -> Option<String>,
) -> String {
    let specifiers = module_specifiers(source);
    rewrite_specifiers(source, &specifiers, |specifier| {
        specifier.dynamic.then(|| {
            let target = rewrite(&specifier.value).unwrap_or_else(|| specifier.value.clone());
            format!("{LAZY_PLACEHOLDER_SCHEME}{target}")
        })
    })
}

/// Undo [`protect_dynamic_imports`].
pub fn restore_dynamic_imports(code: &str) -> String {
    let specifiers = module_specifiers(code);
    rewrite_specifiers(code, &specifiers, |specifier| {
        if !specifier.dynamic {
            return None;
        }
        specifier
            .value
            .strip_prefix(LAZY_PLACEHOLDER_SCHEME)
            .map(str::to_string)
    })
}

/// External module bundler seam.
pub trait ModuleBundler: Send + Sync + std::fmt::Debug {
    /// Produce the code of one bundle from its entry and module sources.
    fn bundle(&self, entry: &SyntheticEntry, modules: &ModuleSources) -> Result<String>;
}

/// Concatenates modules in dependency order.
///
/// Each module is emitted once, after the in-bundle modules it imports, with
/// the import statements of those modules removed. Top-level bindings share
/// one scope, so this suits bundles whose modules don't rename imports or
/// reuse top-level names.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatModuleBundler;

impl ConcatModuleBundler {
    fn emit(
        &self,
        url: &str,
        modules: &ModuleSources,
        emitted: &mut IndexSet<String>,
        out: &mut String,
    ) {
        if !emitted.insert(url.to_string()) {
            return;
        }
        let Some(source) = modules.get(&ResolvedUrl::new(url)) else {
            return;
        };

        let specifiers = module_specifiers(source);
        let in_bundle = |value: &str| modules.contains_key(&ResolvedUrl::new(value));
        for specifier in specifiers.iter().filter(|s| !s.dynamic) {
            if in_bundle(&specifier.value) {
                self.emit(&specifier.value, modules, emitted, out);
            }
        }

        let body = remove_statements(source, &specifiers, |specifier| {
            !specifier.dynamic && in_bundle(&specifier.value)
        });
        out.push_str(&format!("// {url}\n"));
        out.push_str(body.trim_start_matches('\n'));
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
}

impl ModuleBundler for ConcatModuleBundler {
    fn bundle(&self, entry: &SyntheticEntry, modules: &ModuleSources) -> Result<String> {
        let mut emitted = IndexSet::new();
        let mut out = String::new();
        for specifier in module_specifiers(&entry.source) {
            self.emit(&specifier.value, modules, &mut emitted, &mut out);
        }
        Ok(out)
    }
}
