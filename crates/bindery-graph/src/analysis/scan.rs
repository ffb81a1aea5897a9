//! References inside scripts and stylesheets.
//!
//! Module specifiers come from an oxc parse: static `import`/`export … from`
//! declarations and `import()` calls with a string literal argument. Text in
//! comments, strings and templates is never mistaken for an import.
//! Stylesheets are scanned with regexes for `@import` rules and `url()`.

use std::ops::Range;
use std::sync::LazyLock;

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ExportAllDeclaration, ExportNamedDeclaration, Expression, ImportDeclaration, ImportExpression,
    Program, StringLiteral,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;
use oxc_span::{SourceType, Span};
use regex::Regex;
use tracing::debug;

static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:url\(\s*)?["']?([^"')\s;]+)["']?\s*\)?[^;]*;"#)
        .expect("css import pattern")
});

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(["']?)([^"')]+)(["']?)\s*\)"#).expect("css url pattern")
});

/// A specifier found in source text, with the byte range of the specifier
/// itself (quotes excluded) and of the whole statement declaring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub value: String,
    pub range: Range<usize>,
    /// Whole `import …;` / `@import …;` statement, trailing `;` included.
    /// Equal to `range` for `import()` calls and `url()` references.
    pub statement: Range<usize>,
    pub dynamic: bool,
}

fn statement_range(source: &str, whole: Range<usize>) -> Range<usize> {
    let end = if source[whole.end..].starts_with(';') {
        whole.end + 1
    } else {
        whole.end
    };
    whole.start..end
}

/// Parse `source` as a module and hand the program to `f`. `None` when the
/// parser gave up entirely; recoverable syntax errors still yield a program.
fn with_program<T>(source: &str, f: impl FnOnce(&Program<'_>) -> T) -> Option<T> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if parsed.panicked {
        debug!(errors = parsed.errors.len(), "script could not be parsed");
        return None;
    }
    if !parsed.errors.is_empty() {
        debug!(errors = parsed.errors.len(), "script has syntax errors");
    }
    Some(f(&parsed.program))
}

struct SpecifierCollector<'s> {
    source: &'s str,
    found: Vec<Specifier>,
}

impl SpecifierCollector<'_> {
    fn push(&mut self, literal: &StringLiteral<'_>, statement: Option<Span>) {
        let start = literal.span.start as usize + 1;
        let end = (literal.span.end as usize).saturating_sub(1).max(start);
        let range = start..end;
        let (statement, dynamic) = match statement {
            Some(span) => (
                statement_range(self.source, span.start as usize..span.end as usize),
                false,
            ),
            None => (range.clone(), true),
        };
        self.found.push(Specifier {
            value: literal.value.to_string(),
            range,
            statement,
            dynamic,
        });
    }
}

impl<'a> Visit<'a> for SpecifierCollector<'_> {
    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        self.push(&it.source, Some(it.span));
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        self.push(&it.source, Some(it.span));
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &it.source {
            self.push(source, Some(it.span));
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        if let Expression::StringLiteral(literal) = &it.source {
            self.push(literal, None);
        }
        walk::walk_import_expression(self, it);
    }
}

/// Static and dynamic import specifiers of a module, in source order.
pub fn module_specifiers(source: &str) -> Vec<Specifier> {
    with_program(source, |program| {
        let mut collector = SpecifierCollector {
            source,
            found: Vec::new(),
        };
        collector.visit_program(program);
        let mut found = collector.found;
        found.sort_by_key(|specifier| specifier.range.start);
        found
    })
    .unwrap_or_default()
}

/// Whether `source` has any `import` or `export` declaration.
pub fn has_module_syntax(source: &str) -> bool {
    with_program(source, |program| {
        program
            .body
            .iter()
            .any(|statement| statement.as_module_declaration().is_some())
    })
    .unwrap_or(false)
}

/// `@import` targets of a stylesheet, in source order.
pub fn css_imports(source: &str) -> Vec<Specifier> {
    CSS_IMPORT
        .captures_iter(source)
        .filter_map(|caps| Some((caps.get(0)?, caps.get(1)?)))
        .map(|(whole, m)| Specifier {
            value: m.as_str().to_string(),
            range: m.range(),
            statement: whole.range(),
            dynamic: false,
        })
        .collect()
}

/// Every `url(…)` reference and `@import` target of a stylesheet, in source
/// order. An `@import url(x)` is reported once.
pub fn css_references(source: &str) -> Vec<Specifier> {
    let mut found: Vec<Specifier> = CSS_URL
        .captures_iter(source)
        .filter_map(|caps| caps.get(2))
        .map(|m| Specifier {
            value: m.as_str().trim().to_string(),
            range: m.range(),
            statement: m.range(),
            dynamic: false,
        })
        .collect();
    for import in css_imports(source) {
        let covered = found
            .iter()
            .any(|existing| existing.range.start <= import.range.start && import.range.end <= existing.range.end);
        if !covered {
            found.push(import);
        }
    }
    found.sort_by_key(|specifier| specifier.range.start);
    found
}

/// Replace each specifier's range with `rewrite(value)`. Ranges must be
/// sorted and non-overlapping, as returned by the scans above.
pub fn rewrite_specifiers(
    source: &str,
    specifiers: &[Specifier],
    mut rewrite: impl FnMut(&Specifier) -> Option<String>,
) -> String {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    for specifier in specifiers {
        if let Some(replacement) = rewrite(specifier) {
            out.push_str(&source[last..specifier.range.start]);
            out.push_str(&replacement);
            last = specifier.range.end;
        }
    }
    out.push_str(&source[last..]);
    out
}

/// Remove the statements of every specifier `drop` selects.
pub fn remove_statements(
    source: &str,
    specifiers: &[Specifier],
    mut drop: impl FnMut(&Specifier) -> bool,
) -> String {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    for specifier in specifiers {
        if specifier.statement.start >= last && drop(specifier) {
            out.push_str(&source[last..specifier.statement.start]);
            last = specifier.statement.end;
        }
    }
    out.push_str(&source[last..]);
    out
}

/// Relative (`./`, `../`) or root-absolute module specifier. Bare package
/// specifiers need a module resolver and are left alone.
pub fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(specifiers: &[Specifier]) -> Vec<(&str, bool)> {
        specifiers
            .iter()
            .map(|s| (s.value.as_str(), s.dynamic))
            .collect()
    }

    #[test]
    fn finds_static_and_dynamic_imports() {
        let source = r#"import './side-effect.js';
import def, { a as b } from "./dep.js";
import {
  x,
  y,
} from '../multi.js';
export * from './re.js';
const later = () => import('./lazy.js');
const text = "import nothing";
"#;
        assert_eq!(
            values(&module_specifiers(source)),
            vec![
                ("./side-effect.js", false),
                ("./dep.js", false),
                ("../multi.js", false),
                ("./re.js", false),
                ("./lazy.js", true),
            ]
        );
    }

    #[test]
    fn ignores_imports_in_comments_and_strings() {
        let source = "/*\nimport './commented.js';\n*/\nconst t = `\nimport './in-template-string.js';\n`;\nconst s = \"import('./in-string.js')\";\n// import './line-comment.js';\nimport './real.js';\n";
        assert_eq!(values(&module_specifiers(source)), vec![("./real.js", false)]);
    }

    #[test]
    fn finds_imports_nested_in_exports() {
        let source = "export const load = () => import('./page.js');\nexport { a } from './a.js';\n";
        assert_eq!(
            values(&module_specifiers(source)),
            vec![("./page.js", true), ("./a.js", false)]
        );
    }

    #[test]
    fn detects_module_syntax() {
        assert!(has_module_syntax("export const answer = 42;"));
        assert!(has_module_syntax("import './a.js';"));
        assert!(!has_module_syntax("const s = 'export default 1';\nimport('./lazy.js');"));
    }

    #[test]
    fn finds_css_imports_and_urls() {
        let source = r#"@import "a.css";
@import url('b.css') screen;
.x { background: url(img/bg.png); }"#;
        assert_eq!(
            values(&css_imports(source)),
            vec![("a.css", false), ("b.css", false)]
        );
        assert_eq!(
            values(&css_references(source)),
            vec![("a.css", false), ("b.css", false), ("img/bg.png", false)]
        );
    }

    #[test]
    fn removes_whole_statements() {
        let source = "import a from './a.js';\nimport './b.js';\nuse(a);\n";
        let specifiers = module_specifiers(source);
        let out = remove_statements(source, &specifiers, |s| s.value == "./a.js");
        assert_eq!(out, "\nimport './b.js';\nuse(a);\n");
    }

    #[test]
    fn rewrites_in_place() {
        let source = "import a from './a.js';\nimport('./b.js');";
        let specifiers = module_specifiers(source);
        let out = rewrite_specifiers(source, &specifiers, |s| {
            s.dynamic.then(|| format!("lazy:{}", s.value))
        });
        assert_eq!(out, "import a from './a.js';\nimport('lazy:./b.js');");
    }
}
