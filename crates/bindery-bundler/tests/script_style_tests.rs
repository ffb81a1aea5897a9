//! Script and style bundles.

mod helpers;

use bindery_bundler::{BundleKind, ResolvedUrl};
use helpers::*;

#[tokio::test]
async fn script_bundle_keeps_lazy_imports_separate() {
    let output = build(
        &[
            (
                "/app.js",
                "import { twice } from './util.js';\nexport const run = () => import('./lazy.js').then((m) => m.go(twice(2)));\n",
            ),
            ("/util.js", "export const twice = (n) => n * 2;\n"),
            ("/lazy.js", "export const go = (n) => n;\n"),
        ],
        &["/app.js"],
    )
    .await;

    let app = output.bundle(&ResolvedUrl::new("/app.js")).unwrap();
    assert_eq!(app.kind, BundleKind::Script);
    let code = app.content.as_str();
    assert_in_order(
        code,
        &[
            "// /util.js",
            "export const twice = (n) => n * 2;",
            "// /app.js",
            "import('./lazy.js')",
        ],
    );
    assert!(!code.contains("from './util.js'"));
    assert!(!code.contains("bindery-lazy:"));
    assert!(!code.contains("export const go"));

    assert!(content(&output, "/lazy.js").contains("export const go = (n) => n;"));
    assert!(app.bundle.inlined_scripts.contains(&ResolvedUrl::new("/util.js")));
}

#[tokio::test]
async fn shared_modules_are_imported_from_their_bundle() {
    let output = build(
        &[
            ("/pages/a.js", "import '../lib/shared.js';\nconsole.log('a');\n"),
            ("/pages/b.js", "import '../lib/shared.js';\nconsole.log('b');\n"),
            ("/lib/shared.js", "console.log('shared');\n"),
        ],
        &["/pages/a.js", "/pages/b.js"],
    )
    .await;

    let a = content(&output, "/pages/a.js");
    assert!(a.contains("import '../shared_bundle_1.js';"));
    assert!(!a.contains("console.log('shared')"));
    assert!(content(&output, "/shared_bundle_1.js").contains("console.log('shared');"));
}

#[tokio::test]
async fn style_bundle_concatenates_in_import_order() {
    let output = build(
        &[
            (
                "/theme.css",
                "@import 'base.css';\n.theme { background: url(img/bg.png) }\n",
            ),
            ("/base.css", "body { margin: 0 }\n"),
        ],
        &["/theme.css"],
    )
    .await;

    assert_eq!(
        content(&output, "/theme.css"),
        "body { margin: 0 }\n.theme { background: url(img/bg.png) }\n"
    );
    let theme = output.bundle(&ResolvedUrl::new("/theme.css")).unwrap();
    assert_eq!(theme.kind, BundleKind::Style);
    assert_eq!(theme.bundle.inlined_styles.len(), 2);
}

#[tokio::test]
async fn style_urls_are_rebased_to_the_bundle() {
    let output = build(
        &[
            ("/site.css", "@import 'theme/colors.css';\nh1 { color: red }\n"),
            ("/theme/colors.css", ".hero { background: url(../img/hero.png) }\n"),
        ],
        &["/site.css"],
    )
    .await;

    let css = content(&output, "/site.css");
    assert!(css.contains("url(img/hero.png)"));
    assert!(!css.contains("@import"));
    assert_in_order(css, &[".hero", "h1"]);
}
