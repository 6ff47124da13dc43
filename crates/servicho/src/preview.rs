//! Ad-hoc preview pages for component modules.
//!
//! Requesting `/src/Button.jsx` in the browser returns a small HTML shell that
//! imports that module and mounts its default export into `#root`. Nothing
//! is read from disk; whether the module renders is the browser's business.

use std::path::Path;

/// Extensions that get a preview page instead of raw bytes.
pub const PREVIEW_EXTENSIONS: &[&str] = &["js", "jsx"];

/// A generated preview page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewDocument {
    /// Root-relative URL the page imports
    pub import_path: String,
    pub html: String,
}

impl PreviewDocument {
    pub fn into_bytes(self) -> Vec<u8> {
        self.html.into_bytes()
    }
}

/// Whether a request path names a component module.
pub fn is_component_module(request_path: &str) -> bool {
    Path::new(request_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PREVIEW_EXTENSIONS.contains(&ext))
}

/// Root-relative URL for `module_path`, always with a single leading slash.
///
/// Each segment is percent-encoded so names containing `#`, `?` or `%` still
/// import the file they name. Paths outside `root` are used as given.
pub fn import_path(module_path: &Path, root: &Path) -> String {
    let relative = module_path.strip_prefix(root).unwrap_or(module_path);
    let web_path = relative.to_string_lossy().replace('\\', "/");
    let segments: Vec<_> = web_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(urlencoding::encode)
        .collect();
    format!("/{}", segments.join("/"))
}

/// Build the preview page for `module_path`.
pub fn synthesize(module_path: &Path, root: &Path) -> PreviewDocument {
    let import_path = import_path(module_path, root);
    let html = PREVIEW_TEMPLATE.replace(
        "__MODULE_SOURCE__",
        &script_string_literal(&import_path),
    );

    PreviewDocument { import_path, html }
}

/// Quote `value` as a JS string that cannot close the surrounding `<script>`.
fn script_string_literal(value: &str) -> String {
    serde_json::Value::from(value)
        .to_string()
        .replace("</", "<\\/")
}

const PREVIEW_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Component Preview</title>
</head>
<body>
    <div id="root"></div>
    <script type="module">
      import React from 'react';
      import { createRoot } from 'react-dom/client';
      import Component from __MODULE_SOURCE__;
      createRoot(document.getElementById('root')).render(React.createElement(Component, null));
    </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_is_component_module() {
        assert!(is_component_module("/src/Button.jsx"));
        assert!(is_component_module("/app.js"));
        assert!(!is_component_module("/index.html"));
        assert!(!is_component_module("/app.json"));
        assert!(!is_component_module("/src/"));
    }

    #[test]
    fn test_import_path_is_root_relative() {
        let root = PathBuf::from("/site");
        assert_eq!(
            import_path(Path::new("/site/src/Button.jsx"), &root),
            "/src/Button.jsx"
        );
        assert_eq!(import_path(Path::new("/site/app.js"), &root), "/app.js");
    }

    #[test]
    fn test_import_path_normalizes_separators() {
        let root = PathBuf::from("/site");
        assert_eq!(
            import_path(Path::new("src\\widgets\\Card.jsx"), &root),
            "/src/widgets/Card.jsx"
        );
    }

    #[test]
    fn test_synthesize_embeds_module_and_mount_point() {
        let doc = synthesize(Path::new("/site/src/Button.jsx"), Path::new("/site"));

        assert_eq!(doc.import_path, "/src/Button.jsx");
        assert!(doc.html.starts_with("<!DOCTYPE html>"));
        assert!(doc.html.contains(r#"<div id="root"></div>"#));
        assert!(doc.html.contains(r#"<script type="module">"#));
        assert!(doc
            .html
            .contains(r#"import Component from "/src/Button.jsx";"#));
        assert_eq!(doc.html.matches("id=\"root\"").count(), 1);
    }

    #[test]
    fn test_import_path_encodes_url_delimiters() {
        let root = PathBuf::from("/site");
        assert_eq!(import_path(Path::new("/site/a#b.jsx"), &root), "/a%23b.jsx");
        assert_eq!(import_path(Path::new("/site/a?b.jsx"), &root), "/a%3Fb.jsx");
        assert_eq!(
            import_path(Path::new("/site/my widgets/100%.js"), &root),
            "/my%20widgets/100%25.js"
        );
    }

    #[test]
    fn test_synthesize_escapes_script_breakout() {
        let doc = synthesize(
            Path::new("/site/</script><script>alert(1).js"),
            Path::new("/site"),
        );
        assert!(!doc.html.contains("</script><script>alert"));
        assert!(doc
            .html
            .contains(r#""/%3C/script%3E%3Cscript%3Ealert%281%29.js""#));
    }
}
