//! Content classifier: maps a file name to the kind of content it holds.

use crate::models::FileKind;
use std::path::Path;

const MARKUP: &[&str] = &["html", "htm", "xhtml"];
const TEMPLATED: &[&str] = &[
    "jsp", "jspf", "php", "aspx", "ascx", "cshtml", "erb", "hbs", "twig", "vm", "ftl",
];
const STYLESHEET: &[&str] = &["css", "scss", "less"];
const SCRIPT: &[&str] = &["js", "mjs"];

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Classify by extension. Unknown extensions pass through unchanged.
pub fn classify(name: &str) -> FileKind {
    let Some(ext) = extension(name) else {
        return FileKind::Unknown;
    };
    let ext = ext.as_str();
    if MARKUP.contains(&ext) {
        FileKind::Markup
    } else if TEMPLATED.contains(&ext) {
        FileKind::TemplatedMarkup
    } else if STYLESHEET.contains(&ext) {
        FileKind::Stylesheet
    } else if SCRIPT.contains(&ext) {
        FileKind::Script
    } else {
        FileKind::Unknown
    }
}

/// Display label for reports: the upper-cased extension, or `FILE`.
pub fn file_type(name: &str) -> String {
    extension(name)
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_uppercase())
        .unwrap_or_else(|| "FILE".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_by_extension() {
        assert_eq!(classify("index.html"), FileKind::Markup);
        assert_eq!(classify("a/b/Page.HTM"), FileKind::Markup);
        assert_eq!(classify("views/list.jsp"), FileKind::TemplatedMarkup);
        assert_eq!(classify("index.php"), FileKind::TemplatedMarkup);
        assert_eq!(classify("Default.aspx"), FileKind::TemplatedMarkup);
        assert_eq!(classify("site.css"), FileKind::Stylesheet);
        assert_eq!(classify("theme.scss"), FileKind::Stylesheet);
        assert_eq!(classify("app.js"), FileKind::Script);
    }

    #[test]
    fn unknown_degrades_gracefully() {
        assert_eq!(classify("README"), FileKind::Unknown);
        assert_eq!(classify("logo.png"), FileKind::Unknown);
        assert_eq!(classify(""), FileKind::Unknown);
        assert_eq!(classify(".html"), FileKind::Unknown);
    }

    #[test]
    fn file_type_labels() {
        assert_eq!(file_type("x/index.html"), "HTML");
        assert_eq!(file_type("list.Jsp"), "JSP");
        assert_eq!(file_type("Makefile"), "FILE");
    }
}
