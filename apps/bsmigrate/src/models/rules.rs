//! Rule tables for the Bootstrap 3 to Bootstrap 5 migration.
//!
//! A `RuleSet` is built once per process and shared read-only by every
//! component. It is pure data: token mappings, attribute renames, CDN shapes,
//! and the script signatures the detector reports.
//!
//! Table keys are case-sensitive. Mappings are curated so that no replacement
//! token is itself a legacy key, which keeps a second rewrite pass a no-op.

use crate::models::{FileKind, IssueCategory, Severity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Rewrite stages, in application order.
pub enum RuleCategory {
    Cdn,
    ModalHeader,
    Attributes,
    Classes,
    Stylesheet,
    Navigation,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 6] = [
        RuleCategory::Cdn,
        RuleCategory::ModalHeader,
        RuleCategory::Attributes,
        RuleCategory::Classes,
        RuleCategory::Stylesheet,
        RuleCategory::Navigation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleCategory::Cdn => "cdn",
            RuleCategory::ModalHeader => "modal-header",
            RuleCategory::Attributes => "attributes",
            RuleCategory::Classes => "classes",
            RuleCategory::Stylesheet => "stylesheet",
            RuleCategory::Navigation => "navigation",
        }
    }

    /// Whether this stage rewrites content of the given kind.
    pub fn applies_to(self, kind: FileKind) -> bool {
        match self {
            RuleCategory::Stylesheet => kind == FileKind::Stylesheet,
            _ => kind.is_markup(),
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown rule category '{}' (expected one of: {})",
                    s,
                    RuleCategory::ALL.map(|c| c.as_str()).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Which rewrite stages are enabled. All are on by default.
pub struct Categories {
    disabled: [bool; 6],
}

impl Categories {
    pub fn all() -> Self {
        Categories::default()
    }

    pub fn without(mut self, cat: RuleCategory) -> Self {
        self.disabled[cat as usize] = true;
        self
    }

    pub fn is_enabled(&self, cat: RuleCategory) -> bool {
        !self.disabled[cat as usize]
    }

    /// Enabled stages that rewrite content of `kind`, in application order.
    pub fn for_kind(&self, kind: FileKind) -> impl Iterator<Item = RuleCategory> + '_ {
        RuleCategory::ALL
            .into_iter()
            .filter(move |c| self.is_enabled(*c) && c.applies_to(kind))
    }
}

/// A class token matched by regex, expanded through a `$1`-style template.
pub struct TokenPattern {
    pub regex: Regex,
    pub template: String,
}

/// How an unsupported class token is recognized.
pub enum TokenMatch {
    Exact(&'static str),
    Prefix(&'static str),
    Pattern(Regex),
}

impl TokenMatch {
    pub fn matches(&self, token: &str) -> bool {
        match self {
            TokenMatch::Exact(t) => token == *t,
            TokenMatch::Prefix(p) => token.starts_with(p),
            TokenMatch::Pattern(re) => re.is_match(token),
        }
    }
}

/// A legacy class with no automatic treatment.
pub struct UnsupportedClass {
    pub matcher: TokenMatch,
    pub message: String,
    pub suggestion: String,
}

/// A line-level script or markup signature reported by the detector.
pub struct ScriptSignature {
    pub regex: Regex,
    pub message: String,
    pub suggestion: String,
    pub severity: Severity,
    pub category: IssueCategory,
    /// Stage that resolves this signature automatically when it runs.
    pub fixed_by: Option<RuleCategory>,
}

/// Known legacy hosting prefixes and the canonical replacement tags.
pub struct CdnRule {
    pub legacy_prefixes: Vec<&'static str>,
    pub stylesheet_tag: String,
    pub script_tag: String,
}

/// Markers for a dependency on the legacy scripting library.
pub struct LibraryMarker {
    pub regex: Regex,
    pub message: String,
    pub suggestion: String,
}

/// Immutable migration rule tables.
pub struct RuleSet {
    pub classes: BTreeMap<&'static str, Vec<&'static str>>,
    pub class_patterns: Vec<TokenPattern>,
    pub components: BTreeMap<&'static str, Vec<&'static str>>,
    pub attributes: Vec<(&'static str, &'static str)>,
    pub cdn: CdnRule,
    pub signatures: Vec<ScriptSignature>,
    pub unsupported: Vec<UnsupportedClass>,
    pub library: LibraryMarker,
}

const CLASS_TABLE: &[(&str, &str)] = &[
    // Responsive utilities
    ("hidden-xs", "d-none d-sm-block"),
    ("hidden-sm", "d-sm-none d-md-block"),
    ("hidden-md", "d-md-none d-lg-block"),
    ("hidden-lg", "d-lg-none d-xl-block"),
    ("visible-xs", "d-block d-sm-none"),
    ("visible-sm", "d-none d-sm-block d-md-none"),
    ("visible-md", "d-none d-md-block d-lg-none"),
    ("visible-lg", "d-none d-lg-block d-xl-none"),
    // Panels become cards
    ("panel", "card"),
    ("panel-heading", "card-header"),
    ("panel-title", "card-title"),
    ("panel-body", "card-body"),
    ("panel-footer", "card-footer"),
    ("panel-default", "card"),
    ("panel-primary", "card bg-primary text-white"),
    ("panel-success", "card bg-success text-white"),
    ("panel-info", "card bg-info text-white"),
    ("panel-warning", "card bg-warning"),
    ("panel-danger", "card bg-danger text-white"),
    // Wells were removed
    ("well", "card card-body"),
    ("well-lg", "card card-body p-5"),
    ("well-sm", "card card-body p-2"),
    // Images
    ("img-rounded", "rounded"),
    ("img-circle", "rounded-circle"),
    ("img-responsive", "img-fluid"),
    ("thumbnail", "img-thumbnail"),
    // Tables
    ("table-condensed", "table-sm"),
    // Forms
    ("control-label", "col-form-label"),
    ("form-group", "mb-3"),
    ("form-control-static", "form-control-plaintext"),
    ("help-block", "form-text"),
    ("input-lg", "form-control-lg"),
    ("input-sm", "form-control-sm"),
    // Buttons
    ("btn-default", "btn-secondary"),
    ("btn-xs", "btn-sm"),
    ("close", "btn-close"),
    // Utilities
    ("pull-left", "float-start"),
    ("pull-right", "float-end"),
    ("center-block", "mx-auto d-block"),
    ("hidden", "d-none"),
    ("text-left", "text-start"),
    ("text-right", "text-end"),
    ("in", "show"),
    // Labels become badges
    ("label", "badge"),
    ("label-default", "bg-secondary"),
    ("label-primary", "bg-primary"),
    ("label-success", "bg-success"),
    ("label-info", "bg-info"),
    ("label-warning", "bg-warning text-dark"),
    ("label-danger", "bg-danger"),
    // Modals
    ("modal-title", "modal-title fs-5"),
    // Misc components
    ("jumbotron", "p-5 mb-4 bg-light rounded-3"),
    ("badge-pill", "rounded-pill"),
];

const COMPONENT_TABLE: &[(&str, &str)] = &[
    ("navbar-inverse", "navbar-dark bg-dark"),
    ("navbar-default", "navbar-light bg-light"),
    ("navbar-toggle", "navbar-toggler"),
    ("navbar-right", "ms-auto"),
    ("navbar-left", "me-auto"),
    ("navbar-fixed-top", "fixed-top"),
    ("navbar-fixed-bottom", "fixed-bottom"),
    ("nav-stacked", "flex-column"),
    ("nav-justified", "nav-fill"),
    ("dropdown-menu-right", "dropdown-menu-end"),
];

const ATTRIBUTE_TABLE: &[(&str, &str)] = &[
    ("data-toggle", "data-bs-toggle"),
    ("data-target", "data-bs-target"),
    ("data-dismiss", "data-bs-dismiss"),
    ("data-parent", "data-bs-parent"),
    ("data-ride", "data-bs-ride"),
    ("data-slide-to", "data-bs-slide-to"),
    ("data-slide", "data-bs-slide"),
    ("data-spy", "data-bs-spy"),
];

const PLUGINS: &[(&str, &str)] = &[
    ("collapse", "Collapse"),
    ("dropdown", "Dropdown"),
    ("modal", "Modal"),
    ("tooltip", "Tooltip"),
    ("popover", "Popover"),
    ("tab", "Tab"),
    ("alert", "Alert"),
    ("button", "Button"),
    ("carousel", "Carousel"),
    ("scrollspy", "Scrollspy"),
];

const BS5_CSS: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/css/bootstrap.min.css";
const BS5_CSS_SRI: &str =
    "sha384-T3c6CoIi6uLrA9TneNEoa7RxnatzjcDSCmG1MXxSR1GAsXEV/Dwwykc2MPK8M2HN";
const BS5_JS: &str = "https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/js/bootstrap.bundle.min.js";
const BS5_JS_SRI: &str =
    "sha384-C6RzsynM9kWDrMNeT87bh95OGNyZPhcTNXj1NW7RuBCsyN/o0jlpcV8Qyq46cDfL";

fn split_tokens(s: &'static str) -> Vec<&'static str> {
    s.split_whitespace().collect()
}

fn signature(
    pattern: &str,
    message: impl Into<String>,
    suggestion: impl Into<String>,
    severity: Severity,
    category: IssueCategory,
    fixed_by: Option<RuleCategory>,
) -> Result<ScriptSignature, regex::Error> {
    Ok(ScriptSignature {
        regex: Regex::new(pattern)?,
        message: message.into(),
        suggestion: suggestion.into(),
        severity,
        category,
        fixed_by,
    })
}

impl RuleSet {
    /// Build the Bootstrap 3 to 5 rule tables.
    pub fn bootstrap3_to_5() -> Result<RuleSet, regex::Error> {
        let classes = CLASS_TABLE
            .iter()
            .map(|(k, v)| (*k, split_tokens(v)))
            .collect();
        let components = COMPONENT_TABLE
            .iter()
            .map(|(k, v)| (*k, split_tokens(v)))
            .collect();

        let class_patterns = vec![
            TokenPattern {
                regex: Regex::new(r"^col-xs-offset-(\d{1,2})$")?,
                template: "offset-$1".into(),
            },
            TokenPattern {
                regex: Regex::new(r"^col-(sm|md|lg)-offset-(\d{1,2})$")?,
                template: "offset-$1-$2".into(),
            },
            TokenPattern {
                regex: Regex::new(r"^col-xs-(\d{1,2})$")?,
                template: "col-$1".into(),
            },
        ];

        let mut signatures = Vec::new();
        for (name, title) in PLUGINS {
            signatures.push(signature(
                &format!(r"\$\.fn\.{}\b", name),
                format!("{} plugin usage requires updating to Bootstrap 5 syntax", title),
                format!(
                    "Use bootstrap.{}.getOrCreateInstance(element) instead of the jQuery plugin",
                    title
                ),
                Severity::Warning,
                IssueCategory::Javascript,
                None,
            )?);
        }
        for (legacy, replacement) in ATTRIBUTE_TABLE {
            signatures.push(signature(
                &format!(r"{}\s*=", regex::escape(legacy)),
                format!(
                    "{} attribute should be updated to {}",
                    legacy, replacement
                ),
                format!("Rename {} to {}", legacy, replacement),
                Severity::Warning,
                IssueCategory::Javascript,
                Some(RuleCategory::Attributes),
            )?);
        }
        signatures.push(signature(
            r"\$\([^)]*\)\.dropdown\(",
            "Replace jQuery dropdown with native JavaScript and data-bs-toggle",
            "Use new bootstrap.Dropdown(element) or data-bs-toggle=\"dropdown\"",
            Severity::Warning,
            IssueCategory::Javascript,
            None,
        )?);
        signatures.push(signature(
            r"\$\([^)]*\)\.modal\(",
            "Replace with var myModal = new bootstrap.Modal(document.getElementById('myModal'))",
            "Modals are no longer jQuery plugins in Bootstrap 5",
            Severity::Warning,
            IssueCategory::Javascript,
            None,
        )?);
        signatures.push(signature(
            r"\$\([^)]*\)\.(tooltip|popover)\(",
            "Tooltips and popovers must be initialized with the Bootstrap 5 constructors",
            "Use new bootstrap.Tooltip(element) or new bootstrap.Popover(element)",
            Severity::Warning,
            IssueCategory::Javascript,
            None,
        )?);
        signatures.push(signature(
            r"\$\([^)]*\)\.(tab|alert|collapse|carousel|button|scrollspy)\(",
            "jQuery plugin call must be replaced with the Bootstrap 5 JavaScript API",
            "Create the component with new bootstrap.<Component>(element) and call its methods",
            Severity::Warning,
            IssueCategory::Javascript,
            None,
        )?);
        signatures.push(signature(
            r"\$\(\s*window\s*\)\.on\b",
            "Replace with native window.addEventListener",
            "Bootstrap 5 does not depend on jQuery event helpers",
            Severity::Info,
            IssueCategory::Javascript,
            None,
        )?);
        signatures.push(signature(
            r"\baffix\b",
            "The Affix plugin has been removed in Bootstrap 5",
            "Use position: sticky (class sticky-top) or an IntersectionObserver",
            Severity::Error,
            IssueCategory::Javascript,
            None,
        )?);

        let unsupported = vec![
            UnsupportedClass {
                matcher: TokenMatch::Prefix("glyphicon"),
                message: "Glyphicons are not included in Bootstrap 5".into(),
                suggestion: "Switch to Bootstrap Icons or another icon font".into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Exact("caret"),
                message: "The caret class was removed; dropdown toggles draw their own caret"
                    .into(),
                suggestion: "Remove the caret element and rely on .dropdown-toggle".into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Exact("affix"),
                message: "The affix class has no Bootstrap 5 equivalent".into(),
                suggestion: "Use sticky-top or position: sticky".into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Exact("navbar-form"),
                message: "navbar-form was removed from Bootstrap 5".into(),
                suggestion: "Use a form with d-flex inside the navbar".into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Exact("navbar-btn"),
                message: "navbar-btn was removed from Bootstrap 5".into(),
                suggestion: "Use regular button classes with spacing utilities".into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Exact("page-header"),
                message: "page-header was removed from Bootstrap 5".into(),
                suggestion: "Use spacing and border utilities such as pb-2 mt-4 mb-2 border-bottom"
                    .into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Pattern(Regex::new(
                    r"^media(-(object|body|left|right|heading|list))?$",
                )?),
                message: "The media object was removed from Bootstrap 5".into(),
                suggestion: "Rebuild with flex utilities (d-flex, flex-shrink-0, flex-grow-1)"
                    .into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Exact("input-group-addon"),
                message: "input-group-addon was replaced by input-group-text".into(),
                suggestion: "Wrap addon content in .input-group-text and drop wrapper elements"
                    .into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Exact("panel-group"),
                message: "panel-group accordions must be rebuilt with the accordion component"
                    .into(),
                suggestion: "Use .accordion, .accordion-item and .accordion-button".into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Exact("btn-group-justified"),
                message: "btn-group-justified was removed from Bootstrap 5".into(),
                suggestion: "Use d-flex w-100 on the group and flex-fill on the buttons".into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Exact("carousel-control"),
                message: "Carousel controls are split into prev and next classes".into(),
                suggestion: "Use carousel-control-prev and carousel-control-next".into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Exact("dl-horizontal"),
                message: "dl-horizontal was removed from Bootstrap 5".into(),
                suggestion: "Apply row to the dl and column classes to dt/dd".into(),
            },
            UnsupportedClass {
                matcher: TokenMatch::Pattern(Regex::new(r"^col-(xs|sm|md|lg)-(push|pull)-\d{1,2}$")?),
                message: "Column push/pull classes were removed from Bootstrap 5".into(),
                suggestion: "Use order-* utilities to reorder columns".into(),
            },
        ];

        Ok(RuleSet {
            classes,
            class_patterns,
            components,
            attributes: ATTRIBUTE_TABLE.to_vec(),
            cdn: CdnRule {
                legacy_prefixes: vec![
                    "maxcdn.bootstrapcdn.com/bootstrap/3.",
                    "stackpath.bootstrapcdn.com/bootstrap/3.",
                    "netdna.bootstrapcdn.com/bootstrap/3.",
                    "netdna.bootstrapcdn.com/twitter-bootstrap/3.",
                    "cdnjs.cloudflare.com/ajax/libs/twitter-bootstrap/3.",
                    "cdn.jsdelivr.net/bootstrap/3.",
                    "cdn.jsdelivr.net/npm/bootstrap@3.",
                    "unpkg.com/bootstrap@3.",
                ],
                stylesheet_tag: format!(
                    r#"<link href="{}" rel="stylesheet" integrity="{}" crossorigin="anonymous">"#,
                    BS5_CSS, BS5_CSS_SRI
                ),
                script_tag: format!(
                    r#"<script src="{}" integrity="{}" crossorigin="anonymous"></script>"#,
                    BS5_JS, BS5_JS_SRI
                ),
            },
            signatures,
            unsupported,
            library: LibraryMarker {
                regex: Regex::new(r#"(?i)jquery[\w.\-]*\.js|\bjQuery\s*[(.]|\$\(\s*(document|window|['"])"#)?,
                message: "jQuery dependency detected - Bootstrap 5 doesn't require jQuery".into(),
                suggestion: "Consider replacing jQuery with native JavaScript".into(),
            },
        })
    }

    /// Replacement tokens for a class token, from exact entries or grid patterns.
    pub fn class_replacement(&self, token: &str) -> Option<Vec<String>> {
        if let Some(rep) = self.classes.get(token) {
            return Some(rep.iter().map(|s| s.to_string()).collect());
        }
        self.class_patterns.iter().find_map(|p| {
            p.regex.captures(token).map(|caps| {
                let mut out = String::new();
                caps.expand(&p.template, &mut out);
                out.split_whitespace().map(str::to_string).collect()
            })
        })
    }

    pub fn component_replacement(&self, token: &str) -> Option<Vec<String>> {
        self.components
            .get(token)
            .map(|rep| rep.iter().map(|s| s.to_string()).collect())
    }

    pub fn unsupported_class(&self, token: &str) -> Option<&UnsupportedClass> {
        self.unsupported.iter().find(|u| u.matcher.matches(token))
    }

    /// Whether `url` points at a known legacy hosting location.
    pub fn is_legacy_cdn(&self, url: &str) -> bool {
        self.cdn.legacy_prefixes.iter().any(|p| url.contains(p))
    }
}
