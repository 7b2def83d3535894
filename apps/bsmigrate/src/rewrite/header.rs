//! Dismissible header reordering.
//!
//! Bootstrap 3 modal headers place the close control before the title:
//!
//! ```html
//! <div class="modal-header">
//!   <button type="button" class="close" data-dismiss="modal">&times;</button>
//!   <h4 class="modal-title">Title</h4>
//! </div>
//! ```
//!
//! Bootstrap 5 expects the title first and an icon-only `btn-close` button.
//! The rule is text based: the container is located by its opening tag and
//! its closing tag by depth counting within a bounded window. Containers that
//! hold another `<div>` are skipped; the detector reports them instead.

use crate::rewrite::markup::{BlockScanner, ClassAttrs};
use regex::Regex;

/// Bytes scanned after a container's opening tag looking for its end.
pub const MAX_HEADER_SCAN: usize = 4096;

const CONTAINER_CLASS: &str = "modal-header";
const TITLE_CLASS: &str = "modal-title";
const TITLE_SIZE_CLASS: &str = "fs-5";
const CLOSE_BUTTON: &str =
    r#"<button type="button" class="btn-close" data-bs-dismiss="modal" aria-label="Close"></button>"#;

/// A structural rewrite with its own change accounting. Implementations can be
/// swapped (for example for a tree based transformer) without touching the
/// rest of the pipeline.
pub trait StructuralRule: Send + Sync {
    /// Rewrite every eligible occurrence, returning the content and hit count.
    fn apply(&self, content: &str) -> (String, usize);

    /// Byte offsets of occurrences still in legacy order, including ones
    /// `apply` declines to touch.
    fn find_legacy(&self, content: &str) -> Vec<usize>;
}

struct Span {
    start: usize,
    end: usize,
}

/// The located parts of one legacy-ordered header.
struct Plan {
    button: Span,
    heading: Span,
    heading_level: String,
    heading_attrs: String,
    heading_body: String,
    legacy_dismiss: bool,
    legacy_close_class: bool,
}

pub struct DismissibleHeader {
    open: Regex,
    button: Regex,
    heading: Regex,
    dismiss: Regex,
    legacy_dismiss: Regex,
    divs: BlockScanner,
    classes: ClassAttrs,
}

impl DismissibleHeader {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(DismissibleHeader {
            open: Regex::new(r"(?i)<div\b([^>]*)>")?,
            button: Regex::new(r"(?is)<button\b([^>]*)>.*?</button\s*>")?,
            heading: Regex::new(r"(?is)<h([1-6])\b([^>]*)>(.*?)</h([1-6])\s*>")?,
            dismiss: Regex::new(r#"(?i)\bdata-(?:bs-)?dismiss\s*=\s*["']modal["']"#)?,
            legacy_dismiss: Regex::new(r#"(?i)\bdata-dismiss\s*="#)?,
            divs: BlockScanner::new("div")?,
            classes: ClassAttrs::new()?,
        })
    }

    /// Header containers as (open tag start, inner start, inner end).
    fn containers(&self, content: &str) -> Vec<(usize, usize, usize)> {
        self.open
            .captures_iter(content)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                if !self.classes.has_token(attrs, CONTAINER_CLASS) {
                    return None;
                }
                let (inner_end, _) = self.divs.close_of(content, whole.end(), MAX_HEADER_SCAN)?;
                Some((whole.start(), whole.end(), inner_end))
            })
            .collect()
    }

    /// Locate a dismiss button followed by a titled heading inside `inner`.
    fn plan(&self, inner: &str) -> Option<Plan> {
        let button = self.button.captures_iter(inner).find(|c| {
            c.get(1)
                .map(|a| self.dismiss.is_match(a.as_str()))
                .unwrap_or(false)
        })?;
        let button_whole = button.get(0)?;
        let button_attrs = button.get(1).map(|m| m.as_str()).unwrap_or("");

        let heading = self.heading.captures_iter(inner).find(|c| {
            let same_level = c.get(1).map(|m| m.as_str()) == c.get(4).map(|m| m.as_str());
            let attrs = c.get(2).map(|m| m.as_str()).unwrap_or("");
            same_level && self.classes.has_token(attrs, TITLE_CLASS)
        })?;
        let heading_whole = heading.get(0)?;
        if button_whole.end() > heading_whole.start() {
            return None;
        }

        Some(Plan {
            button: Span {
                start: button_whole.start(),
                end: button_whole.end(),
            },
            heading: Span {
                start: heading_whole.start(),
                end: heading_whole.end(),
            },
            heading_level: heading[1].to_string(),
            heading_attrs: heading[2].to_string(),
            heading_body: heading[3].to_string(),
            legacy_dismiss: self.legacy_dismiss.is_match(button_attrs),
            legacy_close_class: self.classes.has_token(button_attrs, "close"),
        })
    }

    fn rebuild(&self, inner: &str, plan: &Plan) -> (String, usize) {
        let mut changes = 1usize;
        let attrs = match self.classes.ensure_token(&plan.heading_attrs, TITLE_SIZE_CLASS) {
            Some(a) => {
                changes += 1;
                a
            }
            None => plan.heading_attrs.clone(),
        };
        if plan.legacy_close_class {
            changes += 1;
        }
        if plan.legacy_dismiss {
            changes += 1;
        }
        let mut out = String::with_capacity(inner.len() + CLOSE_BUTTON.len());
        out.push_str(&inner[..plan.button.start]);
        out.push_str(&format!(
            "<h{lvl}{attrs}>{body}</h{lvl}>",
            lvl = plan.heading_level,
            attrs = attrs,
            body = plan.heading_body
        ));
        out.push_str(&inner[plan.button.end..plan.heading.start]);
        out.push_str(CLOSE_BUTTON);
        out.push_str(&inner[plan.heading.end..]);
        (out, changes)
    }
}

impl StructuralRule for DismissibleHeader {
    fn apply(&self, content: &str) -> (String, usize) {
        let mut out = String::with_capacity(content.len());
        let mut last = 0usize;
        let mut count = 0usize;
        for (open_start, inner_start, inner_end) in self.containers(content) {
            if open_start < last {
                continue;
            }
            let inner = &content[inner_start..inner_end];
            if self.divs.contains_open(inner) {
                tracing::debug!(offset = open_start, "skipping header with nested container");
                continue;
            }
            let Some(plan) = self.plan(inner) else {
                continue;
            };
            let (rebuilt, n) = self.rebuild(inner, &plan);
            out.push_str(&content[last..inner_start]);
            out.push_str(&rebuilt);
            last = inner_end;
            count += n;
        }
        out.push_str(&content[last..]);
        (out, count)
    }

    fn find_legacy(&self, content: &str) -> Vec<usize> {
        let mut found = Vec::new();
        for caps in self.open.captures_iter(content) {
            let Some(whole) = caps.get(0) else { continue };
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if !self.classes.has_token(attrs, CONTAINER_CLASS) {
                continue;
            }
            // Unbalanced containers are scanned up to the bound.
            let inner_end = self
                .divs
                .close_of(content, whole.end(), MAX_HEADER_SCAN)
                .map(|(s, _)| s)
                .unwrap_or_else(|| {
                    let mut e = content.len().min(whole.end() + MAX_HEADER_SCAN);
                    while !content.is_char_boundary(e) {
                        e -= 1;
                    }
                    e
                });
            if self.plan(&content[whole.end()..inner_end]).is_some() {
                found.push(whole.start());
            }
        }
        found
    }
}
