//! Best-effort navigation fixups.
//!
//! Inside `ul.nav` / `ul.navbar-nav` lists, top-level `<li>` elements get
//! `nav-item` and top-level anchors get `nav-link`. Anchors inside a nested
//! `ul.dropdown-menu` get `dropdown-item`. Other nested lists are left alone.
//! Lists whose end cannot be found within the scan window are skipped.

use crate::rewrite::markup::{BlockScanner, ClassAttrs};
use regex::{Captures, Regex};

const MAX_NAV_SCAN: usize = 64 * 1024;

pub struct NavStage {
    list_open: Regex,
    item_or_link: Regex,
    link: Regex,
    lists: BlockScanner,
    classes: ClassAttrs,
}

impl NavStage {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(NavStage {
            list_open: Regex::new(r"(?i)<ul\b([^>]*)>")?,
            item_or_link: Regex::new(r"(?i)<(li|a)\b([^>]*)>")?,
            link: Regex::new(r"(?i)<a\b([^>]*)>")?,
            lists: BlockScanner::new("ul")?,
            classes: ClassAttrs::new()?,
        })
    }

    fn is_nav_list(&self, attrs: &str) -> bool {
        let tokens = self.classes.tokens(attrs);
        tokens.contains(&"nav") || tokens.contains(&"navbar-nav")
    }

    pub fn apply(&self, content: &str) -> (String, usize) {
        let mut out = String::with_capacity(content.len());
        let mut last = 0usize;
        let mut count = 0usize;
        for caps in self.list_open.captures_iter(content) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() < last {
                continue;
            }
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if !self.is_nav_list(attrs) {
                continue;
            }
            let Some((inner_end, _)) = self.lists.close_of(content, whole.end(), MAX_NAV_SCAN)
            else {
                continue;
            };
            let (inner, n) = self.fix_list(&content[whole.end()..inner_end]);
            out.push_str(&content[last..whole.end()]);
            out.push_str(&inner);
            last = inner_end;
            count += n;
        }
        out.push_str(&content[last..]);
        (out, count)
    }

    /// Fix the direct children of a nav list, descending only into dropdown menus.
    fn fix_list(&self, inner: &str) -> (String, usize) {
        let mut out = String::with_capacity(inner.len());
        let mut count = 0usize;
        let mut pos = 0usize;
        while pos < inner.len() {
            let Some(nested) = self.list_open.captures_at(inner, pos) else {
                break;
            };
            let Some(open) = nested.get(0) else { break };
            let (seg, n) = self.fix_items(&inner[pos..open.start()]);
            out.push_str(&seg);
            count += n;
            out.push_str(open.as_str());

            let Some((nested_end, _)) = self.lists.close_of(inner, open.end(), MAX_NAV_SCAN)
            else {
                out.push_str(&inner[open.end()..]);
                return (out, count);
            };
            let nested_attrs = nested.get(1).map(|m| m.as_str()).unwrap_or("");
            let body = &inner[open.end()..nested_end];
            if self.classes.has_token(nested_attrs, "dropdown-menu") {
                let (fixed, n) = self.fix_dropdown(body);
                out.push_str(&fixed);
                count += n;
            } else {
                out.push_str(body);
            }
            pos = nested_end;
        }
        if pos < inner.len() {
            let (seg, n) = self.fix_items(&inner[pos..]);
            out.push_str(&seg);
            count += n;
        }
        (out, count)
    }

    fn fix_items(&self, segment: &str) -> (String, usize) {
        let mut count = 0usize;
        let out = self.item_or_link.replace_all(segment, |caps: &Captures| {
            let token = if caps[1].eq_ignore_ascii_case("li") {
                "nav-item"
            } else {
                "nav-link"
            };
            match self.classes.ensure_token(&caps[2], token) {
                Some(attrs) => {
                    count += 1;
                    format!("<{}{}>", &caps[1], attrs)
                }
                None => caps[0].to_string(),
            }
        });
        (out.into_owned(), count)
    }

    fn fix_dropdown(&self, body: &str) -> (String, usize) {
        let mut count = 0usize;
        let out = self.link.replace_all(body, |caps: &Captures| {
            match self.classes.ensure_token(&caps[1], "dropdown-item") {
                Some(attrs) => {
                    count += 1;
                    format!("<a{}>", attrs)
                }
                None => caps[0].to_string(),
            }
        });
        (out.into_owned(), count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_item_and_link_classes() {
        let src = r##"<ul class="nav navbar-nav"><li class="active"><a href="#">Home</a></li><li><a href="/about">About</a></li></ul>"##;
        let (out, n) = NavStage::new().unwrap().apply(src);
        assert_eq!(
            out,
            r##"<ul class="nav navbar-nav"><li class="active nav-item"><a class="nav-link" href="#">Home</a></li><li class="nav-item"><a class="nav-link" href="/about">About</a></li></ul>"##
        );
        assert_eq!(n, 4);
    }

    #[test]
    fn dropdown_menus_get_dropdown_items() {
        let src = r##"<ul class="nav"><li class="dropdown"><a class="dropdown-toggle" href="#">More</a><ul class="dropdown-menu"><li><a href="/x">X</a></li></ul></li></ul>"##;
        let (out, n) = NavStage::new().unwrap().apply(src);
        assert!(out.contains(r##"<li class="dropdown nav-item"><a class="dropdown-toggle nav-link" href="#">"##));
        assert!(out.contains(r#"<ul class="dropdown-menu"><li><a class="dropdown-item" href="/x">X</a></li></ul>"#));
        assert_eq!(n, 3);
    }

    #[test]
    fn non_nav_lists_untouched_and_idempotent() {
        let st = NavStage::new().unwrap();
        let src = r#"<ul class="list-unstyled"><li><a href="/">x</a></li></ul>"#;
        let (out, n) = st.apply(src);
        assert_eq!(n, 0);
        assert_eq!(out, src);

        let nav = r#"<ul class="nav nav-tabs"><li><a href="/">x</a></li></ul>"#;
        let (once, _) = st.apply(nav);
        let (twice, n2) = st.apply(&once);
        assert_eq!(n2, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn unclosed_nav_list_is_skipped() {
        let src = r#"<ul class="nav"><li><a href="/">x</a></li>"#;
        let (out, n) = NavStage::new().unwrap().apply(src);
        assert_eq!(n, 0);
        assert_eq!(out, src);
    }
}
