//! Text-level markup helpers shared by the rewrite stages.
//!
//! Nothing here parses markup into a tree. Class attributes are located with a
//! regex, split on whitespace, and reassembled only when a token changed.

use regex::{Captures, Regex};
use std::collections::HashSet;

/// Attribute names that carry class lists, including templating dialects
/// (`cssClass` for JSP form tags, `styleClass` for JSF, `className` for JSX).
pub const CLASS_ATTR_PATTERN: &str =
    r#"(\s(?:class|className|cssClass|styleClass)\s*=\s*)(?:"([^"]*)"|'([^']*)')"#;

/// Compiled matchers reused across stages.
pub struct ClassAttrs {
    re: Regex,
}

impl ClassAttrs {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(ClassAttrs {
            re: Regex::new(CLASS_ATTR_PATTERN)?,
        })
    }

    /// Rewrite every class attribute value through `f`, which returns the new
    /// value and its hit count, or `None` to leave the attribute untouched.
    pub fn rewrite<F>(&self, content: &str, mut f: F) -> (String, usize)
    where
        F: FnMut(&str) -> Option<(String, usize)>,
    {
        let mut count = 0usize;
        let out = self.re.replace_all(content, |caps: &Captures| {
            let (value, quote) = attr_value(caps);
            match f(value) {
                Some((new_value, n)) => {
                    count += n;
                    format!("{}{}{}{}", &caps[1], quote, new_value, quote)
                }
                None => caps[0].to_string(),
            }
        });
        (out.into_owned(), count)
    }

    /// Every class attribute value with the byte offset of its start.
    pub fn values<'a>(&self, content: &'a str) -> Vec<(usize, &'a str)> {
        self.re
            .captures_iter(content)
            .filter_map(|caps| {
                let m = caps.get(2).or_else(|| caps.get(3))?;
                Some((m.start(), m.as_str()))
            })
            .collect()
    }

    /// Class tokens of the first class attribute found in a tag's attribute text.
    pub fn tokens<'a>(&self, attrs: &'a str) -> Vec<&'a str> {
        self.re
            .captures(attrs)
            .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
            .map(|m| m.as_str().split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_token(&self, attrs: &str, token: &str) -> bool {
        self.tokens(attrs).contains(&token)
    }

    /// Return the tag attribute text with `token` added to its class list,
    /// inserting a class attribute when none exists. `None` when already present.
    pub fn ensure_token(&self, attrs: &str, token: &str) -> Option<String> {
        match self.re.captures(attrs) {
            Some(caps) => {
                let (value, quote) = attr_value(&caps);
                if value.split_whitespace().any(|t| t == token) {
                    return None;
                }
                let whole = caps.get(0)?;
                let new_value = if value.trim().is_empty() {
                    token.to_string()
                } else {
                    format!("{} {}", value.trim_end(), token)
                };
                Some(format!(
                    "{}{}{}{}{}{}",
                    &attrs[..whole.start()],
                    &caps[1],
                    quote,
                    new_value,
                    quote,
                    &attrs[whole.end()..]
                ))
            }
            None => Some(format!(" class=\"{}\"{}", token, attrs)),
        }
    }
}

fn attr_value<'c>(caps: &'c Captures) -> (&'c str, char) {
    match caps.get(2) {
        Some(m) => (m.as_str(), '"'),
        None => (caps.get(3).map(|m| m.as_str()).unwrap_or(""), '\''),
    }
}

/// Map the whitespace-separated tokens of a class value through `lookup`.
///
/// Each legacy token whose replacement changes the value counts once. Tokens
/// already present in the value are not emitted twice, so a mapping that keeps
/// its own token (`modal-title -> modal-title fs-5`) is stable on re-runs.
/// Returns `None` when nothing changed.
pub fn map_tokens<F>(value: &str, lookup: F) -> Option<(String, usize)>
where
    F: Fn(&str) -> Option<Vec<String>>,
{
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let mapped: Vec<Option<Vec<String>>> = tokens.iter().map(|t| lookup(t)).collect();
    if mapped.iter().all(Option::is_none) {
        return None;
    }
    let mut seen: HashSet<String> = tokens
        .iter()
        .zip(&mapped)
        .filter(|(_, m)| m.is_none())
        .map(|(t, _)| t.to_string())
        .collect();
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut count = 0usize;
    for (tok, rep) in tokens.iter().zip(mapped) {
        match rep {
            None => out.push(tok.to_string()),
            Some(rep) => {
                let emitted: Vec<String> =
                    rep.into_iter().filter(|r| seen.insert(r.clone())).collect();
                if emitted.len() != 1 || emitted[0] != *tok {
                    count += 1;
                }
                out.extend(emitted);
            }
        }
    }
    if count == 0 {
        return None;
    }
    Some((out.join(" "), count))
}

/// Scanner for the end of an element's block by counting nested same-name tags.
pub struct BlockScanner {
    tag: Regex,
}

impl BlockScanner {
    pub fn new(name: &str) -> Result<Self, regex::Error> {
        Ok(BlockScanner {
            tag: Regex::new(&format!(r"(?i)<(/?){}\b[^>]*>", regex::escape(name)))?,
        })
    }

    /// Given the offset just after an opening tag, return the byte range of the
    /// matching closing tag. Gives up past `limit` bytes or on unbalanced input.
    pub fn close_of(&self, content: &str, from: usize, limit: usize) -> Option<(usize, usize)> {
        let mut end = content.len().min(from.saturating_add(limit));
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        let window = content.get(from..end)?;
        let mut depth = 1usize;
        for m in self.tag.captures_iter(window) {
            let whole = m.get(0)?;
            let closing = m.get(1).map(|g| !g.as_str().is_empty()).unwrap_or(false);
            if closing {
                depth -= 1;
                if depth == 0 {
                    return Some((from + whole.start(), from + whole.end()));
                }
            } else if !whole.as_str().ends_with("/>") {
                depth += 1;
            }
        }
        None
    }

    /// Whether any opening tag of this element occurs in `text`.
    pub fn contains_open(&self, text: &str) -> bool {
        self.tag
            .captures_iter(text)
            .any(|c| c.get(1).map(|g| g.as_str().is_empty()).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(t: &str) -> Option<Vec<String>> {
        match t {
            "panel" => Some(vec!["card".into()]),
            "panel-primary" => Some(vec!["card".into(), "bg-primary".into()]),
            "modal-title" => Some(vec!["modal-title".into(), "fs-5".into()]),
            _ => None,
        }
    }

    #[test]
    fn map_tokens_counts_each_changed_token() {
        let (v, n) = map_tokens("panel panel-primary extra", lookup).unwrap();
        assert_eq!(v, "card bg-primary extra");
        assert_eq!(n, 2);
    }

    #[test]
    fn map_tokens_self_including_mapping_is_stable() {
        let (v, n) = map_tokens("modal-title", lookup).unwrap();
        assert_eq!(v, "modal-title fs-5");
        assert_eq!(n, 1);
        assert!(map_tokens(&v, lookup).is_none());
    }

    #[test]
    fn map_tokens_untouched_value() {
        assert!(map_tokens("panel-custom panels", lookup).is_none());
    }

    #[test]
    fn class_attrs_rewrite_keeps_quote_style() {
        let ca = ClassAttrs::new().unwrap();
        let (out, n) = ca.rewrite(r#"<div class='panel' id="x"></div>"#, |v| {
            map_tokens(v, lookup)
        });
        assert_eq!(out, r#"<div class='card' id="x"></div>"#);
        assert_eq!(n, 1);
    }

    #[test]
    fn class_attrs_ignores_data_class() {
        let ca = ClassAttrs::new().unwrap();
        let (out, n) = ca.rewrite(r#"<div data-class="panel"></div>"#, |v| {
            map_tokens(v, lookup)
        });
        assert_eq!(n, 0);
        assert!(out.contains("data-class=\"panel\""));
    }

    #[test]
    fn ensure_token_adds_or_inserts() {
        let ca = ClassAttrs::new().unwrap();
        assert_eq!(
            ca.ensure_token(r#" class="active""#, "nav-item").as_deref(),
            Some(r#" class="active nav-item""#)
        );
        assert_eq!(
            ca.ensure_token(r##" href="#""##, "nav-link").as_deref(),
            Some(r##" class="nav-link" href="#""##)
        );
        assert!(ca.ensure_token(r#" class="nav-link""#, "nav-link").is_none());
    }

    #[test]
    fn block_scanner_counts_nesting() {
        let sc = BlockScanner::new("ul").unwrap();
        let s = "<ul><li><ul><li>x</li></ul></li></ul>tail";
        let (start, end) = sc.close_of(s, 4, 1024).unwrap();
        assert_eq!(&s[start..end], "</ul>");
        assert_eq!(&s[end..], "tail");
    }

    #[test]
    fn block_scanner_gives_up_when_unbalanced() {
        let sc = BlockScanner::new("div").unwrap();
        assert!(sc.close_of("<div><div>never closed", 5, 1024).is_none());
    }
}
