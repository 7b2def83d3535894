//! CDN reference replacement.
//!
//! Legacy `<link>` and `<script>` tags whose URL matches a known hosting
//! prefix are replaced by the canonical Bootstrap 5 tags. The first tag of
//! each kind becomes the canonical reference; later ones (for example the old
//! theme stylesheet) are removed. Each touched tag counts once.

use crate::models::rules::RuleSet;
use regex::Regex;

#[derive(Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Stylesheet,
    Script,
}

pub struct CdnStage {
    link: Regex,
    script: Regex,
}

impl CdnStage {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(CdnStage {
            link: Regex::new(r"(?is)<link\b[^>]*>")?,
            script: Regex::new(r"(?is)<script\b[^>]*>\s*</script\s*>")?,
        })
    }

    pub fn apply(&self, content: &str, rules: &RuleSet) -> (String, usize) {
        let mut hits: Vec<(usize, usize, TagKind)> = Vec::new();
        for m in self.link.find_iter(content) {
            let tag = m.as_str();
            if rules.is_legacy_cdn(tag) && tag.to_ascii_lowercase().contains(".css") {
                hits.push((m.start(), m.end(), TagKind::Stylesheet));
            }
        }
        for m in self.script.find_iter(content) {
            let tag = m.as_str();
            if rules.is_legacy_cdn(tag) && tag.to_ascii_lowercase().contains(".js") {
                hits.push((m.start(), m.end(), TagKind::Script));
            }
        }
        if hits.is_empty() {
            return (content.to_string(), 0);
        }
        hits.sort_by_key(|h| h.0);

        let canonical_url = |kind: TagKind| match kind {
            TagKind::Stylesheet => "bootstrap@5.3.2/dist/css/bootstrap.min.css",
            TagKind::Script => "bootstrap@5.3.2/dist/js/bootstrap.bundle.min.js",
        };
        let mut css_done = content.contains(canonical_url(TagKind::Stylesheet));
        let mut js_done = content.contains(canonical_url(TagKind::Script));

        let mut out = String::with_capacity(content.len());
        let mut last = 0usize;
        for (start, end, kind) in &hits {
            let done = match kind {
                TagKind::Stylesheet => &mut css_done,
                TagKind::Script => &mut js_done,
            };
            if *done {
                let (s, e) = removal_span(content, *start, *end);
                out.push_str(&content[last..s.max(last)]);
                last = e;
            } else {
                out.push_str(&content[last..*start]);
                out.push_str(match kind {
                    TagKind::Stylesheet => &rules.cdn.stylesheet_tag,
                    TagKind::Script => &rules.cdn.script_tag,
                });
                last = *end;
                *done = true;
            }
        }
        out.push_str(&content[last..]);
        (out, hits.len())
    }
}

/// Extend a removed tag to its whole line when nothing else shares the line.
fn removal_span(content: &str, start: usize, end: usize) -> (usize, usize) {
    let line_start = content[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let before_blank = content[line_start..start].trim().is_empty();
    let rest = &content[end..];
    let after_len = if rest.starts_with("\r\n") {
        Some(2)
    } else if rest.starts_with('\n') {
        Some(1)
    } else {
        None
    };
    match after_len {
        Some(n) if before_blank => (line_start, end + n),
        _ => (start, end),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> (CdnStage, RuleSet) {
        (CdnStage::new().unwrap(), RuleSet::bootstrap3_to_5().unwrap())
    }

    #[test]
    fn replaces_stylesheet_and_script_separately() {
        let (st, rs) = stage();
        let src = r#"<head>
  <link rel="stylesheet" href="https://maxcdn.bootstrapcdn.com/bootstrap/3.3.7/css/bootstrap.min.css">
  <script src="https://maxcdn.bootstrapcdn.com/bootstrap/3.3.7/js/bootstrap.min.js"></script>
</head>"#;
        let (out, n) = st.apply(src, &rs);
        assert_eq!(n, 2);
        assert!(out.contains(&rs.cdn.stylesheet_tag));
        assert!(out.contains(&rs.cdn.script_tag));
        assert!(out.contains("integrity=\"sha384-"));
        assert!(!out.contains("maxcdn"));
    }

    #[test]
    fn theme_stylesheet_is_removed_after_first() {
        let (st, rs) = stage();
        let src = "<link rel=\"stylesheet\" href=\"https://maxcdn.bootstrapcdn.com/bootstrap/3.3.7/css/bootstrap.min.css\">\n  <link rel=\"stylesheet\" href=\"https://maxcdn.bootstrapcdn.com/bootstrap/3.3.7/css/bootstrap-theme.min.css\">\n<title>x</title>";
        let (out, n) = st.apply(src, &rs);
        assert_eq!(n, 2);
        assert_eq!(out.matches("bootstrap@5.3.2/dist/css").count(), 1);
        assert!(out.ends_with("<title>x</title>"));
        assert!(!out.contains("bootstrap-theme"));
    }

    #[test]
    fn leaves_unrelated_and_current_references() {
        let (st, rs) = stage();
        let src = r#"<script src="https://ajax.googleapis.com/ajax/libs/jquery/3.2.1/jquery.min.js"></script>"#;
        let (out, n) = st.apply(src, &rs);
        assert_eq!(n, 0);
        assert_eq!(out, src);
        let (again, n2) = st.apply(&rs.cdn.stylesheet_tag, &rs);
        assert_eq!(n2, 0);
        assert_eq!(again, rs.cdn.stylesheet_tag);
    }
}
