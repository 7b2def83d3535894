//! Issue detector.
//!
//! Line checks run over the original content so reported lines always refer
//! to the source layout. Whole-document checks (scripting library reference,
//! uncorrected dismissible headers, classes with no automatic treatment) emit
//! at most one issue each per file.

use crate::models::rules::{Categories, RuleSet};
use crate::models::{FileKind, Issue, IssueCategory, Severity};
use crate::rewrite::header::{DismissibleHeader, StructuralRule};
use crate::rewrite::markup::ClassAttrs;
use crate::utils::line_at;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

const HEADER_MESSAGE: &str =
    "Modal header has close button before title - Bootstrap 5 places the title first";
const HEADER_SUGGESTION: &str =
    "Move the .modal-title heading before the close button and use .btn-close";

pub struct Detector {
    rules: Arc<RuleSet>,
    categories: Categories,
    header: Box<dyn StructuralRule>,
    classes: ClassAttrs,
    selector: Regex,
}

impl Detector {
    pub fn new(rules: Arc<RuleSet>, categories: Categories) -> Result<Self, regex::Error> {
        Ok(Detector {
            rules,
            categories,
            header: Box::new(DismissibleHeader::new()?),
            classes: ClassAttrs::new()?,
            selector: Regex::new(r"\.(-?[_a-zA-Z][_a-zA-Z0-9-]*)")?,
        })
    }

    pub fn with_header_rule(mut self, rule: Box<dyn StructuralRule>) -> Self {
        self.header = rule;
        self
    }

    /// Detect issues in `original`. `converted` is the rewriter's output for
    /// the same file, used to tell which headers and attributes were left in
    /// legacy form; pass `None` when nothing was rewritten.
    pub fn detect(&self, original: &str, converted: Option<&str>, kind: FileKind) -> Vec<Issue> {
        let mut issues = Vec::new();
        match kind {
            FileKind::Unknown => return issues,
            FileKind::Stylesheet => {
                self.unsupported_in_selectors(original, &mut issues);
                return issues;
            }
            _ => {}
        }

        let converted = converted.unwrap_or(original);
        self.library_reference(original, &mut issues);
        self.line_signatures(original, converted, kind, &mut issues);
        if kind.is_markup() {
            self.uncorrected_header(original, converted, &mut issues);
            self.unsupported_in_markup(original, &mut issues);
        }
        issues
    }

    /// A signature its stage resolves is skipped only when that stage left no
    /// match behind in `converted`.
    fn line_signatures(
        &self,
        original: &str,
        converted: &str,
        kind: FileKind,
        issues: &mut Vec<Issue>,
    ) {
        let active: Vec<_> = self
            .rules
            .signatures
            .iter()
            .filter(|sig| {
                let resolved = sig
                    .fixed_by
                    .is_some_and(|c| self.categories.is_enabled(c) && c.applies_to(kind));
                !resolved || sig.regex.is_match(converted)
            })
            .collect();
        for (idx, line) in original.lines().enumerate() {
            for sig in active.iter().filter(|s| s.regex.is_match(line)) {
                issues.push(
                    Issue::new(sig.category, sig.severity, sig.message.clone())
                        .at_line(idx + 1)
                        .with_suggestion(sig.suggestion.clone()),
                );
            }
        }
    }

    fn library_reference(&self, original: &str, issues: &mut Vec<Issue>) {
        let lib = &self.rules.library;
        if let Some(m) = lib.regex.find(original) {
            issues.push(
                Issue::new(IssueCategory::Javascript, Severity::Warning, lib.message.clone())
                    .at_line(line_at(original, m.start()))
                    .with_suggestion(lib.suggestion.clone()),
            );
        }
    }

    fn uncorrected_header(&self, original: &str, converted: &str, issues: &mut Vec<Issue>) {
        if self.header.find_legacy(converted).is_empty() {
            return;
        }
        let mut issue = Issue::new(IssueCategory::Structure, Severity::Warning, HEADER_MESSAGE)
            .with_suggestion(HEADER_SUGGESTION);
        if let Some(offset) = self.header.find_legacy(original).first() {
            issue = issue.at_line(line_at(original, *offset));
        }
        issues.push(issue);
    }

    fn unsupported_in_markup(&self, original: &str, issues: &mut Vec<Issue>) {
        let mut seen = BTreeSet::new();
        for (offset, value) in self.classes.values(original) {
            for token in value.split_whitespace() {
                self.report_unsupported(token, line_at(original, offset), &mut seen, issues);
            }
        }
    }

    fn unsupported_in_selectors(&self, original: &str, issues: &mut Vec<Issue>) {
        let mut seen = BTreeSet::new();
        for caps in self.selector.captures_iter(original) {
            let Some(name) = caps.get(1) else { continue };
            let line = line_at(original, name.start());
            self.report_unsupported(name.as_str(), line, &mut seen, issues);
        }
    }

    /// One issue per unsupported entry per file, at its first occurrence.
    fn report_unsupported(
        &self,
        token: &str,
        line: usize,
        seen: &mut BTreeSet<String>,
        issues: &mut Vec<Issue>,
    ) {
        let Some(entry) = self.rules.unsupported_class(token) else {
            return;
        };
        if !seen.insert(entry.message.clone()) {
            return;
        }
        issues.push(
            Issue::new(
                IssueCategory::Class,
                Severity::Warning,
                format!("{} ('{}')", entry.message, token),
            )
            .at_line(line)
            .with_suggestion(entry.suggestion.clone()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rules::RuleCategory;
    use crate::rewrite::Rewriter;

    fn detector(categories: Categories) -> Detector {
        Detector::new(Arc::new(RuleSet::bootstrap3_to_5().unwrap()), categories).unwrap()
    }

    #[test]
    fn script_lines_are_indexed_from_one() {
        let src = "// boot\n$('.dropdown-toggle').dropdown();\n\n$('#m').modal('show');\n";
        let issues = detector(Categories::all()).detect(src, None, FileKind::Script);
        let lines: Vec<_> = issues
            .iter()
            .filter(|i| i.category == IssueCategory::Javascript)
            .filter_map(|i| i.line)
            .collect();
        assert!(lines.contains(&2));
        assert!(lines.contains(&4));
        assert!(lines.iter().all(|l| *l >= 1 && *l <= 4));
    }

    #[test]
    fn one_line_may_produce_several_issues() {
        let src = r#"$('[data-toggle="tooltip"]').tooltip();"#;
        let issues = detector(Categories::all()).detect(src, None, FileKind::Script);
        let on_first: Vec<_> = issues.iter().filter(|i| i.line == Some(1)).collect();
        assert!(on_first.len() >= 2);
    }

    #[test]
    fn library_reference_flagged_once() {
        let src = "<script src=\"js/jquery-1.12.4.min.js\"></script>\n<script>\n$(document).ready(function(){});\n$(document).on('x', f);\n</script>";
        let issues = detector(Categories::all()).detect(src, None, FileKind::Markup);
        let lib: Vec<_> = issues
            .iter()
            .filter(|i| i.message.contains("jQuery dependency"))
            .collect();
        assert_eq!(lib.len(), 1);
        assert_eq!(lib[0].line, Some(1));
    }

    #[test]
    fn rewritten_attributes_not_reported_in_markup() {
        let src = r##"<button data-toggle="modal" data-target="#m">x</button>"##;
        let rw = Rewriter::new(
            Arc::new(RuleSet::bootstrap3_to_5().unwrap()),
            Categories::all(),
        )
        .unwrap();
        let out = rw.rewrite(src, FileKind::Markup);
        let all = detector(Categories::all()).detect(
            src,
            Some(&out.converted_content),
            FileKind::Markup,
        );
        assert!(all.is_empty(), "{all:?}");

        let untouched = detector(Categories::all()).detect(src, None, FileKind::Markup);
        assert_eq!(untouched.len(), 2);

        let disabled = detector(Categories::all().without(RuleCategory::Attributes))
            .detect(src, None, FileKind::Markup);
        assert!(!disabled.is_empty());

        let script = detector(Categories::all()).detect(src, None, FileKind::Script);
        assert!(!script.is_empty());
    }

    #[test]
    fn corrected_header_is_not_reported() {
        let src = "<div class=\"modal-header\">\n<button class=\"close\" data-dismiss=\"modal\">×</button>\n<h4 class=\"modal-title\">Title</h4>\n</div>";
        let rules = Arc::new(RuleSet::bootstrap3_to_5().unwrap());
        let rw = Rewriter::new(rules.clone(), Categories::all()).unwrap();
        let out = rw.rewrite(src, FileKind::Markup);
        let det = Detector::new(rules, Categories::all()).unwrap();
        let issues = det.detect(src, Some(&out.converted_content), FileKind::Markup);
        assert!(issues.iter().all(|i| i.category != IssueCategory::Structure));

        let untouched = det.detect(src, None, FileKind::Markup);
        let header: Vec<_> = untouched
            .iter()
            .filter(|i| i.category == IssueCategory::Structure)
            .collect();
        assert_eq!(header.len(), 1);
        assert_eq!(header[0].line, Some(1));
    }

    #[test]
    fn nested_header_reported_as_uncorrected() {
        let src = r#"<div class="modal-header"><div class="wrap"><button class="close" data-dismiss="modal">x</button></div><h4 class="modal-title">T</h4></div>"#;
        let rules = Arc::new(RuleSet::bootstrap3_to_5().unwrap());
        let rw = Rewriter::new(rules.clone(), Categories::all()).unwrap();
        let out = rw.rewrite(src, FileKind::Markup);
        let issues = Detector::new(rules, Categories::all()).unwrap().detect(
            src,
            Some(&out.converted_content),
            FileKind::Markup,
        );
        assert!(issues.iter().any(|i| i.category == IssueCategory::Structure));
    }

    #[test]
    fn attributes_left_in_converted_output_are_reported() {
        let src = "<a data-toggle=\"modal\">x</a>\n<script>\nfind(\"(data-toggle=modal)\");\n</script>";
        let converted = "<a data-bs-toggle=\"modal\">x</a>\n<script>\nfind(\"(data-toggle=modal)\");\n</script>";
        let issues = detector(Categories::all()).detect(src, Some(converted), FileKind::Markup);
        let lines: Vec<_> = issues
            .iter()
            .filter(|i| i.message.starts_with("data-toggle attribute"))
            .filter_map(|i| i.line)
            .collect();
        assert_eq!(lines, [1, 3]);
    }

    struct NeverLegacy;

    impl StructuralRule for NeverLegacy {
        fn apply(&self, content: &str) -> (String, usize) {
            (content.to_string(), 0)
        }
        fn find_legacy(&self, _content: &str) -> Vec<usize> {
            Vec::new()
        }
    }

    #[test]
    fn header_check_uses_injected_rule() {
        let src = r#"<div class="modal-header"><button class="close" data-dismiss="modal">x</button><h4 class="modal-title">T</h4></div>"#;
        let issues = detector(Categories::all())
            .with_header_rule(Box::new(NeverLegacy))
            .detect(src, None, FileKind::Markup);
        assert!(issues.iter().all(|i| i.category != IssueCategory::Structure));
    }

    #[test]
    fn unsupported_classes_once_per_entry() {
        let src = "<span class=\"glyphicon glyphicon-user\"></span>\n<span class=\"glyphicon glyphicon-star\"></span>\n<div class=\"page-header\"></div>";
        let issues = detector(Categories::all()).detect(src, None, FileKind::Markup);
        let class: Vec<_> = issues
            .iter()
            .filter(|i| i.category == IssueCategory::Class)
            .collect();
        assert_eq!(class.len(), 2);
        assert_eq!(class[0].line, Some(1));
        assert_eq!(class[1].line, Some(3));
    }

    #[test]
    fn stylesheet_selectors_checked() {
        let src = ".btn { }\n.media-body img { }\n";
        let issues = detector(Categories::all()).detect(src, None, FileKind::Stylesheet);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, Some(2));
    }

    #[test]
    fn unknown_kind_has_no_issues() {
        let issues =
            detector(Categories::all()).detect("$.fn.modal = 1", None, FileKind::Unknown);
        assert!(issues.is_empty());
    }
}
