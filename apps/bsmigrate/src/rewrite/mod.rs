//! Pattern rewriter: ordered text substitutions per content kind.
//!
//! Stage order matters and follows `RuleCategory::ALL`:
//! 1. CDN references
//! 2. Dismissible header reordering
//! 3. `data-*` attribute renames
//! 4. Class tokens in class attributes
//! 5. Stylesheet selectors (stylesheets only)
//! 6. Navigation fixups and whole-component renames
//!
//! Earlier stages emit only current-version tokens, so later stages never
//! re-match their output. A stage that matches nothing is a no-op; the
//! rewriter has no failure mode.

pub mod attrs;
pub mod cdn;
pub mod classes;
pub mod header;
pub mod markup;
pub mod nav;

use crate::models::rules::{Categories, RuleCategory, RuleSet};
use crate::models::{ConversionOutcome, FileKind};
use header::{DismissibleHeader, StructuralRule};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct Rewriter {
    rules: Arc<RuleSet>,
    categories: Categories,
    cdn: cdn::CdnStage,
    header: Box<dyn StructuralRule>,
    attrs: attrs::AttributeStage,
    classes: classes::ClassStage,
    nav: nav::NavStage,
}

impl Rewriter {
    pub fn new(rules: Arc<RuleSet>, categories: Categories) -> Result<Self, regex::Error> {
        Ok(Rewriter {
            cdn: cdn::CdnStage::new()?,
            header: Box::new(DismissibleHeader::new()?),
            attrs: attrs::AttributeStage::new(&rules)?,
            classes: classes::ClassStage::new()?,
            nav: nav::NavStage::new()?,
            rules,
            categories,
        })
    }

    /// Replace the structural header rule, for example with a tree based one.
    pub fn with_header_rule(mut self, rule: Box<dyn StructuralRule>) -> Self {
        self.header = rule;
        self
    }

    /// Run every enabled stage for `kind` over `content`.
    pub fn rewrite(&self, content: &str, kind: FileKind) -> ConversionOutcome {
        let mut current = content.to_string();
        let mut total = 0usize;
        let mut by_category = BTreeMap::new();
        for cat in self.categories.for_kind(kind) {
            let (next, n) = self.run_stage(cat, &current);
            tracing::trace!(stage = cat.as_str(), hits = n, "stage done");
            if n > 0 {
                by_category.insert(cat.as_str().to_string(), n);
                total += n;
                current = next;
            }
        }
        ConversionOutcome {
            converted_content: current,
            change_count: total,
            changes_by_category: by_category,
        }
    }

    fn run_stage(&self, cat: RuleCategory, content: &str) -> (String, usize) {
        let rules = self.rules.as_ref();
        match cat {
            RuleCategory::Cdn => self.cdn.apply(content, rules),
            RuleCategory::ModalHeader => self.header.apply(content),
            RuleCategory::Attributes => self.attrs.apply(content),
            RuleCategory::Classes => self.classes.apply_markup(content, rules),
            RuleCategory::Stylesheet => self.classes.apply_stylesheet(content, rules),
            RuleCategory::Navigation => {
                let (renamed, a) = self.classes.apply_components(content, rules);
                let (fixed, b) = self.nav.apply(&renamed);
                (fixed, a + b)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> Rewriter {
        Rewriter::new(
            Arc::new(RuleSet::bootstrap3_to_5().unwrap()),
            Categories::all(),
        )
        .unwrap()
    }

    const PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <link rel="stylesheet" href="https://maxcdn.bootstrapcdn.com/bootstrap/3.3.7/css/bootstrap.min.css">
  <script src="https://maxcdn.bootstrapcdn.com/bootstrap/3.3.7/js/bootstrap.min.js"></script>
</head>
<body>
  <nav class="navbar navbar-default">
    <ul class="nav navbar-nav navbar-right">
      <li class="active"><a href="#">Home</a></li>
    </ul>
  </nav>
  <div class="container-fluid">
    <div class="col-xs-12 col-md-4 hidden-xs">
      <div class="panel panel-default">
        <div class="panel-body"><span class="label label-default">New</span></div>
      </div>
      <button class="btn btn-default btn-xs" data-toggle="modal" data-target="#m">View</button>
    </div>
  </div>
  <div class="modal fade" id="m">
    <div class="modal-dialog"><div class="modal-content">
      <div class="modal-header">
        <button type="button" class="close" data-dismiss="modal">&times;</button>
        <h4 class="modal-title">Title</h4>
      </div>
    </div></div>
  </div>
</body>
</html>"##;

    #[test]
    fn full_page_is_idempotent() {
        let rw = rewriter();
        let once = rw.rewrite(PAGE, FileKind::Markup);
        assert!(once.change_count > 0);
        let twice = rw.rewrite(&once.converted_content, FileKind::Markup);
        assert_eq!(twice.change_count, 0);
        assert_eq!(twice.converted_content, once.converted_content);
    }

    #[test]
    fn counts_sum_across_categories() {
        let out = rewriter().rewrite(PAGE, FileKind::Markup);
        let sum: usize = out.changes_by_category.values().sum();
        assert_eq!(sum, out.change_count);
        assert_eq!(out.changes_by_category.get("cdn"), Some(&2));
        assert_eq!(out.changes_by_category.get("modal-header"), Some(&4));
        assert_eq!(out.changes_by_category.get("attributes"), Some(&2));
    }

    #[test]
    fn modal_header_scenario() {
        let src = r#"<div class="modal-header"><button class="close" data-dismiss="modal">×</button><h4 class="modal-title">Title</h4></div>"#;
        let out = rewriter().rewrite(src, FileKind::Markup);
        assert!(out.change_count >= 3);
        let c = &out.converted_content;
        assert!(c.find("modal-title fs-5").unwrap() < c.find("btn-close").unwrap());
        assert!(c.contains(r#"data-bs-dismiss="modal""#));
        assert!(!c.contains("data-dismiss"));
    }

    #[test]
    fn stylesheet_only_runs_selector_stage() {
        let out = rewriter().rewrite(".well { margin: 0 }", FileKind::Stylesheet);
        assert_eq!(out.converted_content, ".card.card-body { margin: 0 }");
        assert_eq!(out.change_count, 1);
        let markup_in_css = rewriter().rewrite(r#"/* class="well" */"#, FileKind::Stylesheet);
        assert_eq!(markup_in_css.change_count, 0);
    }

    #[test]
    fn scripts_and_unknown_pass_through() {
        let src = "$('.panel').addClass('well'); <div class=\"well\">";
        for kind in [FileKind::Script, FileKind::Unknown] {
            let out = rewriter().rewrite(src, kind);
            assert_eq!(out.change_count, 0);
            assert_eq!(out.converted_content, src);
        }
    }

    #[test]
    fn disabled_category_is_skipped() {
        let rw = Rewriter::new(
            Arc::new(RuleSet::bootstrap3_to_5().unwrap()),
            Categories::all().without(RuleCategory::Attributes),
        )
        .unwrap();
        let out = rw.rewrite(r#"<a data-toggle="tab" class="btn-default"></a>"#, FileKind::Markup);
        assert!(out.converted_content.contains("data-toggle"));
        assert_eq!(out.change_count, 1);
    }

    struct NoHeader;

    impl StructuralRule for NoHeader {
        fn apply(&self, content: &str) -> (String, usize) {
            (content.to_string(), 0)
        }
        fn find_legacy(&self, _content: &str) -> Vec<usize> {
            Vec::new()
        }
    }

    #[test]
    fn header_rule_is_swappable() {
        let rw = rewriter().with_header_rule(Box::new(NoHeader));
        let src = r#"<div class="modal-header"><button class="close" data-dismiss="modal">×</button><h4 class="modal-title">Title</h4></div>"#;
        let out = rw.rewrite(src, FileKind::Markup);
        assert!(!out.changes_by_category.contains_key("modal-header"));
        assert_eq!(out.changes_by_category.get("attributes"), Some(&1));
        assert!(out.converted_content.find("<button").unwrap() < out.converted_content.find("<h4").unwrap());
    }

    #[test]
    fn single_rule_exact_count() {
        let src = "<p class=\"pull-right\">a</p>\n<p class=\"pull-right\">b</p>\n<p class=\"pull-right\">c</p>\n<p class=\"pull-right\">d</p>";
        let out = rewriter().rewrite(src, FileKind::TemplatedMarkup);
        assert_eq!(out.change_count, 4);
    }
}
