//! Class token replacement in markup attributes and stylesheet selectors.

use crate::models::rules::RuleSet;
use crate::rewrite::markup::{map_tokens, ClassAttrs};
use regex::{Captures, Regex};

pub struct ClassStage {
    attrs: ClassAttrs,
    selector: Regex,
}

impl ClassStage {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(ClassStage {
            attrs: ClassAttrs::new()?,
            selector: Regex::new(r"\.(-?[_a-zA-Z][_a-zA-Z0-9-]*)")?,
        })
    }

    /// Replace legacy tokens inside class attribute values.
    pub fn apply_markup(&self, content: &str, rules: &RuleSet) -> (String, usize) {
        self.attrs
            .rewrite(content, |value| map_tokens(value, |t| rules.class_replacement(t)))
    }

    /// Replace whole-component classes (navbar schemes, nav variants, menu
    /// alignment) inside class attribute values.
    pub fn apply_components(&self, content: &str, rules: &RuleSet) -> (String, usize) {
        self.attrs.rewrite(content, |value| {
            map_tokens(value, |t| rules.component_replacement(t))
        })
    }

    /// Replace `.token` class selectors. Multi-token mappings become compound
    /// selectors (`.well` to `.card.card-body`). Mappings that keep their own
    /// token are skipped in selectors since the compound would narrow the rule.
    pub fn apply_stylesheet(&self, content: &str, rules: &RuleSet) -> (String, usize) {
        let mut count = 0usize;
        let out = self.selector.replace_all(content, |caps: &Captures| {
            let name = &caps[1];
            let rep = rules
                .class_replacement(name)
                .or_else(|| rules.component_replacement(name));
            match rep {
                Some(rep) if !rep.iter().any(|t| t == name) => {
                    count += 1;
                    format!(".{}", rep.join("."))
                }
                _ => caps[0].to_string(),
            }
        });
        (out.into_owned(), count)
    }
}
