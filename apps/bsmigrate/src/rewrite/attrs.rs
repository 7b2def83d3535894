//! `data-*` attribute renames (`data-toggle` to `data-bs-toggle`, ...).

use crate::models::rules::RuleSet;
use regex::{Captures, Regex};
use std::collections::HashMap;

pub struct AttributeStage {
    re: Regex,
    renames: HashMap<String, String>,
}

impl AttributeStage {
    pub fn new(rules: &RuleSet) -> Result<Self, regex::Error> {
        let mut names: Vec<&str> = rules.attributes.iter().map(|(k, _)| *k).collect();
        // Longest first so `data-slide-to` wins over `data-slide`.
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        let alternation = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        // `[` covers attribute selectors in inline scripts.
        let re = Regex::new(&format!(r#"(^|[\s"'\[])({})(\s*=)"#, alternation))?;
        let renames = rules
            .attributes
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Ok(AttributeStage { re, renames })
    }

    pub fn apply(&self, content: &str) -> (String, usize) {
        let mut count = 0usize;
        let out = self.re.replace_all(content, |caps: &Captures| {
            match self.renames.get(&caps[2]) {
                Some(new_name) => {
                    count += 1;
                    format!("{}{}{}", &caps[1], new_name, &caps[3])
                }
                None => caps[0].to_string(),
            }
        });
        (out.into_owned(), count)
    }
}
