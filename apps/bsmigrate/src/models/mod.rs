//! Shared data models for conversion outcomes, issues, and project summaries.

pub mod rules;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
/// Content kind derived from a file name.
pub enum FileKind {
    Markup,
    Stylesheet,
    Script,
    TemplatedMarkup,
    Unknown,
}

impl FileKind {
    /// Markup and templated markup share every markup rule.
    pub fn is_markup(self) -> bool {
        matches!(self, FileKind::Markup | FileKind::TemplatedMarkup)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Markup => "markup",
            FileKind::Stylesheet => "stylesheet",
            FileKind::Script => "script",
            FileKind::TemplatedMarkup => "templated-markup",
            FileKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
/// Warning family; deduplication keys on (category, message).
pub enum IssueCategory {
    Class,
    Javascript,
    Structure,
    /// Project-level notes that belong to no single file.
    General,
}

impl IssueCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCategory::Class => "class",
            IssueCategory::Javascript => "javascript",
            IssueCategory::Structure => "structure",
            IssueCategory::General => "general",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// A single diagnostic. `line` is 1-based against the original content.
pub struct Issue {
    #[serde(rename = "type")]
    pub category: IssueCategory,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Issue {
    pub fn new(category: IssueCategory, severity: Severity, message: impl Into<String>) -> Self {
        Issue {
            category,
            severity,
            message: message.into(),
            file: None,
            line: None,
            suggestion: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Result of rewriting one file.
pub struct ConversionOutcome {
    pub converted_content: String,
    pub change_count: usize,
    /// Per rule category hit counts; sums to `change_count`.
    pub changes_by_category: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
/// Which path produced a file's converted content. A failed external
/// attempt that fell back to local rewriting reports `Local`.
pub enum ConversionPath {
    Local,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Per-file projection embedded in the project summary.
pub struct FileSummary {
    pub file_name: String,
    pub file_type: String,
    pub kind: FileKind,
    pub changes_count: usize,
    pub changes_by_category: BTreeMap<String, usize>,
    pub js_issues: usize,
    pub conversion: ConversionPath,
    pub warnings: Vec<Issue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
/// Distinguishes a full run from one cut short by cancellation.
pub enum RunStatus {
    Complete,
    Partial { completed: usize, skipped: usize },
}

impl RunStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, RunStatus::Complete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Project-level report; recomputed from scratch on every run.
pub struct ProjectSummary {
    pub status: RunStatus,
    pub total_files: usize,
    pub modified_files: usize,
    pub tokens_replaced: usize,
    pub script_issues_found: usize,
    pub manual_fixes_needed: usize,
    pub warnings: Vec<Issue>,
    pub file_summaries: Vec<FileSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_serializes_category_as_type_and_skips_missing_fields() {
        let is = Issue::new(IssueCategory::Javascript, Severity::Warning, "msg").at_line(3);
        let v = serde_json::to_value(&is).unwrap();
        assert_eq!(v["type"], "javascript");
        assert_eq!(v["severity"], "warning");
        assert_eq!(v["line"], 3);
        assert!(v.get("file").is_none());
        assert!(v.get("suggestion").is_none());
    }

    #[test]
    fn run_status_shape() {
        let v = serde_json::to_value(RunStatus::Partial {
            completed: 2,
            skipped: 1,
        })
        .unwrap();
        assert_eq!(v["state"], "partial");
        assert_eq!(v["skipped"], 1);
        assert!(RunStatus::Complete.is_complete());
    }

    #[test]
    fn markup_kinds() {
        assert!(FileKind::Markup.is_markup());
        assert!(FileKind::TemplatedMarkup.is_markup());
        assert!(!FileKind::Stylesheet.is_markup());
        assert_eq!(FileKind::TemplatedMarkup.to_string(), "templated-markup");
    }
}
