//! Migration engine: classify, rewrite, detect and aggregate a file set.
//!
//! Files are processed in parallel with no shared mutable state. Results are
//! reordered by submission index before aggregation. Cancellation is checked
//! before each file starts; files already in progress complete.

use crate::aggregate::{aggregate, FileRecord};
use crate::classify::classify;
use crate::detect::Detector;
use crate::errors::{AggregateError, StrategyError};
use crate::models::rules::{Categories, RuleSet};
use crate::models::{ConversionOutcome, ConversionPath, FileKind, Issue, ProjectSummary, RunStatus};
use crate::rewrite::Rewriter;
use crate::strategy::{ConversionStrategy, Operation};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decoded input text keyed by a caller-chosen file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub name: String,
    pub content: String,
}

impl InputFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        InputFile {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Cooperative cancellation shared between a run and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedFile {
    pub file_name: String,
    pub converted_content: String,
    /// Content differs from the input.
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRun {
    pub summary: ProjectSummary,
    pub converted: Vec<ConvertedFile>,
}

/// Answer to an analyze or suggest request for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub file_name: String,
    pub text: String,
    pub source: ConversionPath,
    /// Why the external strategy was not used, when it was configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

pub struct Engine {
    rules: Arc<RuleSet>,
    categories: Categories,
    rewriter: Rewriter,
    detector: Detector,
    strategy: Option<Box<dyn ConversionStrategy>>,
}

impl Engine {
    pub fn new(rules: Arc<RuleSet>, categories: Categories) -> Result<Self, regex::Error> {
        Ok(Engine {
            rewriter: Rewriter::new(rules.clone(), categories)?,
            detector: Detector::new(rules.clone(), categories)?,
            rules,
            categories,
            strategy: None,
        })
    }

    pub fn with_strategy(mut self, strategy: Box<dyn ConversionStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    /// Process every input and aggregate. A cancelled run yields a partial
    /// summary over the files that completed.
    pub fn run(
        &self,
        inputs: &[InputFile],
        cancel: &CancelToken,
    ) -> Result<MigrationRun, AggregateError> {
        let processed: Vec<Option<FileRecord>> = inputs
            .par_iter()
            .enumerate()
            .map(|(index, input)| {
                if cancel.is_cancelled() {
                    None
                } else {
                    Some(self.process_file(index, input))
                }
            })
            .collect();

        let skipped = processed.iter().filter(|r| r.is_none()).count();
        let records: Vec<FileRecord> = processed.into_iter().flatten().collect();
        let status = if skipped == 0 {
            RunStatus::Complete
        } else {
            RunStatus::Partial {
                completed: records.len(),
                skipped,
            }
        };

        let converted = records
            .iter()
            .filter_map(|rec| {
                let outcome = rec.outcome.as_ref()?;
                Some(ConvertedFile {
                    file_name: rec.name.clone(),
                    changed: outcome.converted_content != inputs[rec.index].content,
                    converted_content: outcome.converted_content.clone(),
                })
            })
            .collect();

        let summary = aggregate(records, status, &self.categories)?;
        tracing::info!(
            files = summary.total_files,
            tokens = summary.tokens_replaced,
            issues = summary.script_issues_found,
            complete = summary.status.is_complete(),
            "run finished"
        );
        Ok(MigrationRun { summary, converted })
    }

    /// Full pipeline for one file. Detection always runs locally on the
    /// original content.
    pub fn process_file(&self, index: usize, input: &InputFile) -> FileRecord {
        let kind = classify(&input.name);
        tracing::debug!(file = %input.name, kind = kind.as_str(), "processing");

        let mut conversion = ConversionPath::Local;
        let mut external_failed = false;
        let outcome = match self.external_convert(input, kind) {
            Some(Ok(outcome)) => {
                conversion = ConversionPath::External;
                outcome
            }
            Some(Err(err)) => {
                tracing::warn!(file = %input.name, error = %err, "external conversion failed, using local rules");
                external_failed = true;
                self.rewriter.rewrite(&input.content, kind)
            }
            None => self.rewriter.rewrite(&input.content, kind),
        };
        let issues = self.detector.detect(
            &input.content,
            Some(outcome.converted_content.as_str()),
            kind,
        );

        FileRecord {
            index,
            name: input.name.clone(),
            kind,
            outcome: Some(outcome),
            issues: Some(issues),
            conversion,
            external_failed,
        }
    }

    fn external_convert(
        &self,
        input: &InputFile,
        kind: FileKind,
    ) -> Option<Result<ConversionOutcome, StrategyError>> {
        let strategy = self.strategy.as_ref()?;
        if !kind.is_markup() {
            return None;
        }
        tracing::debug!(file = %input.name, via = strategy.name(), "external conversion");
        let result = strategy
            .invoke(&input.content, Operation::Convert)
            .and_then(|text| {
                if text.trim().is_empty() {
                    Err(StrategyError::MalformedResponse("empty conversion".into()))
                } else {
                    Ok(text)
                }
            })
            .map(|text| {
                let n = changed_lines(&input.content, &text);
                let mut by_category = BTreeMap::new();
                if n > 0 {
                    by_category.insert("external".to_string(), n);
                }
                ConversionOutcome {
                    converted_content: text,
                    change_count: n,
                    changes_by_category: by_category,
                }
            });
        Some(result)
    }

    /// Ask the strategy to analyze or suggest; fall back to a report built
    /// from local detection.
    pub fn consult(&self, input: &InputFile, op: Operation) -> Consultation {
        let mut fallback_reason = None;
        if let Some(strategy) = self.strategy.as_ref() {
            match strategy.invoke(&input.content, op) {
                Ok(text) if !text.trim().is_empty() => {
                    return Consultation {
                        file_name: input.name.clone(),
                        text,
                        source: ConversionPath::External,
                        fallback_reason: None,
                    };
                }
                Ok(_) => fallback_reason = Some("empty response".to_string()),
                Err(err) => {
                    tracing::warn!(file = %input.name, op = op.as_str(), error = %err, "external strategy failed");
                    fallback_reason = Some(err.to_string());
                }
            }
        }
        let kind = classify(&input.name);
        let outcome = self.rewriter.rewrite(&input.content, kind);
        let issues = self
            .detector
            .detect(&input.content, Some(&outcome.converted_content), kind);
        Consultation {
            file_name: input.name.clone(),
            text: local_report(&outcome, &issues),
            source: ConversionPath::Local,
            fallback_reason,
        }
    }
}

fn local_report(outcome: &ConversionOutcome, issues: &[Issue]) -> String {
    let mut lines = Vec::new();
    if outcome.change_count > 0 {
        let parts: Vec<String> = outcome
            .changes_by_category
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        lines.push(format!(
            "{} automatic change(s) available ({})",
            outcome.change_count,
            parts.join(", ")
        ));
    }
    for issue in issues {
        let at = issue.line.map(|l| format!("line {}: ", l)).unwrap_or_default();
        match &issue.suggestion {
            Some(s) => lines.push(format!("{}{} - {}", at, issue.message, s)),
            None => lines.push(format!("{}{}", at, issue.message)),
        }
    }
    if lines.is_empty() {
        lines.push("No Bootstrap 3 patterns found".to_string());
    }
    lines.join("\n")
}

/// Positional line differences plus the line-count delta.
fn changed_lines(before: &str, after: &str) -> usize {
    let a: Vec<&str> = before.lines().collect();
    let b: Vec<&str> = after.lines().collect();
    let differing = a.iter().zip(b.iter()).filter(|(x, y)| x != y).count();
    differing + a.len().abs_diff(b.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rules::RuleCategory;
    use crate::models::IssueCategory;
    use crate::strategy::testing::{Canned, Unreachable};

    fn engine() -> Engine {
        Engine::new(
            Arc::new(RuleSet::bootstrap3_to_5().unwrap()),
            Categories::all(),
        )
        .unwrap()
    }

    fn inputs() -> Vec<InputFile> {
        vec![
            InputFile::new(
                "index.html",
                "<div class=\"modal-header\">\n<button class=\"close\" data-dismiss=\"modal\">×</button>\n<h4 class=\"modal-title\">Title</h4>\n</div>\n<div class=\"col-xs-6 hidden-xs\"></div>",
            ),
            InputFile::new(
                "app.js",
                "$(document).ready(function () {\n  $('.dropdown-toggle').dropdown();\n});",
            ),
            InputFile::new("site.css", ".well { padding: 0 }\n.pull-right { }"),
            InputFile::new("notes.txt", "class=\"well\""),
            InputFile::new("list.jsp", "<span class=\"label label-default\">x</span>"),
        ]
    }

    #[test]
    fn end_to_end_summary() {
        let run = engine().run(&inputs(), &CancelToken::new()).unwrap();
        let s = &run.summary;
        assert!(s.status.is_complete());
        assert_eq!(s.total_files, 5);
        // html, css and jsp have rewrite stages
        assert_eq!(s.modified_files, 3);
        let names: Vec<_> = s.file_summaries.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, ["index.html", "app.js", "site.css", "notes.txt", "list.jsp"]);
        assert_eq!(
            s.tokens_replaced,
            s.file_summaries.iter().map(|f| f.changes_count).sum::<usize>()
        );
        assert_eq!(s.file_summaries[3].changes_count, 0);
        assert!(s.file_summaries[3].warnings.is_empty());
        assert_eq!(s.file_summaries[2].changes_count, 2);
        assert!(s.file_summaries[1].js_issues >= 2);
        assert!(s.warnings.iter().any(|w| w.message == crate::aggregate::GRID_NOTE));
    }

    #[test]
    fn header_scenario_reports_no_structure_issue() {
        let run = engine().run(&inputs()[..1], &CancelToken::new()).unwrap();
        let f = &run.summary.file_summaries[0];
        assert!(f.changes_count >= 3);
        assert!(f.warnings.iter().all(|w| w.category != IssueCategory::Structure));
        let html = &run.converted[0].converted_content;
        assert!(html.find("modal-title").unwrap() < html.find("btn-close").unwrap());
        assert!(run.converted[0].changed);
    }

    #[test]
    fn converted_set_matches_input_identity() {
        let ins = inputs();
        let run = engine().run(&ins, &CancelToken::new()).unwrap();
        assert_eq!(run.converted.len(), ins.len());
        let txt = run
            .converted
            .iter()
            .find(|c| c.file_name == "notes.txt")
            .unwrap();
        assert!(!txt.changed);
        assert_eq!(txt.converted_content, "class=\"well\"");
    }

    #[test]
    fn failing_strategy_is_transparent() {
        let ins = inputs();
        let local = engine().run(&ins, &CancelToken::new()).unwrap();
        let failing = Unreachable::new();
        let with = engine()
            .with_strategy(Box::new(failing))
            .run(&ins, &CancelToken::new())
            .unwrap();

        assert_eq!(with.summary.file_summaries, local.summary.file_summaries);
        assert_eq!(with.converted, local.converted);
        assert_eq!(with.summary.warnings.len(), local.summary.warnings.len() + 1);
        let extra: Vec<_> = with
            .summary
            .warnings
            .iter()
            .filter(|w| !local.summary.warnings.contains(w))
            .collect();
        assert_eq!(extra.len(), 1);
        assert_eq!(extra[0].category, IssueCategory::General);
    }

    #[test]
    fn strategy_only_called_for_markup() {
        let failing = Arc::new(Unreachable::new());
        struct Shared(Arc<Unreachable>);
        impl ConversionStrategy for Shared {
            fn invoke(&self, c: &str, op: Operation) -> Result<String, StrategyError> {
                self.0.invoke(c, op)
            }
        }
        engine()
            .with_strategy(Box::new(Shared(failing.clone())))
            .run(&inputs(), &CancelToken::new())
            .unwrap();
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn external_conversion_counts_changed_lines() {
        let strategy = Canned(|content: &str, _op: Operation| content.replace("col-xs-6", "col-6"));
        let run = engine()
            .with_strategy(Box::new(strategy))
            .run(&inputs()[..1], &CancelToken::new())
            .unwrap();
        let f = &run.summary.file_summaries[0];
        assert_eq!(f.conversion, ConversionPath::External);
        assert_eq!(f.changes_count, 1);
        assert_eq!(f.changes_by_category.get("external"), Some(&1));
        assert!(run.summary.warnings[0]
            .message
            .starts_with("External conversion strategy used"));
        // Header left in legacy order by the external answer is still reported.
        assert!(f.warnings.iter().any(|w| w.category == IssueCategory::Structure));
    }

    #[test]
    fn issue_lines_refer_to_original_after_lines_removed() {
        let page = InputFile::new(
            "page.html",
            "<link rel=\"stylesheet\" href=\"https://maxcdn.bootstrapcdn.com/bootstrap/3.3.7/css/bootstrap.min.css\">\n<link rel=\"stylesheet\" href=\"https://maxcdn.bootstrapcdn.com/bootstrap/3.3.7/css/bootstrap-theme.min.css\">\n<span class=\"glyphicon glyphicon-user\"></span>\n<script>\n$('.dropdown-toggle').dropdown();\n</script>",
        );
        let run = engine().run(std::slice::from_ref(&page), &CancelToken::new()).unwrap();
        let converted = &run.converted[0].converted_content;
        assert!(converted.lines().count() < page.content.lines().count());
        assert!(converted.lines().nth(3).unwrap_or("").contains(".dropdown("));

        let f = &run.summary.file_summaries[0];
        let line_of = |cat: IssueCategory| {
            f.warnings
                .iter()
                .find(|w| w.category == cat)
                .and_then(|w| w.line)
        };
        assert_eq!(line_of(IssueCategory::Class), Some(3));
        assert_eq!(line_of(IssueCategory::Javascript), Some(5));
    }

    #[test]
    fn attributes_left_by_external_answer_are_reported() {
        let page = InputFile::new("nav.html", "<a data-toggle=\"tab\" href=\"#t\">t</a>");
        let local = engine().run(std::slice::from_ref(&page), &CancelToken::new()).unwrap();
        assert!(local.summary.file_summaries[0].warnings.is_empty());

        let echo = Canned(|content: &str, _op: Operation| content.to_string());
        let run = engine()
            .with_strategy(Box::new(echo))
            .run(std::slice::from_ref(&page), &CancelToken::new())
            .unwrap();
        let f = &run.summary.file_summaries[0];
        assert_eq!(f.conversion, ConversionPath::External);
        assert!(f
            .warnings
            .iter()
            .any(|w| w.message.starts_with("data-toggle attribute") && w.line == Some(1)));
    }

    #[test]
    fn cancelled_run_is_partial() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let run = engine().run(&inputs(), &cancel).unwrap();
        assert_eq!(
            run.summary.status,
            RunStatus::Partial {
                completed: 0,
                skipped: 5
            }
        );
        assert_eq!(run.summary.total_files, 0);
        assert!(run.converted.is_empty());
    }

    #[test]
    fn disabled_categories_flow_through() {
        let eng = Engine::new(
            Arc::new(RuleSet::bootstrap3_to_5().unwrap()),
            Categories::all().without(RuleCategory::Stylesheet),
        )
        .unwrap();
        let run = eng.run(&inputs()[2..3], &CancelToken::new()).unwrap();
        assert_eq!(run.summary.modified_files, 0);
        assert_eq!(run.summary.tokens_replaced, 0);
    }

    #[test]
    fn consult_falls_back_to_local_report() {
        let ins = &inputs()[1];
        let local = engine().consult(ins, Operation::Suggest);
        assert_eq!(local.source, ConversionPath::Local);
        assert!(local.fallback_reason.is_none());
        assert!(local.text.contains("line 2:"));

        let failed = engine()
            .with_strategy(Box::new(Unreachable::new()))
            .consult(ins, Operation::Analyze);
        assert_eq!(failed.source, ConversionPath::Local);
        assert_eq!(failed.text, local.text);
        assert!(failed.fallback_reason.is_some());

        let answered = engine()
            .with_strategy(Box::new(Canned(|_c: &str, op: Operation| {
                format!("{} ok", op.as_str())
            })))
            .consult(ins, Operation::Suggest);
        assert_eq!(answered.source, ConversionPath::External);
        assert_eq!(answered.text, "suggest ok");
    }

    #[test]
    fn changed_lines_counts_positional_and_delta() {
        assert_eq!(changed_lines("a\nb\nc", "a\nx\nc"), 1);
        assert_eq!(changed_lines("a\nb", "a\nb\nc\nd"), 2);
        assert_eq!(changed_lines("same", "same"), 0);
    }
}
