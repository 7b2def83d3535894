//! Result aggregation: folds per-file records into a `ProjectSummary`.
//!
//! Records may arrive in any completion order; they are sorted by their
//! submission index first. A record missing its outcome or its issue list is
//! a fatal inconsistency and no summary is produced.

use crate::classify::file_type;
use crate::errors::AggregateError;
use crate::models::rules::Categories;
use crate::models::{
    ConversionOutcome, ConversionPath, FileKind, FileSummary, Issue, IssueCategory,
    ProjectSummary, RunStatus, Severity,
};
use std::collections::HashSet;

pub const GRID_NOTE: &str = "Bootstrap 5 uses different grid breakpoints";

/// Everything the pipeline produced for one input file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Position in the submitted input sequence.
    pub index: usize,
    pub name: String,
    pub kind: FileKind,
    pub outcome: Option<ConversionOutcome>,
    pub issues: Option<Vec<Issue>>,
    pub conversion: ConversionPath,
    /// The external strategy was tried for this file and failed.
    pub external_failed: bool,
}

pub fn aggregate(
    mut records: Vec<FileRecord>,
    status: RunStatus,
    categories: &Categories,
) -> Result<ProjectSummary, AggregateError> {
    records.sort_by_key(|r| r.index);

    let total_files = records.len();
    let mut modified_files = 0usize;
    let mut tokens_replaced = 0usize;
    let mut script_issues_found = 0usize;
    let mut manual_fixes_needed = 0usize;
    let mut files_with_script_issues = 0usize;
    let mut external_used = 0usize;
    let mut external_failed = 0usize;
    let mut file_warnings: Vec<Issue> = Vec::new();
    let mut file_summaries = Vec::with_capacity(total_files);

    for rec in records {
        let outcome = rec.outcome.ok_or_else(|| AggregateError::MissingOutcome {
            file: rec.name.clone(),
        })?;
        let issues = rec.issues.ok_or_else(|| AggregateError::MissingIssues {
            file: rec.name.clone(),
        })?;
        let issues: Vec<Issue> = issues
            .into_iter()
            .map(|i| match i.file {
                Some(_) => i,
                None => i.in_file(rec.name.clone()),
            })
            .collect();

        if categories.for_kind(rec.kind).next().is_some() {
            modified_files += 1;
        }
        tokens_replaced += outcome.change_count;
        script_issues_found += issues.len();
        manual_fixes_needed += issues.len().div_ceil(2);
        let js_issues = issues
            .iter()
            .filter(|i| i.category == IssueCategory::Javascript)
            .count();
        if js_issues > 0 {
            files_with_script_issues += 1;
        }
        if rec.conversion == ConversionPath::External {
            external_used += 1;
        }
        if rec.external_failed {
            external_failed += 1;
        }

        file_warnings.extend(issues.iter().cloned());
        file_summaries.push(FileSummary {
            file_type: file_type(&rec.name),
            file_name: rec.name,
            kind: rec.kind,
            changes_count: outcome.change_count,
            changes_by_category: outcome.changes_by_category,
            js_issues,
            conversion: rec.conversion,
            warnings: issues,
        });
    }

    let mut warnings = Vec::new();
    if external_used > 0 {
        warnings.push(Issue::new(
            IssueCategory::General,
            Severity::Info,
            format!("External conversion strategy used for {} file(s)", external_used),
        ));
    }
    if external_failed > 0 {
        warnings.push(
            Issue::new(
                IssueCategory::General,
                Severity::Info,
                format!(
                    "External conversion unavailable for {} file(s); local rules were used",
                    external_failed
                ),
            )
            .with_suggestion("Check the external endpoint, credential and timeout settings"),
        );
    }
    if files_with_script_issues > 0 {
        warnings.push(
            Issue::new(
                IssueCategory::Javascript,
                Severity::Warning,
                format!(
                    "Legacy JavaScript patterns found in {} file(s) - Bootstrap 5 doesn't require jQuery",
                    files_with_script_issues.min(total_files)
                ),
            )
            .with_suggestion("Consider replacing jQuery with native JavaScript"),
        );
    }
    if tokens_replaced > 0 {
        warnings.push(
            Issue::new(IssueCategory::General, Severity::Info, GRID_NOTE).with_suggestion(
                "Review responsive layouts: the xs tier is now the default and xxl was added",
            ),
        );
    }
    warnings.extend(file_warnings);

    Ok(ProjectSummary {
        status,
        total_files,
        modified_files,
        tokens_replaced,
        script_issues_found,
        manual_fixes_needed,
        warnings: dedupe(warnings),
        file_summaries,
    })
}

/// Keep the first issue for each (category, message) pair.
fn dedupe(issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    issues
        .into_iter()
        .filter(|i| seen.insert((i.category, i.message.clone())))
        .collect()
}
