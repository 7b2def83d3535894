//! Output rendering for migrate, analyze, suggest and rules commands.
//!
//! Supports `human` (default) and `json` outputs. The JSON form embeds the
//! project summary as-is so presentation layers can consume it directly.

use crate::engine::{Consultation, InputFile, MigrationRun};
use crate::models::rules::RuleSet;
use crate::models::{ConversionPath, Issue, ProjectSummary, RunStatus, Severity};
use crate::package::WriteReport;
use crate::sources::SkippedInput;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::collections::HashMap;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

fn print_json(v: &JsonVal) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{}", s),
        Err(e) => tracing::error!(error = %e, "failed to render JSON"),
    }
}

/// Everything the migrate/analyze printers need about one run.
pub struct RunView<'a> {
    pub run: &'a MigrationRun,
    pub inputs: &'a [InputFile],
    pub skipped: &'a [SkippedInput],
    pub written: Option<&'a WriteReport>,
    pub diff: bool,
    /// External analysis answers, when requested.
    pub analysis: &'a [Consultation],
}

fn badge(sev: Severity, color: bool) -> (String, String) {
    let (icon, text) = match sev {
        Severity::Error => ("✖", "⟦error⟧"),
        Severity::Warning => ("▲", "⟦warn⟧"),
        Severity::Info => ("◆", "⟦info⟧"),
    };
    if !color {
        return (icon.to_string(), text.to_string());
    }
    match sev {
        Severity::Error => (icon.red().to_string(), text.red().bold().to_string()),
        Severity::Warning => (icon.yellow().to_string(), text.yellow().bold().to_string()),
        Severity::Info => (icon.blue().to_string(), text.blue().bold().to_string()),
    }
}

fn issue_line(is: &Issue, color: bool) -> String {
    let (icon, sev) = badge(is.severity, color);
    let loc = match (&is.file, is.line) {
        (Some(f), Some(l)) => format!("{}:{}", f, l),
        (Some(f), None) => f.clone(),
        _ => "project".to_string(),
    };
    let loc = if color { loc.bold().to_string() } else { loc };
    let mut s = format!("{} {} {} ❲{}❳ {}", icon, sev, loc, is.category.as_str(), is.message);
    if let Some(hint) = &is.suggestion {
        s.push_str(&format!("\n    → {}", hint));
    }
    s
}

/// Summary-level notes; per-file warnings carry their file name.
fn project_notes(summary: &ProjectSummary) -> impl Iterator<Item = &Issue> {
    summary.warnings.iter().filter(|w| w.file.is_none())
}

/// Print a migrate or analyze run.
pub fn print_run(view: &RunView, output: &str) {
    if output == "json" {
        print_json(&compose_run_json(view));
        return;
    }
    let color = use_colors(output);
    let summary = &view.run.summary;

    for w in project_notes(summary) {
        println!("{}", issue_line(w, color));
    }

    for fs in &summary.file_summaries {
        let head = format!(
            "{} [{}] changes={} issues={}",
            fs.file_name,
            fs.file_type,
            fs.changes_count,
            fs.warnings.len()
        );
        let via = if fs.conversion == ConversionPath::External {
            " (external)"
        } else {
            ""
        };
        if color {
            println!("{}{}", head.bold(), via.bright_black());
        } else {
            println!("{}{}", head, via);
        }
        for is in &fs.warnings {
            println!("  {}", issue_line(is, color));
        }
    }

    for c in view.analysis {
        let head = format!("analysis: {}", c.file_name);
        if color {
            println!("{}", head.cyan().bold());
        } else {
            println!("{}", head);
        }
        if let Some(reason) = &c.fallback_reason {
            println!("  (local rules; external unavailable: {})", reason);
        }
        for line in c.text.lines() {
            println!("  {}", line);
        }
    }

    if view.diff {
        let originals: HashMap<&str, &str> = view
            .inputs
            .iter()
            .map(|f| (f.name.as_str(), f.content.as_str()))
            .collect();
        for cf in view.run.converted.iter().filter(|c| c.changed) {
            let old = originals.get(cf.file_name.as_str()).copied().unwrap_or("");
            let d = build_line_diff(old, &cf.converted_content);
            if color {
                println!("{} {}\n{}", "---".cyan().bold(), cf.file_name.bold(), d);
            } else {
                println!("--- {}\n{}", cf.file_name, d);
            }
        }
    }

    if let Some(rep) = view.written {
        for p in &rep.written {
            let shown = p.to_string_lossy();
            if color {
                println!("{} {}", "✏️  wrote:".green().bold(), shown.bold());
            } else {
                println!("✏️  wrote: {}", shown);
            }
        }
        for name in &rep.rejected {
            println!("{} {}", crate::utils::error_prefix(), format!("not written (unsafe path): {}", name));
        }
    }

    for sk in view.skipped {
        if color {
            println!("{} {} ({})", "skipped:".bright_black(), sk.path, sk.reason);
        } else {
            println!("skipped: {} ({})", sk.path, sk.reason);
        }
    }

    let status = match &summary.status {
        RunStatus::Complete => String::new(),
        RunStatus::Partial { completed, skipped } => {
            format!(" partial={}/{}", completed, completed + skipped)
        }
    };
    let line = format!(
        "— Summary — files={} modified={} replaced={} issues={} manual={}{}",
        summary.total_files,
        summary.modified_files,
        summary.tokens_replaced,
        summary.script_issues_found,
        summary.manual_fixes_needed,
        status
    );
    if color {
        println!("{}", line.bold());
    } else {
        println!("{}", line);
    }
}

/// Print the answer to a `suggest` request.
pub fn print_consultation(c: &Consultation, output: &str) {
    if output == "json" {
        print_json(&compose_consultation_json(c));
        return;
    }
    let color = use_colors(output);
    let source = match c.source {
        ConversionPath::External => "external",
        ConversionPath::Local => "local rules",
    };
    if color {
        println!("{} {}", c.file_name.bold(), format!("({})", source).bright_black());
    } else {
        println!("{} ({})", c.file_name, source);
    }
    if let Some(reason) = &c.fallback_reason {
        eprintln!(
            "{} {}",
            crate::utils::note_prefix(),
            format!("external strategy unavailable: {}", reason)
        );
    }
    println!("{}", c.text);
}

/// Print the rule tables.
pub fn print_rules(rules: &RuleSet, output: &str) {
    if output == "json" {
        print_json(&compose_rules_json(rules));
        return;
    }
    let color = use_colors(output);
    let heading = |s: &str| {
        if color {
            println!("{}", s.cyan().bold());
        } else {
            println!("{}", s);
        }
    };
    heading("classes");
    for (k, v) in &rules.classes {
        println!("  {} → {}", k, v.join(" "));
    }
    for p in &rules.class_patterns {
        println!("  /{}/ → {}", p.regex.as_str(), p.template);
    }
    heading("components");
    for (k, v) in &rules.components {
        println!("  {} → {}", k, v.join(" "));
    }
    heading("attributes");
    for (k, v) in &rules.attributes {
        println!("  {} → {}", k, v);
    }
    heading("cdn prefixes");
    for p in &rules.cdn.legacy_prefixes {
        println!("  {}", p);
    }
    heading("script signatures");
    for s in &rules.signatures {
        let (icon, _) = badge(s.severity, color);
        println!("  {} /{}/ {}", icon, s.regex.as_str(), s.message);
    }
    heading("unsupported classes");
    for u in &rules.unsupported {
        println!("  {}", u.message);
    }
}

/// Positional line diff: `-old` / `+new` for each differing line.
fn build_line_diff(old: &str, new: &str) -> String {
    let a: Vec<&str> = old.lines().collect();
    let b: Vec<&str> = new.lines().collect();
    let mut out = Vec::new();
    for i in 0..a.len().max(b.len()) {
        match (a.get(i), b.get(i)) {
            (Some(x), Some(y)) if x == y => {}
            (x, y) => {
                if let Some(x) = x {
                    out.push(format!("@@ {} @@\n-{}", i + 1, x));
                } else {
                    out.push(format!("@@ {} @@", i + 1));
                }
                if let Some(y) = y {
                    out.push(format!("+{}", y));
                }
            }
        }
    }
    out.join("\n")
}

/// Compose run JSON object (pure) for testing/snapshot purposes.
pub fn compose_run_json(view: &RunView) -> JsonVal {
    let originals: HashMap<&str, &str> = view
        .inputs
        .iter()
        .map(|f| (f.name.as_str(), f.content.as_str()))
        .collect();
    let written: Vec<String> = view
        .written
        .map(|r| r.written.iter().map(|p| p.to_string_lossy().to_string()).collect())
        .unwrap_or_default();
    let files: Vec<_> = view
        .run
        .converted
        .iter()
        .map(|c| {
            let diff = if view.diff && c.changed {
                originals
                    .get(c.file_name.as_str())
                    .map(|old| build_line_diff(old, &c.converted_content))
            } else {
                None
            };
            json!({
                "fileName": c.file_name,
                "changed": c.changed,
                "diff": diff,
            })
        })
        .collect();
    let skipped: Vec<_> = view
        .skipped
        .iter()
        .map(|s| json!({"path": s.path, "reason": s.reason}))
        .collect();
    json!({
        "summary": view.run.summary,
        "files": files,
        "written": written,
        "skipped": skipped,
        "analysis": view.analysis,
    })
}

pub fn compose_consultation_json(c: &Consultation) -> JsonVal {
    serde_json::to_value(c).unwrap_or(JsonVal::Null)
}

pub fn compose_rules_json(rules: &RuleSet) -> JsonVal {
    let patterns: Vec<_> = rules
        .class_patterns
        .iter()
        .map(|p| json!({"pattern": p.regex.as_str(), "replacement": p.template}))
        .collect();
    let attributes: serde_json::Map<String, JsonVal> = rules
        .attributes
        .iter()
        .map(|(k, v)| (k.to_string(), JsonVal::from(*v)))
        .collect();
    let signatures: Vec<_> = rules
        .signatures
        .iter()
        .map(|s| {
            json!({
                "pattern": s.regex.as_str(),
                "message": s.message,
                "suggestion": s.suggestion,
                "severity": s.severity,
                "type": s.category,
                "fixedBy": s.fixed_by,
            })
        })
        .collect();
    let unsupported: Vec<_> = rules
        .unsupported
        .iter()
        .map(|u| json!({"message": u.message, "suggestion": u.suggestion}))
        .collect();
    json!({
        "classes": rules.classes,
        "classPatterns": patterns,
        "components": rules.components,
        "attributes": attributes,
        "cdnPrefixes": rules.cdn.legacy_prefixes,
        "signatures": signatures,
        "unsupported": unsupported,
    })
}
