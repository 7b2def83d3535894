//! CLI argument parsing via `clap`.

use crate::models::rules::RuleCategory;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bsmigrate",
    version,
    about = "Bootstrap 3 to 5 markup migration",
    long_about = "bsmigrate rewrites Bootstrap 3 markup, stylesheets and templates for Bootstrap 5 and reports what still needs manual work.\n\nConfiguration precedence: CLI > bsmigrate.toml > defaults.\nSet RUST_LOG (or pass --verbose) for diagnostic logs on stderr.",
    after_help = "Examples:\n  bsmigrate migrate --pattern 'site/**/*.html' --diff\n  bsmigrate migrate --write --disable navigation\n  bsmigrate analyze --output json\n  bsmigrate suggest js/app.js --external",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(long, short, global = true, action = clap::ArgAction::SetTrue, help = "Enable debug logging on stderr")]
    pub verbose: bool,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args, Clone, Default)]
/// Input selection and rule options shared by `migrate` and `analyze`.
pub struct RunArgs {
    #[arg(long, help = "Repository root (default: current dir)")]
    pub repo_root: Option<String>,
    #[arg(long = "pattern", help = "Input glob relative to the root (repeatable)")]
    pub patterns: Vec<String>,
    #[arg(long, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
    #[arg(long = "disable", value_name = "CATEGORY", help = "Disable a rule category: cdn|modal-header|attributes|classes|stylesheet|navigation (repeatable)")]
    pub disable: Vec<RuleCategory>,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Use the external conversion strategy (credential from the configured env var)")]
    pub external: bool,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current bsmigrate version.")]
    Version,
    /// Convert files and report
    #[command(
        about = "Convert files and report",
        long_about = "Rewrite matched files for Bootstrap 5. Converted files go to out_dir unless --write is given. When --diff or --check is set, nothing is written.",
        after_help = "Examples:\n  bsmigrate migrate --out-dir build/bs5\n  bsmigrate migrate --write\n  bsmigrate migrate --check"
    )]
    Migrate {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long, help = "Directory for converted files (default: migrated)")]
        out_dir: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "out_dir", help = "Overwrite changed files in place")]
        write: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Show line diffs for changed files (implies no writes)")]
        diff: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Exit non-zero if any file would change (implies no writes)")]
        check: bool,
    },
    /// Report without converting
    #[command(
        about = "Report without converting",
        long_about = "Run conversion in memory and print the project summary. Nothing is written.",
        after_help = "Examples:\n  bsmigrate analyze\n  bsmigrate analyze --pattern '**/*.jsp' --output json"
    )]
    Analyze {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Migration advice for one file
    #[command(
        about = "Migration advice for one file",
        long_about = "Ask the external strategy for migration suggestions. Without it, or when it fails, suggestions are compiled from local detection."
    )]
    Suggest {
        #[arg(help = "File to inspect, relative to the root")]
        file: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Print the rule tables
    #[command(
        about = "Print the rule tables",
        long_about = "List class mappings, attribute renames, CDN prefixes and script signatures."
    )]
    Rules {
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
}
