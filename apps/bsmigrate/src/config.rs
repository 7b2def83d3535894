//! Configuration discovery and effective settings resolution.
//!
//! bsmigrate reads `bsmigrate.toml|yaml|yml` from the repository root (or
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config. Defaults:
//! - `output`: `human`
//! - `patterns`: markup, stylesheet and script globs (see `DEFAULT_PATTERNS`)
//! - `out_dir`: `migrated`
//! - `rules.disable`: empty (all rule categories on)
//! - `external.enabled`: false
//!
//! Overrides precedence: CLI > config file > defaults.
//!
//! Credentials are never stored in the config file. `external.api_key_env`
//! names the environment variable that holds one.

use crate::errors::{MigrateError, Result};
use crate::models::rules::{Categories, RuleCategory};
use crate::strategy::{DEFAULT_API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_MS};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILES: [&str; 3] = ["bsmigrate.toml", "bsmigrate.yaml", "bsmigrate.yml"];

pub const DEFAULT_PATTERNS: &[&str] = &[
    "**/*.html",
    "**/*.htm",
    "**/*.jsp",
    "**/*.php",
    "**/*.aspx",
    "**/*.css",
    "**/*.js",
];

pub const DEFAULT_OUT_DIR: &str = "migrated";

#[derive(Debug, Default, Deserialize, Clone)]
/// Rule selection under `[rules]`.
pub struct RulesCfg {
    #[serde(default)]
    pub disable: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// External strategy settings under `[external]`.
pub struct ExternalCfg {
    pub enabled: Option<bool>,
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `bsmigrate.toml|yaml`.
pub struct MigrateConfig {
    pub output: Option<String>,
    pub patterns: Option<Vec<String>>,
    pub out_dir: Option<String>,
    #[serde(default)]
    pub rules: Option<RulesCfg>,
    #[serde(default)]
    pub external: Option<ExternalCfg>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub api_key_env: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub config_found: bool,
    pub output: String,
    pub patterns: Vec<String>,
    /// Patterns came from the CLI or the config file.
    pub patterns_configured: bool,
    pub out_dir: PathBuf,
    pub write: bool,
    pub diff: bool,
    pub check: bool,
    pub categories: Categories,
    pub external: ExternalSettings,
}

#[derive(Debug, Default, Clone)]
/// CLI values that take precedence over the config file.
pub struct Overrides {
    pub repo_root: Option<String>,
    pub patterns: Vec<String>,
    pub output: Option<String>,
    pub out_dir: Option<String>,
    pub write: bool,
    pub diff: bool,
    pub check: bool,
    pub disable: Vec<RuleCategory>,
    pub external: bool,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `bsmigrate.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `MigrateConfig` from the first config file present under `root`.
pub fn load_config(root: &Path) -> Result<Option<MigrateConfig>> {
    for name in CONFIG_FILES {
        let path = root.join(name);
        if !path.exists() {
            continue;
        }
        let shown = path.to_string_lossy().to_string();
        let s = fs::read_to_string(&path).map_err(|e| MigrateError::io(&shown, e))?;
        let parsed = if name.ends_with(".toml") {
            toml::from_str::<MigrateConfig>(&s).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str::<MigrateConfig>(&s).map_err(|e| e.to_string())
        };
        return parsed
            .map(Some)
            .map_err(|message| MigrateError::ConfigParse {
                path: shown,
                message,
            });
    }
    Ok(None)
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli: &Overrides) -> Result<Effective> {
    let start = PathBuf::from(cli.repo_root.as_deref().unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let loaded = load_config(&repo_root)?;
    let config_found = loaded.is_some();
    let cfg = loaded.unwrap_or_default();

    let output = cli
        .output
        .clone()
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());

    let (patterns, patterns_configured) = if !cli.patterns.is_empty() {
        (cli.patterns.clone(), true)
    } else if let Some(p) = cfg.patterns.filter(|p| !p.is_empty()) {
        (p, true)
    } else {
        (DEFAULT_PATTERNS.iter().map(|s| s.to_string()).collect(), false)
    };

    let out_dir = cli
        .out_dir
        .clone()
        .or(cfg.out_dir)
        .unwrap_or_else(|| DEFAULT_OUT_DIR.to_string());

    let mut categories = Categories::all();
    for name in cfg.rules.unwrap_or_default().disable {
        let cat = name
            .parse::<RuleCategory>()
            .map_err(|message| MigrateError::ConfigParse {
                path: config_name(&repo_root),
                message,
            })?;
        categories = categories.without(cat);
    }
    for cat in &cli.disable {
        categories = categories.without(*cat);
    }

    let ext = cfg.external.unwrap_or_default();
    let external = ExternalSettings {
        enabled: cli.external || ext.enabled.unwrap_or(false),
        endpoint: ext
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        api_key_env: ext
            .api_key_env
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
        timeout_ms: ext.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
    };

    // diff and check are report-only modes.
    let write = cli.write && !(cli.diff || cli.check);

    Ok(Effective {
        out_dir: repo_root.join(out_dir),
        repo_root,
        config_found,
        output,
        patterns,
        patterns_configured,
        write,
        diff: cli.diff,
        check: cli.check,
        categories,
        external,
    })
}

fn config_name(root: &Path) -> String {
    CONFIG_FILES
        .iter()
        .map(|f| root.join(f))
        .find(|p| p.exists())
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| root.to_string_lossy().to_string())
}
