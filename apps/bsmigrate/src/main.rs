//! bsmigrate CLI binary entry point.
//! Resolves configuration, collects inputs, runs the engine and prints results.

use bsmigrate::cli::{Cli, Commands, RunArgs};
use bsmigrate::config::{self, Effective, Overrides};
use bsmigrate::engine::{CancelToken, Consultation, Engine};
use bsmigrate::errors::{MigrateError, Result};
use bsmigrate::models::rules::RuleSet;
use bsmigrate::package::{self, Destination};
use bsmigrate::strategy::{HttpStrategy, Operation};
use bsmigrate::{classify, output, sources, utils};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let result = match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
        Commands::Migrate {
            run,
            out_dir,
            write,
            diff,
            check,
        } => {
            let mut ov = overrides(&run);
            ov.out_dir = out_dir;
            ov.write = write;
            ov.diff = diff;
            ov.check = check;
            migrate(&ov, false)
        }
        Commands::Analyze { run } => migrate(&overrides(&run), true),
        Commands::Suggest { file, run } => suggest(&file, &overrides(&run)),
        Commands::Rules { output: mode } => RuleSet::bootstrap3_to_5()
            .map_err(MigrateError::from)
            .map(|rules| {
                output::print_rules(&rules, mode.as_deref().unwrap_or("human"));
                0
            }),
    };
    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", utils::error_prefix(), e);
            std::process::exit(2);
        }
    }
}

fn overrides(run: &RunArgs) -> Overrides {
    Overrides {
        repo_root: run.repo_root.clone(),
        patterns: run.patterns.clone(),
        output: run.output.clone(),
        disable: run.disable.clone(),
        external: run.external,
        ..Default::default()
    }
}

/// Friendly notes shared by every command that reads inputs.
fn announce(eff: &Effective) {
    if eff.output == "json" {
        return;
    }
    if !eff.config_found {
        eprintln!(
            "{} {}",
            utils::note_prefix(),
            "No bsmigrate.toml found; using defaults."
        );
    }
    if !eff.patterns_configured {
        eprintln!(
            "{} {}",
            utils::info_prefix(),
            format!("Using default patterns: [{}]", eff.patterns.join(", "))
        );
    }
}

fn build_engine(eff: &Effective) -> Result<Engine> {
    let rules = Arc::new(RuleSet::bootstrap3_to_5()?);
    Ok(Engine::new(rules, eff.categories)?)
}

/// Attach the HTTP strategy when external conversion is enabled.
fn with_external(engine: Engine, eff: &Effective) -> Engine {
    if !eff.external.enabled {
        return engine;
    }
    let ext = &eff.external;
    if std::env::var_os(&ext.api_key_env).is_none() && eff.output != "json" {
        eprintln!(
            "{} {}",
            utils::note_prefix(),
            format!(
                "{} is not set; external requests will fall back to local rules",
                ext.api_key_env
            )
        );
    }
    match HttpStrategy::from_env(
        ext.endpoint.clone(),
        &ext.api_key_env,
        Duration::from_millis(ext.timeout_ms),
    ) {
        Ok(strategy) => engine.with_strategy(Box::new(strategy)),
        Err(e) => {
            tracing::warn!(error = %e, "external strategy unavailable");
            engine
        }
    }
}

fn migrate(ov: &Overrides, report_only: bool) -> Result<i32> {
    let eff = config::resolve_effective(ov)?;
    announce(&eff);
    let collected = sources::collect(&eff.repo_root, &eff.patterns, Some(&eff.out_dir))?;
    if collected.files.is_empty() && eff.output != "json" {
        eprintln!("{} {}", utils::note_prefix(), "No input files matched.");
    }

    // analyze keeps conversion local and asks the strategy for analysis only
    let engine = build_engine(&eff)?;
    let engine = if report_only {
        engine
    } else {
        with_external(engine, &eff)
    };
    let run = engine.run(&collected.files, &CancelToken::new())?;

    let analysis: Vec<Consultation> = if report_only && eff.external.enabled {
        let consultant = with_external(engine, &eff);
        collected
            .files
            .iter()
            .filter(|f| classify::classify(&f.name).is_markup())
            .map(|f| consultant.consult(f, Operation::Analyze))
            .collect()
    } else {
        Vec::new()
    };

    let written = if report_only || eff.diff || eff.check {
        None
    } else {
        let dest = if eff.write {
            Destination::InPlace
        } else {
            Destination::Dir(eff.out_dir.clone())
        };
        Some(package::write_converted(&eff.repo_root, &run.converted, &dest)?)
    };

    output::print_run(
        &output::RunView {
            run: &run,
            inputs: &collected.files,
            skipped: &collected.skipped,
            written: written.as_ref(),
            diff: eff.diff,
            analysis: &analysis,
        },
        &eff.output,
    );

    if eff.check && run.converted.iter().any(|c| c.changed) {
        return Ok(1);
    }
    Ok(0)
}

fn suggest(file: &str, ov: &Overrides) -> Result<i32> {
    let eff = config::resolve_effective(ov)?;
    let input = sources::read_one(&eff.repo_root, Path::new(file))?;
    let engine = with_external(build_engine(&eff)?, &eff);
    let answer = engine.consult(&input, Operation::Suggest);
    output::print_consultation(&answer, &eff.output);
    Ok(0)
}
