use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use dicat_config::{ConfigDiagnostics, DicatConfig};
use dicat_diagnostics::ErrorMessageMode;
use dicat_model::MemorySourceModel;
use dicat_resolve::{ContextPlan, Pipeline, ResolveSummary};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "dicat",
    version,
    about = "Compile-time dependency injection resolver (contexts, beans, dependency graphs)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register and resolve every context, then print the diagnostics
    Check(CheckArgs),
    /// Print construction plans for code generation as JSON
    Plan(PlanArgs),
    /// Print the JSON schema of `dicat.toml`
    ConfigSchema,
}

#[derive(Args)]
struct ModelArgs {
    /// Serialized source model (`{ "files": [...] }`)
    model: PathBuf,
    /// Config file (defaults to discovery next to the model file)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Override `diagnostics.mode` from the config
    #[arg(long)]
    mode: Option<ErrorMessageMode>,
}

#[derive(Args)]
struct PlanArgs {
    #[command(flatten)]
    model: ModelArgs,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Check(args) => {
            let config = load_config(&args.model)?;
            let mode = args.mode.unwrap_or(config.diagnostics.mode);
            let (pipeline, summary) = compile(&args.model, &config)?;

            let diagnostics = pipeline.session().diagnostics();
            let exit = if diagnostics.has_errors() { 1 } else { 0 };
            match mode {
                ErrorMessageMode::Debug => {
                    let out = serde_json::to_string_pretty(&diagnostics.debug_report())?;
                    println!("{out}");
                }
                ErrorMessageMode::Human => match pipeline.error_message(mode)? {
                    Some(message) => print!("{message}"),
                    None => println!(
                        "dicat: no problems found ({} contexts, {} dependencies)",
                        summary.contexts, summary.dependencies
                    ),
                },
            }
            Ok(exit)
        }
        Command::Plan(args) => {
            let config = load_config(&args.model)?;
            let (pipeline, summary) = compile(&args.model, &config)?;

            match pipeline.plans()? {
                Some(contexts) => {
                    let out = serde_json::to_string_pretty(&PlanReport { summary, contexts })?;
                    println!("{out}");
                    Ok(0)
                }
                None => {
                    if let Some(message) = pipeline.error_message(config.diagnostics.mode)? {
                        print!("{message}");
                    }
                    Ok(1)
                }
            }
        }
        Command::ConfigSchema => {
            let out = serde_json::to_string_pretty(&dicat_config::json_schema())?;
            println!("{out}");
            Ok(0)
        }
    }
}

#[derive(Serialize)]
struct PlanReport {
    summary: ResolveSummary,
    contexts: Vec<ContextPlan>,
}

fn compile(args: &ModelArgs, config: &DicatConfig) -> Result<(Pipeline, ResolveSummary)> {
    let model = MemorySourceModel::load_from_path(&args.model)
        .with_context(|| format!("failed to load source model {}", args.model.display()))?;
    tracing::debug!(target: "dicat.cli", files = model.len(), "loaded source model");

    let mut pipeline = Pipeline::with_config(config)?;
    let summary = pipeline
        .run(&model)
        .context("compilation aborted on an internal error")?;
    Ok((pipeline, summary))
}

fn load_config(args: &ModelArgs) -> Result<DicatConfig> {
    let (config, path, diagnostics) = match &args.config {
        Some(path) => {
            let (config, diagnostics) = DicatConfig::load_from_path_with_diagnostics(path)?;
            (config, Some(path.clone()), diagnostics)
        }
        None => dicat_config::load_for_workspace(model_dir(&args.model))?,
    };

    dicat_config::init_tracing(&config.logging);
    report_config_diagnostics(path.as_deref(), &diagnostics)?;
    Ok(config)
}

fn model_dir(model: &Path) -> &Path {
    model
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn report_config_diagnostics(path: Option<&Path>, diagnostics: &ConfigDiagnostics) -> Result<()> {
    let shown = path.map(|p| p.display().to_string()).unwrap_or_default();
    for key in &diagnostics.unknown_keys {
        tracing::warn!(target: "dicat.config", path = %shown, key = %key, "unknown config key");
    }
    for warning in &diagnostics.warnings {
        tracing::warn!(target: "dicat.config", path = %shown, ?warning, "config warning");
    }
    if !diagnostics.is_ok() {
        anyhow::bail!("invalid config {shown}: {:?}", diagnostics.errors);
    }
    Ok(())
}
