mod cli;

use layerforge::{BatchSession, Manifest};
use lf_core::config::Config;
use lf_core::{OverwriteMode, RunMode};
use lf_output::{OverwriteDecider, OverwriteDecision};
use lf_pipeline::{ExecutionReport, ItemStatus, RunStatus};
use lf_preview::RenderOutcome;
use lf_settings::{defaults, Overrides, SettingValue, SettingsRegistry};

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use cli::{Cli, Commands, SettingsCommand};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DEFAULT_SETTINGS_FILE: &str = "layerforge-settings.json";

/// Answers overwrite questions on stdin.
struct StdinDecider;

#[async_trait]
impl OverwriteDecider for StdinDecider {
    async fn decide(&self, existing: &Path) -> OverwriteDecision {
        let prompt = format!(
            "{} exists. [r]eplace, [s]kip, rename [n]ew, rename [e]xisting, [c]ancel \
             (uppercase applies to all): ",
            existing.display()
        );
        let answer = tokio::task::spawn_blocking(move || {
            print!("{prompt}");
            std::io::stdout().flush()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok::<_, std::io::Error>(line)
        })
        .await;

        let line = match answer {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                tracing::warn!("Failed to read answer: {e}");
                return OverwriteDecision::once(OverwriteMode::Cancel);
            }
            Err(e) => {
                tracing::warn!("Prompt task failed: {e}");
                return OverwriteDecision::once(OverwriteMode::Cancel);
            }
        };
        parse_answer(line.trim())
    }
}

fn parse_answer(answer: &str) -> OverwriteDecision {
    let Some(c) = answer.chars().next() else {
        return OverwriteDecision::once(OverwriteMode::Skip);
    };
    let mode = match c.to_ascii_lowercase() {
        'r' => OverwriteMode::Replace,
        'n' => OverwriteMode::RenameNew,
        'e' => OverwriteMode::RenameExisting,
        'c' => OverwriteMode::Cancel,
        _ => OverwriteMode::Skip,
    };
    if c.is_ascii_uppercase() {
        OverwriteDecision::for_all(mode)
    } else {
        OverwriteDecision::once(mode)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "layerforge=trace,lf_pipeline=debug,lf_settings=debug,lf_preview=debug,lf_output=debug,lf_items=debug"
                .to_string()
        } else {
            "layerforge=info,lf_pipeline=info,lf_settings=info,lf_preview=info,lf_output=warn,lf_items=warn"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_or_default(cli.config.as_deref());
    let settings_path = cli
        .settings
        .clone()
        .or_else(|| config.settings.path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

    match cli.command {
        Commands::Run {
            manifest,
            mode,
            output,
            extension,
            overwrite,
            traversal,
            json,
        } => {
            let mut overrides = Overrides::new();
            if let Some(output) = output {
                overrides.set(defaults::OUTPUT_DIRECTORY, SettingValue::Path(output));
            }
            if let Some(extension) = extension {
                overrides.set(defaults::FILE_EXTENSION, SettingValue::String(extension));
            }
            if let Some(overwrite) = overwrite {
                overrides.set(
                    defaults::OVERWRITE_MODE,
                    SettingValue::Choice(overwrite.as_str().to_string()),
                );
            }
            if let Some(traversal) = traversal {
                overrides.set(defaults::TRAVERSAL, SettingValue::Choice(traversal.to_string()));
            }

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_batch(&manifest, mode, &settings_path, &config, &overrides, json))
        }
        Commands::Preview { manifest, limit } => {
            let mut overrides = Overrides::new();
            if let Some(limit) = limit {
                let limit = i64::try_from(limit)?;
                overrides.set(defaults::PREVIEW_MAX_ITEMS, SettingValue::Int(limit));
            }
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(preview(&manifest, &settings_path, &config, &overrides))
        }
        Commands::Settings { action } => settings_command(action, &settings_path, &config),
        Commands::Validate {
            config: config_path,
            manifest,
        } => {
            let path = config_path.or(cli.config);
            validate(path.as_deref(), manifest.as_deref(), &settings_path)
        }
        Commands::Version => {
            println!("layerforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_batch(
    manifest_path: &Path,
    mode: RunMode,
    settings_path: &Path,
    config: &Config,
    overrides: &Overrides,
    json: bool,
) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let host = manifest.build_host(true);
    let registry = Arc::new(manifest.registry()?);

    let mut session = BatchSession::open(mode, settings_path, registry, config)
        .with_progress(|progress, item| tracing::debug!("{:>5.1}% {item}", progress * 100.0));
    if let Some(report) = session.load_report() {
        for warning in &report.warnings {
            tracing::warn!("Settings: {warning}");
        }
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted; stopping after the current item");
                cancel.cancel();
            }
        });
    }

    let decider: Option<Arc<dyn OverwriteDecider>> = if mode.allows_ask() {
        Some(Arc::new(StdinDecider))
    } else {
        None
    };
    let report = session.run(&host, overrides, decider, cancel).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(e) = session.save_error() {
        anyhow::bail!("settings not saved to {}: {e}", settings_path.display());
    }

    match &report.status {
        RunStatus::Aborted { command, message, .. } => {
            anyhow::bail!("run aborted: {command} failed: {message}")
        }
        RunStatus::Cancelled | RunStatus::Completed => Ok(()),
    }
}

fn print_report(report: &ExecutionReport) {
    for item in &report.items {
        match &item.status {
            ItemStatus::Processed => match &item.output {
                Some(path) => println!("  ✓ {} -> {}", item.original_name, path.display()),
                None => println!("  ✓ {}", item.original_name),
            },
            ItemStatus::Excluded { command } => {
                tracing::debug!("{} excluded by {command}", item.original_name)
            }
            ItemStatus::Skipped { reason } => println!("  - {} skipped: {reason}", item.original_name),
            ItemStatus::Failed { command, error } => {
                println!("  ✗ {} failed in {command}: {error}", item.original_name)
            }
        }
    }
    println!();
    println!(
        "{} processed, {} excluded, {} skipped, {} failed ({:?})",
        report.processed(),
        report.excluded(),
        report.skipped(),
        report.failed(),
        report.status
    );
}

async fn preview(manifest_path: &Path, settings_path: &Path, config: &Config, overrides: &Overrides) -> Result<()> {
    let manifest = Manifest::load(manifest_path)?;
    let host = manifest.build_host(false);
    let registry = Arc::new(manifest.registry()?);

    let session = BatchSession::open(RunMode::RunWithLastValues, settings_path, registry, config);
    let mut renderer = session.preview_renderer(overrides)?;
    let outcome = session
        .preview(&host, overrides, &mut renderer, &CancellationToken::new())
        .await?;
    if outcome == RenderOutcome::Cancelled {
        println!("Preview cancelled");
        return Ok(());
    }

    let show_original = session
        .resolve(overrides)
        .map(|r| r.show_original_names)
        .unwrap_or(false);
    for entry in &renderer.state().entries {
        let marker = if entry.included { "+" } else { " " };
        let name = if show_original {
            format!("{} -> {}", entry.original_name, entry.resolved_name)
        } else {
            entry.resolved_name.clone()
        };
        match &entry.error {
            Some(error) => println!("{marker} {name} ({error})"),
            None => println!("{marker} {name}"),
        }
    }
    if renderer.state().truncated {
        println!("... more items not shown");
    }
    Ok(())
}

fn settings_command(action: SettingsCommand, settings_path: &Path, config: &Config) -> Result<()> {
    let mut registry = SettingsRegistry::with_defaults(config);
    let report = registry.load(settings_path);
    for warning in &report.warnings {
        tracing::warn!("Settings: {warning}");
    }

    match action {
        SettingsCommand::Show { json } => {
            if json {
                let values: serde_json::Map<String, serde_json::Value> = registry
                    .tree()
                    .iter()
                    .map(|(path, setting)| serde_json::to_value(setting.value()).map(|v| (path, v)))
                    .collect::<Result<_, serde_json::Error>>()?;
                println!("{}", serde_json::to_string_pretty(&values)?);
            } else {
                println!("Settings: {}", settings_path.display());
                for (path, setting) in registry.tree().iter() {
                    let marker = if setting.is_default() { " " } else { "*" };
                    let session = if setting.is_persistent() { "" } else { " (session)" };
                    println!("{marker} {path} = {}{session}", setting.value());
                }
                for key in &report.unknown_keys {
                    println!("? {key} (unknown, kept)");
                }
            }
            Ok(())
        }
        SettingsCommand::Reset { paths } => {
            let subset: Vec<&str> = paths.iter().map(String::as_str).collect();
            let changed = registry.reset(&subset)?;
            registry.save(settings_path)?;
            println!("Reset {changed} setting(s)");
            Ok(())
        }
        SettingsCommand::ExportCommands { path } => {
            registry.export_commands(&path)?;
            println!("Exported commands to {}", path.display());
            Ok(())
        }
        SettingsCommand::ImportCommands { path } => {
            let count = registry.import_commands(&path)?;
            registry.save(settings_path)?;
            println!("Imported {count} command(s)");
            Ok(())
        }
    }
}

fn validate(config_path: Option<&Path>, manifest: Option<&Path>, settings_path: &Path) -> Result<()> {
    let config = match config_path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let config = Config::from_json(&std::fs::read_to_string(p)?)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };
    for warning in config.validate() {
        println!("  warning: {warning}");
    }

    if let Some(manifest) = manifest {
        let manifest = Manifest::load(manifest)?;
        let mut registry = SettingsRegistry::with_defaults(&config);
        registry.load(settings_path);
        let commands = registry.commands()?;
        manifest.registry()?.validate(commands)?;
        println!(
            "✓ {} command(s) valid for {} item(s)",
            commands.len(),
            manifest.item_count()
        );
    }
    Ok(())
}
