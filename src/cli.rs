use clap::{Parser, Subcommand};
use lf_core::{OverwriteMode, RunMode, TraversalMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "layerforge")]
#[command(author, version, about = "Batch processing of image layers")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the persisted settings document
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the configured pipeline over the items of a manifest
    Run {
        /// Manifest describing the items and host procedures
        #[arg(required = true)]
        manifest: PathBuf,

        /// interactive, non-interactive or last-values
        #[arg(long, default_value = "interactive")]
        mode: RunMode,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Default file extension for exports
        #[arg(short, long)]
        extension: Option<String>,

        /// What to do when an output file exists
        #[arg(long)]
        overwrite: Option<OverwriteMode>,

        /// flat or hierarchical
        #[arg(long)]
        traversal: Option<TraversalMode>,

        /// Print the execution report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what a run would do without writing anything
    Preview {
        /// Manifest describing the items and host procedures
        #[arg(required = true)]
        manifest: PathBuf,

        /// Maximum number of items to preview
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Inspect or change the persisted settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },

    /// Validate the config file, and optionally the stored commands against a manifest
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,

        /// Manifest whose procedures the stored commands may use
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Print every setting
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore defaults; pass groups or group/name paths to limit the reset
    Reset { paths: Vec<String> },

    /// Write the command list to a file
    ExportCommands { path: PathBuf },

    /// Replace the command list with the one in a file
    ImportCommands { path: PathBuf },
}
