//! vhdldoc CLI: memory map documentation for VHDL sources.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::build::BuildOverrides;
use manifest::VhdldocManifest;

#[derive(Parser)]
#[command(name = "vhdldoc", version, about = "Memory map documentation for VHDL")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new vhdldoc project
    Init {
        /// Project name
        name: String,
    },
    /// Render documentation pages for all sources
    Build {
        /// Source directory (default: [source] dirs from vhdldoc.toml)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Output directory (default: [output] dir from vhdldoc.toml)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Page format (markdown, text, json)
        #[arg(long)]
        format: Option<String>,
        /// Reject descriptor keys the schema does not define
        #[arg(long)]
        strict: bool,
    },
    /// Resolve descriptors and print their tables without writing pages
    Check {
        /// Source files to check (default: all sources)
        files: Vec<PathBuf>,
        /// Reject descriptor keys the schema does not define
        #[arg(long)]
        strict: bool,
    },
    /// Remove generated pages
    Clean,
    /// Print the descriptor JSON Schema
    Schema,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { name } => commands::init::run(&name),

        Commands::Build {
            source,
            out,
            format,
            strict,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::build::run(
                &project_dir,
                manifest.as_ref(),
                &BuildOverrides {
                    source: source.as_deref(),
                    out: out.as_deref(),
                    format: format.as_deref(),
                    strict,
                },
            )
        }

        Commands::Check { files, strict } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            let config = commands::build::resolve_config(
                &project_dir,
                manifest.as_ref(),
                &BuildOverrides {
                    strict,
                    ..BuildOverrides::default()
                },
            )?;
            commands::check::run(&config, &files)
        }

        Commands::Clean => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::clean::run(&project_dir, manifest.as_ref())
        }

        Commands::Schema => commands::schema::run(),
    }
}

/// Try to load a manifest from the current directory upward. Returns (None, None) if not found.
fn load_manifest_optional(
    cwd: &Path,
) -> anyhow::Result<(Option<VhdldocManifest>, Option<PathBuf>)> {
    match VhdldocManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => {
            tracing::debug!(project = %manifest.project.name, dir = %dir.display(), "loaded manifest");
            Ok((Some(manifest), Some(dir)))
        }
        None => {
            tracing::debug!(cwd = %cwd.display(), "no vhdldoc.toml found, using defaults");
            Ok((None, None))
        }
    }
}
