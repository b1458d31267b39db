mod logs;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use shizuconfig::Config;
use shizulineup::{DeleteOutcome, LineupManager, RootKind};
use std::path::PathBuf;
use tracing::info;

/// Command-line arguments for shizu
#[derive(Parser, Debug)]
#[command(name = "shizu")]
#[command(about = "DJ ledger and event lineup manager")]
#[command(version)]
struct Args {
    /// Configuration directory (defaults to ./.shizu, then ~/.shizu)
    #[arg(short, long, env = "SHIZU_CONFIG")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the ledger (DJ roster and promos)
    Ledger,
    /// List lineup names
    Lineups,
    /// Print one lineup
    Show { name: String },
    /// Create an empty lineup
    Create { name: String },
    /// Delete a lineup
    Delete { name: String },
    /// Export a lineup manifest into a permitted export directory
    Export { lineup: String, dir: PathBuf },
    /// Print the permitted roots
    Roots,
    /// Resolve `<root> [dir...] <file>` inside the permitted roots of a kind
    Resolve {
        #[arg(value_enum)]
        kind: Kind,
        #[arg(required = true)]
        segments: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Logo,
    Recording,
    Export,
}

impl From<Kind> for RootKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Logo => RootKind::Logo,
            Kind::Recording => RootKind::Recording,
            Kind::Export => RootKind::Export,
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config_dir {
        Some(dir) => Config::load_config(dir),
        None => Config::load_config(""),
    }
    .context("Failed to load configuration")?;

    logs::init_logging(&config);
    info!(config = %config.file_path().display(), "Configuration loaded");

    let manager =
        LineupManager::from_config(&config).context("Failed to initialize lineup manager")?;

    match args.command {
        Command::Ledger => print_json(&manager.ledger().await?)?,
        Command::Lineups => {
            for name in manager.list_lineups().await? {
                println!("{}", name);
            }
        }
        Command::Show { name } => print_json(&manager.lineup(&name).await?)?,
        Command::Create { name } => {
            manager.create_lineup(&name).await?;
            println!("Created lineup {}", name);
        }
        Command::Delete { name } => match manager.delete_lineup(&name).await? {
            DeleteOutcome::Deleted => println!("Deleted lineup {}", name),
            DeleteOutcome::NotFound => println!("Lineup {} does not exist", name),
        },
        Command::Export { lineup, dir } => {
            let summary = manager.export_lineup(&lineup, &dir).await?;
            println!(
                "Exported {} DJs and {} promos to {}",
                summary.djs,
                summary.promos,
                summary.path.display()
            );
        }
        Command::Roots => {
            let permissions = manager.permissions();
            print_json(&serde_json::json!({
                "logos": permissions.logos.describe(),
                "recordings": permissions.recordings.describe(),
                "exports": permissions.exports.describe(),
            }))?;
        }
        Command::Resolve { kind, segments } => {
            let path = manager.resolve_path(kind.into(), segments.as_slice())?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
