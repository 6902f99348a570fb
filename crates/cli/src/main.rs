//! wnb - Watch and Backup

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use cli_lib::{util, RunOptions};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wnb_core::Config;

/// Watch and Backup! - snapshot a folder on every change
#[derive(Parser)]
#[command(name = "wnb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder to watch
    folder_path: PathBuf,

    /// Where snapshots are written (default: wnb_backups next to the executable)
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    /// Where change and error logs are written (default: wnb_logs next to the executable)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Collapse bursts of events: snapshot once the folder is quiet for this long
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Don't print a line per event and snapshot
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("{}", "Watch and Backup!".bold());

    let app_dir = util::application_dir()?;
    let mut config = Config::new(&cli.folder_path, &app_dir)
        .with_debounce(cli.debounce_ms.map(Duration::from_millis));
    if let Some(dir) = cli.backup_dir {
        config = config.with_backup_root(dir);
    }
    if let Some(dir) = cli.log_dir {
        config = config.with_log_dir(dir);
    }

    cli_lib::run(config, RunOptions { quiet: cli.quiet }).await
}
