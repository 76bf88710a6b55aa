pub mod output;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{start_daemon, TrackerOptions},
    store::{
        queries::{self, HISTORY_SAMPLE},
        session_store::SessionStoreImpl,
    },
    utils::{dir::create_application_default_path, logging::enable_logging, time::date_to_record_name},
};

use output::{format_duration, paint_category};

#[derive(Parser, Debug)]
#[command(name = "Workwatch", version)]
#[command(about = "Tracks window focus, classifies your activity and guards deep work", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
}

const DIR_HELP: &str =
    "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state";

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run the tracking daemon in the current console")]
    Serve {
        #[arg(long, help = DIR_HELP)]
        dir: Option<PathBuf>,
        #[arg(long, help = "Seconds between focus probe polls", default_value_t = 2)]
        interval_secs: u64,
        #[arg(long = "log-filter")]
        log: Option<LevelFilter>,
        /// This option is for debugging purposes only.
        #[arg(long = "log-console")]
        log_console: bool,
    },
    #[command(about = "Show today's totals per category")]
    Stats {
        #[arg(long, help = DIR_HELP)]
        dir: Option<PathBuf>,
    },
    #[command(about = "Show a per-day trend over recent days")]
    Trend {
        #[arg(long, help = DIR_HELP)]
        dir: Option<PathBuf>,
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    #[command(about = "Show recent sessions grouped by application and day")]
    History {
        #[arg(long, help = DIR_HELP)]
        dir: Option<PathBuf>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    #[command(about = "Show cumulative career XP (learning + productive seconds)")]
    Xp {
        #[arg(long, help = DIR_HELP)]
        dir: Option<PathBuf>,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    match args.commands {
        Commands::Serve {
            dir,
            interval_secs,
            log,
            log_console,
        } => {
            let app_dir = dir.map_or_else(create_application_default_path, Ok)?;
            enable_logging(&app_dir, log, log_console)?;
            let options = TrackerOptions {
                poll_interval: Duration::from_secs(interval_secs.max(1)),
                ..Default::default()
            };
            start_daemon(app_dir, options).await
        }
        Commands::Stats { dir } => print_stats(open_store(dir)?).await,
        Commands::Trend { dir, days } => print_trend(open_store(dir)?, days).await,
        Commands::History { dir, limit } => print_history(open_store(dir)?, limit).await,
        Commands::Xp { dir } => print_xp(open_store(dir)?).await,
    }
}

fn open_store(dir: Option<PathBuf>) -> Result<Arc<SessionStoreImpl>> {
    let app_dir = dir.map_or_else(create_application_default_path, Ok)?;
    Ok(Arc::new(SessionStoreImpl::new(app_dir.join("records"))?))
}

async fn print_stats(store: Arc<SessionStoreImpl>) -> Result<()> {
    let today = chrono::Utc::now().date_naive();
    let totals = queries::today_totals(&store, today).await;

    println!("Today ({})", date_to_record_name(today));
    if totals.is_empty() {
        println!("  no sessions recorded yet");
        return Ok(());
    }
    for (category, total) in &totals {
        println!("  {:<24} {}", paint_category(*category), format_duration(*total));
    }
    let sum: i64 = totals.values().sum();
    println!("  {:<15} {}", "total", format_duration(sum));
    Ok(())
}

async fn print_trend(store: Arc<SessionStoreImpl>, days: i64) -> Result<()> {
    let today = chrono::Utc::now().date_naive();
    let totals = queries::range_totals(&store, today, days).await;

    if totals.is_empty() {
        println!("no sessions recorded in the last {days} days");
        return Ok(());
    }
    for entry in totals {
        println!(
            "{}  {:<24} {}",
            date_to_record_name(entry.date),
            paint_category(entry.category),
            format_duration(entry.total_secs)
        );
    }
    Ok(())
}

async fn print_history(store: Arc<SessionStoreImpl>, limit: usize) -> Result<()> {
    let entries = queries::recent_history(&store, limit, HISTORY_SAMPLE).await;

    if entries.is_empty() {
        println!("no sessions recorded yet");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{}  {:>8}  {:<24} {}",
            date_to_record_name(entry.date),
            format_duration(entry.duration_secs),
            paint_category(entry.category),
            entry.app_name
        );
    }
    Ok(())
}

async fn print_xp(store: Arc<SessionStoreImpl>) -> Result<()> {
    let xp = queries::career_xp(&store).await;
    println!("Career XP: {xp} ({})", format_duration(xp));
    Ok(())
}
