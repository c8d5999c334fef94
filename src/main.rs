mod clock;
mod config;
mod loops;
mod migrate;
mod models;
mod report;
mod stats;
mod store;
mod streak;
mod tracker;
mod tui;
mod utils;

use anyhow::Result;
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use clock::SystemClock;
use fd_lock::RwLock;
use loops::LoopRegistry;
use report::Reporter;
use std::fs::OpenOptions;
use std::rc::Rc;
use store::{FileStore, RecordStore};
use tracker::Tracker;

#[derive(Parser)]
#[command(name = "burnmeter")]
#[command(about = "A terminal widget that shows the monetary cost of your time", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive tracker
    Start {
        /// Hourly rate for this session (persisted)
        #[arg(short, long)]
        rate: Option<f64>,
        /// End the session after this long (e.g. 8h, 30m)
        #[arg(short, long)]
        timeout: Option<String>,
    },
    /// Print a summary of finished tasks
    Report {
        /// Split the daily counts by mineral category
        #[arg(long)]
        minerals: bool,
    },
    /// Clear the running timer and the current task
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config()?;
    let store = RecordStore::open()?;

    match cli.command {
        Commands::Start { rate, timeout } => {
            let base_dir = FileStore::base_dir()?;
            let lock_path = base_dir.join("burnmeter.lock");
            let lock_file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(lock_path)?;

            let mut lock = RwLock::new(lock_file);
            let _guard = lock.try_write().map_err(|_| {
                anyhow::anyhow!("Another instance of Burnmeter is already running. Please close it before starting a new one.")
            })?;

            migrate::migrate(&store, Utc::now())?;
            let streak = streak::record_login(&store, Local::now().date_naive())?;

            if let Some(rate) = rate {
                store.set_hourly_rate(rate)?;
            }
            let deadline = match timeout {
                Some(t) => {
                    let duration = humantime::parse_duration(&t)?;
                    Some(Utc::now() + chrono::Duration::from_std(duration)?)
                }
                None => None,
            };

            let clock: Rc<dyn clock::Clock> = Rc::new(SystemClock);
            let mut tracker =
                Tracker::new(store.clone(), clock.clone(), config.default_hourly_rate);
            tracker.resume();
            let registry = LoopRegistry::new(store.clone(), clock.clone(), config.default_loop_rate);

            let mut app = tui::App::new(tracker, registry, store.clone(), clock, streak, deadline);
            tui::run_tui(&mut app)?;

            // Final save
            app.tracker.pause()?;

            println!("\nSession ended automatically or by user.");
            let reporter = Reporter::new(store);
            reporter.report(false, Local::now().date_naive())?;
        }
        Commands::Report { minerals } => {
            migrate::migrate(&store, Utc::now())?;
            let reporter = Reporter::new(store);
            reporter.report(minerals, Local::now().date_naive())?;
        }
        Commands::Reset => {
            store.set_timer(0)?;
            store.set_current_task("")?;
            println!("Timer reset.");
        }
    }

    Ok(())
}
