use std::path::PathBuf;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use overtime_sync::{
    client::{OvertimeTracker, SkipReason, SyncOutcome},
    config::ClientConfig,
    models::{DayStatus, MonthKey},
};

#[derive(Parser)]
#[command(name = "overtime")]
#[command(about = "Mark overtime days and keep them in sync with your account")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        username: String,
        #[arg(long, env = "OVERTIME_PASSWORD", hide_env_values = true)]
        password: String,
        /// Repeat the password (defaults to --password)
        #[arg(long)]
        confirm: Option<String>,
    },
    /// Log in and pull your data
    Login {
        username: String,
        #[arg(long, env = "OVERTIME_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the session and the local cache
    Logout,
    /// Merge server data into the local cache and push the result back
    Sync,
    /// Advance a day one step: normal -> half -> full -> normal
    Mark {
        /// Day to change (YYYY-MM-DD), today if omitted
        date: Option<NaiveDate>,
    },
    /// Set a day to an explicit status
    Set {
        date: NaiveDate,
        /// normal, half or full
        status: DayStatus,
    },
    /// Clear every entry of a month
    Reset {
        /// Month as YYYY-M, current month if omitted
        month: Option<MonthKey>,
    },
    /// Show the days and totals of a month
    Stats {
        /// Month as YYYY-M, current month if omitted
        month: Option<MonthKey>,
    },
    /// Write the dataset to a JSON file in a directory
    Export {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Merge a previously exported JSON file into local data
    Import {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::load().context("Failed to load client configuration")?;
    let tracker = OvertimeTracker::open(&config).await?;

    match cli.command {
        Commands::Register { username, password, confirm } => {
            let confirm = confirm.unwrap_or_else(|| password.clone());
            let message = tracker.register(&username, &password, &confirm).await?;
            println!("{}. Log in with `overtime login {}`.", message, username.trim());
        }
        Commands::Login { username, password } => {
            tracker.login(&username, &password).await?;
            println!("Logged in as {}.", username.trim());
            report_sync(&tracker).await;
        }
        Commands::Logout => {
            tracker.logout().await?;
            println!("Logged out; local data removed.");
        }
        Commands::Sync => report_sync(&tracker).await,
        Commands::Mark { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let status = tracker.cycle_day(date).await?;
            println!("{date}: {status}");
        }
        Commands::Set { date, status } => {
            tracker.set_day(date, status).await?;
            println!("{date}: {status}");
        }
        Commands::Reset { month } => {
            let month = month.unwrap_or_else(current_month);
            if tracker.reset_month(&month).await? {
                println!("Cleared {month}.");
            } else {
                println!("Nothing recorded for {month}.");
            }
        }
        Commands::Stats { month } => {
            let month = month.unwrap_or_else(current_month);
            print_month(&tracker, &month).await;
        }
        Commands::Export { dir } => {
            let path = tracker.export_to(&dir).await?;
            println!("Exported to {}", path.display());
        }
        Commands::Import { file } => {
            let months = tracker
                .import_from(&file)
                .await
                .with_context(|| format!("Could not import {}", file.display()))?;
            println!("Imported {months} month(s).");
        }
    }

    tracker.flush_uploads().await;
    Ok(())
}

// Sync failures are reported, not fatal: local data stays usable.
async fn report_sync(tracker: &OvertimeTracker) {
    match tracker.sync().await {
        Ok(SyncOutcome::Synced { at }) => {
            println!("{} at {}", tracker.status().await, at.format("%H:%M"));
        }
        Ok(SyncOutcome::Skipped(SkipReason::NotLoggedIn)) => {
            println!("Not logged in; data is kept locally only.");
        }
        Ok(SyncOutcome::Skipped(SkipReason::AlreadySyncing)) => {
            println!("A sync is already running.");
        }
        Err(err) => {
            println!("{}: {}", tracker.status().await, err);
            if err.is_unauthorized() {
                println!("Your session has expired; run `overtime login` again.");
            }
        }
    }
}

async fn print_month(tracker: &OvertimeTracker, month: &MonthKey) {
    let data = tracker.data().await;
    println!("{}", month);
    if let Some(days) = data.month(&month.to_string()) {
        for (day, status) in days {
            println!("  {:>2}  {}", day, status);
        }
    }

    let stats = tracker.month_stats(month).await;
    println!(
        "full: {}  half: {}  total: {:.1} day(s)",
        stats.full_days, stats.half_days, stats.total_days
    );
}

fn current_month() -> MonthKey {
    MonthKey::from_date(Local::now().date_naive())
}
