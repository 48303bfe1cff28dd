//! Preview the notifications a task row would register.
//!
//! Reads a task record (JSON, camelCase fields), plans and dispatches its
//! reminders against an in-memory scheduler, and prints every registration
//! together with the encoded handle field that would be persisted.

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::Parser;
use nudge::notify::recording::Trigger;
use nudge::{
    Clock, EngineConfig, FixedClock, InMemoryHandleStore, RecordingScheduler, SystemClock,
    TaskNotificationOrchestrator, TaskRecord,
};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Preview the reminder notifications for a task record.
#[derive(Parser)]
#[command(name = "nudge-preview", version, about)]
struct Cli {
    /// Task record JSON file, or `-` for stdin.
    task: PathBuf,

    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretend the current time is this local wall-clock instant
    /// (e.g. `2025-01-01T08:00`).
    #[arg(long, value_parser = parse_local)]
    now: Option<NaiveDateTime>,

    /// Print machine-readable JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Preview {
    task_id: i64,
    state: String,
    now: NaiveDateTime,
    registrations: Vec<nudge::notify::recording::Registration>,
    skipped: usize,
    permission_denied: bool,
    encoded: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => EngineConfig::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => EngineConfig::load_or_default().context("cannot load default config")?,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    let record = read_record(&cli.task)?;
    let clock: Arc<dyn Clock> = match cli.now {
        Some(now) => Arc::new(FixedClock::new(now)),
        None => Arc::new(SystemClock),
    };
    let now = clock.now();

    let scheduler = Arc::new(RecordingScheduler::new());
    let orchestrator = TaskNotificationOrchestrator::new(
        scheduler.clone(),
        Arc::new(InMemoryHandleStore::new()),
        clock,
        config,
    );

    let report = orchestrator
        .on_task_created(&record)
        .await
        .with_context(|| format!("task {} has invalid reminder settings", record.id))?;

    let preview = Preview {
        task_id: report.task_id,
        state: report.state.to_string(),
        now,
        registrations: scheduler.pending(),
        skipped: report.skipped,
        permission_denied: report.permission_denied,
        encoded: report.encoded,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        print_table(&preview);
    }
    Ok(())
}

fn parse_local(s: &str) -> Result<NaiveDateTime, String> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DDTHH:MM, got '{s}'"))
}

fn read_record(path: &Path) -> anyhow::Result<TaskRecord> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("cannot read task record from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("cannot read task record {}", path.display()))?
    };
    serde_json::from_str(&raw).context("cannot parse task record")
}

fn print_table(preview: &Preview) {
    println!("task {}: {} (now {})", preview.task_id, preview.state, preview.now);
    if preview.registrations.is_empty() {
        println!("  no notifications registered");
    }
    for registration in &preview.registrations {
        let when = match &registration.trigger {
            Trigger::At { at } => at.format("%Y-%m-%d %a %H:%M").to_string(),
            Trigger::Periodic { pattern } => pattern.to_string(),
        };
        println!(
            "  {:<10} {:<28} {}",
            registration.handle.as_str(),
            when,
            registration.content.title
        );
    }
    if preview.skipped > 0 {
        println!("  {} registration(s) refused", preview.skipped);
    }
    if preview.permission_denied {
        println!("  notification permission not granted");
    }
    println!("encoded: {}", preview.encoded);
}
