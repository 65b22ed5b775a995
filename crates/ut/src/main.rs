//! ut - uitrace CLI
//!
//! Drives an interaction recorder from a script and inspects the JSON
//! exports it writes. Output is JSON on stdout; logs go to stderr.

mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use uitrace::prelude::*;
use uitrace::recorder::{statistics, timestamp};

#[derive(Parser)]
#[command(name = "ut")]
#[command(about = "uitrace - record UI interaction scripts and inspect exports")]
#[command(version)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a script of interactions and export it
    Record {
        #[arg(short, long, default_value = "session")]
        name: String,
        /// Script file; stdin when omitted
        #[arg(long)]
        script: Option<PathBuf>,
        /// Recorder config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Export directory
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show an export
    Show {
        file: String,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Event counts per type
    Stats {
        file: String,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Events matching a type and/or screen
    Filter {
        file: String,
        #[arg(long = "type")]
        event_type: Option<String>,
        #[arg(long)]
        screen: Option<String>,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// List saved exports
    List {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Delete an export
    Delete {
        file: String,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct Output<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Error>,
}

impl<T: Serialize> Output<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
    fn err(e: Error) -> Output<()> {
        Output { success: false, data: None, error: Some(e) }
    }
}

fn print_json<T: Serialize>(output: &T) {
    match serde_json::to_string_pretty(output) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Record { name, script, config, dir } => {
            record(&name, script.as_deref(), config.as_deref(), dir.as_deref())
        }
        Commands::Show { file, all, dir } => show(&file, all, dir.as_deref()),
        Commands::Stats { file, dir } => stats(&file, dir.as_deref()),
        Commands::Filter { file, event_type, screen, dir } => {
            filter(&file, event_type.as_deref(), screen.as_deref(), dir.as_deref())
        }
        Commands::List { dir } => list(dir.as_deref()),
        Commands::Delete { file, dir } => delete(&file, dir.as_deref()),
    };

    if let Err(e) = result {
        if let Some(err) = e.downcast_ref::<Error>() {
            print_json(&Output::<()>::err(err.clone()));
        }
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn open_storage(dir: Option<&Path>) -> Result<ExportStorage> {
    match dir {
        Some(d) => ExportStorage::with_dir(d),
        None => ExportStorage::new(),
    }
}

/// A path on disk, or a file name inside the export directory
fn read_export(file: &str, dir: Option<&Path>) -> Result<String> {
    let path = Path::new(file);
    if path.is_file() {
        return std::fs::read_to_string(path).with_context(|| format!("reading {}", file));
    }
    open_storage(dir)?.load(file)
}

fn load(file: &str, dir: Option<&Path>) -> Result<EventRecorder> {
    let text = read_export(file, dir)?;
    let recorder = EventRecorder::new();
    recorder.load_from_json(&text)?;
    Ok(recorder)
}

fn record(
    name: &str,
    script_path: Option<&Path>,
    config_path: Option<&Path>,
    dir: Option<&Path>,
) -> Result<()> {
    let config = match config_path {
        Some(p) => RecorderConfig::load(p)?,
        None => RecorderConfig::default(),
    };
    let text = match script_path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("reading script {}", p.display()))?,
        None => {
            let mut s = String::new();
            std::io::stdin().read_to_string(&mut s)?;
            s
        }
    };
    let steps = script::parse(&text)?;

    let storage = Arc::new(open_storage(dir)?);
    let recorder = Arc::new(EventRecorder::with_config(config));
    recorder.start();
    let saver = AutoSaver::spawn(recorder.clone(), storage.clone());

    let kept = steps.iter().filter(|s| s.apply(&recorder)).count();
    tracing::debug!(steps = steps.len(), kept, "script applied");

    recorder.stop();
    if let Some(saver) = saver {
        saver.stop();
    }

    let path = recorder
        .export_to_file(storage.as_ref(), name)
        .context("export failed")?;
    print_json(&Output::ok(serde_json::json!({
        "path": path,
        "events": recorder.len(),
        "statistics": recorder.event_statistics(),
    })));
    Ok(())
}

fn show(file: &str, all: bool, dir: Option<&Path>) -> Result<()> {
    let recorder = load(file, dir)?;
    let events = recorder.events();
    let screens: std::collections::BTreeSet<_> = events.iter().map(|e| e.screen.as_str()).collect();
    let mut data = serde_json::json!({
        "file": file,
        "events": events.len(),
        "screens": screens,
        "statistics": statistics(&events),
        "first": events.first().map(|e| e.timestamp.format(timestamp::FORMAT).to_string()),
        "last": events.last().map(|e| e.timestamp.format(timestamp::FORMAT).to_string()),
    });
    if all {
        data["all"] = serde_json::to_value(&events)?;
    }
    print_json(&Output::ok(data));
    Ok(())
}

fn stats(file: &str, dir: Option<&Path>) -> Result<()> {
    let recorder = load(file, dir)?;
    print_json(&Output::ok(recorder.event_statistics()));
    Ok(())
}

fn filter(
    file: &str,
    event_type: Option<&str>,
    screen: Option<&str>,
    dir: Option<&Path>,
) -> Result<()> {
    let recorder = load(file, dir)?;
    let mut events = match event_type {
        Some(t) => recorder.events_by_type(&EventType::from(t)),
        None => recorder.events(),
    };
    if let Some(s) = screen {
        events.retain(|e| e.screen == s);
    }
    print_json(&Output::ok(events));
    Ok(())
}

fn list(dir: Option<&Path>) -> Result<()> {
    let storage = open_storage(dir)?;
    let files = storage.list()?;
    print_json(&Output::ok(serde_json::json!({
        "dir": storage.path(),
        "files": files,
    })));
    Ok(())
}

fn delete(file: &str, dir: Option<&Path>) -> Result<()> {
    let storage = open_storage(dir)?;
    storage.delete(file)?;
    print_json(&Output::ok(serde_json::json!({ "deleted": file })));
    Ok(())
}
