use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use input_automator::capture::RecordingSession;
use input_automator::config::{parse_stop_key, AutomatorConfig};
use input_automator::eventlog::LogStore;
use input_automator::platform::{RdevSink, RdevSource};
use input_automator::processing;
use input_automator::replay::{self, ReplayEngine};

#[derive(Parser, Debug)]
#[command(name = "automator", about = "Record and replay mouse and keyboard input")]
struct Args {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Recordings directory, overrides the configuration
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record input until the stop key is pressed
    Record {
        /// Log name, defaults to a timestamp
        name: Option<String>,

        /// Named key that ends the recording (esc, f8, ...)
        #[arg(long)]
        stop_key: Option<String>,

        /// Keep OS key-repeat duplicates
        #[arg(long)]
        no_compress: bool,

        /// Keep the raw log next to the canonical one
        #[arg(long)]
        keep_raw: bool,

        /// Only write the raw log, skip post-processing
        #[arg(long)]
        raw_only: bool,

        /// Replace an existing log with the same name
        #[arg(long)]
        overwrite: bool,
    },

    /// Replay a recorded log
    Replay {
        name: String,

        /// Number of times to play the log
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        repeat: Option<u32>,

        /// Decimal digits kept from each delay
        #[arg(long)]
        precision: Option<u32>,

        /// Named key that cancels the replay
        #[arg(long)]
        stop_key: Option<String>,
    },

    /// Post-process a raw log into a canonical one
    Compress {
        name: String,

        #[arg(long)]
        no_compress: bool,

        #[arg(long)]
        keep_raw: bool,
    },

    /// List recorded logs
    List {
        /// Include raw logs
        #[arg(long)]
        raw: bool,
    },

    /// Delete a log
    Delete {
        name: String,

        /// Keep the raw log
        #[arg(long)]
        keep_raw: bool,
    },

    /// Rename a log
    Rename {
        old: String,
        new: String,

        /// Leave the raw log under its old name
        #[arg(long)]
        keep_raw_name: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    input_automator::init_tracing();

    let args = Args::parse();
    let mut config = AutomatorConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.dir {
        config.recordings_dir = dir;
    }
    let store = config.store();

    match args.command {
        Command::Record {
            name,
            stop_key,
            no_compress,
            keep_raw,
            raw_only,
            overwrite,
        } => {
            let name = name.unwrap_or_else(|| {
                format!("recording-{}", chrono::Local::now().format("%Y%m%d-%H%M%S"))
            });
            let mut options = config.record_options(name);
            if let Some(key) = stop_key {
                options.stop_key = parse_stop_key(&key)?;
            }
            options.compress_held_keys &= !no_compress;
            options.keep_raw |= keep_raw;
            options.keep_raw_only = raw_only;
            options.overwrite = overwrite;

            eprintln!("Recording... press {} to stop", options.stop_key);
            let session = RecordingSession::new(store, Arc::new(RdevSource::new()));
            let output = tokio::task::spawn_blocking(move || session.start(&options))
                .await?
                .context("recording failed")?;

            println!("Recorded {} events as {}", output.events_recorded, output.name);
            if let Some(canonical) = &output.canonical_log {
                println!("  log: {}", canonical.display());
            }
            if output.raw_retained {
                println!("  raw: {}", output.raw_log.display());
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Replay {
            name,
            repeat,
            precision,
            stop_key,
        } => {
            let mut run_options = config.run_options();
            if let Some(repeat) = repeat {
                run_options.repeat_count = repeat;
            }
            if let Some(key) = stop_key {
                run_options.stop_key = parse_stop_key(&key)?;
            }
            let precision = precision.unwrap_or(config.time_precision);

            let script = replay::compile(&store.log_path(&name), precision)?;
            let mut engine = ReplayEngine::new(Arc::new(RdevSource::new()), RdevSink::new());
            let cancel = engine.cancel_handle();

            eprintln!("Replaying {}... press {} to cancel", name, run_options.stop_key);
            let mut task = tokio::task::spawn_blocking(move || engine.run(&script, &run_options));
            let outcome = tokio::select! {
                joined = &mut task => joined?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl-C received, cancelling replay");
                    cancel.cancel();
                    task.await?
                }
            };
            let result = outcome.context("replay failed")?;

            println!(
                "{} after {} of {} iterations",
                if result.cancelled { "Cancelled" } else { "Finished" },
                result.iterations_completed,
                run_options.repeat_count
            );
            if result.injection_failures.is_empty() {
                Ok(ExitCode::SUCCESS)
            } else {
                for failure in &result.injection_failures {
                    eprintln!("  {}", failure);
                }
                Ok(ExitCode::from(2))
            }
        }

        Command::Compress {
            name,
            no_compress,
            keep_raw,
        } => {
            let raw = if LogStore::is_raw_name(&name) {
                store.log_path(&name)
            } else {
                store.raw_path(&name)
            };
            let mut options = config.post_process_options();
            options.compress_held_keys &= !no_compress;
            options.keep_raw |= keep_raw;

            let canonical = processing::compress(&raw, options)?;
            println!("{}", canonical.display());
            Ok(ExitCode::SUCCESS)
        }

        Command::List { raw } => {
            for name in store.list_logs(raw)? {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Delete { name, keep_raw } => {
            store.delete(&name, !keep_raw)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Rename {
            old,
            new,
            keep_raw_name,
        } => {
            let renamed = store.rename(&old, &new, !keep_raw_name)?;
            println!("{}", renamed);
            Ok(ExitCode::SUCCESS)
        }
    }
}
