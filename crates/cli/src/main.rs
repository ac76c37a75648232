// pxlog CLI - headless conversion, inspection and playback of canvas action logs

mod exit_codes;
mod inspect;
mod play;
mod store_ops;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use pxlog_config::ConfigError;
use pxlog_io::StoreError;
use pxlog_playback::PlaybackError;
use tracing_subscriber::EnvFilter;

use exit_codes::{config_exit_code, playback_exit_code, store_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "pxlog")]
#[command(about = "Convert, inspect and replay pixel canvas action logs")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true, env = "PXLOG_SETTINGS", value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a raw tab-separated action log into an indexed store
    #[command(after_help = "\
Examples:
  pxlog convert pixels.log
  pxlog convert pixels.log -o /tmp/canvas.logdb")]
    Convert {
        /// Raw log file
        raw: PathBuf,

        /// Output store (defaults to the raw file with a .logdb extension)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Show canvas dimensions, record count and snapshots of a store
    Info {
        store: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Check record ids and per-cell links
    Verify {
        store: PathBuf,
    },

    /// Persist canvas snapshots to speed up seeking
    #[command(after_help = "\
Examples:
  pxlog snapshot canvas.logdb                 # every snapshot.interval records
  pxlog snapshot canvas.logdb --every 50000
  pxlog snapshot canvas.logdb --at 1200 --at 98000")]
    Snapshot {
        store: PathBuf,

        /// Snapshot every N records
        #[arg(long, value_name = "N", conflicts_with = "at")]
        every: Option<u64>,

        /// Snapshot at these record ids. Repeatable.
        #[arg(long, value_name = "ID")]
        at: Vec<u64>,
    },

    /// Seek to a record and describe canvas cells
    #[command(after_help = "\
Examples:
  pxlog inspect canvas.logdb --at 5000
  pxlog inspect canvas.logdb --at 5000 --cell 10,20 --cell 11,20 --json")]
    Inspect {
        store: PathBuf,

        /// Record id to seek to (clamped to the record count)
        #[arg(long, value_name = "N")]
        at: u64,

        /// Cell to describe, as X,Y. Repeatable.
        #[arg(long, value_name = "X,Y", value_parser = util::parse_cell)]
        cell: Vec<(u32, u32)>,

        /// Palette JSON file (overrides palette.path)
        #[arg(long, value_name = "FILE")]
        palette: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Run the playback loop headlessly
    #[command(after_help = "\
Examples:
  pxlog play canvas.logdb --step 500 --ticks 40
  pxlog play canvas.logdb --from 100000 --step -1000")]
    Play {
        store: PathBuf,

        /// Record id to start from
        #[arg(long, value_name = "N", default_value_t = 0)]
        from: u64,

        /// Records per tick; negative plays backward (overrides playback.defaultStep)
        #[arg(long, value_name = "S", allow_negative_numbers = true)]
        step: Option<i64>,

        /// Maximum number of ticks
        #[arg(long, value_name = "K", default_value_t = 100)]
        ticks: u64,

        /// Replays longer than this run in the background (overrides playback.offloadThreshold)
        #[arg(long, value_name = "T")]
        threshold: Option<u64>,

        /// Delay between ticks in milliseconds (overrides playback.tickMillis)
        #[arg(long, value_name = "MS")]
        tick_ms: Option<u64>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("PXLOG_BUILD_COMMIT"), ")",
        "\nstore format:    1",
        "\nsnapshot format: 1",
        "\ntarget:          ", env!("PXLOG_BUILD_TARGET"),
        "\nprofile:         ", env!("PXLOG_BUILD_PROFILE"),
    )
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("PXLOG_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = util::load_settings(cli.settings.as_deref()).and_then(|settings| match cli.command {
        Commands::Convert { raw, output } => store_ops::cmd_convert(raw, output),
        Commands::Info { store, json } => store_ops::cmd_info(store, json),
        Commands::Verify { store } => store_ops::cmd_verify(store),
        Commands::Snapshot { store, every, at } => store_ops::cmd_snapshot(store, every, at, &settings),
        Commands::Inspect { store, at, cell, palette, json } => {
            inspect::cmd_inspect(store, at, cell, palette, json, &settings)
        }
        Commands::Play { store, from, step, ticks, threshold, tick_ms } => {
            play::cmd_play(store, from, step, ticks, threshold, tick_ms, &settings)
        }
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        let hint = match &err {
            StoreError::Malformed { .. } => {
                Some("each line needs 6 tab-separated fields: time, fingerprint, x, y, color, action".to_string())
            }
            StoreError::Incompatible(_) => Some("re-run `pxlog convert` on the raw log".to_string()),
            StoreError::Corrupt(_) => Some("the store is damaged; convert the raw log again".to_string()),
            _ => None,
        };
        Self { code: store_exit_code(&err), message: err.to_string(), hint }
    }
}

impl From<PlaybackError> for CliError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::Store(store) => store.into(),
            other => {
                let hint = match &other {
                    PlaybackError::Grid(_) => Some("run `pxlog verify` on the store".to_string()),
                    _ => None,
                };
                Self { code: playback_exit_code(&other), message: other.to_string(), hint }
            }
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self { code: config_exit_code(&err), message: err.to_string(), hint: None }
    }
}
