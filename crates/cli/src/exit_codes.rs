//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3       | Universal        | I/O or configuration error               |
//! | 30-39   | store            | Ingestion and store codes                |
//! | 40-49   | playback         | Seek and replay codes                    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the mapping functions below

use pxlog_config::ConfigError;
use pxlog_io::StoreError;
use pxlog_playback::PlaybackError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing or unusable input path.
pub const EXIT_USAGE: u8 = 2;

/// I/O error, or a settings/palette file that cannot be used.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Store (30-39)
// =============================================================================

/// A raw log line could not be parsed; no store was written.
pub const EXIT_STORE_MALFORMED: u8 = 30;

/// File is not a store this build can read.
pub const EXIT_STORE_INCOMPATIBLE: u8 = 31;

/// Store data violates an index invariant (chain verification failed).
pub const EXIT_STORE_CORRUPT: u8 = 32;

/// SQLite error while reading or writing the store.
pub const EXIT_STORE_DATABASE: u8 = 33;

// =============================================================================
// Playback (40-49)
// =============================================================================

/// Seek or snapshot target beyond the record count.
pub const EXIT_PLAYBACK_RANGE: u8 = 40;

/// Replay hit an inconsistent record chain.
pub const EXIT_PLAYBACK_INCONSISTENT: u8 = 41;

/// Background replay worker failed.
pub const EXIT_PLAYBACK_WORKER: u8 = 42;

/// Map a StoreError to its exit code.
pub fn store_exit_code(err: &StoreError) -> u8 {
    match err {
        StoreError::NotFound(_) | StoreError::IsDirectory(_) => EXIT_USAGE,
        StoreError::Io(_) => EXIT_IO,
        StoreError::Sqlite(_) => EXIT_STORE_DATABASE,
        StoreError::Malformed { .. } => EXIT_STORE_MALFORMED,
        StoreError::Incompatible(_) => EXIT_STORE_INCOMPATIBLE,
        StoreError::OutOfRange { .. } => EXIT_PLAYBACK_RANGE,
        StoreError::Corrupt(_) => EXIT_STORE_CORRUPT,
    }
}

/// Map a PlaybackError to its exit code.
pub fn playback_exit_code(err: &PlaybackError) -> u8 {
    match err {
        PlaybackError::Store(store) => store_exit_code(store),
        PlaybackError::Grid(_) => EXIT_PLAYBACK_INCONSISTENT,
        PlaybackError::Busy | PlaybackError::NoStore | PlaybackError::WorkerPanicked => EXIT_PLAYBACK_WORKER,
        PlaybackError::InvalidStep | PlaybackError::InvalidInterval => EXIT_USAGE,
    }
}

/// Map a ConfigError to its exit code.
pub fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Read { .. } | ConfigError::Write { .. } => EXIT_IO,
        ConfigError::Settings(_) | ConfigError::Palette { .. } => EXIT_IO,
    }
}
