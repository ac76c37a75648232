// Shared helpers for subcommands

use std::path::Path;

use pxlog_config::{load_palette, Settings};
use pxlog_engine::Palette;
use pxlog_io::LogStore;
use pxlog_playback::{Playback, PlaybackOptions};

use crate::CliError;

/// Parse `X,Y` into cell coordinates.
pub fn parse_cell(value: &str) -> Result<(u32, u32), String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{value}'"))?;
    let coord = |text: &str| {
        text.trim()
            .parse::<u32>()
            .map_err(|_| format!("'{}' is not an unsigned integer", text.trim()))
    };
    Ok((coord(x)?, coord(y)?))
}

/// Settings from an explicit file, or the per-user file with fallback to defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    match path {
        Some(path) => Ok(Settings::load_from(path)?),
        None => Ok(Settings::load()),
    }
}

/// Palette from the command-line flag, else from settings, else none.
pub fn resolve_palette(flag: Option<&Path>, settings: &Settings) -> Result<Option<Palette>, CliError> {
    match flag.or(settings.palette_path.as_deref()) {
        Some(path) => Ok(Some(load_palette(path)?)),
        None => Ok(None),
    }
}

pub fn open_playback(store: &Path, options: PlaybackOptions) -> Result<Playback, CliError> {
    let store = LogStore::open(store)?;
    Ok(Playback::new(store, options)?)
}

/// Clamp a user-supplied seek target to the log.
pub fn clamp_target(target: u64, total: u64) -> u64 {
    if target > total {
        log::warn!("Target {} is past the last record; using {}", target, total);
        total
    } else {
        target
    }
}
