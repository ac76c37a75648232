// pxlog inspect: seek and describe cells

use std::path::PathBuf;

use pxlog_config::Settings;
use pxlog_playback::{CellDescription, PlaybackOptions};
use serde_json::{json, Value};

use crate::util::{clamp_target, open_playback, resolve_palette};
use crate::CliError;

fn cell_json(description: &CellDescription) -> Value {
    let state = &description.state;
    let mut cell = json!({
        "x": description.x,
        "y": description.y,
        "color_index": state.color_index,
        "color_name": description.color_name,
        "color": description.color_hex,
        "count": state.count,
        "virgin": state.is_virgin(),
    });
    if let Some(time) = description.last_time_text() {
        cell["last_action"] = json!(state.last_kind);
        cell["last_time"] = json!(time);
        cell["last_fingerprint"] = json!(state.last_fingerprint);
    }
    cell
}

pub fn cmd_inspect(
    path: PathBuf,
    at: u64,
    cells: Vec<(u32, u32)>,
    palette: Option<PathBuf>,
    json: bool,
    settings: &Settings,
) -> Result<(), CliError> {
    let palette = resolve_palette(palette.as_deref(), settings)?;
    let options = PlaybackOptions { offload_threshold: u64::MAX, ..PlaybackOptions::default() };
    let mut playback = open_playback(&path, options)?;
    if let Some(palette) = palette {
        playback.set_palette(palette);
    }

    let target = clamp_target(at, playback.total());
    playback.seek(target)?;

    let (width, height) = playback.dimensions();
    let mut described = Vec::with_capacity(cells.len());
    for (x, y) in cells {
        let description = playback.describe_cell(x, y).ok_or_else(|| {
            CliError::args(format!("cell ({}, {}) is outside the {}x{} canvas", x, y, width, height))
        })?;
        described.push(description);
    }

    if json {
        let output = json!({
            "cursor": playback.cursor(),
            "total": playback.total(),
            "width": width,
            "height": height,
            "painted_cells": playback.grid().painted_cells(),
            "cells": described.iter().map(cell_json).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output).map_err(|e| CliError::general(e.to_string()))?);
        return Ok(());
    }

    println!("{} / {}  ({}x{}, {} painted cells)", playback.cursor(), playback.total(), width, height, playback.grid().painted_cells());
    for description in &described {
        println!("{}", description);
    }
    Ok(())
}
