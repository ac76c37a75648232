// Palette files
// A JSON object mapping color names to hex strings: { "White": "#FFFFFF", ... }
// Entry order defines the color index.

use std::fs;
use std::path::Path;

use pxlog_engine::palette::{Palette, PaletteColor, Rgb};
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

/// Parse a `#RRGGBB` string.
pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
    let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
    let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
    Some(Rgb::new(r, g, b))
}

/// Parse palette JSON. `origin` only labels errors.
pub fn parse_palette(json: &str, origin: &Path) -> ConfigResult<Palette> {
    let invalid = |reason: String| ConfigError::Palette { path: origin.to_path_buf(), reason };

    let value: Value = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
    let entries = value
        .as_object()
        .ok_or_else(|| invalid("expected an object of name -> \"#RRGGBB\"".to_string()))?;

    let mut colors = Vec::with_capacity(entries.len());
    for (name, hex) in entries {
        let rgb = hex
            .as_str()
            .and_then(hex_to_rgb)
            .ok_or_else(|| invalid(format!("color '{name}' is not a #RRGGBB string")))?;
        colors.push(PaletteColor { name: name.clone(), rgb });
    }
    Ok(Palette::new(colors))
}

/// Load a palette file.
pub fn load_palette(path: &Path) -> ConfigResult<Palette> {
    if path.is_dir() {
        return Err(ConfigError::Palette { path: path.to_path_buf(), reason: "is a directory".to_string() });
    }
    let json = fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    let palette = parse_palette(&json, path)?;
    log::info!("Loaded {} palette colors from {}", palette.len(), path.display());
    Ok(palette)
}
