//! Color palette indexed by the log's color index.
//!
//! The palette itself is loaded elsewhere (see `pxlog-config`); the engine
//! only resolves indices, falling back for anything out of range.

/// 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Format as `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// One named palette entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteColor {
    pub name: String,
    pub rgb: Rgb,
}

/// Color used when the palette is empty or an index is out of range.
pub const FALLBACK_COLOR: Rgb = Rgb::new(0xFF, 0xFF, 0xFF);

/// Label reported for out-of-range indices.
pub const FALLBACK_NAME: &str = "<fallback>";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<PaletteColor>,
}

impl Palette {
    pub fn new(colors: Vec<PaletteColor>) -> Self {
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn entries(&self) -> &[PaletteColor] {
        &self.colors
    }

    pub fn color(&self, index: u32) -> Rgb {
        self.colors.get(index as usize).map(|c| c.rgb).unwrap_or(FALLBACK_COLOR)
    }

    pub fn name(&self, index: u32) -> &str {
        self.colors.get(index as usize).map(|c| c.name.as_str()).unwrap_or(FALLBACK_NAME)
    }
}
