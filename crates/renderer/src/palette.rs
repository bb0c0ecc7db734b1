//! Named color palettes precomputed as palette-index lookup tables.
//!
//! A palette maps a normalized value in `[0, 1]` to one of [`RAMP_LEVELS`]
//! ramp colors. Two palette slots are reserved: [`OVERLAY_INDEX`] for
//! gridline pixels and [`TRANSPARENT_INDEX`] for NaN samples, so a rendered
//! frame always fits one indexed PNG palette.

use crate::error::RenderError;

/// Number of ramp entries; indices `0..RAMP_LEVELS` map data values.
pub const RAMP_LEVELS: usize = 254;

/// Palette index used for overlay (gridline) pixels.
pub const OVERLAY_INDEX: u8 = 254;

/// Palette index rendered fully transparent (NaN samples).
pub const TRANSPARENT_INDEX: u8 = 255;

/// Color value in RGBA format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Parse a `#RRGGBB` or `RRGGBB` hex string.
    pub fn from_hex(hex: &str) -> Result<Self, RenderError> {
        let stripped = hex.trim_start_matches('#');
        if stripped.len() != 6 {
            return Err(RenderError::InvalidHexColor(hex.to_string()));
        }

        let parse =
            |s: &str| u8::from_str_radix(s, 16).map_err(|_| RenderError::InvalidHexColor(hex.to_string()));
        Ok(Self::rgb(
            parse(&stripped[0..2])?,
            parse(&stripped[2..4])?,
            parse(&stripped[4..6])?,
        ))
    }
}

/// Linear color interpolation.
fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let t_inv = 1.0 - t;

    Color::new(
        ((color1.r as f32 * t_inv) + (color2.r as f32 * t)) as u8,
        ((color1.g as f32 * t_inv) + (color2.g as f32 * t)) as u8,
        ((color1.b as f32 * t_inv) + (color2.b as f32 * t)) as u8,
        ((color1.a as f32 * t_inv) + (color2.a as f32 * t)) as u8,
    )
}

/// Blue-to-red temperature ramp.
const THERMAL_HEX: [&str; 16] = [
    "000080", "0000D9", "4000FF", "8000FF", "0080FF", "00FFFF", "00FF80", "80FF00", "DAFF00",
    "FFFF00", "FFF500", "FFDA00", "FFB000", "FF7300", "FF0000", "800000",
];

/// Perceptually uniform dark-to-bright ramp, good for reflectivity.
const INFERNO_HEX: [&str; 10] = [
    "000004", "1B0C41", "4A0C6B", "781C6D", "A52C60", "CF4446", "ED6925", "FB9B06", "F7D03C",
    "FCFFA4",
];

/// A named palette with its ramp precomputed.
///
/// The full lookup table is built once at construction; rendering only
/// indexes into it.
#[derive(Debug, Clone)]
pub struct Palette {
    name: String,
    ramp: Vec<Color>,
    overlay: Color,
}

impl Palette {
    /// Look up a built-in palette by name.
    pub fn named(name: &str) -> Result<Self, RenderError> {
        match name {
            "thermal" => Self::from_hex_ramp("thermal", &THERMAL_HEX),
            "inferno" => Self::from_hex_ramp("inferno", &INFERNO_HEX),
            "grayscale" => Self::from_hex_ramp("grayscale", &["000000", "FFFFFF"]),
            other => Err(RenderError::UnknownPalette(other.to_string())),
        }
    }

    /// Build a palette from evenly spaced hex color stops.
    pub fn from_hex_ramp(name: &str, hexes: &[&str]) -> Result<Self, RenderError> {
        if hexes.len() < 2 {
            return Err(RenderError::TooFewStops(hexes.len()));
        }

        let stops = hexes
            .iter()
            .map(|h| Color::from_hex(h))
            .collect::<Result<Vec<_>, _>>()?;

        let segments = stops.len() - 1;
        let mut ramp = Vec::with_capacity(RAMP_LEVELS);
        for i in 0..RAMP_LEVELS {
            let t = i as f32 / (RAMP_LEVELS - 1) as f32;
            let scaled = t * segments as f32;
            let seg = (scaled.floor() as usize).min(segments - 1);
            let frac = scaled - seg as f32;
            ramp.push(interpolate_color(stops[seg], stops[seg + 1], frac));
        }

        Ok(Self {
            name: name.to_string(),
            ramp,
            overlay: Color::rgb(60, 60, 60),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Palette index for a normalized value in `[0, 1]`.
    pub fn index_for(&self, normalized: f32) -> u8 {
        let t = normalized.clamp(0.0, 1.0);
        (t * (RAMP_LEVELS - 1) as f32).round() as u8
    }

    /// Ramp color for a normalized value in `[0, 1]`.
    pub fn color_at(&self, normalized: f32) -> Color {
        self.ramp[self.index_for(normalized) as usize]
    }

    /// Full 256-entry RGBA palette: ramp, overlay slot, transparent slot.
    pub fn plte_entries(&self) -> Vec<(u8, u8, u8, u8)> {
        let mut entries: Vec<(u8, u8, u8, u8)> = self
            .ramp
            .iter()
            .map(|c| (c.r, c.g, c.b, c.a))
            .collect();
        let o = self.overlay;
        entries.push((o.r, o.g, o.b, o.a));
        entries.push((0, 0, 0, 0));
        entries
    }
}
