//! Cell colors and color string parsing.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Alpha channel.
    #[inline]
    pub fn alpha(self) -> u8 {
        self.0[3]
    }

    /// True when the color has maximum alpha.
    #[inline]
    pub fn is_opaque(self) -> bool {
        self.alpha() == u8::MAX
    }

    /// Lowercase `#rrggbb` form (alpha dropped).
    pub fn hex_rgb(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }

    /// Convert to an `image` pixel.
    #[inline]
    pub fn pixel(self) -> image::Rgba<u8> {
        image::Rgba(self.0)
    }
}

impl From<image::Rgba<u8>> for Rgba {
    fn from(p: image::Rgba<u8>) -> Self {
        Self(p.0)
    }
}

/// Built-in dead color, used when no explicit or detected color exists.
pub const FALLBACK_DEAD: Rgba = Rgba::new(255, 254, 254, 255);
/// Built-in alive color.
pub const FALLBACK_ALIVE: Rgba = Rgba::new(65, 183, 130, 255);
/// Built-in dying color.
pub const FALLBACK_DYING: Rgba = Rgba::new(40, 57, 74, 255);

/// The three colors a board is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub dead: Rgba,
    pub alive: Rgba,
    pub dying: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            dead: FALLBACK_DEAD,
            alive: FALLBACK_ALIVE,
            dying: FALLBACK_DYING,
        }
    }
}

impl Palette {
    /// Build a palette from colors ordered (dead, alive, dying), padding
    /// missing slots with the fallback colors in the same order.
    pub fn from_ranked(ranked: &[Rgba]) -> Self {
        let fallback = Self::default();
        Self {
            dead: ranked.first().copied().unwrap_or(fallback.dead),
            alive: ranked.get(1).copied().unwrap_or(fallback.alive),
            dying: ranked.get(2).copied().unwrap_or(fallback.dying),
        }
    }

    /// True if `color` is one of the three palette colors.
    #[inline]
    pub fn contains(&self, color: Rgba) -> bool {
        color == self.dead || color == self.alive || color == self.dying
    }

    /// True if every color has maximum alpha.
    pub fn is_opaque(&self) -> bool {
        self.dead.is_opaque() && self.alive.is_opaque() && self.dying.is_opaque()
    }
}

/// How the palette is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PaletteMode {
    /// Colors given by the user (missing ones filled with fallbacks).
    Fixed(Palette),
    /// Colors detected from the most frequent pixels of each decoded image.
    Auto,
}

impl PaletteMode {
    /// The palette to use when no image has been decoded yet.
    pub fn initial(&self) -> Palette {
        match self {
            PaletteMode::Fixed(palette) => *palette,
            PaletteMode::Auto => Palette::default(),
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, PaletteMode::Auto)
    }
}

/// Parse a color string.
///
/// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r,g,b)`,
/// `rgba(r,g,b,a)` and a handful of basic names.
pub fn parse_color(raw: &str, field: &'static str) -> Result<Rgba, ConfigError> {
    let invalid = || ConfigError::InvalidColor {
        field,
        value: raw.to_string(),
    };

    let value = raw.trim().to_ascii_lowercase();
    if value.is_empty() {
        return Err(invalid());
    }

    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(invalid);
    }

    if let Some(body) = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<u8> = body
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;
        return match parts.as_slice() {
            [r, g, b] if value.starts_with("rgb(") => Ok(Rgba::new(*r, *g, *b, 255)),
            [r, g, b, a] if value.starts_with("rgba(") => Ok(Rgba::new(*r, *g, *b, *a)),
            _ => Err(invalid()),
        };
    }

    match value.as_str() {
        "black" => Ok(Rgba::new(0, 0, 0, 255)),
        "white" => Ok(Rgba::new(255, 255, 255, 255)),
        "red" => Ok(Rgba::new(255, 0, 0, 255)),
        "green" => Ok(Rgba::new(0, 128, 0, 255)),
        "blue" => Ok(Rgba::new(0, 0, 255, 255)),
        "transparent" => Ok(Rgba::new(0, 0, 0, 0)),
        _ => Err(invalid()),
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Rgba::new(nibble(0)?, nibble(1)?, nibble(2)?, 255)),
        4 => Some(Rgba::new(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(parse_color("#fff", "c").unwrap(), Rgba::new(255, 255, 255, 255));
        assert_eq!(parse_color("#0f08", "c").unwrap(), Rgba::new(0, 255, 0, 136));
        assert_eq!(
            parse_color("#41B782", "c").unwrap(),
            Rgba::new(65, 183, 130, 255)
        );
        assert_eq!(
            parse_color("#28394a80", "c").unwrap(),
            Rgba::new(40, 57, 74, 128)
        );
    }

    #[test]
    fn test_parse_functional_and_named() {
        assert_eq!(
            parse_color("rgb(1, 2, 3)", "c").unwrap(),
            Rgba::new(1, 2, 3, 255)
        );
        assert_eq!(
            parse_color("rgba(1,2,3,4)", "c").unwrap(),
            Rgba::new(1, 2, 3, 4)
        );
        assert_eq!(parse_color(" White ", "c").unwrap(), Rgba::new(255, 255, 255, 255));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_color("", "c").is_err());
        assert!(parse_color("#12345", "c").is_err());
        assert!(parse_color("#gggggg", "c").is_err());
        assert!(parse_color("rgb(1,2)", "c").is_err());
        assert!(parse_color("rgb(1,2,3,4)", "c").is_err());
        assert!(parse_color("rgb(256,0,0)", "c").is_err());
        assert!(parse_color("chartreuse-ish", "c").is_err());
    }

    #[test]
    fn test_from_ranked_pads_with_fallbacks() {
        let only_one = Palette::from_ranked(&[Rgba::new(1, 2, 3, 255)]);
        assert_eq!(only_one.dead, Rgba::new(1, 2, 3, 255));
        assert_eq!(only_one.alive, FALLBACK_ALIVE);
        assert_eq!(only_one.dying, FALLBACK_DYING);
        assert_eq!(Palette::from_ranked(&[]), Palette::default());
    }

    #[test]
    fn test_hex_rgb() {
        assert_eq!(FALLBACK_ALIVE.hex_rgb(), "#41b782");
    }
}
