use std::fmt;
use std::str::FromStr;

use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::error::{StoryError, StoryResult};

/// Number of colors in a photo palette.
pub const PALETTE_LEN: usize = 5;

/// Neutral ramp used when extraction fails and to pad short palettes.
pub const FALLBACK_HEX: [&str; PALETTE_LEN] =
    ["#000000", "#333333", "#666666", "#999999", "#CCCCCC"];

const FALLBACK: [HexColor; PALETTE_LEN] = [
    HexColor::new(0x00, 0x00, 0x00),
    HexColor::new(0x33, 0x33, 0x33),
    HexColor::new(0x66, 0x66, 0x66),
    HexColor::new(0x99, 0x99, 0x99),
    HexColor::new(0xCC, 0xCC, 0xCC),
];

/// An opaque sRGB color that prints as `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(Srgb<u8>);

impl HexColor {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self(Srgb::new(red, green, blue))
    }

    pub fn srgb(self) -> Srgb<u8> {
        self.0
    }

    pub fn rgba(self) -> [u8; 4] {
        [self.0.red, self.0.green, self.0.blue, 255]
    }
}

impl From<Srgb<u8>> for HexColor {
    fn from(c: Srgb<u8>) -> Self {
        Self(c)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0.red, self.0.green, self.0.blue)
    }
}

impl FromStr for HexColor {
    type Err = StoryError;

    fn from_str(s: &str) -> StoryResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(StoryError::invalid_color(format!(
                "expected 6 hex digits, got {s:?}"
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| StoryError::invalid_color(format!("{s:?}: {e}")))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for HexColor {
    type Error = StoryError;

    fn try_from(s: String) -> StoryResult<Self> {
        s.parse()
    }
}

impl From<HexColor> for String {
    fn from(c: HexColor) -> Self {
        c.to_string()
    }
}

/// Exactly five representative colors, most dominant first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette([HexColor; PALETTE_LEN]);

impl Palette {
    pub fn fallback() -> Self {
        Self(FALLBACK)
    }

    /// Takes at most five colors and fills the remaining slots from the
    /// fallback ramp, starting at the index equal to the number already taken.
    pub fn padded(colors: impl IntoIterator<Item = HexColor>) -> Self {
        let mut out = FALLBACK;
        let mut taken = 0;
        for (slot, color) in out.iter_mut().zip(colors) {
            *slot = color;
            taken += 1;
        }
        tracing::debug!(taken, padded = PALETTE_LEN - taken, "palette assembled");
        Self(out)
    }

    pub fn colors(&self) -> &[HexColor] {
        &self.0
    }

    pub fn to_hex(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::fallback()
    }
}
