//! Microscope/objective calibration table.
//!
//! Maps a descriptive instrument key (instrument, capture resolution,
//! objective magnification) to a micrometers-per-pixel scalar. The table is
//! fixed at compile time; the reserved `"Custom"` key routes to a
//! user-supplied value instead.

use thiserror::Error;

/// Reserved selector that bypasses the table in favor of an ad-hoc value.
pub const CUSTOM_KEY: &str = "Custom";

/// Calibration constants measured per instrument/objective combination.
pub static CALIBRATIONS: &[(&str, f64)] = &[
    ("NIKON TC1 (640 x 480) - 4x", 3.41880341880341),
    ("NIKON TC1 (640 x 480) - 10x", 1.34916351861845),
    ("NIKON TC1 (640 x 480) - 20x", 0.68259385665529),
    ("NIKON TC1 (640 x 480) - 40x", 0.341880341880342),
    ("NIKON Ti (Microscope Room) (772 x 618) - 4x", 2.63157894736842),
    ("NIKON Ti (Microscope Room) (772 x 618) - 10x", 1.07376785139052),
    ("NIKON Ti (Microscope Room) (772 x 618) - 20x", 0.530982849253969),
    ("NIKON Ti (Microscope Room) (772 x 618) - 40x", 0.263157894736842),
    ("INCUCYTE (1408 x 1040) - 4x", 2.82007896221094),
    ("INCUCYTE (1408 x 1040) - 10x", 1.23992560446373),
    ("INCUCYTE (1408 x 1040) - 20x", 0.619962802231866),
    ("ZEISS L12 (OLD) (1388 x 1040) - 5x", 1.30005200208008),
    ("ZEISS L12 (OLD) (1388 x 1040) - 10x", 0.642219510628733),
    ("ZEISS L12 (OLD) (1388 x 1040) - 20x", 0.322206469905916),
    ("ZEISS L12 (OLD) (1388 x 1040) - 40x", 0.160300081753042),
    ("ZEISS L12 (OLD) (1388 x 1040) - 63x", 0.101800857163217),
    ("ZEISS L12 (NEW) (2752 x 2208) - 10x", 0.455083280240284),
    ("ZEISS L12 (NEW) (2752 x 2208) - 20x", 0.227837142010891),
    ("ZEISS L12 (NEW) (2752 x 2208) - 40x", 0.113190034749341),
    ("ZOE TC1 TIFF (2592 x 1944) - 20x", 0.381199252849464),
    ("NIKON TC1 DISSECTING MICROSCOPE - 0.63x", 9.43396226415094),
    ("NIKON TC1 (1280 x 720) - 20x", 1.709401709401705),
    ("NIKON TC1 (1280 x 720) - 10x", 0.674581759309225),
    ("NIKON TC1 (1280 x 720) - 4x", 0.341296928327645),
];

/// Error establishing a micrometers-per-pixel value.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Selected key is neither a table entry nor the custom selector.
    #[error("\"{0}\" does not match any microscope/objective entry")]
    UnknownKey(String),
    /// The custom field did not parse as a number.
    #[error("custom um-per-pixel value {0:?} is not a valid number")]
    InvalidCustomValue(String),
    /// The value parsed but cannot calibrate anything.
    #[error("um-per-pixel must be a positive finite number, got {0}")]
    NonPositive(f64),
}

/// Exact-match lookup. The reserved custom key is not a table entry.
pub fn lookup(key: &str) -> Option<f64> {
    CALIBRATIONS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, um)| *um)
}

/// Resolve the selected key (or the custom field) to a usable scalar.
///
/// The result is guaranteed strictly positive and finite; geometry code
/// downstream relies on that.
pub fn resolve(key: &str, custom_value: &str) -> Result<f64, CalibrationError> {
    if key == CUSTOM_KEY {
        let text = custom_value.trim();
        let um = text
            .parse::<f64>()
            .map_err(|_| CalibrationError::InvalidCustomValue(text.to_string()))?;
        if !um.is_finite() || um <= 0.0 {
            return Err(CalibrationError::NonPositive(um));
        }
        Ok(um)
    } else {
        lookup(key).ok_or_else(|| CalibrationError::UnknownKey(key.to_string()))
    }
}

/// Recover the `(width, height)` capture resolution embedded in a key.
///
/// Scans whitespace tokens for the first one containing an ASCII `'x'` and
/// parses the two sides. Table keys write the resolution as `"(640 x 480)"`,
/// leaving the `'x'` as a lone token, so an empty side falls back to the
/// neighbouring token. Keys without a parseable resolution (the custom
/// selector, magnification-only entries) yield `None`.
pub fn extract_resolution(key: &str) -> Option<(u32, u32)> {
    let tokens: Vec<&str> = key.split_whitespace().collect();
    let pos = tokens.iter().position(|t| t.contains('x'))?;
    let (left, right) = tokens[pos].split_once('x')?;

    let width = parse_dimension(left)
        .or_else(|| pos.checked_sub(1).and_then(|i| parse_dimension(tokens[i])))?;
    let height = parse_dimension(right)
        .or_else(|| tokens.get(pos + 1).and_then(|t| parse_dimension(t)))?;
    Some((width, height))
}

fn parse_dimension(token: &str) -> Option<u32> {
    let digits = token.trim_matches(|c: char| !c.is_ascii_digit());
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
