//! Length-unit conversion.
//!
//! Trimmed down from `gcodekit5-core::units`: the teacher's version also
//! formats/parses human-entered strings (feed rate labels, fractional
//! inches) for a UI text field, none of which the kernel needs — it only
//! ever converts between the machine's base unit (millimetres) and the
//! per-channel G20/G21 modal unit.

/// One inch in millimetres, the conversion factor used throughout.
pub const MM_PER_INCH: f64 = 25.4;

/// The measurement system a channel is currently operating in (G20/G21).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum LengthUnits {
    #[default]
    Millimeters,
    Inches,
}

impl LengthUnits {
    /// Convert a value expressed in `self` units into millimetres.
    pub fn to_mm(self, value: f64) -> f64 {
        match self {
            LengthUnits::Millimeters => value,
            LengthUnits::Inches => value * MM_PER_INCH,
        }
    }

    /// Convert a value expressed in millimetres into `self` units.
    pub fn from_mm(self, value_mm: f64) -> f64 {
        match self {
            LengthUnits::Millimeters => value_mm,
            LengthUnits::Inches => value_mm / MM_PER_INCH,
        }
    }
}

impl std::fmt::Display for LengthUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LengthUnits::Millimeters => write!(f, "mm"),
            LengthUnits::Inches => write!(f, "in"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm_round_trip_is_identity() {
        assert_eq!(LengthUnits::Millimeters.to_mm(12.5), 12.5);
        assert_eq!(LengthUnits::Millimeters.from_mm(12.5), 12.5);
    }

    #[test]
    fn inch_to_mm_matches_known_constant() {
        assert!((LengthUnits::Inches.to_mm(1.0) - 25.4).abs() < 1e-9);
        assert!((LengthUnits::Inches.from_mm(25.4) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn negative_lengths_convert_too() {
        assert!((LengthUnits::Inches.to_mm(-2.0) - (-50.8)).abs() < 1e-9);
    }
}
