//! Modal interpreter state: values that persist across blocks until
//! explicitly changed.
//!
//! Shaped like `gcodekit5-visualizer::gcode::parser::GcodeState` — a plain
//! `Copy` struct, one field per modal group, reset to explicit defaults on
//! load — but each group is a typed enum here instead of a raw `u8` with a
//! `match`-based range check, since this is a new implementation rather than
//! a protocol-compatible fork of the teacher's state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionMode {
    Rapid,    // G00
    Linear,   // G01
    ArcCw,    // G02
    ArcCcw,   // G03
}

impl std::fmt::Display for MotionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MotionMode::Rapid => "G00",
            MotionMode::Linear => "G01",
            MotionMode::ArcCw => "G02",
            MotionMode::ArcCcw => "G03",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plane {
    Xy, // G17
    Xz, // G18
    Yz, // G19
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMode {
    Absolute,   // G90
    Incremental, // G91
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedMode {
    UnitsPerMinute, // G94
    UnitsPerRev,    // G95
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathMode {
    ExactStop,  // G61
    Continuous, // G64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpindleMode {
    Off, // M05
    Cw,  // M03
    Ccw, // M04
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalState {
    pub motion: MotionMode,
    pub plane: Plane,
    pub units: cncsim_core::LengthUnits,
    pub distance: DistanceMode,
    pub feed_mode: FeedMode,
    pub path_mode: PathMode,
}

impl Default for ModalState {
    /// Modal defaults on load, per spec.md §4.E: G00 G17 G21 G90 G94 G64.
    fn default() -> Self {
        Self {
            motion: MotionMode::Rapid,
            plane: Plane::Xy,
            units: cncsim_core::LengthUnits::Millimeters,
            distance: DistanceMode::Absolute,
            feed_mode: FeedMode::UnitsPerMinute,
            path_mode: PathMode::Continuous,
        }
    }
}
