//! Unified error taxonomy for the kernel.
//!
//! Mirrors the shape of `gcodekit5-core::error`: one `thiserror` enum per
//! concern, unified behind a single `Error`/`Result` pair so callers at the
//! command surface can match on kind without caring which layer raised it.

use thiserror::Error;

/// A line failed to tokenize into a well-formed block.
///
/// Per spec this is always recovered locally (the offending block becomes
/// empty) — it is carried as data on the block, not raised as an exception.
/// The type exists so that diagnostic information has a stable shape.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("line {line}: {reason}")]
pub struct GcodeError {
    pub line: usize,
    pub reason: String,
}

impl GcodeError {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

/// A configuration command was rejected at the command boundary.
///
/// No state changes when this is returned: `add_axis`, `add_channel`,
/// `set_axis_accel`, `set_active_wcs`, and friends validate before mutating.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("axis id {0} is not known")]
    UnknownAxis(u32),
    #[error("channel id {0} is not known")]
    UnknownChannel(u32),
    #[error("axis limits invalid: min {min} > max {max}")]
    InvalidLimits { min: f64, max: f64 },
    #[error("acceleration must be > 0, got {0}")]
    NonPositiveAccel(f64),
    #[error("rapid rate must be > 0, got {0}")]
    NonPositiveRapid(f64),
    #[error("work coordinate system index {0} is out of range")]
    UnknownWcs(usize),
    #[error("channel {channel} references unknown axis id {axis}")]
    ChannelUnknownAxis { channel: u32, axis: u32 },
    #[error("duplicate axis id {0}")]
    DuplicateAxis(u32),
    #[error("duplicate channel id {0}")]
    DuplicateChannel(u32),
    #[error("feed override ratio must be >= 0, got {0}")]
    NegativeOverride(f64),
}

/// A condition that moves a channel to the `ERROR` state mid-program.
///
/// Fatal to the channel, not to the process: the channel halts, and the
/// message + offending `pc` surface on the next snapshot.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("line {line}: feed rate is zero on a motion block")]
    ZeroFeed { line: usize },
    #[error("line {line}: tool slot {slot} has no table entry while length compensation is active")]
    MissingToolEntry { line: usize, slot: u32 },
    #[error("line {line}: cutter compensation requested with zero tool radius")]
    ZeroRadiusComp { line: usize },
}

/// The crate-wide error type. Every fallible public operation returns
/// `Result<T>` built from this.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Gcode(#[from] GcodeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    pub fn is_execution_error(&self) -> bool {
        matches!(self, Error::Execution(_))
    }

    pub fn is_gcode_error(&self) -> bool {
        matches!(self, Error::Gcode(_))
    }
}
