//! Shared vocabulary for the cncsim virtual machine kernel: error taxonomy,
//! unit conversion, and entity ids. Mirrors `gcodekit5-core`'s role as the
//! dependency-free foundation the rest of the workspace builds on.

pub mod error;
pub mod ids;
pub mod units;

pub use error::{ConfigError, Error, ExecutionError, GcodeError, Result};
pub use ids::{AxisId, ChannelId};
pub use units::LengthUnits;
