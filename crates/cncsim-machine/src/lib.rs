//! The virtual CNC kernel: axes, work offsets, tool state, the G-code
//! interpreter, the owning `MachineBrain`, and its snapshot.

pub mod axis;
pub mod brain;
pub mod channel;
pub mod gcode;
pub mod snapshot;
pub mod tool;
pub mod work_offset;

pub use axis::{Axis, AxisKind};
pub use brain::MachineBrain;
pub use channel::{AxisMapping, Channel, ChannelState};
pub use snapshot::Snapshot;
pub use tool::{CutterComp, ToolState, ToolTableEntry};
pub use work_offset::{WorkOffset, WorkOffsetTable};
