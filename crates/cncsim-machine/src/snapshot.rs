//! Pull-only, opaque state snapshot (spec.md §4.G).
//!
//! Plain-data, builder-free shape grounded on `gcodekit5-core::data::mod`'s
//! `MachineStatusSnapshot`: one record copied out of owned state on demand,
//! never a handle into it. Field names here are meant to stay stable across
//! changes to the internal representation, same as the teacher's record.

use serde::{Deserialize, Serialize};

use crate::axis::{Axis, AxisKind};
use crate::channel::{Channel, ChannelState};
use crate::gcode::{DistanceMode, FeedMode, MotionMode, PathMode, Plane, SpindleMode};
use crate::tool::CutterComp;
use crate::work_offset::WorkOffsetTable;
use cncsim_core::{AxisId, ChannelId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisSnapshot {
    pub id: AxisId,
    pub name: String,
    pub kind: AxisKind,
    pub position: f64,
    pub target: f64,
    pub velocity: f64,
    pub min: f64,
    pub max: f64,
    pub invert: bool,
    pub machine_zero: f64,
    pub homed: bool,
    pub is_homing: bool,
    pub clamped_last_tick: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOffsetEntry {
    pub axis_id: AxisId,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOffsetSnapshot {
    pub label: String,
    pub offsets: Vec<WorkOffsetEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalStateSnapshot {
    pub motion: MotionMode,
    pub plane: Plane,
    pub units: cncsim_core::LengthUnits,
    pub distance: DistanceMode,
    pub feed_mode: FeedMode,
    pub path_mode: PathMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisMappingSnapshot {
    pub axis_id: AxisId,
    pub display_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    pub axes: Vec<AxisMappingSnapshot>,
    pub pc: usize,
    pub active_pc: Option<usize>,
    /// Re-rendered program listing, one entry per block, in source order.
    pub program: Vec<String>,
    pub modal: ModalStateSnapshot,
    pub feed_rate: f64,
    pub spindle_rpm: f64,
    pub spindle_mode: SpindleMode,
    pub coolant_on: bool,
    pub tool_length: f64,
    pub tool_radius: f64,
    pub length_comp_active: bool,
    pub cutter_comp: CutterComp,
    pub feed_override: f64,
    pub single_block: bool,
    pub paused: bool,
    pub is_running: bool,
    pub state: ChannelState,
    pub current_motion: Option<MotionMode>,
    pub programmed_work: Vec<(char, f64)>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub axes: Vec<AxisSnapshot>,
    pub work_offsets: Vec<WorkOffsetSnapshot>,
    pub active_wcs: usize,
    pub channels: Vec<ChannelSnapshot>,
    pub estop: bool,
    pub feed_hold: bool,
}

impl Snapshot {
    pub fn capture(
        axes: &[Axis],
        work_offsets: &WorkOffsetTable,
        channels: &[Channel],
        estop: bool,
        feed_hold: bool,
    ) -> Self {
        let axis_snapshots = axes
            .iter()
            .map(|a| AxisSnapshot {
                id: a.id,
                name: a.name.clone(),
                kind: a.kind,
                position: a.position,
                target: a.target,
                velocity: a.velocity,
                min: a.min,
                max: a.max,
                invert: a.invert,
                machine_zero: a.machine_zero,
                homed: a.homed,
                is_homing: a.is_homing,
                clamped_last_tick: a.clamped_last_tick,
            })
            .collect();

        let offset_snapshots = work_offsets
            .entries()
            .iter()
            .map(|wcs| WorkOffsetSnapshot {
                label: wcs.label.clone(),
                offsets: wcs
                    .offsets
                    .iter()
                    .map(|(&axis_id, &value)| WorkOffsetEntry { axis_id, value })
                    .collect(),
            })
            .collect();

        let channel_snapshots = channels
            .iter()
            .map(|c| ChannelSnapshot {
                id: c.id,
                axes: c
                    .axes
                    .iter()
                    .map(|m| AxisMappingSnapshot { axis_id: m.axis_id, display_label: m.display_label.clone() })
                    .collect(),
                pc: c.pc,
                active_pc: c.active_pc,
                program: c.program.iter().map(|b| b.reprint()).collect(),
                modal: ModalStateSnapshot {
                    motion: c.modal.motion,
                    plane: c.modal.plane,
                    units: c.modal.units,
                    distance: c.modal.distance,
                    feed_mode: c.modal.feed_mode,
                    path_mode: c.modal.path_mode,
                },
                feed_rate: c.feed_rate,
                spindle_rpm: c.spindle_rpm,
                spindle_mode: c.spindle_mode,
                coolant_on: c.coolant_on,
                tool_length: c.tool.tool_length,
                tool_radius: c.tool.tool_radius,
                length_comp_active: c.tool.length_comp_active,
                cutter_comp: c.tool.cutter_comp,
                feed_override: c.feed_override_ratio,
                single_block: c.single_block,
                paused: c.paused,
                is_running: c.is_running,
                state: c.state,
                current_motion: c.current_motion,
                programmed_work: c.programmed_work.iter().map(|(&l, &v)| (l, v)).collect(),
                error_message: c.error_message.clone(),
            })
            .collect();

        Snapshot {
            axes: axis_snapshots,
            work_offsets: offset_snapshots,
            active_wcs: work_offsets.active_index(),
            channels: channel_snapshots,
            estop,
            feed_hold,
        }
    }
}
