//! `MachineBrain`: the single owned aggregate that hosts the command surface
//! (spec.md §6), owns every entity, and drives the tick loop.
//!
//! There is no teacher equivalent of an orchestrator that owns axes, offsets,
//! tools, and channels in one value and exposes a tagged command surface —
//! `gcodekit5` talks to live firmware over a serial/network link instead. The
//! shape here (one aggregate, copy-out snapshots, `tracing` spans around the
//! tick) follows the logging/instrumentation conventions the teacher uses in
//! its own orchestration code (`gcodekit5-core::core`'s connection manager).

use cncsim_core::{AxisId, ChannelId, ConfigError, ExecutionError, Result};
use std::collections::HashMap;

use crate::axis::{Axis, AxisKind, MAX_STEP_MS};
use crate::channel::{AdvanceContext, AdvanceOutcome, AxisMapping, Channel};
use crate::snapshot::Snapshot;
use crate::tool::CutterComp;
use crate::work_offset::WorkOffsetTable;

/// Which end an axis seeks toward during `home_all`/`home_axis`, and at what
/// speeds. Mirrors the two-phase seek/reseek split `Axis::home` expects.
const DEFAULT_HOME_RAPID: f64 = 500.0;
const DEFAULT_HOME_FEED: f64 = 50.0;

pub struct MachineBrain {
    axes: Vec<Axis>,
    work_offsets: WorkOffsetTable,
    channels: Vec<Channel>,
    estop: bool,
    feed_hold: bool,
    next_axis_id: u32,
    /// Axes still waiting their turn behind a `home_all_ordered` primary,
    /// in registration order; drained one at a time as each finishes.
    home_sequence: Vec<AxisId>,
    home_sequence_rapid: f64,
    home_sequence_feed: f64,
}

impl Default for MachineBrain {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineBrain {
    pub fn new() -> Self {
        Self {
            axes: Vec::new(),
            work_offsets: WorkOffsetTable::new(),
            channels: Vec::new(),
            estop: false,
            feed_hold: false,
            next_axis_id: 0,
            home_sequence: Vec::new(),
            home_sequence_rapid: DEFAULT_HOME_RAPID,
            home_sequence_feed: DEFAULT_HOME_FEED,
        }
    }

    // -- configuration ----------------------------------------------------

    fn axis_index(&self, id: AxisId) -> Option<usize> {
        self.axes.iter().position(|a| a.id == id)
    }

    fn axis_mut(&mut self, id: AxisId) -> std::result::Result<&mut Axis, ConfigError> {
        self.axes
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ConfigError::UnknownAxis(id.0))
    }

    fn channel_mut(&mut self, id: ChannelId) -> std::result::Result<&mut Channel, ConfigError> {
        self.channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ConfigError::UnknownChannel(id.0))
    }

    /// Dense, monotonically assigned axis ids (spec.md §3).
    pub fn add_axis(&mut self, name: impl Into<String>, kind: AxisKind, min: f64, max: f64) -> Result<AxisId> {
        if min > max {
            return Err(ConfigError::InvalidLimits { min, max }.into());
        }
        let id = AxisId(self.next_axis_id);
        self.next_axis_id += 1;
        let axis = Axis::new(id, name, kind, min, max);
        tracing::debug!(axis = %axis.name, id = id.0, "axis added");
        self.axes.push(axis);
        Ok(id)
    }

    pub fn add_channel(&mut self, id: ChannelId, mappings: Vec<AxisMapping>) -> Result<()> {
        if self.channels.iter().any(|c| c.id == id) {
            return Err(ConfigError::DuplicateChannel(id.0).into());
        }
        for m in &mappings {
            if self.axis_index(m.axis_id).is_none() {
                return Err(ConfigError::ChannelUnknownAxis { channel: id.0, axis: m.axis_id.0 }.into());
            }
        }
        self.channels.push(Channel::new(id, mappings));
        Ok(())
    }

    pub fn add_work_offset(&mut self, label: impl Into<String>) -> usize {
        self.work_offsets.add_work_offset(label)
    }

    /// Removes all axes/channels/work offsets but preserves `estop` state
    /// (spec.md §6).
    pub fn clear_config(&mut self) {
        self.axes.clear();
        self.channels.clear();
        self.work_offsets.clear();
        self.next_axis_id = 0;
        self.home_sequence.clear();
    }

    pub fn set_axis_accel(&mut self, id: AxisId, a: f64) -> Result<()> {
        Ok(self.axis_mut(id)?.set_accel(a)?)
    }

    pub fn set_axis_max_velocity(&mut self, id: AxisId, v: f64) -> Result<()> {
        Ok(self.axis_mut(id)?.set_max_velocity(v)?)
    }

    pub fn set_axis_invert(&mut self, id: AxisId, invert: bool) -> Result<()> {
        self.axis_mut(id)?.set_invert(invert);
        Ok(())
    }

    pub fn set_axis_machine_zero(&mut self, id: AxisId, v: f64) -> Result<()> {
        self.axis_mut(id)?.set_machine_zero(v);
        Ok(())
    }

    pub fn set_axis_limits(&mut self, id: AxisId, min: f64, max: f64) -> Result<()> {
        Ok(self.axis_mut(id)?.set_limits(min, max)?)
    }

    // -- runtime ------------------------------------------------------------

    /// Idempotent per spec.md §5/§7: clamps every target to its current
    /// position and zeros velocity while set; clearing it leaves axes where
    /// they stopped.
    pub fn set_estop(&mut self, engaged: bool) {
        self.estop = engaged;
        if engaged {
            tracing::warn!("estop engaged");
            for axis in &mut self.axes {
                axis.freeze();
            }
        }
    }

    pub fn set_feed_hold(&mut self, engaged: bool) {
        self.feed_hold = engaged;
    }

    pub fn home_axis(&mut self, id: AxisId) -> Result<()> {
        let axis = self.axis_mut(id)?;
        axis.home(DEFAULT_HOME_RAPID, DEFAULT_HOME_FEED);
        Ok(())
    }

    pub fn home_all(&mut self) {
        for axis in &mut self.axes {
            axis.home(DEFAULT_HOME_RAPID, DEFAULT_HOME_FEED);
        }
    }

    /// Homes `primary` to completion (driven entirely by repeated `tick`
    /// calls) before starting the rest in registration (axis-id) order.
    /// Since the kernel has no real limit switches, "to completion" here
    /// means the caller must keep calling `tick` until `primary` reports
    /// `homed`; this method only arms the primary and records the pending
    /// order — see `tick`'s homing-sequencer step.
    pub fn home_all_ordered(&mut self, primary: AxisId, rapid: f64, feed: f64) -> Result<()> {
        let axis = self.axis_mut(primary)?;
        axis.home(rapid, feed);
        self.home_sequence = self
            .axes
            .iter()
            .map(|a| a.id)
            .filter(|&id| id != primary)
            .collect();
        self.home_sequence_rapid = rapid;
        self.home_sequence_feed = feed;
        Ok(())
    }

    pub fn jog_axis(&mut self, id: AxisId, delta: f64) -> Result<()> {
        let axis = self.axis_mut(id)?;
        let cap = axis.max_velocity;
        axis.jog(delta, cap);
        Ok(())
    }

    pub fn jog_axis_rapid(&mut self, id: AxisId, delta: f64) -> Result<()> {
        self.jog_axis(id, delta)
    }

    pub fn jog_axis_feed(&mut self, id: AxisId, delta: f64, feed: f64) -> Result<()> {
        let axis = self.axis_mut(id)?;
        axis.jog(delta, feed);
        Ok(())
    }

    pub fn move_to(&mut self, id: AxisId, target: f64) -> Result<()> {
        let axis = self.axis_mut(id)?;
        let cap = axis.max_velocity;
        axis.command_target(target, cap);
        Ok(())
    }

    pub fn set_active_wcs(&mut self, index: usize) {
        self.work_offsets.set_active_wcs(index);
    }

    pub fn set_work_zero(&mut self, axis_id: AxisId, wcs_index: usize, machine_pos: f64) -> Result<()> {
        Ok(self.work_offsets.set_work_zero(axis_id, wcs_index, machine_pos)?)
    }

    // -- tooling --------------------------------------------------------

    pub fn set_tool_table_entry(&mut self, channel: ChannelId, slot: u32, length: f64, radius: f64) -> Result<()> {
        self.channel_mut(channel)?.tool.set_tool_table_entry(slot, length, radius);
        Ok(())
    }

    pub fn set_active_tool(&mut self, channel: ChannelId, slot: u32) -> Result<()> {
        self.channel_mut(channel)?.tool.set_active_tool(slot);
        Ok(())
    }

    pub fn set_tool_length(&mut self, channel: ChannelId, v: f64) -> Result<()> {
        self.channel_mut(channel)?.tool.set_tool_length(v);
        Ok(())
    }

    pub fn set_tool_radius(&mut self, channel: ChannelId, v: f64) -> Result<()> {
        self.channel_mut(channel)?.tool.set_tool_radius(v);
        Ok(())
    }

    pub fn set_tool_length_comp(&mut self, channel: ChannelId, active: bool) -> Result<()> {
        self.channel_mut(channel)?.tool.set_tool_length_comp(active, None);
        Ok(())
    }

    pub fn set_cutter_comp(&mut self, channel: ChannelId, mode: CutterComp) -> Result<()> {
        self.channel_mut(channel)?.tool.set_cutter_comp(mode, None);
        Ok(())
    }

    // -- channel ----------------------------------------------------------

    pub fn load_program(&mut self, channel: ChannelId, text: impl Into<String>) -> Result<()> {
        self.channel_mut(channel)?.load_program(text);
        Ok(())
    }

    pub fn reset_program(&mut self, channel: ChannelId) -> Result<()> {
        self.channel_mut(channel)?.reset_program();
        Ok(())
    }

    pub fn toggle_pause(&mut self, channel: ChannelId) -> Result<()> {
        self.channel_mut(channel)?.toggle_pause();
        Ok(())
    }

    pub fn jump_blocks(&mut self, channel: ChannelId, delta: i64) -> Result<()> {
        self.channel_mut(channel)?.jump_blocks(delta);
        Ok(())
    }

    pub fn set_feed_override(&mut self, channel: ChannelId, ratio: f64) -> Result<()> {
        Ok(self.channel_mut(channel)?.set_feed_override(ratio)?)
    }

    pub fn set_single_block(&mut self, channel: ChannelId, enabled: bool) -> Result<()> {
        self.channel_mut(channel)?.set_single_block(enabled);
        Ok(())
    }

    pub fn step_once(&mut self, channel: ChannelId) -> Result<()> {
        let idx = self
            .channels
            .iter()
            .position(|c| c.id == channel)
            .ok_or(ConfigError::UnknownChannel(channel.0))?;
        let (estop, feed_hold) = (self.estop, self.feed_hold);
        let axis_rapid = self.rapid_snapshot_for(idx);
        let axes_settled = self.axes_settled_for(idx);
        let axes_blend_ready = self.axes_blend_ready_for(idx);
        let mut ctx = AdvanceContext {
            estop,
            feed_hold,
            axes_settled,
            axes_blend_ready,
            work_offsets: &mut self.work_offsets,
            axis_rapid,
        };
        let outcome = self.channels[idx].step_once(&mut ctx)?;
        self.apply_outcome(outcome);
        Ok(())
    }

    fn rapid_snapshot_for(&self, channel_idx: usize) -> HashMap<AxisId, f64> {
        self.channels[channel_idx]
            .axes
            .iter()
            .filter_map(|m| self.axes.iter().find(|a| a.id == m.axis_id))
            .map(|a| (a.id, a.max_velocity))
            .collect()
    }

    fn axes_settled_for(&self, channel_idx: usize) -> bool {
        self.channels[channel_idx]
            .axes
            .iter()
            .filter_map(|m| self.axes.iter().find(|a| a.id == m.axis_id))
            .all(|a| a.has_settled())
    }

    /// Looser than `axes_settled_for`: used for G64 continuous-path blending
    /// (spec.md §4.E), where the channel need not wait for the axes to come
    /// to rest before dispatching the next block.
    fn axes_blend_ready_for(&self, channel_idx: usize) -> bool {
        self.channels[channel_idx]
            .axes
            .iter()
            .filter_map(|m| self.axes.iter().find(|a| a.id == m.axis_id))
            .all(|a| a.near_target())
    }

    fn apply_outcome(&mut self, outcome: AdvanceOutcome) {
        if let AdvanceOutcome::Emitted(cmds) = outcome {
            for cmd in cmds {
                if let Some(axis) = self.axes.iter_mut().find(|a| a.id == cmd.axis_id) {
                    axis.command_target(cmd.target, cmd.vel_cap);
                }
            }
        }
    }

    // -- time & observation -------------------------------------------------

    /// Advances simulated time by `dt_ms`, subdivided into sub-steps of at
    /// most `MAX_STEP_MS` (spec.md §4.F). Within each sub-step every
    /// channel's interpreter is advanced (in channel-id order) before any
    /// axis is integrated (in axis-id order), preserving the ordering
    /// guarantee in spec.md §5.
    #[tracing::instrument(skip(self), fields(dt_ms))]
    pub fn tick(&mut self, dt_ms: f64) {
        if dt_ms <= 0.0 {
            return;
        }
        if self.estop {
            for axis in &mut self.axes {
                axis.freeze();
            }
            return;
        }

        let mut remaining = dt_ms;
        while remaining > 1e-9 {
            let step_ms = remaining.min(MAX_STEP_MS);
            self.sub_step(step_ms / 1000.0);
            remaining -= step_ms;
        }
    }

    fn sub_step(&mut self, dt_s: f64) {
        for idx in 0..self.channels.len() {
            let axis_rapid = self.rapid_snapshot_for(idx);
            let axes_settled = self.axes_settled_for(idx);
            let axes_blend_ready = self.axes_blend_ready_for(idx);
            let (estop, feed_hold) = (self.estop, self.feed_hold);
            let mut ctx = AdvanceContext {
                estop,
                feed_hold,
                axes_settled,
                axes_blend_ready,
                work_offsets: &mut self.work_offsets,
                axis_rapid,
            };
            match self.channels[idx].advance(&mut ctx) {
                Ok(outcome) => self.apply_outcome(outcome),
                Err(err) => {
                    let line = match &err {
                        ExecutionError::ZeroFeed { line }
                        | ExecutionError::MissingToolEntry { line, .. }
                        | ExecutionError::ZeroRadiusComp { line } => *line,
                    };
                    tracing::warn!(channel = self.channels[idx].id.0, line, error = %err, "channel entered ERROR");
                    self.channels[idx].mark_error(err.to_string(), line);
                }
            }
        }

        let override_ratios: Vec<f64> = self
            .axes
            .iter()
            .map(|axis| self.override_ratio_for_axis(axis.id))
            .collect();
        for (axis, ratio) in self.axes.iter_mut().zip(override_ratios) {
            axis.integrate(dt_s, ratio);
            axis.advance_homing();
        }
        self.advance_home_sequence();
    }

    /// The feed override of whichever channel currently maps this axis
    /// (1.0 if unmapped or multiple disagree — first match wins, matching
    /// single-owner assumptions elsewhere in this kernel).
    fn override_ratio_for_axis(&self, axis_id: AxisId) -> f64 {
        self.channels
            .iter()
            .find(|c| c.axes.iter().any(|m| m.axis_id == axis_id))
            .map(|c| c.feed_override_ratio)
            .unwrap_or(1.0)
    }

    /// Once the primary axis set up by `home_all_ordered` finishes homing,
    /// arms the remaining axes in registration order, one at a time.
    fn advance_home_sequence(&mut self) {
        if self.home_sequence.is_empty() {
            return;
        }
        let primary_still_homing = self.axes.iter().any(|a| a.is_homing);
        if primary_still_homing {
            return;
        }
        let next = self.home_sequence.remove(0);
        if let Some(axis) = self.axes.iter_mut().find(|a| a.id == next) {
            axis.home(self.home_sequence_rapid, self.home_sequence_feed);
        }
    }

    pub fn is_homing(&self) -> bool {
        self.axes.iter().any(|a| a.is_homing) || !self.home_sequence.is_empty()
    }

    pub fn get_full_state(&self) -> Snapshot {
        Snapshot::capture(&self.axes, &self.work_offsets, &self.channels, self.estop, self.feed_hold)
    }
}
