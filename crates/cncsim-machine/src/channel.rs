//! Channel: an independent G-code interpreter driving a subset of axes.
//!
//! The modal dispatch itself replaces
//! `gcodekit5-visualizer::gcode::pipeline::ProcessorPipeline::update_state`'s
//! `cmd_upper.contains("G00")` string search with a typed match over
//! tokenized words — the naive approach can't distinguish `G01` from `G010`
//! or handle more than one G-word per line, both of which real programs do.
//! Feed/spindle override clamping follows the shape of
//! `gcodekit5-communication::firmware::override_manager`.

use cncsim_core::{AxisId, ConfigError, ExecutionError, LengthUnits};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::gcode::{
    arc::expand_arc, tokenize_program, Block, DistanceMode, FeedMode, ModalState, MotionMode,
    PathMode, Plane,
};
use crate::tool::{CutterComp, ToolState};
use crate::work_offset::WorkOffsetTable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisMapping {
    pub axis_id: AxisId,
    /// The G-code letter this mapping answers to (e.g. "X").
    pub display_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
    Idle,
    Running,
    Paused,
    Completed,
    Error,
}

/// A single axis move emitted by the interpreter for this sub-step.
#[derive(Debug, Clone, Copy)]
pub struct AxisCommand {
    pub axis_id: AxisId,
    pub target: f64,
    pub vel_cap: f64,
}

/// Everything `Channel::advance` needs from the rest of the machine but
/// does not own itself (per spec.md §3: channels refer to axes/offsets
/// solely by id, never by pointer).
pub struct AdvanceContext<'a> {
    pub estop: bool,
    pub feed_hold: bool,
    pub axes_settled: bool,
    /// Looser than `axes_settled`: true once every mapped axis is within
    /// `axis::PATH_BLEND_TOLERANCE` of its target. Only consulted in G64
    /// continuous-path mode (spec.md §4.E).
    pub axes_blend_ready: bool,
    pub work_offsets: &'a mut WorkOffsetTable,
    /// Current `max_velocity` (rapid rate) of each axis this channel maps,
    /// snapshotted by the caller for this sub-step.
    pub axis_rapid: HashMap<AxisId, f64>,
}

pub enum AdvanceOutcome {
    Idle,
    Emitted(Vec<AxisCommand>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: cncsim_core::ChannelId,
    pub axes: Vec<AxisMapping>,
    pub program: Vec<Block>,
    #[serde(skip)]
    source_text: String,
    pub pc: usize,
    pub active_pc: Option<usize>,
    pub modal: ModalState,
    pub tool: ToolState,
    pub feed_rate: f64,
    pub spindle_rpm: f64,
    pub spindle_mode: crate::gcode::SpindleMode,
    pub coolant_on: bool,
    pub feed_override_ratio: f64,
    pub single_block: bool,
    pub paused: bool,
    pub is_running: bool,
    pub state: ChannelState,
    pub current_motion: Option<MotionMode>,
    pub programmed_work: HashMap<char, f64>,
    pub pending_target: HashMap<AxisId, f64>,
    pub error_message: Option<String>,
    #[serde(skip)]
    last_work_position: HashMap<char, f64>,
    #[serde(skip)]
    pending_tool: Option<u32>,
    #[serde(skip)]
    arc_queue: VecDeque<HashMap<char, f64>>,
}

impl Channel {
    pub fn new(id: cncsim_core::ChannelId, axes: Vec<AxisMapping>) -> Self {
        Self {
            id,
            axes,
            program: Vec::new(),
            source_text: String::new(),
            pc: 0,
            active_pc: None,
            modal: ModalState::default(),
            tool: ToolState::default(),
            feed_rate: 0.0,
            spindle_rpm: 0.0,
            spindle_mode: crate::gcode::SpindleMode::Off,
            coolant_on: false,
            feed_override_ratio: 1.0,
            single_block: false,
            paused: false,
            is_running: false,
            state: ChannelState::Idle,
            current_motion: None,
            programmed_work: HashMap::new(),
            pending_target: HashMap::new(),
            error_message: None,
            last_work_position: HashMap::new(),
            pending_tool: None,
            arc_queue: VecDeque::new(),
        }
    }

    fn axis_for_letter(&self, letter: char) -> Option<AxisId> {
        self.axes
            .iter()
            .find(|m| m.display_label.eq_ignore_ascii_case(&letter.to_string()))
            .map(|m| m.axis_id)
    }

    pub fn load_program(&mut self, text: impl Into<String>) {
        let text = text.into();
        let lex = tokenize_program(&text);
        for diag in &lex.diagnostics {
            tracing::debug!(line = diag.line, reason = %diag.reason, "gcode parse diagnostic");
        }
        self.program = lex.blocks;
        self.source_text = text;
        self.reset_interpreter_state();
    }

    pub fn reset_program(&mut self) {
        let text = self.source_text.clone();
        self.load_program(text);
    }

    /// Modal defaults on load (spec.md §4.E): G00 G17 G21 G90 G94 G64 G40
    /// G49 M05, coolant off, F=0, S=0. `feed_override_ratio` is explicitly
    /// carried over ("last set") rather than reset — see DESIGN.md.
    fn reset_interpreter_state(&mut self) {
        self.pc = 0;
        self.active_pc = None;
        self.paused = false;
        self.is_running = false;
        self.state = ChannelState::Idle;
        self.current_motion = None;
        self.modal = ModalState::default();
        self.tool.length_comp_active = false;
        self.tool.cutter_comp = CutterComp::Off;
        self.spindle_mode = crate::gcode::SpindleMode::Off;
        self.coolant_on = false;
        self.feed_rate = 0.0;
        self.spindle_rpm = 0.0;
        self.programmed_work.clear();
        self.pending_target.clear();
        self.last_work_position.clear();
        self.pending_tool = None;
        self.arc_queue.clear();
        self.error_message = None;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        if self.paused && self.state == ChannelState::Running {
            self.state = ChannelState::Paused;
        } else if !self.paused && self.state == ChannelState::Paused {
            self.state = ChannelState::Running;
        }
    }

    pub fn jump_blocks(&mut self, delta: i64) {
        let len = self.program.len() as i64;
        let next = (self.pc as i64 + delta).clamp(0, len);
        self.pc = next as usize;
    }

    pub fn set_feed_override(&mut self, ratio: f64) -> Result<(), ConfigError> {
        if ratio < 0.0 {
            return Err(ConfigError::NegativeOverride(ratio));
        }
        self.feed_override_ratio = ratio;
        Ok(())
    }

    pub fn set_single_block(&mut self, enabled: bool) {
        self.single_block = enabled;
    }

    /// Force exactly one block dispatch even while paused, per spec.md
    /// §4.E's `step_once`. Re-pauses afterward when single-block mode is on
    /// (mirroring the boundary pause that a normal dispatch would apply).
    pub fn step_once(&mut self, ctx: &mut AdvanceContext) -> Result<AdvanceOutcome, ExecutionError> {
        let was_paused = self.paused;
        self.paused = false;
        let outcome = self.advance(ctx)?;
        if self.single_block {
            self.paused = true;
        } else {
            self.paused = was_paused && matches!(outcome, AdvanceOutcome::Idle);
        }
        Ok(outcome)
    }

    /// Drives the interpreter forward by at most one dispatch, per the
    /// sub-step rules in spec.md §4.E/§4.F.
    pub fn advance(&mut self, ctx: &mut AdvanceContext) -> Result<AdvanceOutcome, ExecutionError> {
        if self.state == ChannelState::Error {
            self.is_running = false;
            return Ok(AdvanceOutcome::Idle);
        }
        if ctx.estop || ctx.feed_hold || self.paused {
            self.is_running = false;
            return Ok(AdvanceOutcome::Idle);
        }
        if self.pc >= self.program.len() && self.arc_queue.is_empty() {
            if ctx.axes_settled {
                self.is_running = false;
                if self.state == ChannelState::Running {
                    self.state = ChannelState::Completed;
                }
            }
            return Ok(AdvanceOutcome::Idle);
        }
        // G61 exact-stop demands a full settle (position and velocity at
        // rest) before the next block is emitted; G64 continuous-path only
        // needs the axes within blend tolerance of their current target,
        // per spec.md §4.E.
        let ready_for_next = match self.modal.path_mode {
            PathMode::ExactStop => ctx.axes_settled,
            PathMode::Continuous => ctx.axes_settled || ctx.axes_blend_ready,
        };
        if !ready_for_next {
            return Ok(AdvanceOutcome::Idle);
        }

        if let Some(step) = self.arc_queue.pop_front() {
            let cmds = self.axis_commands_for_step(&step, ctx);
            self.is_running = true;
            self.record_pending_targets(&cmds);
            return Ok(AdvanceOutcome::Emitted(cmds));
        }

        let block = self.program[self.pc].clone();
        self.pc += 1;
        self.active_pc = Some(self.pc - 1);
        self.state = ChannelState::Running;

        let cmds = self.interpret_block(&block, ctx)?;
        self.is_running = true;
        self.record_pending_targets(&cmds);
        if self.single_block {
            self.paused = true;
            self.state = ChannelState::Paused;
        }
        Ok(AdvanceOutcome::Emitted(cmds))
    }

    fn interpret_block(
        &mut self,
        block: &Block,
        ctx: &mut AdvanceContext,
    ) -> Result<Vec<AxisCommand>, ExecutionError> {
        let line = block.source_line;

        for g in block.all('G') {
            self.apply_g_word(g.round() as i64, block, ctx, line)?;
        }
        for m in block.all('M') {
            self.apply_m_word(m.round() as i64, line)?;
        }
        if let Some(f) = block.get('F') {
            if f > 0.0 {
                self.feed_rate = f;
            }
        }
        if let Some(s) = block.get('S') {
            self.spindle_rpm = s;
        }
        if let Some(t) = block.get('T') {
            self.pending_tool = Some(t.max(0.0).round() as u32);
        }

        self.dispatch_motion(block, ctx, line)
    }

    fn apply_g_word(
        &mut self,
        code: i64,
        block: &Block,
        ctx: &mut AdvanceContext,
        line: usize,
    ) -> Result<(), ExecutionError> {
        match code {
            0 => self.modal.motion = MotionMode::Rapid,
            1 => self.modal.motion = MotionMode::Linear,
            2 => self.modal.motion = MotionMode::ArcCw,
            3 => self.modal.motion = MotionMode::ArcCcw,
            17 => self.modal.plane = Plane::Xy,
            18 => self.modal.plane = Plane::Xz,
            19 => self.modal.plane = Plane::Yz,
            20 => self.modal.units = LengthUnits::Inches,
            21 => self.modal.units = LengthUnits::Millimeters,
            40 => self.tool.set_cutter_comp(CutterComp::Off, None),
            41 => {
                let d = block.get('D').map(|v| v as u32);
                self.tool.set_cutter_comp(CutterComp::Left, d);
                if self.tool.tool_radius <= 0.0 {
                    return Err(ExecutionError::ZeroRadiusComp { line });
                }
            }
            42 => {
                let d = block.get('D').map(|v| v as u32);
                self.tool.set_cutter_comp(CutterComp::Right, d);
                if self.tool.tool_radius <= 0.0 {
                    return Err(ExecutionError::ZeroRadiusComp { line });
                }
            }
            43 => {
                let h = block.get('H').map(|v| v as u32);
                self.tool.set_tool_length_comp(true, h);
            }
            49 => self.tool.set_tool_length_comp(false, None),
            54..=59 => {
                let idx = (code - 54) as usize;
                ctx.work_offsets.set_active_wcs(idx);
            }
            61 => self.modal.path_mode = PathMode::ExactStop,
            64 => self.modal.path_mode = PathMode::Continuous,
            90 => self.modal.distance = DistanceMode::Absolute,
            91 => self.modal.distance = DistanceMode::Incremental,
            94 => self.modal.feed_mode = FeedMode::UnitsPerMinute,
            95 => self.modal.feed_mode = FeedMode::UnitsPerRev,
            _ => {}
        }
        Ok(())
    }

    fn apply_m_word(&mut self, code: i64, line: usize) -> Result<(), ExecutionError> {
        match code {
            0 => self.paused = true,
            3 => self.spindle_mode = crate::gcode::SpindleMode::Cw,
            4 => self.spindle_mode = crate::gcode::SpindleMode::Ccw,
            5 => self.spindle_mode = crate::gcode::SpindleMode::Off,
            6 => {
                let slot = self.pending_tool.take().unwrap_or(self.tool.active_tool);
                if self.tool.length_comp_active && !self.tool.table.contains_key(&slot) {
                    return Err(ExecutionError::MissingToolEntry { line, slot });
                }
                // Only the active slot changes here; length/radius stay
                // whatever they were unless G43/G41/G42 is already active,
                // in which case the new slot's table entry takes over
                // (spec.md §4.E point 2 — a bare M06 must not silently
                // move the applied length/radius out from under a running
                // program). `set_active_tool` (the always-load form) is
                // reserved for the explicit tool-table command surface.
                self.tool.active_tool = slot;
                if self.tool.length_comp_active {
                    let e = self.tool.entry(slot);
                    self.tool.tool_length = e.length;
                }
                if matches!(self.tool.cutter_comp, CutterComp::Left | CutterComp::Right) {
                    let e = self.tool.entry(slot);
                    self.tool.tool_radius = e.radius;
                }
            }
            8 => self.coolant_on = true,
            9 => self.coolant_on = false,
            30 => self.pc = self.program.len(),
            _ => {}
        }
        Ok(())
    }

    const AXIS_LETTERS: [char; 6] = ['X', 'Y', 'Z', 'A', 'B', 'C'];

    fn dispatch_motion(
        &mut self,
        block: &Block,
        ctx: &mut AdvanceContext,
        line: usize,
    ) -> Result<Vec<AxisCommand>, ExecutionError> {
        let has_axis_word = Self::AXIS_LETTERS.iter().any(|&l| block.has(l));
        let is_arc_mode = matches!(self.modal.motion, MotionMode::ArcCw | MotionMode::ArcCcw);
        let has_arc_word = block.has('I') || block.has('J') || block.has('K') || block.has('R');
        if !has_axis_word && !(is_arc_mode && has_arc_word) {
            return Ok(Vec::new());
        }

        if !matches!(self.modal.motion, MotionMode::Rapid) && self.feed_rate <= 0.0 {
            return Err(ExecutionError::ZeroFeed { line });
        }

        let mut work_target = self.last_work_position.clone();
        for &l in &Self::AXIS_LETTERS {
            if let Some(raw) = block.get(l) {
                let mm = self.modal.units.to_mm(raw);
                let new_val = match self.modal.distance {
                    DistanceMode::Absolute => mm,
                    DistanceMode::Incremental => {
                        self.last_work_position.get(&l).copied().unwrap_or(0.0) + mm
                    }
                };
                work_target.insert(l, new_val);
            }
        }

        self.current_motion = Some(self.modal.motion);
        let cmds = if is_arc_mode {
            self.dispatch_arc(block, &work_target, ctx)
        } else {
            self.programmed_work = work_target.clone();
            let prev = self.last_work_position.clone();
            self.last_work_position = work_target.clone();
            let vel_cap = self.effective_feed_mm_per_s();
            self.axis_commands_for_target(&work_target, &prev, ctx, vel_cap)
        };
        Ok(cmds)
    }

    fn plane_letters(&self) -> (char, char, char) {
        match self.modal.plane {
            Plane::Xy => ('X', 'Y', 'Z'),
            Plane::Xz => ('X', 'Z', 'Y'),
            Plane::Yz => ('Y', 'Z', 'X'),
        }
    }

    fn dispatch_arc(
        &mut self,
        block: &Block,
        work_target: &HashMap<char, f64>,
        ctx: &mut AdvanceContext,
    ) -> Vec<AxisCommand> {
        let (lu, lv, lt) = self.plane_letters();
        let start_u = self.last_work_position.get(&lu).copied().unwrap_or(0.0);
        let start_v = self.last_work_position.get(&lv).copied().unwrap_or(0.0);
        let start_t = self.last_work_position.get(&lt).copied().unwrap_or(0.0);
        let end_u = work_target.get(&lu).copied().unwrap_or(start_u);
        let end_v = work_target.get(&lv).copied().unwrap_or(start_v);
        let end_t = work_target.get(&lt).copied().unwrap_or(start_t);

        let (center_u, center_v) = if let Some(r) = block.get('R') {
            self.arc_center_from_radius(start_u, start_v, end_u, end_v, self.modal.units.to_mm(r))
        } else {
            let (il, jl) = match self.modal.plane {
                Plane::Xy => ('I', 'J'),
                Plane::Xz => ('I', 'K'),
                Plane::Yz => ('J', 'K'),
            };
            let off_u = self.modal.units.to_mm(block.get(il).unwrap_or(0.0));
            let off_v = self.modal.units.to_mm(block.get(jl).unwrap_or(0.0));
            (start_u + off_u, start_v + off_v)
        };

        let clockwise = matches!(self.modal.motion, MotionMode::ArcCw);
        let points = expand_arc(start_u, start_v, end_u, end_v, center_u, center_v, clockwise);
        let n = points.len().max(1);

        self.programmed_work = work_target.clone();
        // `last_work_position` is updated incrementally, one arc sub-step
        // at a time, inside `axis_commands_for_step` — not wholesale here —
        // so each sub-step's delta is computed against the position it
        // actually advances from, not the arc's final endpoint.

        self.arc_queue.clear();
        for (i, p) in points.iter().enumerate() {
            let t = (i + 1) as f64 / n as f64;
            let mut step = HashMap::new();
            step.insert(lu, p.u);
            step.insert(lv, p.v);
            step.insert(lt, start_t + (end_t - start_t) * t);
            self.arc_queue.push_back(step);
        }

        let first = self.arc_queue.pop_front().unwrap_or_default();
        self.axis_commands_for_step(&first, ctx)
    }

    /// Standard two-point/radius circle-center resolution: `r >= 0` selects
    /// the minor (<=180 deg) arc, `r < 0` the major arc, matching common
    /// G-code R-word convention.
    fn arc_center_from_radius(
        &self,
        start_u: f64,
        start_v: f64,
        end_u: f64,
        end_v: f64,
        r: f64,
    ) -> (f64, f64) {
        let dx = end_u - start_u;
        let dy = end_v - start_v;
        let chord = (dx * dx + dy * dy).sqrt();
        if chord <= f64::EPSILON {
            return (start_u, start_v);
        }
        let h_sq = r * r - (chord / 2.0).powi(2);
        let h = h_sq.max(0.0).sqrt();
        let mx = (start_u + end_u) / 2.0;
        let my = (start_v + end_v) / 2.0;
        let (nx, ny) = (-dy / chord, dx / chord);
        let sign = if r >= 0.0 { 1.0 } else { -1.0 };
        (mx + nx * h * sign, my + ny * h * sign)
    }

    fn effective_feed_mm_per_s(&self) -> f64 {
        let feed_mm = self.modal.units.to_mm(self.feed_rate);
        let per_min = match self.modal.feed_mode {
            FeedMode::UnitsPerMinute => feed_mm,
            FeedMode::UnitsPerRev => feed_mm * self.spindle_rpm.max(0.0),
        };
        (per_min / 60.0) * self.feed_override_ratio.max(0.0)
    }

    fn axis_commands_for_step(&mut self, step: &HashMap<char, f64>, ctx: &mut AdvanceContext) -> Vec<AxisCommand> {
        let prev = self.last_work_position.clone();
        let vel_cap = self.effective_feed_mm_per_s();
        let cmds = self.axis_commands_for_target(step, &prev, ctx, vel_cap);
        for (&k, &v) in step {
            self.last_work_position.insert(k, v);
        }
        cmds
    }

    /// Builds one `AxisCommand` per mapped axis whose work-coordinate
    /// target is present in `work_target`, distributing `vel_cap_total`
    /// across axes in proportion to each axis's share of the Euclidean
    /// displacement (spec.md §9 Open Question: vector-magnitude feed).
    fn axis_commands_for_target(
        &self,
        work_target: &HashMap<char, f64>,
        prev_work: &HashMap<char, f64>,
        ctx: &mut AdvanceContext,
        vel_cap_total: f64,
    ) -> Vec<AxisCommand> {
        let rapid = matches!(self.modal.motion, MotionMode::Rapid);
        let mut deltas: Vec<(char, f64)> = Vec::new();
        let mut total_sq = 0.0;
        for &l in &Self::AXIS_LETTERS {
            if let Some(&target) = work_target.get(&l) {
                let prev = prev_work.get(&l).copied().unwrap_or(target);
                let d = target - prev;
                total_sq += d * d;
                deltas.push((l, d));
            }
        }
        let total = total_sq.sqrt();

        let (lu, lv, _lt) = self.plane_letters();
        let cutter_active = matches!(self.tool.cutter_comp, CutterComp::Left | CutterComp::Right)
            && !rapid
            && matches!(self.modal.motion, MotionMode::Linear);

        let mut adjusted = work_target.clone();
        if cutter_active {
            if let (Some(&eu), Some(&ev)) = (work_target.get(&lu), work_target.get(&lv)) {
                let pu = prev_work.get(&lu).copied().unwrap_or(eu);
                let pv = prev_work.get(&lv).copied().unwrap_or(ev);
                let (du, dv) = (eu - pu, ev - pv);
                let len = (du * du + dv * dv).sqrt();
                if len > f64::EPSILON {
                    let (nx, ny) = (-dv / len, du / len);
                    let sign = if self.tool.cutter_comp == CutterComp::Left { 1.0 } else { -1.0 };
                    let r = self.tool.tool_radius * sign;
                    adjusted.insert(lu, eu + nx * r);
                    adjusted.insert(lv, ev + ny * r);
                }
            }
        }

        let mut out = Vec::new();
        for (l, d) in &deltas {
            let Some(axis_id) = self.axis_for_letter(*l) else { continue };
            let mut machine_target = adjusted.get(l).copied().unwrap_or(0.0) + ctx.work_offsets.active_offset(axis_id);
            if *l == 'Z' && self.tool.length_comp_active {
                machine_target += self.tool.tool_length;
            }
            let axis_rapid_cap = ctx.axis_rapid.get(&axis_id).copied().unwrap_or(vel_cap_total);
            let vel_cap = if rapid {
                axis_rapid_cap
            } else if total > f64::EPSILON {
                // A feed command that would outrun the axis's rapid/traverse
                // rate is capped at rapid (spec.md §4.A tie-break).
                (vel_cap_total * (d.abs() / total)).min(axis_rapid_cap)
            } else {
                vel_cap_total.min(axis_rapid_cap)
            };
            out.push(AxisCommand { axis_id, target: machine_target, vel_cap });
        }
        out
    }

    fn record_pending_targets(&mut self, cmds: &[AxisCommand]) {
        if cmds.is_empty() {
            return;
        }
        self.pending_target.clear();
        for c in cmds {
            self.pending_target.insert(c.axis_id, c.target);
        }
    }

    pub fn mark_error(&mut self, message: String, line: usize) {
        self.state = ChannelState::Error;
        self.is_running = false;
        self.active_pc = Some(line.saturating_sub(1));
        self.error_message = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work_offset::WorkOffsetTable;

    fn channel_xyz() -> Channel {
        Channel::new(
            cncsim_core::ChannelId(0),
            vec![
                AxisMapping { axis_id: AxisId(0), display_label: "X".into() },
                AxisMapping { axis_id: AxisId(1), display_label: "Y".into() },
                AxisMapping { axis_id: AxisId(2), display_label: "Z".into() },
            ],
        )
    }

    fn ctx(offsets: &mut WorkOffsetTable) -> AdvanceContext<'_> {
        let mut rapid = HashMap::new();
        rapid.insert(AxisId(0), 1000.0);
        rapid.insert(AxisId(1), 1000.0);
        rapid.insert(AxisId(2), 1000.0);
        AdvanceContext {
            estop: false,
            feed_hold: false,
            axes_settled: true,
            axes_blend_ready: true,
            work_offsets: offsets,
            axis_rapid: rapid,
        }
    }

    #[test]
    fn single_feed_move_emits_axis_command() {
        let mut ch = channel_xyz();
        ch.load_program("G21\nG90\nG01 X10 F600\n");
        let mut offsets = WorkOffsetTable::new();
        let mut c = ctx(&mut offsets);
        // G21, G90 blocks emit nothing (no motion words).
        assert!(matches!(ch.advance(&mut c).unwrap(), AdvanceOutcome::Emitted(v) if v.is_empty()));
        let mut c = ctx(&mut offsets);
        assert!(matches!(ch.advance(&mut c).unwrap(), AdvanceOutcome::Emitted(v) if v.is_empty()));
        let mut c = ctx(&mut offsets);
        let outcome = ch.advance(&mut c).unwrap();
        match outcome {
            AdvanceOutcome::Emitted(cmds) => {
                assert_eq!(cmds.len(), 1);
                assert_eq!(cmds[0].axis_id, AxisId(0));
                assert!((cmds[0].target - 10.0).abs() < 1e-9);
            }
            _ => panic!("expected motion emission"),
        }
    }

    #[test]
    fn zero_feed_on_linear_move_is_an_execution_error() {
        let mut ch = channel_xyz();
        ch.load_program("G01 X10\n");
        let mut offsets = WorkOffsetTable::new();
        let mut c = ctx(&mut offsets);
        assert!(ch.advance(&mut c).is_err());
    }

    #[test]
    fn incremental_moves_accumulate_on_last_commanded_point() {
        let mut ch = channel_xyz();
        ch.load_program("G91\nG01 X5 F600\nG01 X5\n");
        let mut offsets = WorkOffsetTable::new();
        let mut c = ctx(&mut offsets);
        ch.advance(&mut c).unwrap(); // G91
        let mut c = ctx(&mut offsets);
        let first = ch.advance(&mut c).unwrap();
        if let AdvanceOutcome::Emitted(cmds) = first {
            assert!((cmds[0].target - 5.0).abs() < 1e-9);
        }
        let mut c = ctx(&mut offsets);
        let second = ch.advance(&mut c).unwrap();
        if let AdvanceOutcome::Emitted(cmds) = second {
            assert!((cmds[0].target - 10.0).abs() < 1e-9);
        } else {
            panic!("expected second move");
        }
    }

    #[test]
    fn single_block_pauses_after_each_emission() {
        let mut ch = channel_xyz();
        ch.set_single_block(true);
        ch.load_program("G01 X1 F600\nG01 X2\n");
        let mut offsets = WorkOffsetTable::new();
        let mut c = ctx(&mut offsets);
        ch.advance(&mut c).unwrap();
        assert!(ch.paused);
        assert_eq!(ch.active_pc, Some(0));
    }

    #[test]
    fn exact_stop_waits_for_full_settle_even_when_blend_ready() {
        let mut ch = channel_xyz();
        ch.load_program("G61\nG01 X10 F600\nG01 X20\n");
        let mut offsets = WorkOffsetTable::new();
        ch.advance(&mut ctx(&mut offsets)).unwrap(); // G61
        ch.advance(&mut ctx(&mut offsets)).unwrap(); // first G01

        let mut c = ctx(&mut offsets);
        c.axes_settled = false;
        c.axes_blend_ready = true;
        let outcome = ch.advance(&mut c).unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Idle));
        assert_eq!(ch.pc, 2, "G61 must not advance past an unsettled block");
    }

    #[test]
    fn continuous_path_advances_once_blend_ready_without_full_settle() {
        let mut ch = channel_xyz();
        ch.load_program("G64\nG01 X10 F600\nG01 X20\n");
        let mut offsets = WorkOffsetTable::new();
        ch.advance(&mut ctx(&mut offsets)).unwrap(); // G64 (already the default)
        ch.advance(&mut ctx(&mut offsets)).unwrap(); // first G01

        let mut c = ctx(&mut offsets);
        c.axes_settled = false;
        c.axes_blend_ready = true;
        let outcome = ch.advance(&mut c).unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Emitted(_)));
        assert_eq!(ch.pc, 3, "G64 should hand off to the next block once blend-ready");
    }
}
