//! Tool table and per-channel tool state (G43/G49, G40/G41/G42).
//!
//! This is *not* the teacher's CAM tool catalog (`gcodekit5-core::data::tools::
//! ToolLibrary`, a rich geometry/material/coating model for a tool database
//! UI) — only the naming convention is carried over. The spec's tool model
//! is a slot → (length, radius) map, nothing more; see DESIGN.md for why the
//! table is kept per-channel rather than shared across channels.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolTableEntry {
    pub length: f64,
    pub radius: f64,
}

/// Cutter radius compensation mode (G40/G41/G42).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CutterComp {
    #[default]
    Off,
    Left,
    Right,
}

impl std::fmt::Display for CutterComp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CutterComp::Off => write!(f, "G40"),
            CutterComp::Left => write!(f, "G41"),
            CutterComp::Right => write!(f, "G42"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolState {
    pub table: HashMap<u32, ToolTableEntry>,
    pub active_tool: u32,
    pub tool_length: f64,
    pub tool_radius: f64,
    pub length_comp_active: bool,
    pub cutter_comp: CutterComp,
    pub active_h: u32,
    pub active_d: u32,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            table: HashMap::new(),
            active_tool: 0,
            tool_length: 0.0,
            tool_radius: 0.0,
            length_comp_active: false,
            cutter_comp: CutterComp::Off,
            active_h: 0,
            active_d: 0,
        }
    }
}

impl ToolState {
    pub fn set_tool_table_entry(&mut self, slot: u32, length: f64, radius: f64) {
        self.table.insert(slot, ToolTableEntry { length, radius });
    }

    pub fn entry(&self, slot: u32) -> ToolTableEntry {
        self.table
            .get(&slot)
            .copied()
            .unwrap_or(ToolTableEntry { length: 0.0, radius: 0.0 })
    }

    /// Loads the slot's length/radius into the channel's tool state,
    /// defaulting to 0/0 for slot 0 or a missing slot (spec.md §4.C).
    pub fn set_active_tool(&mut self, slot: u32) {
        self.active_tool = slot;
        let e = self.entry(slot);
        self.tool_length = e.length;
        self.tool_radius = e.radius;
    }

    pub fn set_tool_length(&mut self, v: f64) {
        self.tool_length = v;
    }

    pub fn set_tool_radius(&mut self, v: f64) {
        self.tool_radius = v;
    }

    pub fn set_tool_length_comp(&mut self, active: bool, h: Option<u32>) {
        if let Some(h) = h {
            self.active_h = h;
            let e = self.entry(h);
            self.tool_length = e.length;
        }
        self.length_comp_active = active;
    }

    pub fn set_cutter_comp(&mut self, mode: CutterComp, d: Option<u32>) {
        if let Some(d) = d {
            self.active_d = d;
            let e = self.entry(d);
            self.tool_radius = e.radius;
        }
        self.cutter_comp = mode;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_active_tool_loads_table_entry() {
        let mut s = ToolState::default();
        s.set_tool_table_entry(1, 50.0, 4.0);
        s.set_active_tool(1);
        assert_eq!(s.tool_length, 50.0);
        assert_eq!(s.tool_radius, 4.0);
    }

    #[test]
    fn missing_slot_defaults_to_zero() {
        let mut s = ToolState::default();
        s.set_active_tool(9);
        assert_eq!(s.tool_length, 0.0);
        assert_eq!(s.tool_radius, 0.0);
    }

    #[test]
    fn length_comp_without_h_keeps_current_length() {
        let mut s = ToolState::default();
        s.set_tool_length(12.0);
        s.set_tool_length_comp(true, None);
        assert_eq!(s.tool_length, 12.0);
        assert!(s.length_comp_active);
    }
}
