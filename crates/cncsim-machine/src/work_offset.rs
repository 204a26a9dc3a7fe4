//! Work-coordinate systems (G54…G59).
//!
//! The resolution math (`work_to_machine`) is grounded on `rCandle`'s
//! `MachineState::get_work_offset` / `update_machine_position`, the closest
//! retrieved example of a real controller mapping work ↔ machine
//! coordinates through an active offset index.

use cncsim_core::{AxisId, ConfigError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOffset {
    pub label: String,
    pub offsets: HashMap<AxisId, f64>,
}

impl WorkOffset {
    fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            offsets: HashMap::new(),
        }
    }
}

/// Ordered set of work-coordinate systems; insertion order is preserved and
/// the active one is identified by index (spec.md §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkOffsetTable {
    offsets: Vec<WorkOffset>,
    active: usize,
}

impl WorkOffsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_work_offset(&mut self, label: impl Into<String>) -> usize {
        self.offsets.push(WorkOffset::new(label));
        self.offsets.len() - 1
    }

    pub fn set_work_zero(
        &mut self,
        axis_id: AxisId,
        wcs_index: usize,
        machine_pos: f64,
    ) -> Result<(), ConfigError> {
        let wcs = self
            .offsets
            .get_mut(wcs_index)
            .ok_or(ConfigError::UnknownWcs(wcs_index))?;
        wcs.offsets.insert(axis_id, machine_pos);
        Ok(())
    }

    pub fn set_active_wcs(&mut self, index: usize) {
        if self.offsets.is_empty() {
            self.active = 0;
            return;
        }
        self.active = index.min(self.offsets.len() - 1);
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn offset(&self, wcs_index: usize, axis_id: AxisId) -> f64 {
        self.offsets
            .get(wcs_index)
            .and_then(|w| w.offsets.get(&axis_id))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn active_offset(&self, axis_id: AxisId) -> f64 {
        self.offset(self.active, axis_id)
    }

    /// `work_value + offset(active_wcs, axis_id)` per spec.md §4.B.
    pub fn work_to_machine(&self, axis_id: AxisId, work_value: f64) -> f64 {
        work_value + self.active_offset(axis_id)
    }

    pub fn entries(&self) -> &[WorkOffset] {
        &self.offsets
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
        self.active = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_resolve_offset() {
        let mut table = WorkOffsetTable::new();
        let idx = table.add_work_offset("G54");
        assert_eq!(idx, 0);
        table.set_work_zero(AxisId(0), idx, 5.0).unwrap();
        table.set_active_wcs(idx);
        assert_eq!(table.work_to_machine(AxisId(0), 10.0), 15.0);
    }

    #[test]
    fn unknown_wcs_index_is_rejected() {
        let mut table = WorkOffsetTable::new();
        assert!(table.set_work_zero(AxisId(0), 3, 1.0).is_err());
    }

    #[test]
    fn missing_axis_offset_defaults_to_zero() {
        let mut table = WorkOffsetTable::new();
        table.add_work_offset("G54");
        assert_eq!(table.work_to_machine(AxisId(7), 3.0), 3.0);
    }

    #[test]
    fn set_active_wcs_clamps_to_bounds() {
        let mut table = WorkOffsetTable::new();
        table.add_work_offset("G54");
        table.add_work_offset("G55");
        table.set_active_wcs(99);
        assert_eq!(table.active_index(), 1);
    }
}
