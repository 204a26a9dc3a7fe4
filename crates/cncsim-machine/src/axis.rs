//! A single controllable degree of freedom.
//!
//! The trapezoidal profile naming (`cruise_v`, `accel_distance`,
//! `decel_distance`) follows the kinematics vocabulary in
//! `klipper_estimator`'s planner rather than the teacher workspace, which
//! has no motion-integration code of its own — `gcodekit5` talks to real
//! firmware and never simulates a trajectory locally.

use cncsim_core::{AxisId, ConfigError};
use serde::{Deserialize, Serialize};

/// Numerical settle tolerance, per spec recommendation (ε).
pub const EPSILON: f64 = 1e-4;

/// Distance-to-target tolerance for G64 continuous-path blending: much
/// looser than `EPSILON` since it stands in for "close enough to start the
/// next block", not "at rest".
pub const PATH_BLEND_TOLERANCE: f64 = 0.1;

/// Bounded sub-step length used by `MachineBrain::tick`.
pub const MAX_STEP_MS: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisKind {
    Linear,
    Rotary,
}

impl std::fmt::Display for AxisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisKind::Linear => write!(f, "linear"),
            AxisKind::Rotary => write!(f, "rotary"),
        }
    }
}

/// Which stage of the (sensor-less) homing choreography an axis is in.
///
/// There is no physical limit switch in this kernel (spec.md's Non-goals
/// exclude real-motor control), so each stage is driven purely by the axis
/// settling on an internally chosen target rather than by hardware input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HomingStage {
    Seek,
    Backoff,
    Reseek,
    SetZero,
}

/// Fixed travel used for the homing backoff stage, in the axis's base unit.
const HOMING_BACKOFF: f64 = 2.0;
/// Rapid/feed split used internally by the homing sub-machine.
const HOMING_RESEEK_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub id: AxisId,
    pub name: String,
    pub kind: AxisKind,
    pub min: f64,
    pub max: f64,
    pub position: f64,
    pub target: f64,
    pub velocity: f64,
    pub acceleration: f64,
    /// Rapid/traverse velocity cap (units/s). Not named in spec.md's Axis
    /// attribute list, but required for the G00-vs-feed cap distinction in
    /// §8 invariant 2 and scenario S4 to have anywhere to live — see
    /// DESIGN.md Open Question 3.
    pub max_velocity: f64,
    pub invert: bool,
    pub machine_zero: f64,
    pub homed: bool,
    pub is_homing: bool,
    #[serde(skip)]
    homing_stage: Option<HomingStage>,
    #[serde(skip)]
    homing_rapid: f64,
    #[serde(skip)]
    homing_feed: f64,
    #[serde(skip)]
    vel_cap: f64,
    /// Advisory flag: the most recent `command_target` had to clamp its
    /// argument into `[min, max]`. Surfaced on the snapshot, never raised
    /// as an error (spec.md §7 KinematicClamp).
    pub clamped_last_tick: bool,
}

impl Axis {
    pub fn new(id: AxisId, name: impl Into<String>, kind: AxisKind, min: f64, max: f64) -> Self {
        let max_velocity = 1000.0; // mm/s default rapid; tune via set_max_velocity
        Self {
            id,
            name: name.into(),
            kind,
            min,
            max,
            position: 0.0,
            target: 0.0,
            velocity: 0.0,
            acceleration: 100.0,
            max_velocity,
            invert: false,
            machine_zero: 0.0,
            homed: false,
            is_homing: false,
            homing_stage: None,
            homing_rapid: max_velocity,
            homing_feed: max_velocity * HOMING_RESEEK_FACTOR,
            vel_cap: max_velocity,
            clamped_last_tick: false,
        }
    }

    /// Rotary axes with `min == max` are unbounded (spec.md §3 invariant).
    fn is_bounded(&self) -> bool {
        self.kind == AxisKind::Linear || self.min != self.max
    }

    pub fn set_limits(&mut self, min: f64, max: f64) -> Result<(), ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidLimits { min, max });
        }
        self.min = min;
        self.max = max;
        if self.is_bounded() {
            self.position = self.position.clamp(min, max);
            self.target = self.target.clamp(min, max);
        }
        Ok(())
    }

    pub fn set_accel(&mut self, a: f64) -> Result<(), ConfigError> {
        if a <= 0.0 {
            tracing::warn!(axis = %self.name, accel = a, "rejected non-positive acceleration");
            return Err(ConfigError::NonPositiveAccel(a));
        }
        self.acceleration = a;
        Ok(())
    }

    pub fn set_max_velocity(&mut self, v: f64) -> Result<(), ConfigError> {
        if v <= 0.0 {
            return Err(ConfigError::NonPositiveRapid(v));
        }
        self.max_velocity = v;
        Ok(())
    }

    pub fn set_invert(&mut self, invert: bool) {
        self.invert = invert;
    }

    pub fn set_machine_zero(&mut self, v: f64) {
        self.machine_zero = v;
    }

    /// Clamp `t` into `[min, max]` for bounded axes and set it as the new
    /// target; `vel_cap` is the cruise velocity this particular motion may
    /// not exceed (rapid rate for G00, the per-axis feed share otherwise).
    pub fn command_target(&mut self, t: f64, vel_cap: f64) {
        let clamped = if self.is_bounded() { t.clamp(self.min, self.max) } else { t };
        self.clamped_last_tick = (clamped - t).abs() > f64::EPSILON;
        if self.clamped_last_tick {
            tracing::debug!(axis = %self.name, requested = t, clamped, "target clamped to soft limits");
        }
        self.target = clamped;
        self.vel_cap = vel_cap.max(0.0);
    }

    /// Advance `position` toward `target` by `dt` seconds using a
    /// trapezoidal velocity profile, recomputed from the current
    /// `(position, velocity)` every call so a mid-motion target change is
    /// handled without overshoot.
    pub fn integrate(&mut self, dt: f64, override_ratio: f64) {
        if dt <= 0.0 {
            return;
        }
        let remaining = self.target - self.position;
        if remaining.abs() <= EPSILON {
            self.position = self.target;
            self.velocity = 0.0;
            return;
        }

        let dir = remaining.signum();
        let accel = (self.acceleration * override_ratio * override_ratio).max(1e-9);
        let cruise_v = self.vel_cap.max(0.0);
        let v = self.velocity;
        let same_dir = v == 0.0 || v.signum() == dir;

        let new_v = if !same_dir {
            // Wrong-way (or stalled) velocity: kill it first, accelerate next tick.
            let step = accel * dt;
            if v > 0.0 {
                (v - step).max(0.0)
            } else {
                (v + step).min(0.0)
            }
        } else {
            let stopping_dist = (v * v) / (2.0 * accel);
            if stopping_dist >= remaining.abs() {
                // Decelerate to arrive at rest exactly at the target.
                let mag = (v.abs() - accel * dt).max(0.0);
                dir * mag
            } else if v.abs() < cruise_v {
                let mag = (v.abs() + accel * dt).min(cruise_v);
                dir * mag
            } else {
                dir * cruise_v.min(v.abs())
            }
        };

        let avg_v = (v + new_v) / 2.0;
        let mut new_pos = self.position + avg_v * dt;
        // Never overshoot: a step that crosses the target snaps to it.
        if (new_pos - self.target).signum() == dir && (new_pos - self.target).abs() > 1e-9 {
            new_pos = self.target;
            self.position = new_pos;
            self.velocity = 0.0;
            return;
        }
        self.position = new_pos;
        self.velocity = new_v;
    }

    pub fn has_settled(&self) -> bool {
        (self.position - self.target).abs() <= EPSILON
    }

    /// Looser than `has_settled`: true once the axis is within
    /// `PATH_BLEND_TOLERANCE` of its target, regardless of velocity. Used by
    /// G64 continuous-path mode, which (unlike G61 exact-stop) hands off to
    /// the next block without waiting for the axis to come to rest.
    pub fn near_target(&self) -> bool {
        (self.position - self.target).abs() <= PATH_BLEND_TOLERANCE
    }

    /// Immediately freeze the axis in place (used by estop).
    pub fn freeze(&mut self) {
        self.target = self.position;
        self.velocity = 0.0;
    }

    /// Enter the homing sub-machine. `rapid`/`feed` govern the seek and
    /// reseek stage speeds respectively.
    pub fn home(&mut self, rapid: f64, feed: f64) {
        self.is_homing = true;
        self.homed = false;
        self.homing_rapid = rapid;
        self.homing_feed = feed;
        self.homing_stage = Some(HomingStage::Seek);
        let seek_target = if self.invert { self.max } else { self.min };
        self.command_target(seek_target, rapid);
    }

    /// Drive the homing sub-machine forward once the axis has settled on
    /// its current internal target. A no-op when not homing or not yet
    /// settled.
    pub fn advance_homing(&mut self) {
        if !self.is_homing || !self.has_settled() {
            return;
        }
        match self.homing_stage {
            Some(HomingStage::Seek) => {
                let dir = if self.invert { -1.0 } else { 1.0 };
                let backoff_target = (self.target - dir * HOMING_BACKOFF).clamp(self.min, self.max);
                self.homing_stage = Some(HomingStage::Backoff);
                self.command_target(backoff_target, self.homing_rapid);
            }
            Some(HomingStage::Backoff) => {
                let reseek_target = if self.invert { self.max } else { self.min };
                self.homing_stage = Some(HomingStage::Reseek);
                self.command_target(reseek_target, self.homing_feed);
            }
            Some(HomingStage::Reseek) => {
                self.position = self.machine_zero;
                self.target = self.position;
                self.velocity = 0.0;
                self.homed = true;
                self.is_homing = false;
                self.homing_stage = None;
            }
            None => {}
        }
    }

    /// `delta` is applied to the current target (not current position),
    /// matching `command_target(position + delta)` from spec.md §4.A.
    pub fn jog(&mut self, delta: f64, vel_cap: f64) {
        let base = self.target;
        self.command_target(base + delta, vel_cap);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis() -> Axis {
        let mut a = Axis::new(AxisId(0), "X", AxisKind::Linear, -100.0, 100.0);
        a.acceleration = 1000.0;
        a.max_velocity = 1000.0;
        a
    }

    #[test]
    fn settles_without_overshoot() {
        let mut a = axis();
        a.command_target(10.0, 10.0);
        let mut max_abs = 0.0_f64;
        for _ in 0..20000 {
            a.integrate(0.001, 1.0);
            max_abs = max_abs.max(a.position.abs());
            if a.has_settled() {
                break;
            }
        }
        assert!(a.has_settled());
        assert!((a.position - 10.0).abs() < 1e-6);
        assert!(max_abs <= 10.0 + 1e-6, "overshot: {max_abs}");
    }

    #[test]
    fn rejects_non_positive_accel() {
        let mut a = axis();
        assert!(a.set_accel(0.0).is_err());
        assert!(a.set_accel(-5.0).is_err());
        assert_eq!(a.acceleration, 1000.0);
    }

    #[test]
    fn command_target_clamps_and_flags() {
        let mut a = axis();
        a.command_target(500.0, 10.0);
        assert_eq!(a.target, 100.0);
        assert!(a.clamped_last_tick);
    }

    #[test]
    fn retargeting_mid_motion_never_overshoots() {
        let mut a = axis();
        a.command_target(10.0, 10.0);
        for _ in 0..2000 {
            a.integrate(0.001, 1.0);
        }
        a.command_target(-10.0, 10.0);
        let mut max_abs = 0.0_f64;
        for _ in 0..20000 {
            a.integrate(0.001, 1.0);
            max_abs = max_abs.max(a.position.abs());
            if a.has_settled() {
                break;
            }
        }
        assert!((a.position - (-10.0)).abs() < 1e-6);
        assert!(max_abs <= 10.0 + 1e-6);
    }

    #[test]
    fn rotary_axis_with_equal_limits_is_unbounded() {
        let mut a = Axis::new(AxisId(1), "C", AxisKind::Rotary, 0.0, 0.0);
        a.max_velocity = 100.0;
        a.acceleration = 100.0;
        a.command_target(720.0, 100.0);
        assert_eq!(a.target, 720.0);
        assert!(!a.clamped_last_tick);
    }

    #[test]
    fn homing_sequence_reaches_terminal_state() {
        let mut a = axis();
        a.machine_zero = 0.0;
        a.home(50.0, 5.0);
        for _ in 0..200_000 {
            a.integrate(0.001, 1.0);
            a.advance_homing();
            if a.homed {
                break;
            }
        }
        assert!(a.homed);
        assert_eq!(a.position, a.machine_zero);
        assert_eq!(a.target, a.position);
        assert_eq!(a.velocity, 0.0);
        assert!(!a.is_homing);
    }
}
