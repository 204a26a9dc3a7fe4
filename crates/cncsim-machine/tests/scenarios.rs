//! End-to-end scenarios against `MachineBrain`, covering spec.md §8's
//! concrete S1–S6 walkthroughs and a few of the numbered invariants that
//! only show up once a whole machine (not a single module) is driven.

use cncsim_core::ChannelId;
use cncsim_machine::axis::AxisKind;
use cncsim_machine::channel::AxisMapping;
use cncsim_machine::MachineBrain;

const CH: ChannelId = ChannelId(0);

fn tick_until_idle(brain: &mut MachineBrain, dt_ms: f64, max_ticks: usize) {
    for _ in 0..max_ticks {
        brain.tick(dt_ms);
        let s = brain.get_full_state();
        let c = s.channels.iter().find(|c| c.id == CH).unwrap();
        if !c.is_running && c.pc >= c.program.len() {
            break;
        }
    }
}

/// S1: single linear feed, no overshoot, terminal state settles on X=10.
#[test]
fn s1_single_linear_feed_settles_without_overshoot() {
    let mut brain = MachineBrain::new();
    let x = brain.add_axis("X", AxisKind::Linear, -100.0, 100.0).unwrap();
    brain.set_axis_accel(x, 1000.0).unwrap();
    brain
        .add_channel(CH, vec![AxisMapping { axis_id: x, display_label: "X".into() }])
        .unwrap();
    brain.load_program(CH, "G21\nG90\nG01 X10 F600\n").unwrap();

    let mut max_abs = 0.0_f64;
    for _ in 0..200_000 {
        brain.tick(1.0);
        let s = brain.get_full_state();
        max_abs = max_abs.max(s.axes[0].position.abs());
        let c = &s.channels[0];
        if !c.is_running && c.pc >= c.program.len() {
            break;
        }
    }

    let s = brain.get_full_state();
    assert!((s.axes[0].position - 10.0).abs() < 1e-3);
    assert!((s.axes[0].target - 10.0).abs() < 1e-9);
    assert!(s.axes[0].velocity.abs() < 1e-3);
    assert!(!s.channels[0].is_running);
    assert!(max_abs <= 10.0 + 1e-6, "overshot: {max_abs}");
}

/// S2: WCS offset shifts the machine target by the work-zero value.
#[test]
fn s2_wcs_offset_shifts_machine_target() {
    let mut brain = MachineBrain::new();
    let x = brain.add_axis("X", AxisKind::Linear, -100.0, 100.0).unwrap();
    let y = brain.add_axis("Y", AxisKind::Linear, -100.0, 100.0).unwrap();
    let z = brain.add_axis("Z", AxisKind::Linear, -100.0, 100.0).unwrap();
    for a in [x, y, z] {
        brain.set_axis_accel(a, 1000.0).unwrap();
    }
    brain
        .add_channel(
            CH,
            vec![
                AxisMapping { axis_id: x, display_label: "X".into() },
                AxisMapping { axis_id: y, display_label: "Y".into() },
                AxisMapping { axis_id: z, display_label: "Z".into() },
            ],
        )
        .unwrap();
    let wcs = brain.add_work_offset("G54");
    brain.set_work_zero(x, wcs, 5.0).unwrap();
    brain.set_active_wcs(wcs);
    brain.load_program(CH, "G90\nG01 X10 F600\n").unwrap();

    tick_until_idle(&mut brain, 1.0, 200_000);
    let s = brain.get_full_state();
    assert!((s.axes[0].position - 15.0).abs() < 1e-3);
}

/// S3: tool length compensation adds `tool_length` to the machine-Z target.
#[test]
fn s3_tool_length_comp_offsets_z() {
    let mut brain = MachineBrain::new();
    let z = brain.add_axis("Z", AxisKind::Linear, -200.0, 200.0).unwrap();
    brain.set_axis_accel(z, 1000.0).unwrap();
    brain
        .add_channel(CH, vec![AxisMapping { axis_id: z, display_label: "Z".into() }])
        .unwrap();
    brain.set_tool_table_entry(CH, 1, 50.0, 4.0).unwrap();
    brain.set_active_tool(CH, 1).unwrap();
    brain.load_program(CH, "G43 H1\nG01 Z-10 F300\n").unwrap();

    tick_until_idle(&mut brain, 1.0, 200_000);
    let s = brain.get_full_state();
    assert!((s.axes[0].position - 40.0).abs() < 1e-3);
}

/// S4: rapid traverse reaches a far higher peak velocity than a feed move.
#[test]
fn s4_rapid_peak_velocity_exceeds_feed_peak_velocity() {
    let mut brain = MachineBrain::new();
    let x = brain.add_axis("X", AxisKind::Linear, -100.0, 100.0).unwrap();
    brain.set_axis_accel(x, 5000.0).unwrap();
    brain.set_axis_max_velocity(x, 1000.0).unwrap();
    brain
        .add_channel(CH, vec![AxisMapping { axis_id: x, display_label: "X".into() }])
        .unwrap();
    brain.load_program(CH, "G21\nG90\nG00 X100\nG01 X0 F60\n").unwrap();

    let mut rapid_peak = 0.0_f64;
    let mut feed_peak = 0.0_f64;
    for _ in 0..400_000 {
        brain.tick(1.0);
        let s = brain.get_full_state();
        let c = &s.channels[0];
        match c.current_motion {
            Some(cncsim_machine::gcode::MotionMode::Rapid) => {
                rapid_peak = rapid_peak.max(s.axes[0].velocity.abs());
            }
            Some(cncsim_machine::gcode::MotionMode::Linear) => {
                feed_peak = feed_peak.max(s.axes[0].velocity.abs());
            }
            _ => {}
        }
        if !c.is_running && c.pc >= c.program.len() {
            break;
        }
    }
    assert!(rapid_peak > feed_peak * 2.0, "rapid={rapid_peak} feed={feed_peak}");
}

/// S5: single-block mode pauses after each block, resumable via toggle_pause.
#[test]
fn s5_single_block_pauses_between_blocks() {
    let mut brain = MachineBrain::new();
    let x = brain.add_axis("X", AxisKind::Linear, -100.0, 100.0).unwrap();
    brain.set_axis_accel(x, 1000.0).unwrap();
    brain
        .add_channel(CH, vec![AxisMapping { axis_id: x, display_label: "X".into() }])
        .unwrap();
    brain.set_single_block(CH, true).unwrap();
    brain.load_program(CH, "G01 X1 F600\nG01 X2 F600\n").unwrap();

    for _ in 0..50_000 {
        brain.tick(1.0);
        let s = brain.get_full_state();
        if s.channels[0].paused {
            break;
        }
    }
    let s = brain.get_full_state();
    assert!(s.channels[0].paused);
    assert_eq!(s.channels[0].active_pc, Some(0));
    assert_eq!(s.channels[0].pc, 1);

    brain.toggle_pause(CH).unwrap();
    for _ in 0..50_000 {
        brain.tick(1.0);
        let s = brain.get_full_state();
        if s.channels[0].paused && s.channels[0].active_pc == Some(1) {
            break;
        }
    }
    let s = brain.get_full_state();
    assert_eq!(s.channels[0].active_pc, Some(1));
}

/// S6: a CW arc stays on the commanded circle and terminates at the endpoint.
#[test]
fn s6_arc_stays_on_circle_and_terminates_at_endpoint() {
    let mut brain = MachineBrain::new();
    let x = brain.add_axis("X", AxisKind::Linear, -100.0, 100.0).unwrap();
    let y = brain.add_axis("Y", AxisKind::Linear, -100.0, 100.0).unwrap();
    brain.set_axis_accel(x, 2000.0).unwrap();
    brain.set_axis_accel(y, 2000.0).unwrap();
    brain
        .add_channel(
            CH,
            vec![
                AxisMapping { axis_id: x, display_label: "X".into() },
                AxisMapping { axis_id: y, display_label: "Y".into() },
            ],
        )
        .unwrap();
    brain.load_program(CH, "G17\nG90\nG02 X10 Y0 I5 J0 F600\n").unwrap();

    let mut max_radial_error = 0.0_f64;
    for _ in 0..200_000 {
        brain.tick(1.0);
        let s = brain.get_full_state();
        let r = ((s.axes[0].position - 5.0).powi(2) + s.axes[1].position.powi(2)).sqrt();
        max_radial_error = max_radial_error.max((r - 5.0).abs());
        let c = &s.channels[0];
        if !c.is_running && c.pc >= c.program.len() {
            break;
        }
    }
    let s = brain.get_full_state();
    assert!(max_radial_error <= 0.05, "radial error {max_radial_error} exceeds 0.01*radius");
    assert!((s.axes[0].position - 10.0).abs() < 1e-3);
    assert!((s.axes[1].position - 0.0).abs() < 1e-3);
}

/// Invariant 4: estop zeroes velocity and pins target to position on the
/// next tick, regardless of in-flight motion.
#[test]
fn estop_freezes_all_axes_on_next_tick() {
    let mut brain = MachineBrain::new();
    let x = brain.add_axis("X", AxisKind::Linear, -100.0, 100.0).unwrap();
    brain.set_axis_accel(x, 1000.0).unwrap();
    brain
        .add_channel(CH, vec![AxisMapping { axis_id: x, display_label: "X".into() }])
        .unwrap();
    brain.load_program(CH, "G01 X100 F600\n").unwrap();
    for _ in 0..50 {
        brain.tick(1.0);
    }
    let mid = brain.get_full_state();
    assert!(mid.axes[0].velocity.abs() > 0.0, "expected motion in flight before estop");

    brain.set_estop(true);
    brain.tick(1.0);
    let after = brain.get_full_state();
    assert_eq!(after.axes[0].velocity, 0.0);
    assert_eq!(after.axes[0].target, after.axes[0].position);
}

/// Invariant 5: load_program followed by reset_program yields the same
/// pc=0 starting state as the initial load.
#[test]
fn reset_program_matches_initial_load_state() {
    let mut brain = MachineBrain::new();
    let x = brain.add_axis("X", AxisKind::Linear, -100.0, 100.0).unwrap();
    brain.set_axis_accel(x, 1000.0).unwrap();
    brain
        .add_channel(CH, vec![AxisMapping { axis_id: x, display_label: "X".into() }])
        .unwrap();
    brain.load_program(CH, "G01 X5 F600\nG01 X10\n").unwrap();
    for _ in 0..500 {
        brain.tick(1.0);
    }
    brain.reset_program(CH).unwrap();
    let s = brain.get_full_state();
    assert_eq!(s.channels[0].pc, 0);
    assert_eq!(s.channels[0].active_pc, None);
    assert!(!s.channels[0].is_running);
    assert!(!s.channels[0].paused);
}
