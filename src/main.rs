//! Small CLI demo: builds a three-axis machine, optionally loads a G-code
//! file named on the command line into channel 0, and ticks it to
//! completion while logging the resulting snapshot.
//!
//! This is the only place in the workspace that touches argv or the
//! filesystem — the kernel crates never do (spec §6).

use cncsim::{AxisKind, MachineBrain};
use cncsim_core::ChannelId;
use cncsim_machine::channel::AxisMapping;

fn build_default_machine() -> anyhow::Result<MachineBrain> {
    let mut brain = MachineBrain::new();
    let x = brain.add_axis("X", AxisKind::Linear, -100.0, 100.0)?;
    let y = brain.add_axis("Y", AxisKind::Linear, -100.0, 100.0)?;
    let z = brain.add_axis("Z", AxisKind::Linear, -100.0, 100.0)?;
    brain.set_axis_accel(x, 1000.0)?;
    brain.set_axis_accel(y, 1000.0)?;
    brain.set_axis_accel(z, 1000.0)?;

    brain.add_channel(
        ChannelId(0),
        vec![
            AxisMapping { axis_id: x, display_label: "X".into() },
            AxisMapping { axis_id: y, display_label: "Y".into() },
            AxisMapping { axis_id: z, display_label: "Z".into() },
        ],
    )?;
    brain.add_work_offset("G54");
    Ok(brain)
}

fn run_to_idle(brain: &mut MachineBrain, channel: ChannelId, dt_ms: f64, max_ticks: usize) {
    for _ in 0..max_ticks {
        brain.tick(dt_ms);
        let snapshot = brain.get_full_state();
        let done = snapshot
            .channels
            .iter()
            .find(|c| c.id == channel)
            .map(|c| !c.is_running && c.pc >= c.program.len())
            .unwrap_or(true);
        if done {
            break;
        }
    }
}

fn main() -> anyhow::Result<()> {
    cncsim::init_logging()?;

    let mut brain = build_default_machine()?;
    let channel = ChannelId(0);

    let program = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)?,
        None => "G21\nG90\nG01 X10 Y5 F600\n".to_string(),
    };
    brain.load_program(channel, program)?;

    run_to_idle(&mut brain, channel, 1.0, 200_000);

    let snapshot = brain.get_full_state();
    for axis in &snapshot.axes {
        tracing::info!(axis = %axis.name, position = axis.position, "axis settled");
    }
    Ok(())
}
