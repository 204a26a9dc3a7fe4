//! # cncsim
//!
//! A deterministic virtual CNC machine kernel: per-axis trapezoidal motion,
//! a modal G/M-code channel interpreter, and a `MachineBrain` orchestrator
//! that owns axes, work offsets, tooling, and channels behind a single
//! command surface.
//!
//! This root crate is the only part of the workspace that touches the
//! filesystem or the process environment (`main.rs`'s CLI demo); the kernel
//! itself (`cncsim-core`, `cncsim-machine`) never does.

#![allow(dead_code)]

pub use cncsim_core::{AxisId, ChannelId, ConfigError, Error, ExecutionError, GcodeError, Result};
pub use cncsim_machine::{
    axis::AxisKind, channel::AxisMapping, tool::CutterComp, Axis, Channel, ChannelState,
    MachineBrain, Snapshot,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration.
///
/// Sets up structured logging with console output, `RUST_LOG` support, and
/// source line numbers — the same `tracing_subscriber` setup the workspace
/// has always used.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();

    Ok(())
}
