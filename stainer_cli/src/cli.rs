//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Effective watchdog of the current run (for JSON error details).
pub static LAST_SAFETY: OnceLock<CliSafety> = OnceLock::new();

#[derive(Copy, Clone, Debug)]
pub struct CliSafety {
    pub switch_wait_ms: u64,
}

#[derive(Parser, Debug)]
#[command(name = "stainer", version, about = "Wood staining machine controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/stainer.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty; results and errors print as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        #[cfg(target_os = "linux")]
        {
            return RtLock::Current;
        }
        #[allow(unreachable_code)]
        RtLock::None
    }
}

/// Real-time knobs of the `run` command.
#[derive(Args, Debug, Clone, Copy)]
pub struct RtOpts {
    /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Enable real-time mode on supported OSes.\n\nLinux: Attempts SCHED_FIFO priority, pins to one CPU, and calls mlockall to keep the process resident. Step pulses are timed in microseconds, so page faults and preemption show up as motor stalls. May require elevated privileges or ulimits (e.g., memlock).\n\nmacOS: Only mlockall is applied."
    )]
    pub rt: bool,
    /// Real-time priority for SCHED_FIFO on Linux (1..=max); ignored on macOS
    #[arg(long, value_name = "PRIO")]
    pub rt_prio: Option<i32>,
    /// Select memory locking mode for --rt: none, current, or all
    #[arg(long, value_enum, value_name = "MODE")]
    pub rt_lock: Option<RtLock>,
    /// CPU index to pin the process to (Linux only). Defaults to 0.
    #[arg(long, value_name = "CPU")]
    pub rt_cpu: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the configured passes on the real machine (GPIO), then halt
    ///
    /// A running pass cannot be interrupted; Ctrl-C ends the halt blink.
    Run {
        #[command(flatten)]
        rt: RtOpts,
    },
    /// Run the configured passes against a simulated rig
    Simulate {
        /// Scenario TOML: axis lengths, operator taps, overrides
        #[arg(long, value_name = "FILE", default_value = "etc/scenario.toml")]
        scenario: PathBuf,
    },
    /// Validate the config and print the pin assignment
    Check,
    /// Print the spray selected for each of the first N strokes of an axis
    SprayPlan {
        #[arg(long, default_value_t = 20)]
        strokes: u32,
    },
}
