//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Effective maneuver parameters used for the current run (for JSON details).
pub static LAST_MANEUVER: OnceLock<CliManeuver> = OnceLock::new();

#[derive(Copy, Clone, Debug)]
pub struct CliManeuver {
    pub t_begin: f64,
    pub t_reset: f64,
    pub pd_begin: f64,
    pub pd_target: f64,
    pub termination_time: f64,
    pub command_ms: u64,
}

#[derive(Parser, Debug)]
#[command(name = "pounce", version, about = "Single-servo pounce maneuver CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/pounce.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); defaults to the
    /// config's logging.level, then to info
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
        #[cfg(target_os = "macos")]
        {
            return RtLock::None;
        }
        #[allow(unreachable_code)]
        RtLock::None
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute one pounce maneuver and record its telemetry
    Run(RunArgs),
    /// Quick health check (simulated servo responds)
    SelfCheck,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override: hold phase ends and the push starts at this time (s)
    #[arg(long, value_name = "S")]
    pub t_begin: Option<f64>,

    /// Override: settle ends and the reset starts at this time (s)
    #[arg(long, value_name = "S")]
    pub t_reset: Option<f64>,

    /// Override: position threshold that ends the push (rev)
    #[arg(long, value_name = "REV")]
    pub pd_begin: Option<f64>,

    /// Override: settle position target (rev)
    #[arg(long, value_name = "REV")]
    pub pd_target: Option<f64>,

    /// Override: open-loop push torque (Nm)
    #[arg(long, value_name = "NM")]
    pub feedforward_torque: Option<f64>,

    /// Override: kp scale for position phases
    #[arg(long, value_name = "SCALE")]
    pub kp_scale: Option<f64>,

    /// Override: kd scale for position phases
    #[arg(long, value_name = "SCALE")]
    pub kd_scale: Option<f64>,

    /// Override: torque limit outside the reset phase (Nm)
    #[arg(long, value_name = "NM")]
    pub maximum_torque: Option<f64>,

    /// Override: reduced torque limit for the reset phase (Nm)
    #[arg(long, value_name = "NM")]
    pub reset_torque: Option<f64>,

    /// Override: the run ends at the first sample past this time (s)
    #[arg(long, value_name = "S")]
    pub termination_time: Option<f64>,

    /// Telemetry output path (overrides telemetry.out from the config)
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Servo command timeout in ms (overrides timeouts.command_ms)
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
    #[arg(
        long,
        action = ArgAction::SetTrue,
        long_help = "Enable real-time mode on supported OSes.\n\nLinux: attempts SCHED_FIFO priority, pins to one CPU, and locks process memory to cut page-fault jitter out of the polling loop. May require elevated privileges or ulimits (e.g. memlock).\n\nmacOS: only mlockall is applied; SCHED_FIFO/affinity are unavailable."
    )]
    pub rt: bool,

    /// Real-time priority for SCHED_FIFO on Linux (1..=max); ignored on macOS
    #[arg(
        long,
        value_name = "PRIO",
        long_help = "SCHED_FIFO priority when --rt is enabled (Linux only). Higher values run before lower ones; the value is clamped to the platform range (usually 1..=99)."
    )]
    pub rt_prio: Option<i32>,

    /// Select memory locking mode for --rt: none, current, or all
    #[arg(
        long,
        value_enum,
        value_name = "MODE",
        long_help = "Memory locking mode when --rt is enabled.\n- none: do not lock memory.\n- current: mlockall(MCL_CURRENT).\n- all: mlockall(MCL_CURRENT|MCL_FUTURE).\nDefault: current on Linux, none on macOS."
    )]
    pub rt_lock: Option<RtLock>,

    /// Real-time CPU index to pin the process to (Linux only); defaults to 0
    #[arg(
        long,
        value_name = "CPU",
        long_help = "CPU index to pin the process to when --rt is enabled (Linux only). The value must be allowed by the current affinity mask; otherwise affinity is left unchanged and a warning is logged."
    )]
    pub rt_cpu: Option<usize>,

    /// Print loop-rate stats on completion
    #[arg(long, action = ArgAction::SetTrue)]
    pub stats: bool,
}
