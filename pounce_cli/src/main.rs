//! pounce: execute a timed single-servo pounce maneuver and record telemetry.

mod cli;
mod error_fmt;
mod rt;
mod run;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing::warn;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("error report handler failed to install: {e}");
        return ExitCode::from(1);
    }

    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    // Config before tracing: config errors must print even when the
    // subscriber cannot be built from that same config.
    let config = match run::load_config(&cli.config) {
        Ok(c) => c,
        Err(err) => return fail(&err),
    };

    init_tracing(&cli, &config);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed)) {
            warn!(error = %e, "ctrl-c handler not installed; interrupt will kill the process");
        }
    }

    let result = match &cli.cmd {
        Commands::Run(args) => run::run_maneuver(&config, args, shutdown),
        Commands::SelfCheck => run::self_check(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(&err),
    }
}

/// Console layer per --json and the level precedence RUST_LOG > --log-level >
/// config logging.level > info, plus an optional non-blocking JSON file layer
/// per the config's [logging] section.
fn init_tracing(cli: &Cli, config: &pounce_config::Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer, fmt};

    let directive = cli
        .log_level
        .as_deref()
        .or(config.logging.level.as_deref())
        .unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let file_layer = config.logging.file.as_ref().map(|path| {
        let appender = match config.logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(".", path),
            Some("hourly") => tracing_appender::rolling::hourly(".", path),
            _ => tracing_appender::rolling::never(".", path),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_writer(writer).boxed()
    });

    // Logs go to stderr; stdout carries only run output (human or JSON).
    let console = if cli.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().compact().with_writer(std::io::stderr).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
}

/// Print the error (JSON or humanized) to stderr and map it to an exit code.
fn fail(err: &eyre::Report) -> ExitCode {
    if *JSON_MODE.get().unwrap_or(&false) {
        eprintln!("{}", format_error_json(err));
    } else {
        eprintln!("{}", humanize(err));
    }
    ExitCode::from(u8::try_from(exit_code_for_error(err)).unwrap_or(1))
}
