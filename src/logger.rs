//! Logging setup for the solver binaries, benches and tests.
//!
//! Installs a `tracing-subscriber` fmt subscriber with a compact bracketed line format:
//!
//! ```text
//! [INFO  2026-10-16 09:14:02.381 equilibrium::solver] message
//! [DEBUG 2026-10-16 09:14:02.382 ipnewton.rs:212] message
//! ```
//!
//! The default level is INFO and can be overridden with `RUST_LOG`, e.g.
//! `RUST_LOG=equilibrium_solver=debug` to see the per-iteration tables.

use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{FmtContext, FormatEvent, FormatFields, format::Writer},
    registry::LookupSpan,
};

const CRATE_PREFIX: &str = "equilibrium_solver::";

/// Install the global subscriber with default level INFO.
///
/// Calling it again after a subscriber is installed has no effect.
///
/// ```no_run
/// equilibrium_solver::init_logger();
/// tracing::info!("solver ready");
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO);
}

/// Install the global subscriber with `default_level` (overridable through `RUST_LOG`).
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logger_with_level(default_level: Level) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(BracketFormatter)
        .try_init()
        .is_ok()
}

/// `[LEVEL timestamp location] message`, where the location is the module path for
/// INFO and above and `file:line` for DEBUG and TRACE.
struct BracketFormatter;

impl<S, N> FormatEvent<S, N> for BracketFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let level = *metadata.level();

        let (color, label) = match level {
            Level::ERROR => ("\x1b[31m", "ERROR"),
            Level::WARN => ("\x1b[33m", "WARN "),
            Level::INFO => ("\x1b[32m", "INFO "),
            Level::DEBUG => ("\x1b[34m", "DEBUG"),
            Level::TRACE => ("\x1b[35m", "TRACE"),
        };
        if writer.has_ansi_escapes() {
            write!(writer, "[{color}{label}\x1b[0m ")?;
        } else {
            write!(writer, "[{label} ")?;
        }

        write!(
            writer,
            "{} ",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f")
        )?;

        // Levels compare by verbosity: DEBUG and TRACE are greater than INFO
        match (level >= Level::DEBUG, metadata.file(), metadata.line()) {
            (true, Some(file), Some(line)) => {
                let name = file.rsplit(['/', '\\']).next().unwrap_or(file);
                write!(writer, "{name}:{line}")?;
            }
            _ => {
                let target = metadata.target();
                write!(writer, "{}", target.strip_prefix(CRATE_PREFIX).unwrap_or(target))?;
            }
        }
        write!(writer, "] ")?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
