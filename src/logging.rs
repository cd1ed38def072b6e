use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use std::fmt::Display;
use std::io::Write;
use std::time::SystemTime;

use crate::http::Request;

/// Log target for per-request access records.
pub const ACCESS_TARGET: &str = "access";

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1B[31m",
        Level::Warn => "\x1B[33m",
        Level::Info => "\x1B[32m",
        Level::Debug => "\x1B[36m",
        Level::Trace => "\x1B[35m",
    }
}

/// Installs the stdout logger. `RUST_LOG` overrides the default `info` level,
/// e.g. `RUST_LOG=access=off` silences the access log.
pub fn setup_logging() {
    let colored = atty::is(atty::Stream::Stdout);

    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .target(Target::Stdout)
        .format(move |buf, record| {
            let level = record.level();
            let (color, reset) = if colored {
                (level_color(level), "\x1B[0m")
            } else {
                ("", "")
            };
            write!(
                buf,
                "{color}{level:>5}{reset} [{}] {}",
                humantime::format_rfc3339_millis(SystemTime::now()),
                record.args()
            )?;
            if level >= Level::Debug {
                write!(
                    buf,
                    " - {}:{}",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )?;
            }
            writeln!(buf)
        })
        .init();
}

/// `"<METHOD> <REQUEST-URI> <PROTOCOL>" - <STATUS>`
pub fn access_line(req: &Request, status: u16) -> String {
    format!(
        "\"{} {} {}\" - {}",
        req.method, req.target, req.version, status
    )
}

pub fn log_access(req: &Request, status: u16) {
    log::info!(target: ACCESS_TARGET, "{}", access_line(req, status));
}

#[macro_export]
macro_rules! log_error {
    ($error:expr, $context:expr) => {
        log::error!("{} - {}", $context, $error)
    };
}

/// Runs a fallible step, tracing its start and reporting failure at debug
/// level. The caller decides whether the error deserves more.
pub fn log_step<T, E, F>(step: &str, subject: impl Display, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: Display,
{
    log::trace!("{} {}", step, subject);
    f().map_err(|e| {
        log::debug!("{} {} failed: {}", step, subject, e);
        e
    })
}
