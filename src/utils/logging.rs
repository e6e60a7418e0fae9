//! Logging setup. Log lines go to stderr; stdout carries the rendered report.

use chrono::Local;
use env_logger::{Builder, Env, Target};
use log::{Level, LevelFilter};
use std::io::Write;

/// Environment variable overriding the configured level, in `env_logger` syntax.
pub const LOG_ENV: &str = "CRYPTOPULSE_LOG";

fn level_color(level: Level) -> &'static str {
    match level {
        | Level::Error => "\x1b[31m",
        | Level::Warn => "\x1b[33m",
        | Level::Info => "\x1b[32m",
        | Level::Debug => "\x1b[36m",
        | Level::Trace => "\x1b[35m",
    }
}

/// Drop the crate prefix from a module path: `cryptopulse::signal::news` -> `signal::news`.
fn short_target(target: &str) -> &str {
    target.strip_prefix("cryptopulse::").unwrap_or(target)
}

/// Install the global logger at `level` unless `CRYPTOPULSE_LOG` says
/// otherwise. Calling it twice keeps the first logger.
pub fn init_logging(level: &str) {
    let env = Env::default().filter_or(LOG_ENV, level).write_style_or("CRYPTOPULSE_LOG_STYLE", "auto");

    let installed = Builder::from_env(env)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {}{:5}\x1b[0m [{}] {}",
                Local::now().format("%H:%M:%S%.3f"),
                level_color(record.level()),
                record.level(),
                short_target(record.target()),
                record.args()
            )
        })
        .target(Target::Stderr)
        .try_init()
        .is_ok();

    if installed {
        log::debug!("Logging initialized at level {}", level);
    }
}

/// Debug-level logger captured by the test harness.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).filter_level(LevelFilter::Debug).try_init();
}
