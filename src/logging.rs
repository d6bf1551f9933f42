//! Logging setup for the binary.
//!
//! Warnings go to stderr by default and `RUST_LOG` adjusts the filter as usual.
//! Setting `SHELL_SESSIONS_DEBUG_LOG=1` turns on debug output and writes it to
//! /tmp/shell-sessions-debug.log instead, so it does not mix with command output.

use std::fs::OpenOptions;
use std::io::Write;

use env_logger::{Builder, Env, Target};

pub const DEBUG_LOG_ENV: &str = "SHELL_SESSIONS_DEBUG_LOG";
pub const DEBUG_LOG_PATH: &str = "/tmp/shell-sessions-debug.log";

/// Initialize logging. Call once at startup.
pub fn init() {
    let debug = std::env::var_os(DEBUG_LOG_ENV).is_some();
    let mut builder = builder(debug);

    if debug {
        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(DEBUG_LOG_PATH)
        {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Failed to open debug log file {DEBUG_LOG_PATH}: {e}"),
        }
    }

    if builder.try_init().is_ok() && debug {
        log::debug!("Debug logging initialized");
    }
}

fn builder(debug: bool) -> Builder {
    let default_filter = if debug { "debug" } else { "warn" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter));

    if debug {
        builder.format(|buf, record| {
            let thread = std::thread::current();
            writeln!(
                buf,
                "[{}] [{:?}] [{}] {} - {}",
                buf.timestamp_millis(),
                thread.id(),
                record.level(),
                record.target(),
                record.args()
            )
        });
    }

    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
        log::warn!("logging still works after repeated init");
    }
}
