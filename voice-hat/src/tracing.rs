//! Log setup for the voice-hat binaries.
//!
//! The library only emits events; a binary installs a subscriber once at
//! startup with [`init_journald_or_stdout`]. Modules pull in the log macros
//! with `use crate::tracing::prelude::*`.

use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Variable the filter directives are read from.
pub const FILTER_ENV: &str = "RUST_LOG";

/// Set by systemd when stdout is connected to the journal.
const JOURNAL_ENV: &str = "JOURNAL_STREAM";

const STAMP: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Where log events end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogSink {
    Journald,
    Stdout,
}

/// Install the global subscriber: journald under systemd, stdout otherwise.
/// Returns the sink actually used.
pub fn init_journald_or_stdout() -> LogSink {
    let sink = if std::env::var_os(JOURNAL_ENV).is_some() {
        match tracing_journald::layer() {
            Ok(layer) => {
                tracing_subscriber::registry().with(layer).init();
                LogSink::Journald
            }
            Err(e) => {
                init_stdout();
                error!(error = %e, "Journald unavailable, logging to stdout");
                LogSink::Stdout
            }
        }
    } else {
        init_stdout();
        LogSink::Stdout
    };
    debug!(%sink, "Logging initialized");
    sink
}

/// Filter from `$RUST_LOG`, at INFO when unset or unparsable.
fn stdout_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(FILTER_ENV)
        .from_env_lossy()
}

fn init_stdout() {
    tracing_subscriber::registry()
        .with(stdout_filter())
        .with(tracing_subscriber::fmt::layer().with_timer(WallClock))
        .init();
}

/// Wall-clock time of day, local when the offset is known, else UTC.
struct WallClock;

fn stamp(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.format(STAMP)
}

impl FormatTime for WallClock {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let text = stamp(now).map_err(|_| std::fmt::Error)?;
        w.write_str(&text)
    }
}
