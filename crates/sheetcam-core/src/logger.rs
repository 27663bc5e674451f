//! Stderr logger with per-crate levels.
//!
//! Output looks like `[   1.234s INFO  sheetcam_capture::controller] message`
//! (time since installation, level, target). Levels come from a
//! [`LogFilter`]: a default plus overrides per target prefix, parsed from
//! strings like `info,sheetcam_capture=warn`. [`init_with_level`] also reads
//! the `SHEETCAM_LOG` environment variable. Library crates only talk to the
//! `log` facade.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a [`LogFilter`] directive string.
pub const LOG_ENV: &str = "SHEETCAM_LOG";

/// Default level plus per-target overrides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter {
    default: LevelFilter,
    targets: Vec<(String, LevelFilter)>,
}

impl LogFilter {
    pub fn new(default: LevelFilter) -> Self {
        Self {
            default,
            targets: Vec::new(),
        }
    }

    /// Override the level for `target` and its submodules.
    pub fn with_target(mut self, target: impl Into<String>, level: LevelFilter) -> Self {
        let target = target.into();
        self.targets.retain(|(t, _)| *t != target);
        self.targets.push((target, level));
        self
    }

    /// Parse comma-separated directives: a bare level sets the default,
    /// `target=level` adds an override. Unparsable directives are skipped.
    pub fn parse(directives: &str, default: LevelFilter) -> Self {
        let mut filter = Self::new(default);
        for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.split_once('=') {
                Some((target, level)) => {
                    if let Ok(level) = level.trim().parse() {
                        filter = filter.with_target(target.trim(), level);
                    }
                }
                None => {
                    if let Ok(level) = directive.parse() {
                        filter.default = level;
                    }
                }
            }
        }
        filter
    }

    /// Level for `target`; the longest matching override wins.
    pub fn level_for(&self, target: &str) -> LevelFilter {
        self.targets
            .iter()
            .filter(|(t, _)| {
                target == t
                    || target
                        .strip_prefix(t.as_str())
                        .is_some_and(|rest| rest.starts_with("::"))
            })
            .max_by_key(|(t, _)| t.len())
            .map_or(self.default, |&(_, level)| level)
    }

    /// Most verbose level any target can reach.
    pub fn max_level(&self) -> LevelFilter {
        self.targets
            .iter()
            .map(|&(_, level)| level)
            .fold(self.default, Ord::max)
    }
}

struct SheetcamLogger {
    filter: LogFilter,
    started: Instant,
}

impl Log for SheetcamLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let secs = self.started.elapsed().as_secs_f64();
        let mut out = std::io::stderr().lock();
        let _ = writeln!(
            out,
            "[{secs:8.3}s {:<5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<SheetcamLogger> = OnceLock::new();

/// Install the stderr logger with `filter`. Later calls are no-ops.
pub fn init_with_filter(filter: LogFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| SheetcamLogger {
        filter,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(logger.filter.max_level());
    Ok(())
}

/// Install the stderr logger at `level`, refined by `SHEETCAM_LOG` when set.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) => LogFilter::parse(&directives, level),
        Err(_) => LogFilter::new(level),
    };
    init_with_filter(filter)
}

/// Map `-v` / `-q` counts onto a level filter, starting from `Info`.
pub fn level_from_verbosity(verbose: u8, quiet: u8) -> LevelFilter {
    match 3 + i32::from(verbose) - i32::from(quiet) {
        i32::MIN..=0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install a `tracing` subscriber filtered by `SHEETCAM_LOG`, then
/// `RUST_LOG`, then `info`. `json` selects flattened JSON events.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
