//! Logging for the Trellis crates.
//!
//! Every crate in the workspace logs through the macros exported here.
//! Lines are written to STDERR, one per event, and everything is driven by
//! environment variables read once on first use.
//!
//! ```rust
//! use trellis_log::{debug, info, warn};
//!
//! info!("Dispatched {} {}", "GET", "/login");
//! warn!("Flash entry discarded unread");
//! debug!(target: "trellis::router", "Matching route: {}", "/users/42");
//! ```
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `TRELLIS_DEBUG` | `1` / `true` lowers the threshold to `debug` | off |
//! | `TRELLIS_LOG_LEVEL` | `trace`, `debug`, `info`, `warn`, `error`, `off` | `info` |
//! | `TRELLIS_LOG_FORMAT` | `json`, `text`, `compact` | `json` |
//! | `TRELLIS_LOG_TIMESTAMPS` | `1` / `0` | `1` |
//! | `TRELLIS_LOG_MODULE` | `1` / `0` | `1` |

use once_cell::sync::Lazy;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Threshold only; nothing is ever logged at this level.
    Off = 5,
}

impl Level {
    const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Off,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = match s.trim().to_ascii_lowercase().as_str() {
            "warning" => "warn".to_string(),
            "none" => "off".to_string(),
            other => other.to_string(),
        };
        Level::ALL
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown log level '{}'", s))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shape of an emitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `{"timestamp":..,"level":..,"target":..,"message":..}`
    Json,
    /// `2026-01-01 12:00:00.000 INFO  [trellis::router] message`
    Text,
    /// `12:00:00 I trellis::router: message`
    Compact,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "text" | "pretty" => Ok(Format::Text),
            "compact" => Ok(Format::Compact),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub format: Format,
    pub timestamps: bool,
    pub show_target: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Json,
            timestamps: true,
            show_target: true,
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`, which stands in for the environment.
    ///
    /// An explicit `TRELLIS_LOG_LEVEL` wins over `TRELLIS_DEBUG`. Unparsable
    /// values fall back to the defaults.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let switch = |key: &str, default: bool| match lookup(key) {
            Some(v) => matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "on"),
            None => default,
        };

        let debug = switch("TRELLIS_DEBUG", false);
        let level = lookup("TRELLIS_LOG_LEVEL")
            .and_then(|v| v.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { defaults.level });

        Self {
            level,
            format: lookup("TRELLIS_LOG_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.format),
            timestamps: switch("TRELLIS_LOG_TIMESTAMPS", defaults.timestamps),
            show_target: switch("TRELLIS_LOG_MODULE", defaults.show_target),
        }
    }

    fn render(&self, level: Level, target: &str, message: &str) -> String {
        match self.format {
            Format::Json => render_json(level, target, message),
            Format::Text => {
                let mut line = String::with_capacity(message.len() + 48);
                if self.timestamps {
                    let now = chrono::Local::now();
                    line.push_str(&now.format("%Y-%m-%d %H:%M:%S%.3f ").to_string());
                }
                line.push_str(&format!("{:<5} ", level.label()));
                if self.show_target && !target.is_empty() {
                    line.push_str(&format!("[{}] ", target));
                }
                line.push_str(message);
                line
            }
            Format::Compact => {
                let mut parts: Vec<String> = Vec::with_capacity(3);
                if self.timestamps {
                    parts.push(chrono::Local::now().format("%H:%M:%S").to_string());
                }
                parts.push(level.label()[..1].to_string());
                if self.show_target && !target.is_empty() {
                    parts.push(format!("{}:", target));
                }
                parts.push(message.to_string());
                parts.join(" ")
            }
        }
    }
}

#[cfg(feature = "json")]
fn render_json(level: Level, target: &str, message: &str) -> String {
    serde_json::json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "level": level.label(),
        "target": target,
        "message": message,
    })
    .to_string()
}

#[cfg(not(feature = "json"))]
fn render_json(level: Level, target: &str, message: &str) -> String {
    format!(
        r#"{{"timestamp":"{}","level":"{}","target":"{}","message":"{}"}}"#,
        chrono::Utc::now().to_rfc3339(),
        level.label(),
        target.escape_default(),
        message.escape_default()
    )
}

struct Logger {
    threshold: AtomicU8,
    settings: LogSettings,
}

static LOGGER: Lazy<Logger> = Lazy::new(|| {
    let settings = LogSettings::from_env();
    Logger {
        threshold: AtomicU8::new(settings.level as u8),
        settings,
    }
});

/// Settings the process started with.
pub fn settings() -> &'static LogSettings {
    &LOGGER.settings
}

#[inline]
pub fn enabled(level: Level) -> bool {
    level != Level::Off && level as u8 >= LOGGER.threshold.load(Ordering::Relaxed)
}

/// Change the threshold for the rest of the process, e.g. from a test.
pub fn set_level(level: Level) {
    LOGGER.threshold.store(level as u8, Ordering::Relaxed);
}

#[doc(hidden)]
pub fn emit(level: Level, target: &str, args: fmt::Arguments<'_>) {
    let line = LOGGER.settings.render(level, target, &args.to_string());
    let _ = writeln!(std::io::stderr().lock(), "{}", line);
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, target: $target:expr, $($arg:tt)+) => {
        if $crate::enabled($level) {
            $crate::emit($level, $target, format_args!($($arg)+));
        }
    };
    ($level:expr, $($arg:tt)+) => {
        $crate::__log!($level, target: module_path!(), $($arg)+)
    };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Trace, $($arg)+) };
}

/// Log at debug level; shown when `TRELLIS_DEBUG=1`.
///
/// ```rust
/// use trellis_log::debug;
///
/// debug!(target: "trellis::session", "Loaded session {}", "abc123");
/// ```
#[macro_export]
macro_rules! debug {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Debug, $($arg)+) };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Info, $($arg)+) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Warn, $($arg)+) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)+) => { $crate::__log!($crate::Level::Error, $($arg)+) };
}
