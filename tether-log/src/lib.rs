//! Tether diagnostic console.
//!
//! Structured, environment-controlled output for request summaries and task
//! events printed by the Tether dispatcher when local printing is enabled.
//!
//! # Usage
//!
//! ```rust
//! use tether_log::{emit, Level};
//!
//! emit(
//!     Level::Info,
//!     "tether::request",
//!     "GET https://api.example.com/users",
//!     &[("status", "200".to_string()), ("adapter", "request".to_string())],
//! );
//! ```
//!
//! # Environment Variables
//!
//! - `TETHER_DEBUG=1` - Enable debug output
//! - `TETHER_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level
//! - `TETHER_LOG_FORMAT=pretty|json|compact` - Record format
//! - `TETHER_LOG_COLOR=1|0` - Enable/disable colors
//! - `TETHER_LOG_TIMESTAMPS=1|0` - Prefix records with a timestamp

use once_cell::sync::Lazy;
use std::env;
use std::fmt::Write as _;
use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Levels
// ============================================================================

/// Severity of a console record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no output)
    Off = 5,
}

impl Level {
    /// Get level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }

    #[cfg(feature = "color")]
    fn colored(&self) -> colored::ColoredString {
        use colored::Colorize;
        match self {
            Level::Trace => "TRACE".magenta(),
            Level::Debug => "DEBUG".blue(),
            Level::Info => "INFO".green(),
            Level::Warn => "WARN".yellow(),
            Level::Error => "ERROR".red().bold(),
            Level::Off => "OFF".white(),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            other => Err(format!("unknown log level `{}`", other)),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Record Format
// ============================================================================

/// Output format for console records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line format, one field per line
    Pretty,
    /// Single-line `key=value` format
    Compact,
    /// One JSON object per record
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown log format `{}`", other)),
        }
    }
}

// ============================================================================
// Global Configuration
// ============================================================================

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(LogConfig::from_env);

/// Console configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum level
    pub level: Level,
    /// Record format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Pretty,
            color: false,
            timestamps: true,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Create config from `TETHER_*` environment variables.
    pub fn from_env() -> Self {
        let debug = env_flag("TETHER_DEBUG").unwrap_or(false);

        let level = env::var("TETHER_LOG_LEVEL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = env::var("TETHER_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(Format::Pretty);

        let color = env_flag("TETHER_LOG_COLOR")
            .unwrap_or_else(|| env::var("NO_COLOR").is_err() && env::var("TERM").is_ok());

        let timestamps = env_flag("TETHER_LOG_TIMESTAMPS").unwrap_or(true);

        DEBUG_ENABLED.store(debug, Ordering::SeqCst);
        LOG_LEVEL.store(level as u8, Ordering::SeqCst);

        Self {
            debug,
            level,
            format,
            color,
            timestamps,
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Initialize the console eagerly.
///
/// Runs automatically on first [`emit`].
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Check if debug output is enabled.
#[inline]
pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Check if a level passes the current filter.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Get current level.
pub fn current_level() -> Level {
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Set level at runtime.
pub fn set_level(level: Level) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Enable or disable debug mode at runtime.
pub fn set_debug(enabled: bool) {
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

/// Get the global configuration.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

/// Emit one structured record to stderr.
pub fn emit(level: Level, target: &str, message: &str, fields: &[(&str, String)]) {
    init();
    if !is_level_enabled(level) {
        return;
    }

    let line = render(level, target, message, fields, config());
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "{}", line);
}

/// Render a record without writing it.
pub fn render(
    level: Level,
    target: &str,
    message: &str,
    fields: &[(&str, String)],
    config: &LogConfig,
) -> String {
    match config.format {
        Format::Pretty => render_pretty(level, target, message, fields, config),
        Format::Compact => render_compact(level, target, message, fields, config),
        Format::Json => render_json(level, target, message, fields),
    }
}

fn level_label(level: Level, config: &LogConfig) -> String {
    #[cfg(feature = "color")]
    if config.color {
        return level.colored().to_string();
    }
    let _ = config;
    level.as_str().to_string()
}

fn render_pretty(
    level: Level,
    target: &str,
    message: &str,
    fields: &[(&str, String)],
    config: &LogConfig,
) -> String {
    let mut out = String::new();

    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(out, "{} ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
    }
    let _ = write!(out, "{:5} ", level_label(level, config));
    if !target.is_empty() {
        let _ = write!(out, "[{}] ", target);
    }
    out.push_str(message);

    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    for (key, value) in fields {
        let _ = write!(out, "\n    {:width$} : {}", key, value, width = width);
    }
    out
}

fn render_compact(
    level: Level,
    target: &str,
    message: &str,
    fields: &[(&str, String)],
    config: &LogConfig,
) -> String {
    let mut out = String::new();

    if config.timestamps {
        let now = chrono::Local::now();
        let _ = write!(out, "{} ", now.format("%H:%M:%S"));
    }
    let _ = write!(out, "{} ", level.as_str().chars().next().unwrap_or('?'));
    if !target.is_empty() {
        let _ = write!(out, "{}: ", target);
    }
    out.push_str(message);
    for (key, value) in fields {
        let _ = write!(out, " {}={}", key, value);
    }
    out
}

#[cfg(feature = "json")]
fn render_json(level: Level, target: &str, message: &str, fields: &[(&str, String)]) -> String {
    use serde::Serialize;

    #[derive(Serialize)]
    struct Record<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
        fields: serde_json::Map<String, serde_json::Value>,
    }

    let record = Record {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
        fields: fields
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
            .collect(),
    };

    serde_json::to_string(&record).unwrap_or_else(|_| message.to_string())
}

#[cfg(not(feature = "json"))]
fn render_json(level: Level, target: &str, message: &str, fields: &[(&str, String)]) -> String {
    let mut out = format!(
        r#"{{"timestamp":"{}","level":"{}","target":"{}","message":"{}","fields":{{"#,
        chrono::Utc::now().to_rfc3339(),
        level.as_str(),
        escape_json(target),
        escape_json(message)
    );
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, r#""{}":"{}""#, escape_json(key), escape_json(value));
    }
    out.push_str("}}");
    out
}

#[cfg(not(feature = "json"))]
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(result, "\\u{:04x}", c as u32);
            }
            c => result.push(c),
        }
    }
    result
}

// ============================================================================
// Tracing Integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Subscriber that honours the `TETHER_*` console settings, for hosts
    //! that want the dispatcher's `tracing` events alongside printed records.

    use super::*;

    /// Create a tracing subscriber using the console's level and color settings.
    pub fn subscriber() -> impl tracing::Subscriber {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{EnvFilter, fmt};

        let config = config();
        let level = match config.level {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(config.color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_config(format: Format) -> LogConfig {
        LogConfig {
            format,
            color: false,
            timestamps: false,
            ..LogConfig::default()
        }
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("debug".parse(), Ok(Level::Debug));
        assert_eq!("DEBUG".parse(), Ok(Level::Debug));
        assert_eq!("warning".parse(), Ok(Level::Warn));
        assert!("loud".parse::<Level>().is_err());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("pretty".parse(), Ok(Format::Pretty));
        assert_eq!("Compact".parse(), Ok(Format::Compact));
        assert_eq!("json".parse(), Ok(Format::Json));
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_set_level_and_debug() {
        let original = current_level();

        set_level(Level::Error);
        assert_eq!(current_level(), Level::Error);
        assert!(!is_level_enabled(Level::Info));

        set_debug(true);
        assert!(is_debug_enabled());
        assert_eq!(current_level(), Level::Debug);

        set_debug(false);
        set_level(original);
    }

    #[test]
    fn test_off_is_never_enabled() {
        assert!(!is_level_enabled(Level::Off));
    }

    #[test]
    fn test_render_compact() {
        let line = render(
            Level::Info,
            "tether::request",
            "GET /users",
            &[("status", "200".to_string()), ("adapter", "request".to_string())],
            &plain_config(Format::Compact),
        );
        assert_eq!(line, "I tether::request: GET /users status=200 adapter=request");
    }

    #[test]
    fn test_render_pretty_aligns_fields() {
        let line = render(
            Level::Warn,
            "",
            "upload",
            &[("url", "/a".to_string()), ("progress", "50".to_string())],
            &plain_config(Format::Pretty),
        );
        assert_eq!(line, "WARN  upload\n    url      : /a\n    progress : 50");
    }

    #[test]
    fn test_render_json_is_one_object() {
        let line = render(
            Level::Debug,
            "t",
            "msg \"quoted\"",
            &[("k", "v".to_string())],
            &plain_config(Format::Json),
        );
        assert!(line.starts_with('{') && line.ends_with('}'));
        assert!(line.contains(r#""level":"DEBUG""#));
        assert!(line.contains(r#""k":"v""#));
        assert!(line.contains(r#"msg \"quoted\""#));
    }
}
