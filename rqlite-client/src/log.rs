//! Structured logging façade.
//!
//! Every I/O boundary event the driver and query layer can raise is named
//! here, each independently enableable with its own severity and a cap on
//! how much of a message body gets logged. Nothing in `driver`, `query`, or
//! `backup` calls `tracing::event!` directly — everything goes through a
//! [`Logger`], so a caller can dial individual hooks up or down without
//! touching code.

use std::time::Duration;

use tracing::Level;

/// One independently toggleable logging hook.
#[derive(Debug, Clone, Copy)]
pub struct EventConfig {
    pub enabled: bool,
    pub level: Level,
    /// Messages longer than this are truncated before being logged.
    pub max_message_len: usize,
}

impl EventConfig {
    const fn new(enabled: bool, level: Level, max_message_len: usize) -> Self {
        Self { enabled, level, max_message_len }
    }
}

/// The fixed set of hooks the driver and query layer can raise.
#[derive(Debug, Clone, Copy)]
pub struct LogConfig {
    pub read_start: EventConfig,
    pub read_response: EventConfig,
    pub read_stale: EventConfig,
    pub write_start: EventConfig,
    pub write_response: EventConfig,
    pub follow_redirect: EventConfig,
    pub fetch_error: EventConfig,
    pub connect_timeout: EventConfig,
    pub read_timeout: EventConfig,
    pub hosts_exhausted: EventConfig,
    pub non_ok_response: EventConfig,
    pub backup_start: EventConfig,
    pub backup_end: EventConfig,
    /// Fires when wall time from request start to header arrival exceeds
    /// `slow_query_threshold`. Disabled by default (no threshold makes
    /// sense as a universal default).
    pub slow_query: EventConfig,
    pub slow_query_threshold: Duration,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            read_start: EventConfig::new(true, Level::DEBUG, 256),
            read_response: EventConfig::new(true, Level::DEBUG, 256),
            read_stale: EventConfig::new(true, Level::INFO, 256),
            write_start: EventConfig::new(true, Level::DEBUG, 256),
            write_response: EventConfig::new(true, Level::DEBUG, 256),
            follow_redirect: EventConfig::new(true, Level::INFO, 256),
            fetch_error: EventConfig::new(true, Level::WARN, 512),
            connect_timeout: EventConfig::new(true, Level::WARN, 256),
            read_timeout: EventConfig::new(true, Level::WARN, 256),
            hosts_exhausted: EventConfig::new(true, Level::ERROR, 256),
            non_ok_response: EventConfig::new(true, Level::WARN, 512),
            backup_start: EventConfig::new(true, Level::INFO, 256),
            backup_end: EventConfig::new(true, Level::INFO, 256),
            slow_query: EventConfig::new(false, Level::WARN, 256),
            slow_query_threshold: Duration::from_secs(1),
        }
    }
}

fn truncate(message: &str, max_len: usize) -> &str {
    if message.len() <= max_len {
        message
    } else {
        let mut end = max_len;
        while end > 0 && !message.is_char_boundary(end) {
            end -= 1;
        }
        &message[..end]
    }
}

/// Evaluates `$cfg` and, if enabled, fires a `tracing::event!` at its
/// configured level with a length-capped message.
macro_rules! fire {
    ($cfg:expr, $name:expr, $($arg:tt)*) => {{
        let cfg = $cfg;
        if cfg.enabled {
            let message = format!($($arg)*);
            let message = truncate(&message, cfg.max_message_len);
            match cfg.level {
                tracing::Level::ERROR => tracing::error!(event = $name, %message),
                tracing::Level::WARN => tracing::warn!(event = $name, %message),
                tracing::Level::INFO => tracing::info!(event = $name, %message),
                tracing::Level::DEBUG => tracing::debug!(event = $name, %message),
                tracing::Level::TRACE => tracing::trace!(event = $name, %message),
            }
        }
    }};
}

/// Thin wrapper pairing a [`LogConfig`] with the fire-if-enabled helper
/// used by every hook. Cheap to clone; holds no I/O state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger {
    pub config: LogConfig,
}

impl Logger {
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    pub fn read_start(&self, path: &str) {
        fire!(self.config.read_start, "readStart", "read start: {path}");
    }

    pub fn read_response(&self, path: &str, status: u16) {
        fire!(self.config.read_response, "readResponse", "read response: {path} -> {status}");
    }

    pub fn read_stale(&self, path: &str) {
        fire!(self.config.read_stale, "readStale", "stale read, retrying at weak: {path}");
    }

    pub fn write_start(&self, path: &str) {
        fire!(self.config.write_start, "writeStart", "write start: {path}");
    }

    pub fn write_response(&self, path: &str, status: u16) {
        fire!(self.config.write_response, "writeResponse", "write response: {path} -> {status}");
    }

    pub fn follow_redirect(&self, from: &str, to: &str) {
        fire!(self.config.follow_redirect, "followRedirect", "redirect: {from} -> {to}");
    }

    pub fn fetch_error(&self, host: &str, error: &str) {
        fire!(self.config.fetch_error, "fetchError", "fetch error against {host}: {error}");
    }

    pub fn connect_timeout(&self, host: &str) {
        fire!(self.config.connect_timeout, "connectTimeout", "connect timeout against {host}");
    }

    pub fn read_timeout(&self, host: &str) {
        fire!(self.config.read_timeout, "readTimeout", "read timeout against {host}");
    }

    pub fn hosts_exhausted(&self, path: &str) {
        fire!(self.config.hosts_exhausted, "hostsExhausted", "hosts exhausted: {path}");
    }

    pub fn non_ok_response(&self, host: &str, status: u16) {
        fire!(self.config.non_ok_response, "nonOkResponse", "non-OK response from {host}: {status}");
    }

    pub fn backup_start(&self, path: &str) {
        fire!(self.config.backup_start, "backupStart", "backup start: {path}");
    }

    pub fn backup_end(&self, bytes_written: u64) {
        fire!(self.config.backup_end, "backupEnd", "backup end: {bytes_written} bytes");
    }

    pub fn slow_query(&self, path: &str, elapsed: Duration) {
        if elapsed >= self.config.slow_query_threshold {
            fire!(self.config.slow_query, "slowQuery", "slow query: {path} took {elapsed:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "h\u{00e9}llo"; // 'é' is 2 bytes in UTF-8
        let t = truncate(s, 2);
        assert!(s.is_char_boundary(t.len()) || t.len() < 2);
        assert!(t.len() <= 2);
    }

    #[test]
    fn truncate_is_noop_under_the_cap() {
        assert_eq!(truncate("short", 100), "short");
    }

    #[test]
    fn default_config_enables_every_hook_except_slow_query() {
        let cfg = LogConfig::default();
        assert!(cfg.read_start.enabled);
        assert!(cfg.hosts_exhausted.enabled);
        assert!(!cfg.slow_query.enabled);
    }
}
