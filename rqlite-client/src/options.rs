//! Connection configuration.
//!
//! `ConnectionOptions` is immutable after construction and built through a
//! chained-setter builder.

use std::sync::Arc;

use rqlite_client_core::consistency::{Consistency, Freshness};

use crate::log::LogConfig;
use crate::selector::{DefaultSelectorFactory, SelectorFactory};

/// Connection-wide settings, shared read-only by every query issued over
/// one [`crate::Connection`].
#[derive(Clone)]
pub struct ConnectionOptions {
    pub(crate) timeout_ms: u64,
    pub(crate) response_timeout_ms: u64,
    pub(crate) max_redirects: u32,
    pub(crate) max_attempts_per_host: u32,
    pub(crate) read_consistency: Consistency,
    pub(crate) freshness: Freshness,
    pub(crate) log: LogConfig,
    pub(crate) selector_factory: Arc<dyn SelectorFactory>,
}

impl std::fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("timeout_ms", &self.timeout_ms)
            .field("response_timeout_ms", &self.response_timeout_ms)
            .field("max_redirects", &self.max_redirects)
            .field("max_attempts_per_host", &self.max_attempts_per_host)
            .field("read_consistency", &self.read_consistency)
            .field("freshness", &self.freshness)
            .finish_non_exhaustive()
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            response_timeout_ms: 60_000,
            max_redirects: 2,
            max_attempts_per_host: 2,
            read_consistency: Consistency::Weak,
            freshness: Freshness::default_value(),
            log: LogConfig::default(),
            selector_factory: Arc::new(DefaultSelectorFactory),
        }
    }
}

impl ConnectionOptions {
    pub fn builder() -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder::default()
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn response_timeout_ms(&self) -> u64 {
        self.response_timeout_ms
    }

    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    pub fn max_attempts_per_host(&self) -> u32 {
        self.max_attempts_per_host
    }

    pub fn read_consistency(&self) -> Consistency {
        self.read_consistency
    }

    pub fn freshness(&self) -> &Freshness {
        &self.freshness
    }

    pub fn log(&self) -> &LogConfig {
        &self.log
    }

    pub fn selector_factory(&self) -> &Arc<dyn SelectorFactory> {
        &self.selector_factory
    }
}

/// Chained-setter builder for [`ConnectionOptions`]. All setters take `self`
/// by value so calls can be chained; `build()` finalizes an immutable
/// options struct.
#[derive(Clone)]
pub struct ConnectionOptionsBuilder {
    inner: ConnectionOptions,
}

impl Default for ConnectionOptionsBuilder {
    fn default() -> Self {
        Self { inner: ConnectionOptions::default() }
    }
}

impl ConnectionOptionsBuilder {
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.inner.timeout_ms = timeout_ms;
        self
    }

    pub fn response_timeout_ms(mut self, response_timeout_ms: u64) -> Self {
        self.inner.response_timeout_ms = response_timeout_ms;
        self
    }

    pub fn max_redirects(mut self, max_redirects: u32) -> Self {
        self.inner.max_redirects = max_redirects;
        self
    }

    pub fn max_attempts_per_host(mut self, max_attempts_per_host: u32) -> Self {
        self.inner.max_attempts_per_host = max_attempts_per_host;
        self
    }

    pub fn read_consistency(mut self, read_consistency: Consistency) -> Self {
        self.inner.read_consistency = read_consistency;
        self
    }

    pub fn freshness(mut self, freshness: Freshness) -> Self {
        self.inner.freshness = freshness;
        self
    }

    pub fn log(mut self, log: LogConfig) -> Self {
        self.inner.log = log;
        self
    }

    pub fn selector_factory(mut self, selector_factory: Arc<dyn SelectorFactory>) -> Self {
        self.inner.selector_factory = selector_factory;
        self
    }

    pub fn build(self) -> ConnectionOptions {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let opts = ConnectionOptions::default();
        assert_eq!(opts.timeout_ms(), 5_000);
        assert_eq!(opts.response_timeout_ms(), 60_000);
        assert_eq!(opts.max_redirects(), 2);
        assert_eq!(opts.max_attempts_per_host(), 2);
        assert_eq!(opts.read_consistency(), Consistency::Weak);
        assert_eq!(opts.freshness().0, "5m");
    }

    #[test]
    fn builder_overrides_chain() {
        let opts = ConnectionOptions::builder()
            .timeout_ms(1_000)
            .max_attempts_per_host(5)
            .read_consistency(Consistency::Strong)
            .build();
        assert_eq!(opts.timeout_ms(), 1_000);
        assert_eq!(opts.max_attempts_per_host(), 5);
        assert_eq!(opts.read_consistency(), Consistency::Strong);
        // Untouched fields keep their defaults.
        assert_eq!(opts.max_redirects(), 2);
    }
}
