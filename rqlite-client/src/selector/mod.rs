//! The node-selector protocol.
//!
//! The request driver never sees a selector's internals: it only ever
//! calls the four methods of [`PerQuerySelector`]. A selector is free to
//! wrap another selector (the leader-discovery selector wraps a random
//! one) without the driver knowing or caring.

pub mod leader;
pub mod random;

use std::sync::Arc;

use async_trait::async_trait;
use rqlite_client_core::consistency::{Consistency, Freshness};
use rqlite_client_core::error::{Error, FailureKind};
use tokio_util::sync::CancellationToken;
use url::Url;

pub use leader::LeaderDiscoverySelector;
pub use random::RandomNodeSelector;

/// The outcome of `on_redirect`.
#[derive(Debug, Clone)]
pub struct RedirectOutcome {
    pub follow: bool,
    /// Overrides the bare redirect-location URL the driver would otherwise
    /// follow (unused by the selectors in this crate, but part of the
    /// documented callback contract).
    pub override_follow_target: Option<Url>,
    pub log: bool,
}

/// Per-query callbacks invoked by the request driver.
///
/// Implementations own all per-query mutable state; the driver holds a
/// `Box<dyn PerQuerySelector>` for the lifetime of one `execute` call and
/// discards it on success or exhaustion.
#[async_trait]
pub trait PerQuerySelector: Send {
    /// Returns the next host to contact, or fails with *hosts-exhausted*
    /// ([`Error::HostsExhausted`]) or *canceled* ([`Error::Canceled`]) —
    /// the only two ways selection itself can fail.
    async fn select_node(&mut self) -> Result<Url, Error>;

    /// Called once the attempt against the most recently selected node
    /// succeeded. Most selectors have nothing to release here.
    async fn on_success(&mut self) {}

    /// Called when the driver receives a 3xx with a `Location` header.
    async fn on_redirect(&mut self, location: &Url) -> RedirectOutcome;

    /// Called when an attempt against the most recently selected node
    /// failed. May sleep (backoff) before returning; never fails except
    /// via cancellation, which is represented by simply returning after
    /// the cancellation token fires (the driver re-checks the token on its
    /// next loop iteration and fails `Canceled` itself).
    async fn on_failure(&mut self, kind: FailureKind);
}

/// A per-connection factory that knows how to build a [`PerQuerySelector`]
/// for one query.
///
/// The outer factory ([`SelectorFactory`]) is constructed once per
/// `Connection` from `(hosts, options)`; calling it returns a
/// `QuerySelectorFactory` that must be cheap to invoke per query.
pub trait QuerySelectorFactory: Send + Sync {
    fn new_selector(
        &self,
        strength: Consistency,
        freshness: Option<Freshness>,
        cancel: CancellationToken,
        path: &str,
    ) -> Box<dyn PerQuerySelector>;
}

/// The outer, per-connection selector factory.
///
/// `max_attempts_per_host` and `max_redirects` come from
/// [`crate::options::ConnectionOptions`]; they're passed as primitives
/// rather than the whole options struct to keep this module free of a
/// dependency cycle with `options`.
pub trait SelectorFactory: Send + Sync {
    fn for_connection(
        &self,
        hosts: Arc<[Url]>,
        max_attempts_per_host: u32,
        max_redirects: u32,
    ) -> Arc<dyn QuerySelectorFactory>;
}

/// The default selector: plain random rotation for everything except the
/// backup path, which is routed through leader discovery because backups
/// run far faster when directed at the leader.
pub struct DefaultSelectorFactory;

struct DefaultQuerySelectorFactory {
    hosts: Arc<[Url]>,
    max_attempts_per_host: u32,
    max_redirects: u32,
}

impl SelectorFactory for DefaultSelectorFactory {
    fn for_connection(
        &self,
        hosts: Arc<[Url]>,
        max_attempts_per_host: u32,
        max_redirects: u32,
    ) -> Arc<dyn QuerySelectorFactory> {
        Arc::new(DefaultQuerySelectorFactory { hosts, max_attempts_per_host, max_redirects })
    }
}

/// Tags a query path as the backup endpoint, which is the only path the
/// default factory routes through leader discovery.
pub fn is_backup_path(path: &str) -> bool {
    path.starts_with("/db/backup")
}

impl QuerySelectorFactory for DefaultQuerySelectorFactory {
    fn new_selector(
        &self,
        strength: Consistency,
        freshness: Option<Freshness>,
        cancel: CancellationToken,
        path: &str,
    ) -> Box<dyn PerQuerySelector> {
        let random = RandomNodeSelector::new(
            self.hosts.clone(),
            self.max_attempts_per_host,
            self.max_redirects,
            cancel.clone(),
        );
        if is_backup_path(path) && strength.requires_leader_discovery() {
            Box::new(LeaderDiscoverySelector::new(
                self.hosts.clone(),
                self.max_attempts_per_host,
                self.max_redirects,
                random,
                freshness,
                cancel,
            ))
        } else {
            Box::new(random)
        }
    }
}
