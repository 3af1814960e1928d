//! The random node selector.

use std::sync::Arc;

use async_trait::async_trait;
use rqlite_client_core::backoff::backoff;
use rqlite_client_core::error::{Error, FailureKind, HostsExhausted};
use rqlite_client_core::random::{random_range, random_shuffle};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{PerQuerySelector, RedirectOutcome};

/// Per-query selector state.
///
/// `order` holds indices into `hosts` and stays empty until the *second*
/// `select_node` call: lazy shuffling means a query that only ever needs one
/// node never pays for a permutation. The first pass is `[initial_index] ++
/// shuffle(hosts \ {initial_index})`; every later pass is a fresh shuffle of
/// all hosts, with `hosts[initial_index]` rotated out of its pinned
/// first-pass position (not out of the host set).
pub struct RandomNodeSelector {
    hosts: Arc<[Url]>,
    max_attempts_per_host: u32,
    max_redirects: u32,
    cancel: CancellationToken,

    initial_index: usize,
    order: Vec<usize>,
    cursor: usize,
    loops_through_shuffled_hosts: u32,
    redirects: u32,

    /// Attempts made against the node returned by the most recent
    /// `select_node` call. Only meaningful for the single-host
    /// specialization, where there is no pass to advance past.
    attempts_on_current_host: u32,
    selections_made: u32,
}

impl RandomNodeSelector {
    pub fn new(
        hosts: Arc<[Url]>,
        max_attempts_per_host: u32,
        max_redirects: u32,
        cancel: CancellationToken,
    ) -> Self {
        assert!(!hosts.is_empty(), "RandomNodeSelector requires at least one host");
        let initial_index = random_range(hosts.len() as u32) as usize;
        Self {
            hosts,
            max_attempts_per_host,
            max_redirects,
            cancel,
            initial_index,
            order: Vec::new(),
            cursor: 0,
            loops_through_shuffled_hosts: 0,
            redirects: 0,
            attempts_on_current_host: 0,
            selections_made: 0,
        }
    }

    fn single_host(&self) -> bool {
        self.hosts.len() == 1
    }

    fn first_pass_order(&self) -> Vec<usize> {
        let others: Vec<usize> = (0..self.hosts.len()).filter(|&i| i != self.initial_index).collect();
        let perm = random_shuffle(others.len());
        let mut order = Vec::with_capacity(self.hosts.len());
        order.push(self.initial_index);
        order.extend(perm.into_iter().map(|i| others[i]));
        order
    }

    fn later_pass_order(&self) -> Vec<usize> {
        let perm = random_shuffle(self.hosts.len());
        perm
    }

    fn at_last_position_of_pass(&self) -> bool {
        !self.order.is_empty() && self.cursor + 1 == self.order.len()
    }
}

#[async_trait]
impl PerQuerySelector for RandomNodeSelector {
    async fn select_node(&mut self) -> Result<Url, Error> {
        self.redirects = 0;

        if self.single_host() {
            // Pure budget check against max_attempts_per_host; no
            // permutation ever materializes for a single host.
            if self.selections_made > 0 && self.attempts_on_current_host >= self.max_attempts_per_host {
                return Err(Error::HostsExhausted(HostsExhausted { should_log: true }));
            }
            self.selections_made += 1;
            self.attempts_on_current_host += 1;
            return Ok(self.hosts[0].clone());
        }

        if self.selections_made == 0 {
            self.selections_made = 1;
            return Ok(self.hosts[self.initial_index].clone());
        }

        if self.order.is_empty() {
            // Second call: materialize the first-pass order. Position 0 of
            // that order is the host the first (lazy) call already
            // returned, so the cursor starts at 1.
            self.order = self.first_pass_order();
            self.cursor = 1;
        } else {
            self.cursor += 1;
            if self.cursor >= self.order.len() {
                self.loops_through_shuffled_hosts += 1;
                if self.loops_through_shuffled_hosts >= self.max_attempts_per_host {
                    return Err(Error::HostsExhausted(HostsExhausted { should_log: true }));
                }
                self.order = self.later_pass_order();
                self.cursor = 0;
            }
        }

        self.selections_made += 1;
        Ok(self.hosts[self.order[self.cursor]].clone())
    }

    async fn on_success(&mut self) {}

    async fn on_redirect(&mut self, _location: &Url) -> RedirectOutcome {
        if self.redirects >= self.max_redirects {
            RedirectOutcome { follow: false, override_follow_target: None, log: true }
        } else {
            self.redirects += 1;
            RedirectOutcome { follow: true, override_follow_target: None, log: true }
        }
    }

    async fn on_failure(&mut self, _kind: FailureKind) {
        if self.single_host() {
            // No permutation to advance, but the next attempt against this
            // same host still backs off like any other retry.
            let _ = backoff(self.attempts_on_current_host, &self.cancel).await;
            return;
        }

        if self.at_last_position_of_pass() {
            // Backoff only fires at pass boundaries; within
            // a pass, failures are immediate retries on the next node.
            // Cancellation is surfaced by the driver re-checking its own
            // token on the next loop iteration, so a Canceled result here
            // is intentionally ignored.
            let _ = backoff(self.loops_through_shuffled_hosts, &self.cancel).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn hosts(n: usize) -> Arc<[Url]> {
        (0..n)
            .map(|i| Url::parse(&format!("http://node{i}.example:4001")).unwrap())
            .collect::<Vec<_>>()
            .into()
    }

    #[tokio::test(start_paused = true)]
    async fn single_host_is_a_pure_budget_check() {
        let cancel = CancellationToken::new();
        let mut sel = RandomNodeSelector::new(hosts(1), 2, 2, cancel);
        assert!(sel.select_node().await.is_ok());
        sel.on_failure(FailureKind::FetchError("boom".into())).await;
        assert!(sel.select_node().await.is_ok());
        sel.on_failure(FailureKind::FetchError("boom".into())).await;
        assert!(sel.select_node().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn single_host_backs_off_between_attempts() {
        let cancel = CancellationToken::new();
        let mut sel = RandomNodeSelector::new(hosts(1), 3, 2, cancel);
        sel.select_node().await.unwrap();
        let start = tokio::time::Instant::now();
        sel.on_failure(FailureKind::FetchError("boom".into())).await;
        assert!(tokio::time::Instant::now() - start >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn one_pass_contacts_every_host_exactly_once() {
        let cancel = CancellationToken::new();
        let h = hosts(5);
        let mut sel = RandomNodeSelector::new(h.clone(), 3, 2, cancel);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..h.len() {
            let node = sel.select_node().await.unwrap();
            assert!(seen.insert(node), "host visited twice within one pass");
        }
        assert_eq!(seen.len(), h.len());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_exactly_k_attempts_per_host() {
        let cancel = CancellationToken::new();
        let h = hosts(3);
        let k = 2u32;
        let mut sel = RandomNodeSelector::new(h.clone(), k, 2, cancel);
        let mut attempts = 0u32;
        loop {
            match sel.select_node().await {
                Ok(_) => {
                    attempts += 1;
                    sel.on_failure(FailureKind::FetchError("x".into())).await;
                }
                Err(_) => break,
            }
        }
        assert_eq!(attempts, h.len() as u32 * k);
    }

    #[tokio::test(start_paused = true)]
    async fn multi_pass_visits_every_host_each_pass() {
        let cancel = CancellationToken::new();
        let h = hosts(4);
        let mut sel = RandomNodeSelector::new(h.clone(), 3, 2, cancel);
        for _pass in 0..3 {
            let mut seen = std::collections::HashSet::new();
            for _ in 0..h.len() {
                let node = sel.select_node().await.unwrap();
                assert!(seen.insert(node));
                sel.on_failure(FailureKind::FetchError("x".into())).await;
            }
            assert_eq!(seen.len(), h.len());
        }
        assert!(sel.select_node().await.is_err());
    }
}
