//! Leader-discovery node selector.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rqlite_client_core::consistency::Freshness;
use rqlite_client_core::error::{Error, FailureKind, NonOkSubtype, TimeoutPhase};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::random::RandomNodeSelector;
use super::{PerQuerySelector, RedirectOutcome};
use crate::url_util::strip_to_origin;

const PROBE_BODY: &str = r#"[["SELECT 1"]]"#;

enum Phase {
    /// Probing for the leader. Wraps the selector used to pick probe
    /// targets and to absorb probe failures.
    Discovering(RandomNodeSelector),
    /// Leader found; every subsequent call delegates to a freshly
    /// constructed random selector over the full host list, preserving
    /// full retry budgets for the real request.
    Delegating(RandomNodeSelector),
}

/// Wraps a [`RandomNodeSelector`] and, on the first `select_node` call,
/// probes nodes with a trivial weak read to discover the cluster leader
/// before handing control to a fresh selector.
pub struct LeaderDiscoverySelector {
    hosts: Arc<[Url]>,
    max_attempts_per_host: u32,
    max_redirects: u32,
    cancel: CancellationToken,
    client: reqwest::Client,
    connect_timeout: Duration,
    phase: Phase,
}

impl LeaderDiscoverySelector {
    pub fn new(
        hosts: Arc<[Url]>,
        max_attempts_per_host: u32,
        max_redirects: u32,
        random: RandomNodeSelector,
        _freshness: Option<Freshness>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            hosts,
            max_attempts_per_host,
            max_redirects,
            cancel,
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("reqwest client construction is infallible with no custom TLS config"),
            connect_timeout: Duration::from_secs(5),
            phase: Phase::Discovering(random),
        }
    }

    async fn probe(&self, target: &Url) -> Result<ProbeOutcome, FailureKind> {
        let request = self
            .client
            .post(format!("{}/db/query?level=weak&redirect", ensure_trailing_slash(target)))
            .header("Content-Type", "application/json; charset=UTF-8")
            .body(PROBE_BODY)
            .timeout(self.connect_timeout);

        let response = request
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FailureKind::Timeout(TimeoutPhase::Connect)
                } else {
                    FailureKind::FetchError(e.to_string())
                }
            })?;

        let status = response.status();
        if matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308) {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            let leader = location
                .as_deref()
                .and_then(|s| Url::parse(s).ok())
                .and_then(|u| strip_to_origin(&u));
            return match leader {
                Some(leader) => Ok(ProbeOutcome::Leader(leader)),
                None => {
                    let body = response.text().await.unwrap_or_default();
                    Err(FailureKind::NonOkResponse(NonOkSubtype::MissingLocation(body)))
                }
            };
        }

        if status.is_success() {
            return Ok(ProbeOutcome::Leader(target.clone()));
        }

        Err(FailureKind::NonOkResponse(NonOkSubtype::Status(status.as_u16())))
    }

    async fn discover(&mut self, random: &mut RandomNodeSelector) -> Result<Url, Error> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Canceled);
            }
            let candidate = random.select_node().await?;
            match self.probe(&candidate).await {
                Ok(ProbeOutcome::Leader(leader)) => return Ok(leader),
                Err(kind) => random.on_failure(kind).await,
            }
        }
    }
}

enum ProbeOutcome {
    Leader(Url),
}

fn ensure_trailing_slash(url: &Url) -> String {
    let s = url.as_str();
    if s.ends_with('/') { s.trim_end_matches('/').to_string() } else { s.to_string() }
}

#[async_trait]
impl PerQuerySelector for LeaderDiscoverySelector {
    async fn select_node(&mut self) -> Result<Url, Error> {
        match &mut self.phase {
            Phase::Discovering(_) => {
                let mut random = match std::mem::replace(
                    &mut self.phase,
                    Phase::Delegating(RandomNodeSelector::new(
                        self.hosts.clone(),
                        self.max_attempts_per_host,
                        self.max_redirects,
                        self.cancel.clone(),
                    )),
                ) {
                    Phase::Discovering(r) => r,
                    Phase::Delegating(_) => unreachable!(),
                };
                let leader = self.discover(&mut random).await?;
                Ok(leader)
            }
            Phase::Delegating(random) => random.select_node().await,
        }
    }

    async fn on_success(&mut self) {
        if let Phase::Delegating(random) = &mut self.phase {
            random.on_success().await;
        }
    }

    async fn on_redirect(&mut self, location: &Url) -> RedirectOutcome {
        match &mut self.phase {
            Phase::Delegating(random) => random.on_redirect(location).await,
            Phase::Discovering(_) => {
                // Never reached: select_node always resolves (or fails) a
                // leader before returning, so the driver only sees
                // redirects once we've transitioned to Delegating.
                RedirectOutcome { follow: false, override_follow_target: None, log: true }
            }
        }
    }

    async fn on_failure(&mut self, kind: FailureKind) {
        if let Phase::Delegating(random) = &mut self.phase {
            random.on_failure(kind).await;
        }
    }
}
