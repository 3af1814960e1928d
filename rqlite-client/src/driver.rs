//! The request driver: the only component in this crate that performs I/O.
//!
//! One call to [`execute`] drives a single logical request to completion,
//! retrying across nodes via a [`PerQuerySelector`] until success,
//! cancellation, or *hosts-exhausted*. Every per-attempt timer and in-flight
//! fetch is torn down by Rust's ordinary drop semantics: `tokio::select!`
//! drops the losing branch's future as soon as one side resolves, which
//! releases the socket and cancels the read exactly like an explicit LIFO
//! teardown stack would, without needing to hand-roll one.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Method;
use rqlite_client_core::error::{Error, FailureKind, NonOkSubtype, TimeoutPhase};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::log::Logger;
use crate::selector::{PerQuerySelector, RedirectOutcome};
use crate::url_util::strip_to_origin;

/// Everything the driver needs that doesn't change per attempt.
pub(crate) struct DriverContext {
    pub client: reqwest::Client,
    pub logger: Logger,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl DriverContext {
    pub fn new(client: reqwest::Client, logger: Logger, timeout_ms: u64, response_timeout_ms: u64) -> Self {
        Self {
            client,
            logger,
            connect_timeout: Duration::from_millis(timeout_ms),
            response_timeout: Duration::from_millis(response_timeout_ms),
        }
    }
}

/// Drives one logical request to completion.
///
/// `path` is joined against whichever host the selector (or a redirect)
/// names; it carries the query string (`?level=weak&redirect`, etc). `body`
/// is the raw JSON payload, or `None` for the backup `GET`. `parse_response`
/// consumes the 2xx response and either returns the decoded value or a
/// [`FailureKind`] describing why reading the body failed (a read timeout
/// is surfaced by the caller racing this future against
/// `ctx.response_timeout`, not by `parse_response` itself).
pub(crate) async fn execute<T, P, Fut>(
    ctx: &DriverContext,
    mut selector: Box<dyn PerQuerySelector>,
    method: Method,
    path: &str,
    body: Option<Arc<Vec<u8>>>,
    cancel: CancellationToken,
    mut parse_response: P,
) -> Result<T, Error>
where
    P: FnMut(reqwest::Response) -> Fut,
    Fut: Future<Output = Result<T, FailureKind>>,
{
    let mut follow_target: Option<Url> = None;

    loop {
        if cancel.is_cancelled() {
            return Err(Error::Canceled);
        }

        let target = match follow_target.take() {
            Some(url) => url,
            None => match selector.select_node().await {
                Ok(url) => url,
                Err(Error::HostsExhausted(exhausted)) => {
                    if exhausted.should_log {
                        ctx.logger.hosts_exhausted(path);
                    }
                    return Err(Error::HostsExhausted(exhausted));
                }
                Err(err) => return Err(err),
            },
        };
        let Ok(url) = target.join(path) else {
            return Err(Error::protocol(format!("invalid request path: {path}")));
        };

        let start = Instant::now();
        let mut request = ctx.client.request(method.clone(), url.clone());
        request = request.header("Content-Type", "application/json; charset=UTF-8");
        if let Some(body) = &body {
            request = request.body((**body).clone());
        }

        let send = request.send();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Canceled),
            res = tokio::time::timeout(ctx.connect_timeout, send) => res,
        };

        let response = match outcome {
            Err(_elapsed) => {
                ctx.logger.connect_timeout(url.as_str());
                selector.on_failure(FailureKind::Timeout(TimeoutPhase::Connect)).await;
                continue;
            }
            Ok(Err(fetch_err)) => {
                ctx.logger.fetch_error(url.as_str(), &fetch_err.to_string());
                selector.on_failure(FailureKind::FetchError(fetch_err.to_string())).await;
                continue;
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();

        if matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308) {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| Url::parse(s).ok());

            let Some(location) = location else {
                let body_text = response.text().await.unwrap_or_default();
                ctx.logger.non_ok_response(url.as_str(), status.as_u16());
                selector
                    .on_failure(FailureKind::NonOkResponse(NonOkSubtype::MissingLocation(body_text)))
                    .await;
                continue;
            };

            let RedirectOutcome { follow, override_follow_target, log } = selector.on_redirect(&location).await;
            if log {
                ctx.logger.follow_redirect(url.as_str(), location.as_str());
            }
            if follow {
                follow_target = override_follow_target.or_else(|| strip_to_origin(&location));
                continue;
            } else {
                ctx.logger.non_ok_response(url.as_str(), status.as_u16());
                continue;
            }
        }

        if status.is_success() {
            ctx.logger.slow_query(path, start.elapsed());
            let parsed = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Canceled),
                res = tokio::time::timeout(ctx.response_timeout, parse_response(response)) => res,
            };
            match parsed {
                Err(_elapsed) => {
                    ctx.logger.read_timeout(url.as_str());
                    selector.on_failure(FailureKind::Timeout(TimeoutPhase::Read)).await;
                    continue;
                }
                Ok(Err(kind)) => {
                    selector.on_failure(kind).await;
                    continue;
                }
                Ok(Ok(value)) => {
                    selector.on_success().await;
                    return Ok(value);
                }
            }
        }

        ctx.logger.non_ok_response(url.as_str(), status.as_u16());
        selector.on_failure(FailureKind::NonOkResponse(NonOkSubtype::Status(status.as_u16()))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use wiremock::matchers::method as method_matcher;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct SingleShotSelector {
        hosts: Vec<Url>,
        next: usize,
        redirects: Arc<Mutex<u32>>,
        failures: Arc<Mutex<u32>>,
    }

    impl SingleShotSelector {
        fn new(hosts: Vec<Url>) -> Self {
            Self { hosts, next: 0, redirects: Arc::new(Mutex::new(0)), failures: Arc::new(Mutex::new(0)) }
        }
    }

    #[async_trait]
    impl PerQuerySelector for SingleShotSelector {
        async fn select_node(&mut self) -> Result<Url, Error> {
            if self.next >= self.hosts.len() {
                return Err(Error::HostsExhausted(rqlite_client_core::error::HostsExhausted { should_log: true }));
            }
            let host = self.hosts[self.next].clone();
            self.next += 1;
            Ok(host)
        }

        async fn on_redirect(&mut self, _location: &Url) -> RedirectOutcome {
            *self.redirects.lock().unwrap() += 1;
            RedirectOutcome { follow: true, override_follow_target: None, log: true }
        }

        async fn on_failure(&mut self, _kind: FailureKind) {
            *self.failures.lock().unwrap() += 1;
        }
    }

    fn logger() -> Logger {
        Logger::default()
    }

    async fn parse_text(response: reqwest::Response) -> Result<String, FailureKind> {
        response.text().await.map_err(|e| FailureKind::FetchError(e.to_string()))
    }

    #[tokio::test]
    async fn succeeds_against_an_ok_response() {
        let server = MockServer::start().await;
        Mock::given(method_matcher("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let ctx = DriverContext::new(reqwest::Client::new(), logger(), 5_000, 60_000);
        let selector = Box::new(SingleShotSelector::new(vec![Url::parse(&server.uri()).unwrap()]));
        let result =
            execute(&ctx, selector, Method::GET, "/db/query?level=weak", None, CancellationToken::new(), parse_text)
                .await
                .unwrap();
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn follows_a_single_redirect() {
        let follower = MockServer::start().await;
        let leader = MockServer::start().await;

        Mock::given(method_matcher("POST"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", leader.uri()))
            .mount(&follower)
            .await;
        Mock::given(method_matcher("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("leader-ok"))
            .mount(&leader)
            .await;

        let ctx = DriverContext::new(reqwest::Client::new(), logger(), 5_000, 60_000);
        let selector = Box::new(SingleShotSelector::new(vec![Url::parse(&follower.uri()).unwrap()]));
        let result =
            execute(&ctx, selector, Method::POST, "/db/execute?redirect", None, CancellationToken::new(), parse_text)
                .await
                .unwrap();
        assert_eq!(result, "leader-ok");
    }

    #[tokio::test]
    async fn an_already_cancelled_token_fails_immediately() {
        let ctx = DriverContext::new(reqwest::Client::new(), logger(), 5_000, 60_000);
        let selector = Box::new(SingleShotSelector::new(vec![Url::parse("http://127.0.0.1:1").unwrap()]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result =
            execute(&ctx, selector, Method::GET, "/db/query?level=weak", None, cancel, parse_text).await;
        assert!(matches!(result, Err(Error::Canceled)));
    }

    #[tokio::test]
    async fn non_ok_status_feeds_the_selector_and_propagates_exhaustion() {
        let server = MockServer::start().await;
        Mock::given(method_matcher("GET")).respond_with(ResponseTemplate::new(503)).mount(&server).await;

        let ctx = DriverContext::new(reqwest::Client::new(), logger(), 5_000, 60_000);
        let selector = Box::new(SingleShotSelector::new(vec![Url::parse(&server.uri()).unwrap()]));
        let result =
            execute(&ctx, selector, Method::GET, "/db/query?level=weak", None, CancellationToken::new(), parse_text)
                .await;
        assert!(matches!(result, Err(Error::HostsExhausted(_))));
    }

    #[tokio::test]
    async fn hosts_exhausted_from_select_node_itself_propagates() {
        let ctx = DriverContext::new(reqwest::Client::new(), logger(), 5_000, 60_000);
        let selector = Box::new(SingleShotSelector::new(Vec::new()));
        let result =
            execute(&ctx, selector, Method::GET, "/db/query?level=weak", None, CancellationToken::new(), parse_text)
                .await;
        assert!(matches!(result, Err(Error::HostsExhausted(_))));
    }
}
