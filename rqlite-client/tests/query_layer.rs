//! End-to-end scenarios driven through the public `Connection`/`Cursor` API
//! against a mocked rqlite HTTP surface.

use rqlite_client::{BulkOptions, Connection, ConnectionOptions, Consistency, Error, ExecuteOptions};
use wiremock::matchers::{body_string_contains, method, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Matches a bare, valueless query flag such as `&transaction` — wiremock's
/// own `query_param` matcher expects a value and never matches the empty
/// string `query_pairs()` parses a valueless key to.
struct BareQueryFlag(&'static str);

impl wiremock::Match for BareQueryFlag {
    fn matches(&self, request: &Request) -> bool {
        request.url.query_pairs().any(|(k, _)| k == self.0)
    }
}

fn connection_over(server: &MockServer) -> Connection {
    Connection::new(vec![server.uri().parse().unwrap()], None).unwrap()
}

/// S1 — write then read (weak).
#[tokio::test]
async fn write_then_read_round_trips_through_the_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("CREATE TABLE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": [{}]})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("INSERT INTO"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": [{"rows_affected": 1}]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("SELECT v FROM t"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": [{"values": [["a"]]}]})),
        )
        .mount(&server)
        .await;

    let connection = connection_over(&server);
    let cursor = connection.cursor(None, None);

    cursor
        .execute("CREATE TABLE t(id INTEGER PRIMARY KEY, v TEXT)", &[], ExecuteOptions::default(), None)
        .await
        .unwrap();

    let inserted = cursor.execute("INSERT INTO t(v) VALUES (?)", &["a".into()], ExecuteOptions::default(), None).await.unwrap();
    assert_eq!(inserted.adapted().rows_affected(), Some(1));

    let selected = cursor.execute("SELECT v FROM t", &[], ExecuteOptions::default(), None).await.unwrap();
    assert_eq!(selected.adapted().results(), Some(&[vec![serde_json::json!("a")]][..]));
}

/// S3 — stale read retry.
#[tokio::test]
async fn a_none_level_stale_read_is_retried_once_at_weak() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("level", "none"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "stale read"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(query_param("level", "weak"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": [{"values": [[1]]}]})),
        )
        .mount(&server)
        .await;

    let connection = connection_over(&server);
    let cursor = connection.cursor(Some(Consistency::None), None);

    let result = cursor
        .execute("SELECT 1", &[], ExecuteOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(result.adapted().results(), Some(&[vec![serde_json::json!(1)]][..]));
}

/// S4 — bulk atomicity: a duplicate-key second operation surfaces as a
/// per-item SQL error rather than failing the whole batch, and the
/// response never carries more items than operations submitted.
#[tokio::test]
async fn bulk_execute_reports_a_per_item_error_without_padding_the_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(BareQueryFlag("transaction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                {"rows_affected": 1},
                {"error": "UNIQUE constraint failed: t.id"}
            ]
        })))
        .mount(&server)
        .await;

    let connection = connection_over(&server);
    let cursor = connection.cursor(None, None);

    let empty: Vec<serde_json::Value> = Vec::new();
    let statements: Vec<(&str, &[serde_json::Value])> = vec![
        ("INSERT INTO t VALUES(1,'x')", &empty),
        ("INSERT INTO t VALUES(1,'y')", &empty),
    ];
    let opts = BulkOptions { raise_on_error: Some(false), transaction: Some(true) };
    let result = cursor.execute_many(&statements, opts, None).await.unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.first_error_index(), Some(1));
}

/// S6 — hosts exhausted: every host refuses the connection outright, and
/// `maxAttemptsPerHost=1` means exactly one attempt per host before giving
/// up.
#[tokio::test]
async fn hosts_exhausted_when_every_host_refuses_the_connection() {
    let options = ConnectionOptions::builder().max_attempts_per_host(1).max_redirects(2).build();
    let hosts = vec![
        "http://127.0.0.1:1".parse().unwrap(),
        "http://127.0.0.1:2".parse().unwrap(),
        "http://127.0.0.1:3".parse().unwrap(),
    ];
    let connection = Connection::new(hosts, Some(options)).unwrap();
    let cursor = connection.cursor(None, None);

    let result = cursor.execute("SELECT 1", &[], ExecuteOptions::default(), None).await;
    assert!(matches!(result, Err(Error::HostsExhausted(_))));
}
