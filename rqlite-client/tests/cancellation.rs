//! Property 5 — a canceled execute fails with *canceled* rather than
//! hanging or surfacing a transport error, whether the token fires before
//! the call starts or while a request is in flight.

use rqlite_client::{CancellationToken, Connection, Error, ExecuteOptions};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wiremock::matchers::method;

#[tokio::test]
async fn an_already_canceled_token_fails_execute_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    let connection = Connection::new(vec![server.uri().parse().unwrap()], None).unwrap();
    let cursor = connection.cursor(None, None);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = cursor.execute("SELECT 1", &[], ExecuteOptions::default(), Some(cancel)).await;
    assert!(matches!(result, Err(Error::Canceled)));
}

#[tokio::test]
async fn cancellation_during_a_slow_response_wins_over_the_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(30)))
        .mount(&server)
        .await;

    let connection = Connection::new(vec![server.uri().parse().unwrap()], None).unwrap();
    let cursor = connection.cursor(None, None);

    let cancel = CancellationToken::new();
    let canceler = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        canceler.cancel();
    });

    let result = cursor.execute("SELECT 1", &[], ExecuteOptions::default(), Some(cancel)).await;
    assert!(matches!(result, Err(Error::Canceled)));
}
