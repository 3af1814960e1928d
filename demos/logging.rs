use std::env;

use rqlite_client::{Connection, ConnectionOptions, EventConfig, ExecuteOptions, LogConfig};
use tracing::Level;

#[tokio::main]
async fn main() -> Result<(), rqlite_client::Error> {
    tracing_subscriber::fmt::init();

    let uri = env::var("RQLITE_URI").unwrap_or_else(|_| "http://127.0.0.1:4001".to_string());

    // Turn the chatty per-request hooks down to TRACE, but keep
    // hosts-exhausted loud since that one always indicates real trouble.
    let mut log = LogConfig::default();
    log.read_start = EventConfig { enabled: true, level: Level::TRACE, max_message_len: 128 };
    log.read_response = EventConfig { enabled: true, level: Level::TRACE, max_message_len: 128 };

    let options = ConnectionOptions::builder().log(log).build();
    let connection = Connection::new(vec![uri.parse().expect("invalid RQLITE_URI")], Some(options))?;
    let cursor = connection.cursor(None, None);

    let result = cursor.execute("SELECT 1", &[], ExecuteOptions::default(), None).await?;
    println!("{:?}", result.adapted().results());

    Ok(())
}
