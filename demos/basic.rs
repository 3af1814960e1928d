use std::env;

use rqlite_client::{Connection, ExecuteOptions};

#[tokio::main]
async fn main() -> Result<(), rqlite_client::Error> {
    let uri = env::var("RQLITE_URI").unwrap_or_else(|_| "http://127.0.0.1:4001".to_string());
    println!("Connecting to {uri} ...");

    let connection = Connection::new(vec![uri.parse().expect("invalid RQLITE_URI")], None)?;
    let cursor = connection.cursor(None, None);

    cursor
        .execute(
            "CREATE TABLE IF NOT EXISTS basic (id INTEGER PRIMARY KEY, note TEXT)",
            &[],
            ExecuteOptions::default(),
            None,
        )
        .await?;

    let inserted = cursor
        .execute(
            "INSERT INTO basic (note) VALUES (?)",
            &["hello from rqlite-client".into()],
            ExecuteOptions::default(),
            None,
        )
        .await?;
    println!("last_insert_id = {:?}", inserted.adapted().last_insert_id());

    let selected = cursor.execute("SELECT id, note FROM basic", &[], ExecuteOptions::default(), None).await?;
    println!("rows = {:?}", selected.adapted().results());

    Ok(())
}
