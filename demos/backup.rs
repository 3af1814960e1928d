use std::env;

use clap::Parser;
use rqlite_client::{BackupFormat, Connection};

/// Streams a snapshot of an rqlite cluster's database to a local file.
#[derive(Parser)]
struct Args {
    /// Destination path for the backup.
    out: String,

    /// Dump as a textual SQL script instead of the binary SQLite format.
    #[arg(long)]
    sql: bool,
}

#[tokio::main]
async fn main() -> Result<(), rqlite_client::Error> {
    let args = Args::parse();
    let uri = env::var("RQLITE_URI").unwrap_or_else(|_| "http://127.0.0.1:4001".to_string());

    let connection = Connection::new(vec![uri.parse().expect("invalid RQLITE_URI")], None)?;
    let format = if args.sql { BackupFormat::Sql } else { BackupFormat::Binary };

    let written = connection.backup_to_file(format, &args.out, None).await?;
    println!("wrote {written} bytes to {}", args.out);

    Ok(())
}
