//! Async client for rqlite, a distributed SQLite-backed database reachable
//! over plain HTTP with leader-based consensus.
//!
//! ```no_run
//! # async fn go() -> Result<(), rqlite_client::Error> {
//! use rqlite_client::Connection;
//!
//! let connection = Connection::new(vec!["http://127.0.0.1:4001".parse().unwrap()], None)?;
//! let cursor = connection.cursor(None, None);
//! let result = cursor.execute("SELECT 1", &[], Default::default(), None).await?;
//! println!("{:?}", result.adapted().results());
//! # Ok(())
//! # }
//! ```
//!
//! A [`Connection`] owns the host list, transport and node-selector
//! factory; a [`Cursor`] is a cheap, short-lived scope over it that fixes
//! read consistency and freshness for the calls made through it.

mod backup;
mod connection;
mod driver;
mod error;
mod explain;
mod log;
mod options;
mod query;
mod selector;
mod url_util;

pub use backup::BackupFormat;
pub use connection::{Connection, Cursor, ExecuteResult};
pub use error::{Error, FailureKind, HostsExhausted, NonOkSubtype, TimeoutPhase};
pub use explain::{ExplainFormat, ExplainNode, ExplainTree};
pub use log::{EventConfig, LogConfig, Logger};
pub use options::{ConnectionOptions, ConnectionOptionsBuilder};
pub use query::{BulkOptions, ExecuteOptions};
pub use selector::{DefaultSelectorFactory, PerQuerySelector, QuerySelectorFactory, RedirectOutcome, SelectorFactory};

pub use rqlite_client_core::consistency::{Consistency, Freshness};
pub use rqlite_client_core::result::{AdaptedResultItem, BulkResult};
pub use rqlite_client_core::wire::RawResultItem;

pub use tokio_util::sync::CancellationToken;
pub use url::Url;
