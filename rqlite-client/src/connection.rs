//! The consumer-facing API: [`Connection`] and [`Cursor`].

use std::path::Path;
use std::sync::Arc;

use rqlite_client_core::consistency::{Consistency, Freshness};
use rqlite_client_core::error::Error;
use rqlite_client_core::result::{AdaptedResultItem, BulkResult};
use rqlite_client_core::wire::RawResultItem;
use serde_json::Value;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::backup::{self, BackupFormat};
use crate::driver::DriverContext;
use crate::explain::{ExplainFormat, ExplainTree};
use crate::log::Logger;
use crate::options::ConnectionOptions;
use crate::query::{self, BulkOptions, ExecuteOptions};
use crate::selector::QuerySelectorFactory;

/// One statement's result from [`Cursor::execute`].
///
/// Wraps the raw wire item so [`ExecuteResult::adapted`] can hand back a
/// zero-copy [`AdaptedResultItem`] borrowing it, rather than cloning row
/// data into a second owned shape.
#[derive(Debug, Clone)]
pub struct ExecuteResult(RawResultItem);

impl ExecuteResult {
    pub fn adapted(&self) -> AdaptedResultItem<'_> {
        AdaptedResultItem::new(&self.0)
    }

    pub fn into_raw(self) -> RawResultItem {
        self.0
    }
}

/// A connection to an rqlite cluster: one or more candidate hosts plus the
/// shared transport, logger and selector factory every query reuses.
///
/// Cheap to clone (an `Arc` around the driver-facing pieces would be the
/// usual move, but nothing here actually needs shared ownership across
/// threads beyond `&Connection`, so query methods just borrow it).
pub struct Connection {
    ctx: DriverContext,
    selector_factory: Arc<dyn QuerySelectorFactory>,
    default_consistency: Consistency,
    default_freshness: Freshness,
}

impl Connection {
    /// Builds a connection over `hosts`, which must be non-empty.
    pub fn new(hosts: Vec<Url>, options: Option<ConnectionOptions>) -> Result<Self, Error> {
        if hosts.is_empty() {
            return Err(Error::protocol("Connection requires at least one host"));
        }
        let options = options.unwrap_or_default();
        let logger = Logger::new(*options.log());
        let ctx = DriverContext::new(reqwest::Client::new(), logger, options.timeout_ms(), options.response_timeout_ms());
        let hosts: Arc<[Url]> = hosts.into();
        let selector_factory =
            options.selector_factory().for_connection(hosts, options.max_attempts_per_host(), options.max_redirects());

        Ok(Self {
            ctx,
            selector_factory,
            default_consistency: options.read_consistency(),
            default_freshness: options.freshness().clone(),
        })
    }

    /// Derives a cursor fixing the read consistency and freshness for every
    /// call made through it, falling back to the connection's defaults.
    pub fn cursor(&self, consistency: Option<Consistency>, freshness: Option<Freshness>) -> Cursor<'_> {
        Cursor {
            connection: self,
            consistency: consistency.unwrap_or(self.default_consistency),
            freshness: freshness.unwrap_or_else(|| self.default_freshness.clone()),
        }
    }

    /// Streams a backup of the cluster's database to `sink`, directed at
    /// the leader by default (`consistency` overrides the leader-discovery
    /// strength; `freshness` is only meaningful alongside `Consistency::None`).
    pub async fn backup<W>(
        &self,
        format: BackupFormat,
        sink: W,
        cancel: Option<CancellationToken>,
        consistency: Option<Consistency>,
        freshness: Option<Freshness>,
    ) -> Result<u64, Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let cancel = cancel.unwrap_or_default();
        let consistency = consistency.unwrap_or(Consistency::Strong);
        let selector = self.selector_factory.new_selector(consistency, freshness, cancel.clone(), "/db/backup");
        backup::backup_to_writer(&self.ctx, selector, format, cancel, sink).await
    }

    /// Same as [`Connection::backup`] but opens `path` for the caller.
    pub async fn backup_to_file(
        &self,
        format: BackupFormat,
        path: impl AsRef<Path>,
        cancel: Option<CancellationToken>,
    ) -> Result<u64, Error> {
        let cancel = cancel.unwrap_or_default();
        let selector = self.selector_factory.new_selector(Consistency::Strong, None, cancel.clone(), "/db/backup");
        backup::backup_to_file(&self.ctx, selector, format, cancel, path.as_ref()).await
    }
}

/// A short-lived, stateless scope fixing read consistency and freshness for
/// the calls made through it. Cheap to create; holds only a borrow of its
/// parent [`Connection`].
pub struct Cursor<'a> {
    connection: &'a Connection,
    consistency: Consistency,
    freshness: Freshness,
}

impl<'a> Cursor<'a> {
    /// Runs one statement. Reads use this cursor's consistency (or
    /// `opts.read_consistency`, which wins if set); writes always go
    /// through `strong`.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[Value],
        opts: ExecuteOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<ExecuteResult, Error> {
        let item = query::execute(
            &self.connection.ctx,
            self.connection.selector_factory.as_ref(),
            self.consistency,
            &self.freshness,
            sql,
            params,
            opts,
            cancel.unwrap_or_default(),
        )
        .await?;
        Ok(ExecuteResult(item))
    }

    /// Runs every statement in `statements` as one consensus entry. The
    /// tuple-list form (`&[(sql, params)]`) is this crate's ergonomic
    /// shape for a batch; there is no separate parallel-arrays variant the
    /// way a dynamically typed binding might offer, since a slice of
    /// tuples is already a single well-typed argument.
    pub async fn execute_many(
        &self,
        statements: &[(&str, &[Value])],
        opts: BulkOptions,
        cancel: Option<CancellationToken>,
    ) -> Result<BulkResult, Error> {
        query::execute_many(
            &self.connection.ctx,
            self.connection.selector_factory.as_ref(),
            statements,
            opts,
            cancel.unwrap_or_default(),
        )
        .await
    }

    /// Runs `sql` through `EXPLAIN QUERY PLAN` and assembles the resulting
    /// rows into a tree. When `out` is given, the tree is also rendered in
    /// `format` (default [`ExplainFormat::Tree`]) and written through it.
    #[allow(clippy::too_many_arguments)]
    pub async fn explain(
        &self,
        sql: &str,
        params: &[Value],
        read_consistency: Option<Consistency>,
        freshness: Option<Freshness>,
        out: Option<&mut dyn std::io::Write>,
        format: Option<ExplainFormat>,
        cancel: Option<CancellationToken>,
    ) -> Result<ExplainTree, Error> {
        query::explain(
            &self.connection.ctx,
            self.connection.selector_factory.as_ref(),
            self.consistency,
            &self.freshness,
            sql,
            params,
            read_consistency,
            freshness,
            out,
            format,
            cancel.unwrap_or_default(),
        )
        .await
    }
}
