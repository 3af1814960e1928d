//! The query layer: classifies SQL text, maps consistency levels onto the
//! right endpoint, and implements the three request shapes (single execute,
//! bulk execute, explain) on top of [`crate::driver::execute`].

use std::sync::Arc;

use reqwest::Method;
use rqlite_client_core::command::{classify, SqlCommand};
use rqlite_client_core::consistency::{Consistency, Freshness};
use rqlite_client_core::error::{Error, FailureKind};
use rqlite_client_core::result::BulkResult;
use rqlite_client_core::wire::{QueryResponse, RawResultItem};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::driver::{self, DriverContext};
use crate::explain::{ExplainFormat, ExplainTree};
use crate::selector::QuerySelectorFactory;

/// Per-call overrides accepted by `cursor.execute`.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub raise_on_error: Option<bool>,
    pub read_consistency: Option<Consistency>,
    pub freshness: Option<Freshness>,
}

/// Per-call overrides accepted by `cursor.executeMany`.
#[derive(Debug, Clone, Default)]
pub struct BulkOptions {
    pub raise_on_error: Option<bool>,
    pub transaction: Option<bool>,
}

fn encode_body(statements: &[(&str, &[Value])]) -> Result<Vec<u8>, Error> {
    let array: Vec<Value> = statements
        .iter()
        .map(|(sql, params)| {
            let mut row = Vec::with_capacity(1 + params.len());
            row.push(Value::String((*sql).to_string()));
            row.extend(params.iter().cloned());
            Value::Array(row)
        })
        .collect();
    serde_json::to_vec(&Value::Array(array)).map_err(|e| Error::protocol(e.to_string()))
}

fn read_path(consistency: Consistency, freshness: &Freshness) -> String {
    let mut path = format!("/db/query?level={}&redirect", consistency.as_query_value());
    if matches!(consistency, Consistency::None) {
        path.push_str(&format!("&freshness={freshness}"));
    }
    path
}

fn bulk_path(transaction: bool) -> &'static str {
    if transaction {
        "/db/execute?redirect&transaction"
    } else {
        "/db/execute?redirect"
    }
}

/// Calls the driver for one `/db/query` or `/db/execute` round trip and
/// decodes the JSON envelope. Read/write start/response logging happens
/// here, one level above the driver's own transport-failure logging.
async fn call_driver(
    ctx: &DriverContext,
    selector_factory: &dyn QuerySelectorFactory,
    consistency: Consistency,
    freshness: &Freshness,
    path: &str,
    body: Vec<u8>,
    cancel: CancellationToken,
) -> Result<QueryResponse, Error> {
    let is_read = path.starts_with("/db/query");
    if is_read {
        ctx.logger.read_start(path);
    } else {
        ctx.logger.write_start(path);
    }

    let selector = selector_factory.new_selector(consistency, Some(freshness.clone()), cancel.clone(), path);
    let body = Arc::new(body);
    let result = driver::execute(ctx, selector, Method::POST, path, Some(body), cancel, |response| async move {
        response.json::<QueryResponse>().await.map_err(|e| FailureKind::FetchError(e.to_string()))
    })
    .await;

    match &result {
        Ok(_) if is_read => ctx.logger.read_response(path, 200),
        Ok(_) => ctx.logger.write_response(path, 200),
        Err(_) => {}
    }
    result
}

/// Runs a single statement, handling the once-only stale-read retry.
async fn run_single(
    ctx: &DriverContext,
    selector_factory: &dyn QuerySelectorFactory,
    sql: &str,
    params: &[Value],
    mut consistency: Consistency,
    freshness: &Freshness,
    raise_on_error: bool,
    cancel: CancellationToken,
) -> Result<RawResultItem, Error> {
    let body = encode_body(&[(sql, params)])?;
    let mut retried_stale = false;

    loop {
        let path = read_path(consistency, freshness);
        let response =
            call_driver(ctx, selector_factory, consistency, freshness, &path, body.clone(), cancel.clone()).await?;

        if let Some(err) = response.error.as_deref().filter(|e| !e.is_empty()) {
            if err == "stale read" && matches!(consistency, Consistency::None) && !retried_stale {
                ctx.logger.read_stale(&path);
                retried_stale = true;
                consistency = Consistency::Weak;
                continue;
            }
            return Err(Error::Server(err.to_string()));
        }

        if response.results.len() != 1 {
            return Err(Error::protocol(format!(
                "expected exactly one result item, got {}",
                response.results.len()
            )));
        }
        let item = response.results.into_iter().next().expect("checked len == 1 above");

        if raise_on_error {
            if let Some(message) = item.error.as_ref().filter(|e| !e.is_empty()) {
                return Err(Error::Sql { message: message.clone(), index: 0 });
            }
        }
        return Ok(item);
    }
}

/// Always uses `/db/execute?redirect` at `strong` consistency — writes never
/// negotiate consistency.
async fn run_write(
    ctx: &DriverContext,
    selector_factory: &dyn QuerySelectorFactory,
    sql: &str,
    params: &[Value],
    raise_on_error: bool,
    cancel: CancellationToken,
) -> Result<RawResultItem, Error> {
    let body = encode_body(&[(sql, params)])?;
    let response =
        call_driver(ctx, selector_factory, Consistency::Strong, &Freshness::default_value(), "/db/execute?redirect", body, cancel)
            .await?;

    if let Some(err) = response.error.as_deref().filter(|e| !e.is_empty()) {
        return Err(Error::Server(err.to_string()));
    }
    if response.results.len() != 1 {
        return Err(Error::protocol(format!("expected exactly one result item, got {}", response.results.len())));
    }
    let item = response.results.into_iter().next().expect("checked len == 1 above");
    if raise_on_error {
        if let Some(message) = item.error.as_ref().filter(|e| !e.is_empty()) {
            return Err(Error::Sql { message: message.clone(), index: 0 });
        }
    }
    Ok(item)
}

/// `cursor.execute`: classifies `sql`, routes reads through the configured
/// consistency and writes through `strong`, and applies the stale-read
/// retry for `none`-level reads.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn execute(
    ctx: &DriverContext,
    selector_factory: &dyn QuerySelectorFactory,
    default_consistency: Consistency,
    default_freshness: &Freshness,
    sql: &str,
    params: &[Value],
    opts: ExecuteOptions,
    cancel: CancellationToken,
) -> Result<RawResultItem, Error> {
    let raise_on_error = opts.raise_on_error.unwrap_or(true);
    let command = classify(sql);

    if command.is_read() {
        let consistency = opts.read_consistency.unwrap_or(default_consistency);
        let freshness = opts.freshness.unwrap_or_else(|| default_freshness.clone());
        run_single(ctx, selector_factory, sql, params, consistency, &freshness, raise_on_error, cancel).await
    } else {
        run_write(ctx, selector_factory, sql, params, raise_on_error, cancel).await
    }
}

/// `cursor.executeMany`: one consensus entry covering every statement.
pub(crate) async fn execute_many(
    ctx: &DriverContext,
    selector_factory: &dyn QuerySelectorFactory,
    statements: &[(&str, &[Value])],
    opts: BulkOptions,
    cancel: CancellationToken,
) -> Result<BulkResult, Error> {
    let raise_on_error = opts.raise_on_error.unwrap_or(true);
    let transaction = opts.transaction.unwrap_or(true);

    let body = encode_body(statements)?;
    let path = bulk_path(transaction);
    let response =
        call_driver(ctx, selector_factory, Consistency::Strong, &Freshness::default_value(), path, body, cancel)
            .await?;

    if let Some(err) = response.error.as_deref().filter(|e| !e.is_empty()) {
        return Err(Error::Server(err.to_string()));
    }

    let result = BulkResult::new(response.results);
    if raise_on_error {
        if let Some(index) = result.first_error_index() {
            let message = result.items_raw()[index].error.clone().unwrap_or_default();
            return Err(Error::Sql { message, index });
        }
    }
    Ok(result)
}

fn strip_bare_explain(sql: &str) -> &str {
    let trimmed = sql.trim_start();
    if trimmed.len() >= 7 && trimmed[..7].eq_ignore_ascii_case("EXPLAIN") {
        trimmed[7..].trim_start()
    } else {
        trimmed
    }
}

/// `cursor.explain`: upgrades plain `EXPLAIN` to `EXPLAIN QUERY PLAN`,
/// clamps `strong` consistency down to `weak`, and always raises on a SQL
/// error rather than handing back a half-formed tree. When `out` is given,
/// the tree is additionally rendered in `format` (default [`ExplainFormat::Tree`])
/// and written through it.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn explain(
    ctx: &DriverContext,
    selector_factory: &dyn QuerySelectorFactory,
    default_consistency: Consistency,
    default_freshness: &Freshness,
    sql: &str,
    params: &[Value],
    read_consistency: Option<Consistency>,
    freshness: Option<Freshness>,
    out: Option<&mut dyn std::io::Write>,
    format: Option<ExplainFormat>,
    cancel: CancellationToken,
) -> Result<ExplainTree, Error> {
    let command = classify(sql);
    let explain_sql = match command {
        SqlCommand::ExplainQueryPlan => sql.to_string(),
        SqlCommand::Explain => format!("EXPLAIN QUERY PLAN {}", strip_bare_explain(sql)),
        _ => format!("EXPLAIN QUERY PLAN {sql}"),
    };

    let consistency = match read_consistency.unwrap_or(default_consistency) {
        Consistency::Strong => Consistency::Weak,
        other => other,
    };
    let freshness = freshness.unwrap_or_else(|| default_freshness.clone());

    let item = run_single(ctx, selector_factory, &explain_sql, params, consistency, &freshness, true, cancel).await?;
    let rows = item.values.ok_or_else(|| Error::protocol("EXPLAIN QUERY PLAN returned no rows"))?;
    let tree = ExplainTree::from_rows(&rows)?;

    if let Some(sink) = out {
        let rendered = tree.render(format.unwrap_or_default());
        sink.write_all(rendered.as_bytes()).map_err(|e| Error::protocol(e.to_string()))?;
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_path_adds_freshness_only_for_none_consistency() {
        let freshness = Freshness("10s".to_string());
        assert_eq!(read_path(Consistency::Weak, &freshness), "/db/query?level=weak&redirect");
        assert_eq!(read_path(Consistency::None, &freshness), "/db/query?level=none&redirect&freshness=10s");
    }

    #[test]
    fn bulk_path_toggles_the_transaction_flag() {
        assert_eq!(bulk_path(true), "/db/execute?redirect&transaction");
        assert_eq!(bulk_path(false), "/db/execute?redirect");
    }

    #[test]
    fn strip_bare_explain_removes_only_the_leading_keyword() {
        assert_eq!(strip_bare_explain("EXPLAIN SELECT 1"), "SELECT 1");
        assert_eq!(strip_bare_explain("explain   select 1"), "select 1");
    }

    #[test]
    fn encode_body_builds_an_array_of_sql_plus_params_arrays() {
        let params = vec![Value::from("a")];
        let body = encode_body(&[("INSERT INTO t(v) VALUES (?)", &params)]).unwrap();
        let decoded: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(decoded, serde_json::json!([["INSERT INTO t(v) VALUES (?)", "a"]]));
    }
}
