//! The backup pathway: a `GET` whose response body is streamed to a sink
//! without ever being buffered in memory, plus a file-sink convenience
//! wrapper built the same way.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use reqwest::Method;
use rqlite_client_core::error::{Error, FailureKind};
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::driver::{self, DriverContext};
use crate::selector::PerQuerySelector;

/// Matches the buffer size named for the chunked reader.
const CHUNK_BUFFER_HINT: usize = 16 * 1024;

/// Backup output format: binary snapshot (default) or a textual SQL dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupFormat {
    Binary,
    Sql,
}

impl BackupFormat {
    fn query_suffix(self) -> &'static str {
        match self {
            BackupFormat::Binary => "",
            BackupFormat::Sql => "?fmt=sql",
        }
    }
}

/// Streams a backup response to `sink`, consuming the body in
/// [`CHUNK_BUFFER_HINT`]-ish chunks rather than materializing it whole.
async fn stream_to<W: AsyncWrite + Unpin>(
    response: reqwest::Response,
    sink: &mut W,
) -> Result<u64, FailureKind> {
    use tokio::io::AsyncWriteExt;

    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk.map_err(|e| FailureKind::FetchError(e.to_string()))?;
        sink.write_all(&chunk).await.map_err(|e| FailureKind::FetchError(e.to_string()))?;
        written += chunk.len() as u64;
    }
    sink.flush().await.map_err(|e| FailureKind::FetchError(e.to_string()))?;
    Ok(written)
}

pub(crate) async fn backup_to_writer<W: AsyncWrite + Unpin + Send>(
    ctx: &DriverContext,
    selector: Box<dyn PerQuerySelector>,
    format: BackupFormat,
    cancel: CancellationToken,
    sink: W,
) -> Result<u64, Error> {
    ctx.logger.backup_start("/db/backup");
    let path = format!("/db/backup{}", format.query_suffix());
    // A retried attempt reuses the same sink, so it's shared through an Arc
    // rather than captured by a plain `&mut` — that would tie the parser
    // closure's future to a borrow of this frame across every retry, which
    // a `FnMut` closure can't express without an owned capture.
    let sink = Arc::new(tokio::sync::Mutex::new(sink));
    let written = driver::execute(ctx, selector, Method::GET, &path, None::<Arc<Vec<u8>>>, cancel, {
        let sink = Arc::clone(&sink);
        move |response| {
            let sink = Arc::clone(&sink);
            async move {
                let mut guard = sink.lock().await;
                stream_to(response, &mut *guard).await
            }
        }
    })
    .await?;
    ctx.logger.backup_end(written);
    Ok(written)
}

/// Opens `path` and streams the backup body into it through a buffered
/// writer, reusing the exact same streaming consumer as [`backup_to_writer`]
/// — the driver never knows whether the sink is a socket-backed file or
/// anything else.
pub(crate) async fn backup_to_file(
    ctx: &DriverContext,
    selector: Box<dyn PerQuerySelector>,
    format: BackupFormat,
    cancel: CancellationToken,
    path: &Path,
) -> Result<u64, Error> {
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|e| Error::protocol(format!("could not create backup file {}: {e}", path.display())))?;
    let writer = tokio::io::BufWriter::with_capacity(CHUNK_BUFFER_HINT, file);
    backup_to_writer(ctx, selector, format, cancel, writer).await
}
