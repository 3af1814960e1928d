//! Error taxonomy.
//!
//! `Error` is the single public error type returned from the query layer.
//! `FailureKind` is the internal vocabulary the request driver uses to tell
//! a node selector's `onFailure` callback what went wrong with an attempt;
//! it never reaches a caller directly — the selector loop absorbs it and
//! only surfaces `Error::HostsExhausted` once budgets are spent.

use thiserror::Error;

/// Phase a timeout fired in ("if the timer fired, it is
/// *connect timeout*; if the timer fired while reading, it is *read
/// timeout*").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPhase {
    Connect,
    Read,
}

/// The non-OK-response subtype: a redirect
/// status with no `Location` header carries the response body; any other
/// non-2xx status carries just the numeric code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonOkSubtype {
    /// Redirect status (3xx) with a missing/unusable `Location` header.
    MissingLocation(String),
    /// Any other non-OK status.
    Status(u16),
}

/// What a single fetch attempt failed with, fed into
/// [`NodeSelector::on_failure`](crate) by the request driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Timeout(TimeoutPhase),
    FetchError(String),
    NonOkResponse(NonOkSubtype),
}

/// Carries whether the selector that gave up wants the driver's standard
/// `hostsExhausted` log line to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostsExhausted {
    pub should_log: bool,
}

/// The public error type for every `rqlite-client` operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The caller's cancellation signal fired.
    #[error("operation canceled")]
    Canceled,

    /// The node selector exhausted its attempt/redirect budgets.
    #[error("hosts exhausted")]
    HostsExhausted(HostsExhausted),

    /// The server reported a per-operation SQL error.
    #[error("sql error in operation {index}: {message}")]
    Sql { message: String, index: usize },

    /// A top-level `error` field that is neither `"stale read"` nor a
    /// per-operation error.
    #[error("server error: {0}")]
    Server(String),

    /// A fatal, non-retryable shape mismatch in the response body.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }
}
