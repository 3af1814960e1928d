//! Error re-exports.
//!
//! The whole crate shares one public error type, [`rqlite_client_core`]'s
//! `Error`: the driver layer never needs a shape the core crate hasn't
//! already named (cancellation, hosts-exhausted, a SQL error, a server
//! error, a protocol error), so there is no separate wrapping type here —
//! just the names a caller of this crate actually needs, gathered in one
//! place.
pub use rqlite_client_core::error::{Error, FailureKind, HostsExhausted, NonOkSubtype, TimeoutPhase};
