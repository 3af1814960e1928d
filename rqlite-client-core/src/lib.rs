//! Wire types, pure algorithms and the error taxonomy shared by the
//! `rqlite-client` crate.
//!
//! This crate has no knowledge of HTTP or of any particular transport; it is
//! the part of the driver that can be tested without a network.

pub mod backoff;
pub mod command;
pub mod consistency;
pub mod error;
pub mod random;
pub mod result;
pub mod wire;

pub use command::SqlCommand;
pub use consistency::Consistency;
pub use error::{Error, FailureKind, HostsExhausted};
pub use result::{AdaptedResultItem, BulkResult};
pub use wire::{QueryResponse, RawResultItem};
