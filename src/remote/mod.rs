//! Backend boundary module.
//!
//! - `pending`: ids with an operation in flight
//! - `optimistic`: local state shown ahead of confirmation, with rollback
//! - `persistence`: the async `Persistence` trait
//! - `http`: reqwest implementation (feature `remote`)

pub mod optimistic;
pub mod pending;
pub mod persistence;

#[cfg(feature = "remote")]
pub mod http;

pub use optimistic::Optimistic;
pub use pending::PendingSet;
pub use persistence::{Persistence, RemoteError};

#[cfg(feature = "remote")]
pub use http::HttpPersistence;
