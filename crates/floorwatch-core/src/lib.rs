//! Domain types and storage contract for the floorwatch occupancy service.
//!
//! This crate is consumed by the server, automation tooling, and tests. It
//! holds the zone/session records, the `SessionStore` trait the server's
//! persistence adapters implement, and the in-memory adapter used for tests
//! and Redis-less deployments.

pub mod session_store;
pub mod types;

pub use session_store::{InMemorySessionStore, SessionStore, SessionStoreError};
pub use types::{LogEntry, Region, Session, Zone};
