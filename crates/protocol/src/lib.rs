//! Wire and record types shared across the authkeep workspace.
//!
//! Three families live here:
//!
//! - [`cookie`] - browser cookies and per-origin storage entries, the opaque
//!   payload the manager persists and replays but never interprets
//! - [`session`] - the persisted [`AuthSession`] record and its schema version
//! - [`verdict`] - validation outcomes reported by session probes
//! - [`cdp`] - Chrome DevTools Protocol message envelopes used by the runtime
//!
//! This crate is I/O-free on purpose: everything here is plain data with
//! serde derives, consumed by `ak-runtime` and the core crate.

pub mod cdp;
pub mod cookie;
pub mod session;
pub mod verdict;

pub use cdp::{CdpError, CdpEvent, CdpMessage, CdpRequest, CdpResponse};
pub use cookie::{Cookie, OriginState, SameSite, StorageEntry};
pub use session::{AuthSession, SESSION_SCHEMA_VERSION};
pub use verdict::{ValidationOutcome, ValidationReport};
