//! Browser transport runtime: DevTools endpoint discovery and the CDP
//! connection layer.
//!
//! This crate knows how to find a debuggable browser (`/json/version` over
//! HTTP) and how to talk to it (flat-mode CDP over a single WebSocket with
//! request/response correlation and an event stream). It knows nothing about
//! sessions, cookies-as-auth, or validation policy; those live upstream.

mod connection;
mod endpoint;
mod error;

pub use connection::{CdpConnection, wait_for_event};
pub use endpoint::{DevToolsInfo, fetch_devtools_info};
pub use error::{Error, Result};
