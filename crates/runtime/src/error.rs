//! Error types for the browser transport runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while discovering or talking to a browser.
#[derive(Debug, Error)]
pub enum Error {
	/// No debuggable browser answered on the probed endpoint.
	#[error("No DevTools endpoint reachable on port {port}: {reason}")]
	EndpointUnreachable { port: u16, reason: String },

	/// Failed to establish the WebSocket connection.
	#[error("Failed to connect to browser: {0}")]
	ConnectionFailed(String),

	/// Transport-level failure on an established connection.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// The browser replied with something the protocol layer cannot use.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	/// The browser rejected a command.
	#[error("Browser error: {message} (code {code})")]
	Remote { code: i64, message: String },

	/// A command did not complete within its deadline.
	#[error("Timeout: {0}")]
	Timeout(String),

	/// The connection closed while requests were still in flight.
	#[error("Connection closed unexpectedly")]
	ChannelClosed,

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true when the failure was a deadline expiring.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout(_))
	}

	/// Returns true when the failure means the endpoint/environment was
	/// unreachable rather than the command being rejected.
	pub fn is_unreachable(&self) -> bool {
		matches!(self, Error::EndpointUnreachable { .. } | Error::ConnectionFailed(_))
	}
}
