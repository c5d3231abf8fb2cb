//! Error taxonomy for the session lifecycle manager.
//!
//! Failures with a recovery path (corrupt store records, stale sessions)
//! are absorbed where they occur; only failures with no defined recovery
//! reach callers, so a test that sees an `Err` knows the authentication
//! pipeline itself is broken and must fail rather than continue.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AkError>;

#[derive(Debug, Error)]
pub enum AkError {
	/// The target environment did not answer the validation probe. This is
	/// an infrastructure problem, not a session problem; acquisition is
	/// suppressed so it cannot masquerade as a login failure.
	#[error("target environment unreachable: {reason}; acquisition suppressed, check connectivity")]
	NetworkUnreachable { reason: String },

	/// The interactive login did not complete inside its bound.
	#[error("interactive login did not complete within {secs}s; run `authkeep setup` again when ready")]
	AcquisitionTimeout { secs: u64 },

	/// The operator aborted an in-flight acquisition.
	#[error("acquisition aborted by operator; nothing was persisted")]
	AcquisitionCancelled,

	/// No strategy produced a session that passed validation.
	#[error("acquisition failed: {reason}")]
	AcquisitionFailed { reason: String },

	/// A browser could not be located or launched.
	#[error("browser launch failed: {0}")]
	BrowserLaunch(String),

	/// A page navigation was rejected by the browser.
	#[error("navigation to {url} failed: {reason}")]
	Navigation { url: String, reason: String },

	/// In-page script evaluation failed.
	#[error("script evaluation failed: {0}")]
	Script(String),

	/// Configuration is missing or unusable.
	#[error("configuration error: {0}")]
	Config(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Runtime(#[from] ak_runtime::Error),
}

impl AkError {
	/// Returns true when the failure means the remote end could not be
	/// reached at all (as opposed to answering and rejecting us).
	pub fn is_unreachable(&self) -> bool {
		match self {
			AkError::NetworkUnreachable { .. } | AkError::Navigation { .. } => true,
			AkError::Runtime(e) => e.is_unreachable() || e.is_timeout(),
			_ => false,
		}
	}
}
