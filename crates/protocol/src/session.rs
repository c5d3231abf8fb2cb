//! The persisted authenticated-session record.

use serde::{Deserialize, Serialize};

use crate::cookie::{Cookie, OriginState};

/// Current on-disk schema version for [`AuthSession`] records.
pub const SESSION_SCHEMA_VERSION: u32 = 1;

fn session_schema_version() -> u32 {
	SESSION_SCHEMA_VERSION
}

/// One persisted unit of authenticated browser state.
///
/// Created only by acquisition, read by validation probes and test runs,
/// and replaced wholesale by a later acquisition. The record is never
/// patched in place: a different identity always means a different record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
	/// Record schema version.
	#[serde(default = "session_schema_version")]
	pub schema_version: u32,

	/// Logical user/environment key this session belongs to.
	pub identity: String,

	/// Cookies captured at acquisition, in browser order.
	pub cookies: Vec<Cookie>,

	/// Per-origin localStorage captured at acquisition.
	#[serde(default)]
	pub origins: Vec<OriginState>,

	/// Unix epoch seconds when the session was captured.
	pub captured_at: u64,

	/// Authenticated landing URL observed at capture time. Diagnostic only;
	/// never consulted when deciding validity.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source_url: Option<String>,
}

impl AuthSession {
	/// Creates a freshly-captured record for `identity`.
	pub fn new(identity: impl Into<String>, cookies: Vec<Cookie>, origins: Vec<OriginState>, captured_at: u64) -> Self {
		Self {
			schema_version: SESSION_SCHEMA_VERSION,
			identity: identity.into(),
			cookies,
			origins,
			captured_at,
			source_url: None,
		}
	}

	/// Sets the observed landing URL.
	pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
		self.source_url = Some(url.into());
		self
	}

	/// Returns `true` when the record carries no replayable state at all.
	pub fn is_empty(&self) -> bool {
		self.cookies.is_empty() && self.origins.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn schema_version_defaults_when_missing() {
		let json = r#"{"identity":"uat","cookies":[],"capturedAt":1700000000}"#;
		let session: AuthSession = serde_json::from_str(json).unwrap();
		assert_eq!(session.schema_version, SESSION_SCHEMA_VERSION);
		assert!(session.origins.is_empty());
	}

	#[test]
	fn empty_record_detection() {
		let session = AuthSession::new("uat", Vec::new(), Vec::new(), 0);
		assert!(session.is_empty());

		let session = AuthSession::new("uat", vec![Cookie::new("s", "v", "example.com")], Vec::new(), 0);
		assert!(!session.is_empty());
	}

	#[test]
	fn round_trip_preserves_identity_and_landing() {
		let session = AuthSession::new("uat", vec![Cookie::new("s", "v", "example.com")], Vec::new(), 1700000000)
			.with_source_url("https://app.example.com/dashboard");
		let json = serde_json::to_string_pretty(&session).unwrap();
		let back: AuthSession = serde_json::from_str(&json).unwrap();
		assert_eq!(back.identity, "uat");
		assert_eq!(back.source_url.as_deref(), Some("https://app.example.com/dashboard"));
		assert_eq!(back.captured_at, 1700000000);
	}
}
