//! Cookie and client-storage types carried inside a persisted session.
//!
//! These are opaque payload to every component except the browser that
//! replays them: nothing in this workspace parses a cookie value or a
//! storage entry, they only round-trip through serde and DevTools calls.

use serde::{Deserialize, Serialize};

/// SameSite cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
	/// Sent with same-site and cross-site requests.
	#[serde(rename = "None")]
	None,
	/// Sent with same-site requests and cross-site top-level navigations.
	#[default]
	#[serde(rename = "Lax")]
	Lax,
	/// Only sent with same-site requests.
	#[serde(rename = "Strict")]
	Strict,
}

/// A browser cookie as captured from, and replayed into, a browser context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	/// Cookie name.
	pub name: String,

	/// Cookie value. Opaque; never inspected.
	pub value: String,

	/// Domain the cookie applies to.
	pub domain: String,

	/// Path the cookie applies to.
	#[serde(default = "default_path")]
	pub path: String,

	/// Unix timestamp in seconds; `None` means a session cookie.
	///
	/// Displayed in diagnostics only. Validity is always decided by a live
	/// probe, never by comparing this field against the clock.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub expires: Option<f64>,

	/// Whether the cookie is HTTP-only.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub http_only: Option<bool>,

	/// Whether the cookie requires HTTPS.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub secure: Option<bool>,

	/// SameSite attribute.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub same_site: Option<SameSite>,
}

fn default_path() -> String {
	"/".to_string()
}

impl Cookie {
	/// Creates a cookie with required fields and default attributes.
	pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			domain: domain.into(),
			path: default_path(),
			expires: None,
			http_only: None,
			secure: None,
			same_site: None,
		}
	}

	/// Sets the expiration timestamp (Unix seconds).
	pub fn expires(mut self, expires: f64) -> Self {
		self.expires = Some(expires);
		self
	}

	/// Marks the cookie HTTP-only.
	pub fn http_only(mut self, http_only: bool) -> Self {
		self.http_only = Some(http_only);
		self
	}

	/// Marks the cookie secure-only.
	pub fn secure(mut self, secure: bool) -> Self {
		self.secure = Some(secure);
		self
	}

	/// Returns `true` for session cookies (no expiry or sentinel `-1`).
	pub fn is_session_cookie(&self) -> bool {
		match self.expires {
			None => true,
			Some(ts) => ts < 0.0,
		}
	}
}

/// A single key/value entry of client-side storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
	/// Storage key.
	pub name: String,
	/// Storage value. Opaque; never inspected.
	pub value: String,
}

/// localStorage contents for a single origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginState {
	/// The origin URL (scheme + host + port).
	pub origin: String,
	/// localStorage entries for this origin.
	pub local_storage: Vec<StorageEntry>,
}
