//! Manager configuration: target URLs, login markers, strategy knobs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AkError, Result};

/// Current schema version for the configuration file.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

fn config_schema_version() -> u32 {
	CONFIG_SCHEMA_VERSION
}

fn default_login_patterns() -> Vec<String> {
	["/login", "signin", "sso", "saml", "authorize"].iter().map(|s| s.to_string()).collect()
}

fn default_navigation_timeout_secs() -> u64 {
	30
}

fn default_acquire_timeout_secs() -> u64 {
	300
}

fn default_settle_poll_ms() -> u64 {
	500
}

/// A deterministically-named input field the drive strategy may pre-fill.
///
/// Only ever an initial identifier (account/email); credentials and the
/// second factor stay with the human.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierField {
	/// CSS selector of the field on the identity provider's first page.
	pub selector: String,
	/// Value to type into it.
	pub value: String,
}

/// Full manager configuration, normally loaded from `authkeep.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerConfig {
	/// Configuration schema version.
	#[serde(default = "config_schema_version")]
	pub schema: u32,

	/// Logical user/environment key sessions are stored under.
	#[serde(default = "default_identity")]
	pub identity: String,

	/// Entry point of the protected application; interactive acquisition
	/// starts here and lets the SSO redirect chain take over.
	pub entry_url: String,

	/// A URL known to require authentication, used by validation probes.
	pub probe_url: String,

	/// Case-insensitive substrings identifying login/IdP pages by URL.
	#[serde(default = "default_login_patterns")]
	pub login_url_patterns: Vec<String>,

	/// Optional CSS selector that must be present on an authenticated page.
	#[serde(default)]
	pub success_marker: Option<String>,

	/// Optional identifier field to pre-fill during interactive drive.
	#[serde(default)]
	pub identifier_field: Option<IdentifierField>,

	/// DevTools port of an externally-supervised, already-authenticated
	/// browser. Absent means the live-capture strategy is disabled.
	#[serde(default)]
	pub live_attach_port: Option<u16>,

	/// Override for the session store directory.
	#[serde(default)]
	pub store_root: Option<PathBuf>,

	/// Bound on any single navigation wait, in seconds.
	#[serde(default = "default_navigation_timeout_secs")]
	pub navigation_timeout_secs: u64,

	/// Bound on the whole interactive login flow, in seconds.
	#[serde(default = "default_acquire_timeout_secs")]
	pub acquire_timeout_secs: u64,

	/// Poll interval while waiting for the login redirect chain to settle.
	#[serde(default = "default_settle_poll_ms")]
	pub settle_poll_ms: u64,
}

fn default_identity() -> String {
	"default".to_string()
}

impl ManagerConfig {
	/// Loads and checks a configuration file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path).map_err(|e| {
			AkError::Config(format!("cannot read {}: {e}. Create it with entryUrl and probeUrl set.", path.display()))
		})?;
		let config: Self = serde_json::from_str(&content)
			.map_err(|e| AkError::Config(format!("cannot parse {}: {e}", path.display())))?;
		config.validate()?;
		debug!(target = "ak.config", path = %path.display(), identity = %config.identity, "configuration loaded");
		Ok(config)
	}

	/// Rejects configurations the manager cannot act on.
	pub fn validate(&self) -> Result<()> {
		if self.schema != CONFIG_SCHEMA_VERSION {
			return Err(AkError::Config(format!(
				"unsupported config schema {} (expected {CONFIG_SCHEMA_VERSION})",
				self.schema
			)));
		}
		for (field, value) in [("entryUrl", &self.entry_url), ("probeUrl", &self.probe_url)] {
			if value.trim().is_empty() {
				return Err(AkError::Config(format!("{field} must not be empty")));
			}
			if !value.starts_with("http://") && !value.starts_with("https://") {
				return Err(AkError::Config(format!("{field} must be an absolute http(s) URL, got {value:?}")));
			}
		}
		Ok(())
	}

	pub fn navigation_timeout(&self) -> Duration {
		Duration::from_secs(self.navigation_timeout_secs)
	}

	pub fn acquire_timeout(&self) -> Duration {
		Duration::from_secs(self.acquire_timeout_secs)
	}

	pub fn settle_poll(&self) -> Duration {
		Duration::from_millis(self.settle_poll_ms)
	}
}

#[cfg(test)]
mod tests {
	use tempfile::tempdir;

	use super::*;

	fn minimal_json() -> &'static str {
		r#"{"entryUrl":"https://app.example.com/","probeUrl":"https://app.example.com/dashboard"}"#
	}

	#[test]
	fn minimal_config_gets_defaults() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("authkeep.json");
		fs::write(&path, minimal_json()).unwrap();

		let config = ManagerConfig::load(&path).unwrap();
		assert_eq!(config.schema, CONFIG_SCHEMA_VERSION);
		assert_eq!(config.identity, "default");
		assert!(config.live_attach_port.is_none());
		assert_eq!(config.navigation_timeout(), Duration::from_secs(30));
		assert!(config.login_url_patterns.iter().any(|p| p == "saml"));
	}

	#[test]
	fn missing_file_is_a_config_error() {
		let err = ManagerConfig::load(Path::new("/definitely/missing/authkeep.json")).unwrap_err();
		assert!(matches!(err, AkError::Config(_)), "got {err}");
		assert!(err.to_string().contains("entryUrl"));
	}

	#[test]
	fn unsupported_schema_is_rejected() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("authkeep.json");
		fs::write(
			&path,
			r#"{"schema":9,"entryUrl":"https://a.example.com/","probeUrl":"https://a.example.com/p"}"#,
		)
		.unwrap();

		let err = ManagerConfig::load(&path).unwrap_err();
		assert!(err.to_string().contains("unsupported config schema"));
	}

	#[test]
	fn relative_urls_are_rejected() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("authkeep.json");
		fs::write(&path, r#"{"entryUrl":"app.example.com","probeUrl":"https://a.example.com/p"}"#).unwrap();

		let err = ManagerConfig::load(&path).unwrap_err();
		assert!(err.to_string().contains("absolute http(s) URL"));
	}
}
