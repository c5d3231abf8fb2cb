//! Durable session storage with atomic commit.
//!
//! One JSON record per identity. Writes go to a temp file in the store
//! directory and are renamed over the record, so a concurrent reader sees
//! either the previous record or the new one, never a torn mix. Unreadable
//! records surface as absent: the caller's recovery path is re-acquisition,
//! and the broken file stays on disk for a human to inspect.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use ak_protocol::{AuthSession, SESSION_SCHEMA_VERSION};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::Result;

/// File-backed store of [`AuthSession`] records, one per identity.
#[derive(Debug, Clone)]
pub struct SessionStore {
	root: PathBuf,
}

impl SessionStore {
	/// Creates a store rooted at `root`. The directory is created lazily on
	/// first save.
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Path of the record backing `identity`, for diagnostics.
	pub fn path_for(&self, identity: &str) -> PathBuf {
		self.root.join(format!("{}.json", sanitize_identity(identity)))
	}

	/// Loads the record for `identity`.
	///
	/// Returns `None` for a missing file and for anything unreadable:
	/// malformed JSON, a wrong schema version, or a record whose fields do
	/// not deserialize. Corruption is logged, never propagated.
	pub fn load(&self, identity: &str) -> Result<Option<AuthSession>> {
		let path = self.path_for(identity);
		let content = match fs::read_to_string(&path) {
			Ok(c) => c,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};

		let value: serde_json::Value = match serde_json::from_str(&content) {
			Ok(v) => v,
			Err(e) => {
				warn!(target = "ak.store", path = %path.display(), error = %e, "unreadable session record; treating as absent");
				return Ok(None);
			}
		};

		let schema = value.get("schemaVersion").and_then(|v| v.as_u64()).unwrap_or(0);
		if schema != SESSION_SCHEMA_VERSION as u64 {
			warn!(
				target = "ak.store",
				path = %path.display(),
				schema,
				"session record has unsupported schema version; treating as absent"
			);
			return Ok(None);
		}

		match serde_json::from_value::<AuthSession>(value) {
			Ok(session) => Ok(Some(session)),
			Err(e) => {
				warn!(target = "ak.store", path = %path.display(), error = %e, "malformed session record; treating as absent");
				Ok(None)
			}
		}
	}

	/// Commits `session` for its identity, replacing any previous record.
	///
	/// The write is atomic with respect to concurrent `load` calls: the
	/// record is fully written and synced to a temp file in the same
	/// directory, then renamed into place.
	pub fn save(&self, session: &AuthSession) -> Result<()> {
		fs::create_dir_all(&self.root)?;
		let path = self.path_for(&session.identity);
		let content = serde_json::to_string_pretty(session)?;

		let mut staged = NamedTempFile::new_in(&self.root)?;
		staged.write_all(content.as_bytes())?;
		staged.as_file().sync_all()?;
		staged.persist(&path).map_err(|e| e.error)?;

		debug!(
			target = "ak.store",
			path = %path.display(),
			cookies = session.cookies.len(),
			origins = session.origins.len(),
			"session record committed"
		);
		Ok(())
	}
}

/// Maps an identity to a filename-safe form. Distinct identities that
/// sanitize identically would share a record, so keep identities simple.
fn sanitize_identity(identity: &str) -> String {
	let cleaned: String = identity
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '-' })
		.collect();
	if cleaned.is_empty() { "default".to_string() } else { cleaned }
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use ak_protocol::Cookie;
	use tempfile::tempdir;

	use super::*;

	fn session(identity: &str, cookie_count: usize) -> AuthSession {
		let cookies = (0..cookie_count)
			.map(|i| Cookie::new(format!("c{i}"), format!("v{i}"), ".example.com"))
			.collect();
		AuthSession::new(identity, cookies, Vec::new(), 1700000000)
	}

	#[test]
	fn load_missing_returns_absent() {
		let dir = tempdir().unwrap();
		let store = SessionStore::new(dir.path());
		assert!(store.load("uat").unwrap().is_none());
	}

	#[test]
	fn save_then_load_round_trips() {
		let dir = tempdir().unwrap();
		let store = SessionStore::new(dir.path().join("sessions"));

		store.save(&session("uat", 2)).unwrap();
		let loaded = store.load("uat").unwrap().unwrap();
		assert_eq!(loaded.identity, "uat");
		assert_eq!(loaded.cookies.len(), 2);
	}

	#[test]
	fn corrupt_record_is_absent_not_an_error() {
		let dir = tempdir().unwrap();
		let store = SessionStore::new(dir.path());
		fs::write(store.path_for("uat"), "{not json").unwrap();

		assert!(store.load("uat").unwrap().is_none());
		// Record stays on disk for diagnosis.
		assert!(store.path_for("uat").exists());
	}

	#[test]
	fn unsupported_schema_is_absent() {
		let dir = tempdir().unwrap();
		let store = SessionStore::new(dir.path());
		let mut value = serde_json::to_value(session("uat", 1)).unwrap();
		value["schemaVersion"] = serde_json::json!(99);
		fs::write(store.path_for("uat"), value.to_string()).unwrap();

		assert!(store.load("uat").unwrap().is_none());
	}

	#[test]
	fn save_replaces_previous_record() {
		let dir = tempdir().unwrap();
		let store = SessionStore::new(dir.path());

		store.save(&session("uat", 1)).unwrap();
		store.save(&session("uat", 3)).unwrap();
		assert_eq!(store.load("uat").unwrap().unwrap().cookies.len(), 3);
	}

	#[test]
	fn identities_are_sanitized_consistently() {
		let dir = tempdir().unwrap();
		let store = SessionStore::new(dir.path());

		store.save(&session("qa/staging env", 1)).unwrap();
		let path = store.path_for("qa/staging env");
		assert!(path.ends_with("qa-staging-env.json"), "got {}", path.display());
		assert!(store.load("qa/staging env").unwrap().is_some());
	}

	#[test]
	fn concurrent_readers_never_see_a_torn_record() {
		let dir = tempdir().unwrap();
		let store = Arc::new(SessionStore::new(dir.path()));
		store.save(&session("uat", 1)).unwrap();

		let reader = {
			let store = Arc::clone(&store);
			std::thread::spawn(move || {
				for _ in 0..200 {
					// Every observation must be a complete record with one of
					// the two cookie counts ever written.
					let loaded = store.load("uat").unwrap().expect("record must always be present");
					assert!(matches!(loaded.cookies.len(), 1 | 3), "torn read: {} cookies", loaded.cookies.len());
				}
			})
		};

		for i in 0..200 {
			let count = if i % 2 == 0 { 3 } else { 1 };
			store.save(&session("uat", count)).unwrap();
		}
		reader.join().unwrap();
	}
}
