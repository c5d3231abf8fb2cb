//! The provider façade: the one call test runs make.
//!
//! `get_session` either returns a validated, ready-to-use session or an
//! error the calling test must surface as its own failure. There is no
//! third outcome: a test can never silently proceed unauthenticated, so a
//! red test always means a broken feature, not a broken login pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use ak_protocol::{AuthSession, ValidationOutcome};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::acquire::Acquire;
use crate::error::{AkError, Result};
use crate::store::SessionStore;
use crate::validate::Validate;

/// Façade over store, validator, and acquirer.
pub struct SessionProvider {
	store: SessionStore,
	validator: Arc<dyn Validate>,
	acquirer: Arc<dyn Acquire>,
	/// Sessions already handed out by this process; reused verbatim.
	ready: Mutex<HashMap<String, Arc<AuthSession>>>,
	/// Serializes the validate/acquire cycle so concurrent requests for the
	/// same identity cannot race an interactive flow.
	cycle: tokio::sync::Mutex<()>,
	abort: Arc<Notify>,
}

impl SessionProvider {
	pub fn new(store: SessionStore, validator: Arc<dyn Validate>, acquirer: Arc<dyn Acquire>) -> Self {
		Self {
			store,
			validator,
			acquirer,
			ready: Mutex::new(HashMap::new()),
			cycle: tokio::sync::Mutex::new(()),
			abort: Arc::new(Notify::new()),
		}
	}

	/// Handle an operator can use to abort an in-flight acquisition.
	pub fn abort_handle(&self) -> Arc<Notify> {
		Arc::clone(&self.abort)
	}

	/// Returns a validated session for `identity`, acquiring one if needed.
	///
	/// Within one process, a second call for the same identity returns the
	/// identical session without another probe. Concurrent first calls
	/// serialize; followers reuse the winner's result.
	pub async fn get_session(&self, identity: &str) -> Result<Arc<AuthSession>> {
		if let Some(session) = self.ready.lock().get(identity).cloned() {
			debug!(target = "ak.provider", identity, "reusing in-process session");
			return Ok(session);
		}

		let _cycle = self.cycle.lock().await;
		if let Some(session) = self.ready.lock().get(identity).cloned() {
			return Ok(session);
		}

		let session = match self.store.load(identity)? {
			Some(stored) => {
				let report = self.validator.validate(&stored).await?;
				match report.outcome {
					ValidationOutcome::Ok => {
						info!(target = "ak.provider", identity, "stored session validated; reusing");
						stored
					}
					ValidationOutcome::RedirectedToLogin | ValidationOutcome::NoSession => {
						info!(
							target = "ak.provider",
							identity,
							outcome = %report.outcome,
							"stored session is stale; re-acquiring"
						);
						self.reacquire(identity).await?
					}
					ValidationOutcome::NetworkUnreachable => {
						return Err(AkError::NetworkUnreachable {
							reason: "validation probe could not reach the target environment".to_string(),
						});
					}
				}
			}
			None => {
				info!(target = "ak.provider", identity, "no stored session; acquiring");
				self.reacquire(identity).await?
			}
		};

		let session = Arc::new(session);
		self.ready.lock().insert(identity.to_string(), Arc::clone(&session));
		Ok(session)
	}

	/// Acquire → persist → validate, per the provider state machine.
	async fn reacquire(&self, identity: &str) -> Result<AuthSession> {
		let fresh = self.acquirer.acquire(identity, &self.abort).await?;
		self.store.save(&fresh)?;

		let report = self.validator.validate(&fresh).await?;
		match report.outcome {
			ValidationOutcome::Ok => Ok(fresh),
			ValidationOutcome::NetworkUnreachable => Err(AkError::NetworkUnreachable {
				reason: "environment became unreachable right after acquisition".to_string(),
			}),
			outcome => Err(AkError::AcquisitionFailed {
				reason: format!("freshly acquired session failed validation ({outcome})"),
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::collections::VecDeque;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use ak_protocol::{Cookie, ValidationReport};
	use async_trait::async_trait;
	use tempfile::tempdir;

	use super::*;

	fn session(identity: &str) -> AuthSession {
		AuthSession::new(identity, vec![Cookie::new("sid", "tok", ".example.com")], Vec::new(), 1700000000)
	}

	/// Validator that replays a scripted sequence of outcomes, then `Ok`.
	struct ScriptedValidator {
		outcomes: Mutex<VecDeque<ValidationOutcome>>,
		calls: AtomicUsize,
	}

	impl ScriptedValidator {
		fn new(outcomes: &[ValidationOutcome]) -> Arc<Self> {
			Arc::new(Self {
				outcomes: Mutex::new(outcomes.iter().copied().collect()),
				calls: AtomicUsize::new(0),
			})
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl Validate for ScriptedValidator {
		async fn validate(&self, _session: &AuthSession) -> Result<ValidationReport> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			let outcome = self.outcomes.lock().pop_front().unwrap_or(ValidationOutcome::Ok);
			Ok(match outcome {
				ValidationOutcome::Ok => ValidationReport::ok("https://app.example.com/dashboard"),
				other => ValidationReport::rejected(other, None),
			})
		}
	}

	/// Acquirer that hands out fresh sessions, or a scripted failure.
	struct StubAcquirer {
		calls: AtomicUsize,
		fail_with: Option<fn() -> AkError>,
	}

	impl StubAcquirer {
		fn new() -> Arc<Self> {
			Arc::new(Self { calls: AtomicUsize::new(0), fail_with: None })
		}

		fn failing(fail_with: fn() -> AkError) -> Arc<Self> {
			Arc::new(Self { calls: AtomicUsize::new(0), fail_with: Some(fail_with) })
		}

		fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}
	}

	#[async_trait]
	impl Acquire for StubAcquirer {
		async fn acquire(&self, identity: &str, _abort: &Notify) -> Result<AuthSession> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			match self.fail_with {
				Some(make_error) => Err(make_error()),
				None => Ok(session(identity)),
			}
		}
	}

	fn provider_with(
		dir: &std::path::Path,
		validator: Arc<ScriptedValidator>,
		acquirer: Arc<StubAcquirer>,
	) -> SessionProvider {
		SessionProvider::new(SessionStore::new(dir), validator, acquirer)
	}

	#[tokio::test]
	async fn second_call_reuses_without_revalidating() {
		let dir = tempdir().unwrap();
		let store = SessionStore::new(dir.path());
		store.save(&session("uat")).unwrap();

		let validator = ScriptedValidator::new(&[ValidationOutcome::Ok]);
		let acquirer = StubAcquirer::new();
		let provider = provider_with(dir.path(), Arc::clone(&validator), Arc::clone(&acquirer));

		let first = provider.get_session("uat").await.unwrap();
		let second = provider.get_session("uat").await.unwrap();

		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(validator.calls(), 1);
		assert_eq!(acquirer.calls(), 0);
	}

	#[tokio::test]
	async fn store_miss_acquires_persists_and_validates() {
		let dir = tempdir().unwrap();
		let validator = ScriptedValidator::new(&[]);
		let acquirer = StubAcquirer::new();
		let provider = provider_with(dir.path(), Arc::clone(&validator), Arc::clone(&acquirer));

		let ready = provider.get_session("uat").await.unwrap();
		assert_eq!(ready.identity, "uat");
		assert_eq!(acquirer.calls(), 1);
		// Post-acquisition validation ran.
		assert_eq!(validator.calls(), 1);
		// The fresh session was committed.
		assert!(SessionStore::new(dir.path()).load("uat").unwrap().is_some());
	}

	#[tokio::test]
	async fn stale_session_triggers_exactly_one_reacquisition() {
		let dir = tempdir().unwrap();
		let store = SessionStore::new(dir.path());
		store.save(&session("uat")).unwrap();

		let validator = ScriptedValidator::new(&[ValidationOutcome::RedirectedToLogin, ValidationOutcome::Ok]);
		let acquirer = StubAcquirer::new();
		let provider = provider_with(dir.path(), Arc::clone(&validator), Arc::clone(&acquirer));

		let ready = provider.get_session("uat").await.unwrap();
		assert_eq!(acquirer.calls(), 1);
		assert_eq!(validator.calls(), 2);
		assert_eq!(ready.identity, "uat");
	}

	#[tokio::test]
	async fn no_session_outcome_is_treated_as_stale() {
		let dir = tempdir().unwrap();
		let store = SessionStore::new(dir.path());
		store.save(&AuthSession::new("uat", Vec::new(), Vec::new(), 0)).unwrap();

		let validator = ScriptedValidator::new(&[ValidationOutcome::NoSession, ValidationOutcome::Ok]);
		let acquirer = StubAcquirer::new();
		let provider = provider_with(dir.path(), Arc::clone(&validator), Arc::clone(&acquirer));

		provider.get_session("uat").await.unwrap();
		assert_eq!(acquirer.calls(), 1);
	}

	#[tokio::test]
	async fn network_unreachable_never_invokes_the_acquirer() {
		let dir = tempdir().unwrap();
		let store = SessionStore::new(dir.path());
		store.save(&session("uat")).unwrap();

		let validator = ScriptedValidator::new(&[ValidationOutcome::NetworkUnreachable]);
		let acquirer = StubAcquirer::new();
		let provider = provider_with(dir.path(), Arc::clone(&validator), Arc::clone(&acquirer));

		let err = provider.get_session("uat").await.unwrap_err();
		assert!(matches!(err, AkError::NetworkUnreachable { .. }), "got {err}");
		assert_eq!(acquirer.calls(), 0);
	}

	#[tokio::test]
	async fn failed_acquisition_is_a_terminal_error() {
		let dir = tempdir().unwrap();
		let validator = ScriptedValidator::new(&[]);
		let acquirer = StubAcquirer::failing(|| AkError::AcquisitionTimeout { secs: 300 });
		let provider = provider_with(dir.path(), Arc::clone(&validator), Arc::clone(&acquirer));

		let err = provider.get_session("uat").await.unwrap_err();
		assert!(matches!(err, AkError::AcquisitionTimeout { secs: 300 }), "got {err}");
		// Nothing was persisted and nothing cached.
		assert!(SessionStore::new(dir.path()).load("uat").unwrap().is_none());
		assert!(provider.ready.lock().is_empty());
	}

	#[tokio::test]
	async fn cancelled_acquisition_persists_nothing() {
		let dir = tempdir().unwrap();
		let validator = ScriptedValidator::new(&[]);
		let acquirer = StubAcquirer::failing(|| AkError::AcquisitionCancelled);
		let provider = provider_with(dir.path(), Arc::clone(&validator), Arc::clone(&acquirer));

		let err = provider.get_session("uat").await.unwrap_err();
		assert!(matches!(err, AkError::AcquisitionCancelled), "got {err}");
		assert!(SessionStore::new(dir.path()).load("uat").unwrap().is_none());
	}

	#[tokio::test]
	async fn reacquired_session_failing_validation_is_not_ready() {
		let dir = tempdir().unwrap();
		let store = SessionStore::new(dir.path());
		store.save(&session("uat")).unwrap();

		// Stale, then the fresh session also probes stale.
		let validator = ScriptedValidator::new(&[
			ValidationOutcome::RedirectedToLogin,
			ValidationOutcome::RedirectedToLogin,
		]);
		let acquirer = StubAcquirer::new();
		let provider = provider_with(dir.path(), Arc::clone(&validator), Arc::clone(&acquirer));

		let err = provider.get_session("uat").await.unwrap_err();
		assert!(matches!(err, AkError::AcquisitionFailed { .. }), "got {err}");
	}

	#[tokio::test]
	async fn distinct_identities_get_distinct_sessions() {
		let dir = tempdir().unwrap();
		let validator = ScriptedValidator::new(&[]);
		let acquirer = StubAcquirer::new();
		let provider = provider_with(dir.path(), Arc::clone(&validator), Arc::clone(&acquirer));

		let uat = provider.get_session("uat").await.unwrap();
		let staging = provider.get_session("staging").await.unwrap();
		assert_ne!(uat.identity, staging.identity);
		assert_eq!(acquirer.calls(), 2);
	}
}
