//! Validation outcomes reported by session probes.

use serde::{Deserialize, Serialize};

/// Why a probe accepted or rejected a stored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationOutcome {
	/// The probe reached the protected page while authenticated.
	Ok,
	/// The probe was bounced to a login page; the session is stale.
	RedirectedToLogin,
	/// The record carries no replayable state to probe with.
	NoSession,
	/// The target environment could not be reached at all. This is an
	/// infrastructure signal, not a statement about the session, and must
	/// never trigger re-acquisition.
	NetworkUnreachable,
}

impl std::fmt::Display for ValidationOutcome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ValidationOutcome::Ok => write!(f, "OK"),
			ValidationOutcome::RedirectedToLogin => write!(f, "REDIRECTED_TO_LOGIN"),
			ValidationOutcome::NoSession => write!(f, "NO_SESSION"),
			ValidationOutcome::NetworkUnreachable => write!(f, "NETWORK_UNREACHABLE"),
		}
	}
}

/// Full result of validating one stored session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
	/// Probe decision.
	pub outcome: ValidationOutcome,
	/// URL the probe finally landed on, when navigation got that far.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub observed_url: Option<String>,
}

impl ValidationReport {
	/// Report for a probe that landed authenticated.
	pub fn ok(observed_url: impl Into<String>) -> Self {
		Self { outcome: ValidationOutcome::Ok, observed_url: Some(observed_url.into()) }
	}

	/// Report for a probe with the given failure outcome.
	pub fn rejected(outcome: ValidationOutcome, observed_url: Option<String>) -> Self {
		Self { outcome, observed_url }
	}

	/// Whether the session may be handed to a test run.
	pub fn is_valid(&self) -> bool {
		self.outcome == ValidationOutcome::Ok
	}

	/// Whether the outcome means the session itself is stale (recoverable by
	/// re-acquisition), as opposed to the environment being unreachable.
	pub fn is_stale(&self) -> bool {
		matches!(self.outcome, ValidationOutcome::RedirectedToLogin | ValidationOutcome::NoSession)
	}
}
