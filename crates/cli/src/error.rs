//! CLI error wrapper and exit-code mapping.
//!
//! Exit codes are part of the automation contract: 0 means a validated
//! success, and the distinguishing non-zero codes let wrapping scripts tell
//! an expired login bound from a rejected session from an operator abort.

use authkeep::AkError;
use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

/// Exit code for [`AkError::AcquisitionTimeout`].
pub const EXIT_TIMEOUT: i32 = 10;
/// Exit code for sessions that exist but fail validation.
pub const EXIT_VALIDATION_FAILED: i32 = 11;
/// Exit code for operator-cancelled acquisition.
pub const EXIT_CANCELLED: i32 = 12;
/// Exit code for an unreachable target environment.
pub const EXIT_NETWORK_UNREACHABLE: i32 = 13;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Ak(#[from] AkError),

	/// A check verdict that is not `OK` (stale or absent session).
	#[error("{0}")]
	Validation(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl CliError {
	/// Process exit code for this failure.
	pub fn exit_code(&self) -> i32 {
		match self {
			CliError::Ak(AkError::AcquisitionTimeout { .. }) => EXIT_TIMEOUT,
			CliError::Ak(AkError::AcquisitionFailed { .. }) => EXIT_VALIDATION_FAILED,
			CliError::Ak(AkError::AcquisitionCancelled) => EXIT_CANCELLED,
			CliError::Ak(AkError::NetworkUnreachable { .. }) => EXIT_NETWORK_UNREACHABLE,
			CliError::Validation(_) => EXIT_VALIDATION_FAILED,
			_ => 1,
		}
	}

	/// Machine error code for the output envelope.
	pub fn error_code(&self) -> ErrorCode {
		match self {
			CliError::Ak(AkError::AcquisitionTimeout { .. }) => ErrorCode::Timeout,
			CliError::Ak(AkError::AcquisitionCancelled) => ErrorCode::Cancelled,
			CliError::Ak(AkError::NetworkUnreachable { .. }) => ErrorCode::NetworkUnreachable,
			CliError::Ak(AkError::AcquisitionFailed { .. }) => ErrorCode::AcquisitionFailed,
			CliError::Ak(AkError::Config(_)) => ErrorCode::ConfigError,
			CliError::Ak(AkError::Io(_)) | CliError::Io(_) => ErrorCode::IoError,
			CliError::Validation(_) => ErrorCode::ValidationFailed,
			_ => ErrorCode::InternalError,
		}
	}

	/// Converts into an envelope error payload.
	pub fn to_command_error(&self) -> CommandError {
		CommandError { code: self.error_code(), message: self.to_string() }
	}
}
