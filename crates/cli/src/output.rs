//! Structured output envelope for automation consumers.
//!
//! Every command can emit a machine envelope on stdout with `--format json`:
//!
//! ```json
//! { "ok": true, "command": "setup", "data": { ... } }
//! { "ok": false, "command": "check", "error": { "code": "VALIDATION_FAILED", "message": "..." } }
//! ```
//!
//! Text mode keeps stdout for results and stderr for interactive guidance.

use serde::Serialize;

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// JSON envelope
	Json,
}

/// The result envelope emitted in JSON mode.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	/// Whether the command succeeded.
	pub ok: bool,
	/// Command name, e.g. "setup".
	pub command: &'static str,
	/// Command-specific data, present on success.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	/// Error information, present on failure.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
}

/// Error payload inside a failed envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Standardized error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Interactive acquisition hit its bound.
	Timeout,
	/// A session (stored or freshly acquired) failed validation.
	ValidationFailed,
	/// The operator aborted the acquisition.
	Cancelled,
	/// The target environment is unreachable; infrastructure, not auth.
	NetworkUnreachable,
	/// No strategy produced a usable session.
	AcquisitionFailed,
	/// Configuration missing or unusable.
	ConfigError,
	/// File I/O error.
	IoError,
	/// Unknown/internal error.
	InternalError,
}

/// Emits a success envelope when running in JSON mode.
pub fn print_success<T: Serialize>(command: &'static str, data: T, format: OutputFormat) {
	if format == OutputFormat::Json {
		let result = CommandResult { ok: true, command, data: Some(data), error: None };
		match serde_json::to_string(&result) {
			Ok(json) => println!("{json}"),
			Err(e) => eprintln!("failed to serialize result: {e}"),
		}
	}
}

/// Reports a failure: human line on stderr, envelope on stdout in JSON mode.
pub fn print_error(command: &'static str, error: &CommandError, format: OutputFormat) {
	eprintln!("Error: {}", error.message);
	if format == OutputFormat::Json {
		let result: CommandResult<()> =
			CommandResult { ok: false, command, data: None, error: Some(error.clone()) };
		if let Ok(json) = serde_json::to_string(&result) {
			println!("{json}");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn success_envelope_omits_error() {
		let result = CommandResult { ok: true, command: "check", data: Some(serde_json::json!({"x": 1})), error: None };
		let json = serde_json::to_string(&result).unwrap();
		assert!(json.contains("\"ok\":true"));
		assert!(!json.contains("error"));
	}

	#[test]
	fn error_codes_serialize_screaming_snake() {
		let json = serde_json::to_string(&ErrorCode::NetworkUnreachable).unwrap();
		assert_eq!(json, "\"NETWORK_UNREACHABLE\"");
	}
}
