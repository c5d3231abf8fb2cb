//! Chrome DevTools Protocol message envelopes.
//!
//! The runtime speaks flat-mode CDP over a single WebSocket: requests carry a
//! client-generated `id` and optionally a `sessionId` scoping the command to
//! an attached target; anything arriving without an `id` is an event.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command sent to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpRequest {
	/// Client-generated id used to correlate the response.
	pub id: u64,
	/// Domain-qualified method, e.g. `Target.createBrowserContext`.
	pub method: String,
	/// Method parameters; an empty object when the method takes none.
	pub params: Value,
	/// Target session scope; browser-level commands omit it.
	#[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Error payload inside a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpError {
	/// Protocol error code.
	pub code: i64,
	/// Human-readable message.
	pub message: String,
}

impl std::fmt::Display for CdpError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} (code {})", self.message, self.code)
	}
}

/// Response correlated to a previously-sent request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpResponse {
	/// Id of the request this answers.
	pub id: u64,
	/// Success result; mutually exclusive with `error`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Failure payload; mutually exclusive with `result`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CdpError>,
}

/// Unsolicited event emitted by the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdpEvent {
	/// Domain-qualified event name, e.g. `Page.loadEventFired`.
	pub method: String,
	/// Event parameters.
	#[serde(default)]
	pub params: Value,
	/// Session the event belongs to; browser-level events omit it.
	#[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
	pub session_id: Option<String>,
}

/// Discriminated union of everything the browser can send us.
///
/// Responses carry an `id`; events do not. The `Unknown` arm keeps the
/// reader loop forward-compatible with payloads neither shape matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CdpMessage {
	/// Response message (has `id`).
	Response(CdpResponse),
	/// Event message (no `id`).
	Event(CdpEvent),
	/// Unrecognized payload, preserved verbatim.
	Unknown(Value),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn response_and_event_are_distinguished() {
		let response: CdpMessage =
			serde_json::from_str(r#"{"id":3,"result":{"browserContextId":"ctx-1"}}"#).unwrap();
		assert!(matches!(response, CdpMessage::Response(r) if r.id == 3));

		let event: CdpMessage =
			serde_json::from_str(r#"{"method":"Page.loadEventFired","params":{"timestamp":1.0},"sessionId":"s1"}"#)
				.unwrap();
		match event {
			CdpMessage::Event(e) => {
				assert_eq!(e.method, "Page.loadEventFired");
				assert_eq!(e.session_id.as_deref(), Some("s1"));
			}
			other => panic!("expected event, got {other:?}"),
		}
	}

	#[test]
	fn error_response_parses() {
		let msg: CdpMessage =
			serde_json::from_str(r#"{"id":7,"error":{"code":-32000,"message":"No target with given id"}}"#).unwrap();
		match msg {
			CdpMessage::Response(r) => {
				let err = r.error.unwrap();
				assert_eq!(err.code, -32000);
				assert!(err.to_string().contains("No target"));
			}
			other => panic!("expected response, got {other:?}"),
		}
	}

	#[test]
	fn request_omits_absent_session_id() {
		let request = CdpRequest {
			id: 1,
			method: "Browser.getVersion".into(),
			params: serde_json::json!({}),
			session_id: None,
		};
		let json = serde_json::to_string(&request).unwrap();
		assert!(!json.contains("sessionId"));
	}
}
