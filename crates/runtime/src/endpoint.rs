//! DevTools endpoint discovery over `/json/version`.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// `/json/version` response subset from the Chrome DevTools Protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct DevToolsInfo {
	/// Browser-level WebSocket endpoint to connect to.
	#[serde(rename = "webSocketDebuggerUrl")]
	pub web_socket_debugger_url: String,
	/// Browser product string, e.g. `Chrome/126.0.6478.55`.
	#[serde(rename = "Browser")]
	pub browser: Option<String>,
}

/// Resolves DevTools metadata from `/json/version` on `port`.
///
/// Tries the IPv4, name, and IPv6 loopback spellings in turn; browsers vary
/// in which one they bind. Each attempt is bounded by `timeout` so an
/// unresponsive host cannot stall the caller.
pub async fn fetch_devtools_info(port: u16, timeout: Duration) -> Result<DevToolsInfo> {
	let client = reqwest::Client::builder()
		.timeout(timeout)
		.build()
		.map_err(|e| Error::ProtocolError(format!("failed to create HTTP client: {e}")))?;
	let mut last_error = "no response".to_string();

	for url in [
		format!("http://127.0.0.1:{port}/json/version"),
		format!("http://localhost:{port}/json/version"),
		format!("http://[::1]:{port}/json/version"),
	] {
		let response = match client.get(&url).send().await {
			Ok(r) => r,
			Err(e) => {
				last_error = e.to_string();
				continue;
			}
		};

		if !response.status().is_success() {
			last_error = format!("unexpected status {}", response.status());
			continue;
		}

		return response
			.json::<DevToolsInfo>()
			.await
			.map_err(|e| Error::ProtocolError(format!("failed to parse /json/version response: {e}")));
	}

	Err(Error::EndpointUnreachable { port, reason: last_error })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn unreachable_port_reports_endpoint_unreachable() {
		// Port 1 is never a DevTools endpoint.
		let err = fetch_devtools_info(1, Duration::from_millis(200)).await.unwrap_err();
		assert!(matches!(err, Error::EndpointUnreachable { port: 1, .. }), "got {err}");
		assert!(err.is_unreachable());
	}

	#[test]
	fn version_info_parses_browser_field() {
		let info: DevToolsInfo = serde_json::from_str(
			r#"{"Browser":"Chrome/126.0.0.0","webSocketDebuggerUrl":"ws://127.0.0.1:9222/devtools/browser/abc"}"#,
		)
		.unwrap();
		assert_eq!(info.browser.as_deref(), Some("Chrome/126.0.0.0"));
		assert!(info.web_socket_debugger_url.starts_with("ws://"));
	}
}
