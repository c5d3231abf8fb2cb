//! Disposable browser contexts over the CDP runtime.
//!
//! A [`ProbeBrowser`] owns one browser (launched into a throwaway profile,
//! or attached to an externally-supervised instance). A [`ProbeContext`] is
//! one target inside it: validation replays state into an isolated context
//! and throws it away; live capture attaches to the instance's existing
//! page instead and only reads.

use std::sync::Arc;
use std::time::Duration;

use ak_protocol::{Cookie, OriginState, SameSite, StorageEntry};
use ak_runtime::{CdpConnection, fetch_devtools_info, wait_for_event};
use serde_json::{Value, json};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{AkError, Result};
use crate::launch::launch_browser;

const ATTACH_DISCOVERY_TIMEOUT: Duration = Duration::from_millis(400);

/// A connected browser, owned (launched) or borrowed (attached).
pub struct ProbeBrowser {
	conn: Arc<CdpConnection>,
	/// Throwaway profile backing a launched browser; `None` when attached.
	profile: Option<TempDir>,
}

impl ProbeBrowser {
	/// Launches a headless browser in a fresh throwaway profile.
	pub async fn launch_headless() -> Result<Self> {
		Self::launch(true).await
	}

	/// Launches a visible browser in a fresh throwaway profile.
	pub async fn launch_headed() -> Result<Self> {
		Self::launch(false).await
	}

	async fn launch(headless: bool) -> Result<Self> {
		let profile = TempDir::new()?;
		let info = launch_browser(profile.path(), headless).await?;
		let conn = CdpConnection::connect(&info.web_socket_debugger_url).await?;
		Ok(Self { conn: Arc::new(conn), profile: Some(profile) })
	}

	/// Attaches to an externally-supervised browser by DevTools port.
	pub async fn attach(port: u16) -> Result<Self> {
		let info = fetch_devtools_info(port, ATTACH_DISCOVERY_TIMEOUT).await?;
		debug!(target = "ak.probe", port, browser = ?info.browser, "attached to external browser");
		let conn = CdpConnection::connect(&info.web_socket_debugger_url).await?;
		Ok(Self { conn: Arc::new(conn), profile: None })
	}

	/// Returns the underlying connection.
	pub fn connection(&self) -> Arc<CdpConnection> {
		Arc::clone(&self.conn)
	}

	/// Returns `true` when this browser was launched by us (and so may be
	/// closed by us).
	pub fn is_owned(&self) -> bool {
		self.profile.is_some()
	}

	/// Tears the browser down. Owned browsers get `Browser.close`; attached
	/// ones only have their connection dropped, the external instance is
	/// never ours to kill.
	pub async fn shutdown(self) {
		if self.is_owned() {
			if let Err(e) = self.conn.send("Browser.close", json!({})).await {
				debug!(target = "ak.probe", error = %e, "Browser.close failed during shutdown");
			}
		}
		self.conn.close();
	}
}

/// One attached target (page) inside a [`ProbeBrowser`].
pub struct ProbeContext {
	conn: Arc<CdpConnection>,
	/// Set for isolated contexts; attached default-context pages have none.
	context_id: Option<String>,
	target_id: String,
	session_id: String,
}

impl ProbeContext {
	/// Opens a fresh isolated browser context with a blank page.
	pub async fn isolated(conn: Arc<CdpConnection>) -> Result<Self> {
		let created = conn.send("Target.createBrowserContext", json!({ "disposeOnDetach": true })).await?;
		let context_id = required_str(&created, "browserContextId")?.to_string();

		let target = conn
			.send("Target.createTarget", json!({ "url": "about:blank", "browserContextId": context_id }))
			.await?;
		let target_id = required_str(&target, "targetId")?.to_string();

		Self::attach_target(conn, Some(context_id), target_id).await
	}

	/// Attaches to the first ordinary page of the browser's default context.
	pub async fn attach_first_page(conn: Arc<CdpConnection>) -> Result<Self> {
		let targets = conn.send("Target.getTargets", json!({})).await?;
		let empty = Vec::new();
		let infos = targets.get("targetInfos").and_then(|v| v.as_array()).unwrap_or(&empty);

		let page = infos
			.iter()
			.find(|info| {
				info.get("type").and_then(|v| v.as_str()) == Some("page")
					&& info
						.get("url")
						.and_then(|v| v.as_str())
						.is_some_and(|url| !url.starts_with("devtools://") && !url.starts_with("chrome-extension://"))
			})
			.ok_or_else(|| AkError::BrowserLaunch("attached browser has no open page to capture from".to_string()))?;

		let target_id = required_str(page, "targetId")?.to_string();
		Self::attach_target(conn, None, target_id).await
	}

	async fn attach_target(conn: Arc<CdpConnection>, context_id: Option<String>, target_id: String) -> Result<Self> {
		let attached = conn
			.send("Target.attachToTarget", json!({ "targetId": target_id, "flatten": true }))
			.await?;
		let session_id = required_str(&attached, "sessionId")?.to_string();

		conn.send_on(&session_id, "Page.enable", json!({})).await?;

		Ok(Self { conn, context_id, target_id, session_id })
	}

	/// Navigates and waits for the load event, bounded by `timeout`.
	pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
		let mut events = self.conn.subscribe();

		let result = self.conn.send_on(&self.session_id, "Page.navigate", json!({ "url": url })).await?;
		if let Some(error_text) = result.get("errorText").and_then(|v| v.as_str()) {
			if !error_text.is_empty() {
				return Err(AkError::Navigation { url: url.to_string(), reason: error_text.to_string() });
			}
		}

		wait_for_event(&mut events, timeout, |event| {
			event.method == "Page.loadEventFired" && event.session_id.as_deref() == Some(self.session_id.as_str())
		})
		.await?;
		Ok(())
	}

	/// Evaluates an expression in the page, returning its value by value.
	async fn evaluate(&self, expression: &str) -> Result<Value> {
		let result = self
			.conn
			.send_on(
				&self.session_id,
				"Runtime.evaluate",
				json!({ "expression": expression, "returnByValue": true }),
			)
			.await?;

		if let Some(details) = result.get("exceptionDetails") {
			let text = details
				.get("exception")
				.and_then(|e| e.get("description"))
				.or_else(|| details.get("text"))
				.and_then(|v| v.as_str())
				.unwrap_or("unknown exception");
			return Err(AkError::Script(text.to_string()));
		}

		Ok(result.get("result").and_then(|r| r.get("value")).cloned().unwrap_or(Value::Null))
	}

	/// URL the page is currently on.
	pub async fn current_url(&self) -> Result<String> {
		match self.evaluate("window.location.href").await? {
			Value::String(url) => Ok(url),
			other => Err(AkError::Script(format!("location.href returned {other}"))),
		}
	}

	/// Whether `selector` matches anything on the current page.
	pub async fn has_selector(&self, selector: &str) -> Result<bool> {
		let expression = format!("!!document.querySelector({})", js_string(selector));
		Ok(self.evaluate(&expression).await? == Value::Bool(true))
	}

	/// Fills the first element matching `selector`, firing input/change
	/// events. Returns whether the element was found.
	pub async fn fill_value(&self, selector: &str, value: &str) -> Result<bool> {
		let expression = format!(
			"(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
			 el.focus(); el.value = {val}; \
			 el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
			 el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
			sel = js_string(selector),
			val = js_string(value),
		);
		Ok(self.evaluate(&expression).await? == Value::Bool(true))
	}

	/// Replays cookies into this context.
	pub async fn set_cookies(&self, cookies: &[Cookie]) -> Result<()> {
		if cookies.is_empty() {
			return Ok(());
		}
		let mut params = json!({ "cookies": cookies.iter().map(cookie_to_devtools).collect::<Vec<_>>() });
		if let Some(context_id) = &self.context_id {
			params["browserContextId"] = json!(context_id);
		}
		self.conn.send("Storage.setCookies", params).await?;
		Ok(())
	}

	/// Replays per-origin localStorage into this context by visiting each
	/// origin and writing its entries.
	pub async fn seed_local_storage(&self, origins: &[OriginState], timeout: Duration) -> Result<()> {
		for origin in origins {
			if origin.local_storage.is_empty() {
				continue;
			}
			self.navigate(&origin.origin, timeout).await?;
			let assignments: String = origin
				.local_storage
				.iter()
				.map(|entry| format!("localStorage.setItem({}, {});", js_string(&entry.name), js_string(&entry.value)))
				.collect();
			self.evaluate(&format!("{{ {assignments} }}")).await?;
		}
		Ok(())
	}

	/// Reads every cookie visible to this context.
	pub async fn collect_cookies(&self) -> Result<Vec<Cookie>> {
		let params = match &self.context_id {
			Some(context_id) => json!({ "browserContextId": context_id }),
			None => json!({}),
		};
		let result = self.conn.send("Storage.getCookies", params).await?;
		let empty = Vec::new();
		let raw = result.get("cookies").and_then(|v| v.as_array()).unwrap_or(&empty);
		Ok(raw.iter().filter_map(cookie_from_devtools).collect())
	}

	/// Reads the current page's origin and its localStorage entries.
	/// Returns `None` for opaque origins or empty storage.
	pub async fn collect_local_storage(&self) -> Result<Option<OriginState>> {
		let snapshot = self
			.evaluate("({ origin: window.location.origin, entries: Object.entries(window.localStorage) })")
			.await?;

		let origin = match snapshot.get("origin").and_then(|v| v.as_str()) {
			Some(origin) if origin.starts_with("http") => origin.to_string(),
			_ => return Ok(None),
		};

		let empty = Vec::new();
		let entries: Vec<StorageEntry> = snapshot
			.get("entries")
			.and_then(|v| v.as_array())
			.unwrap_or(&empty)
			.iter()
			.filter_map(|pair| {
				let name = pair.get(0)?.as_str()?.to_string();
				let value = pair.get(1)?.as_str()?.to_string();
				Some(StorageEntry { name, value })
			})
			.collect();

		if entries.is_empty() {
			return Ok(None);
		}
		Ok(Some(OriginState { origin, local_storage: entries }))
	}

	/// Tears the context down. Best effort: a probe that cannot be disposed
	/// dies with its browser anyway.
	pub async fn dispose(self) {
		if let Err(e) = self.conn.send("Target.closeTarget", json!({ "targetId": self.target_id })).await {
			debug!(target = "ak.probe", error = %e, "closeTarget failed during dispose");
		}
		if let Some(context_id) = &self.context_id {
			if let Err(e) = self
				.conn
				.send("Target.disposeBrowserContext", json!({ "browserContextId": context_id }))
				.await
			{
				warn!(target = "ak.probe", error = %e, "disposeBrowserContext failed");
			}
		}
	}
}

fn required_str<'a>(value: &'a Value, key: &str) -> Result<&'a str> {
	value
		.get(key)
		.and_then(|v| v.as_str())
		.ok_or_else(|| ak_runtime::Error::ProtocolError(format!("response missing {key}")).into())
}

/// Quotes a Rust string as a JS string literal.
fn js_string(s: &str) -> String {
	serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn cookie_to_devtools(cookie: &Cookie) -> Value {
	let mut value = json!({
		"name": cookie.name,
		"value": cookie.value,
		"domain": cookie.domain,
		"path": cookie.path,
	});
	if let Some(expires) = cookie.expires {
		value["expires"] = json!(expires);
	}
	if let Some(http_only) = cookie.http_only {
		value["httpOnly"] = json!(http_only);
	}
	if let Some(secure) = cookie.secure {
		value["secure"] = json!(secure);
	}
	if let Some(same_site) = cookie.same_site {
		value["sameSite"] = json!(same_site_name(same_site));
	}
	value
}

fn cookie_from_devtools(raw: &Value) -> Option<Cookie> {
	let mut cookie = Cookie::new(raw.get("name")?.as_str()?, raw.get("value")?.as_str()?, raw.get("domain")?.as_str()?);
	if let Some(path) = raw.get("path").and_then(|v| v.as_str()) {
		cookie.path = path.to_string();
	}
	// DevTools reports -1 for session cookies; keep those as expiry-less.
	cookie.expires = raw.get("expires").and_then(|v| v.as_f64()).filter(|ts| *ts >= 0.0);
	cookie.http_only = raw.get("httpOnly").and_then(|v| v.as_bool());
	cookie.secure = raw.get("secure").and_then(|v| v.as_bool());
	cookie.same_site = raw.get("sameSite").and_then(|v| v.as_str()).and_then(same_site_from_name);
	Some(cookie)
}

fn same_site_name(same_site: SameSite) -> &'static str {
	match same_site {
		SameSite::None => "None",
		SameSite::Lax => "Lax",
		SameSite::Strict => "Strict",
	}
}

fn same_site_from_name(name: &str) -> Option<SameSite> {
	match name {
		"None" => Some(SameSite::None),
		"Lax" => Some(SameSite::Lax),
		"Strict" => Some(SameSite::Strict),
		_ => None,
	}
}
