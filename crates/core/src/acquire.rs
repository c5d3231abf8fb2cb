//! Session acquisition: live capture and interactive drive.
//!
//! Which strategies run is a pure decision over configuration; the order is
//! fixed (live capture first, interactive drive second, first success wins).
//! Every candidate is validated before it is handed back for persistence;
//! a candidate that fails validation is discarded, never stored.

use std::sync::Arc;
use std::time::Duration;

use ak_protocol::AuthSession;
use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::{IdentifierField, ManagerConfig};
use crate::error::{AkError, Result};
use crate::probe::{ProbeBrowser, ProbeContext};
use crate::validate::{Validate, matches_login};

/// Which acquisition strategies a run may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquirePlan {
	/// Whether an externally-supervised browser may be captured from.
	pub try_live_capture: bool,
	/// Whether the human-in-the-loop drive flow may run.
	pub try_interactive: bool,
}

/// Inputs used to resolve an [`AcquirePlan`].
#[derive(Debug, Clone, Copy)]
pub struct AcquireInput {
	/// Configured DevTools port of an already-authenticated browser.
	pub live_attach_port: Option<u16>,
	/// Whether this run is an explicit setup phase. Test-pool runs keep
	/// this off so a parallel worker can never start an interactive login.
	pub interactive: bool,
}

/// Resolves the strategy plan from normalized inputs.
pub fn resolve_acquire_plan(input: AcquireInput) -> AcquirePlan {
	AcquirePlan {
		try_live_capture: input.live_attach_port.is_some(),
		try_interactive: input.interactive,
	}
}

/// Acquisition seam consumed by the provider.
#[async_trait]
pub trait Acquire: Send + Sync {
	/// Produces a fresh, validated session for `identity`.
	///
	/// May suspend waiting on human action; `abort` cancels the wait and
	/// discards anything captured so far.
	async fn acquire(&self, identity: &str, abort: &Notify) -> Result<AuthSession>;
}

/// Browser-backed acquirer implementing both strategies.
pub struct SessionAcquirer {
	entry_url: String,
	login_url_patterns: Vec<String>,
	success_marker: Option<String>,
	identifier_field: Option<IdentifierField>,
	live_attach_port: Option<u16>,
	navigation_timeout: Duration,
	acquire_timeout: Duration,
	settle_poll: Duration,
	interactive: bool,
	validator: Arc<dyn Validate>,
}

impl SessionAcquirer {
	/// Builds an acquirer from manager configuration.
	///
	/// `interactive` is the setup-phase switch; see [`AcquireInput`].
	pub fn from_config(config: &ManagerConfig, validator: Arc<dyn Validate>, interactive: bool) -> Self {
		Self {
			entry_url: config.entry_url.clone(),
			login_url_patterns: config.login_url_patterns.clone(),
			success_marker: config.success_marker.clone(),
			identifier_field: config.identifier_field.clone(),
			live_attach_port: config.live_attach_port,
			navigation_timeout: config.navigation_timeout(),
			acquire_timeout: config.acquire_timeout(),
			settle_poll: config.settle_poll(),
			interactive,
			validator,
		}
	}

	async fn live_capture(&self, identity: &str, port: u16) -> Result<AuthSession> {
		info!(target = "ak.acquire", identity, port, "attempting live capture");
		let browser = ProbeBrowser::attach(port).await?;

		let captured = self.capture_from(&browser, identity).await;
		// Borrowed browser: drop our connection, never close the instance.
		browser.shutdown().await;

		self.validated(captured?, "live capture").await
	}

	async fn capture_from(&self, browser: &ProbeBrowser, identity: &str) -> Result<AuthSession> {
		let page = ProbeContext::attach_first_page(browser.connection()).await?;
		let cookies = page.collect_cookies().await?;
		let origins = page.collect_local_storage().await?.into_iter().collect();
		let landing = page.current_url().await.ok();

		let mut session = AuthSession::new(identity, cookies, origins, now_ts());
		if let Some(url) = landing {
			session = session.with_source_url(url);
		}
		Ok(session)
	}

	async fn interactive_drive(&self, identity: &str, abort: &Notify) -> Result<AuthSession> {
		info!(
			target = "ak.acquire",
			identity,
			timeout_secs = self.acquire_timeout.as_secs(),
			"starting interactive login; complete it in the opened browser"
		);
		let browser = ProbeBrowser::launch_headed().await?;

		let outcome = tokio::select! {
			result = self.drive(&browser, identity) => result,
			_ = tokio::time::sleep(self.acquire_timeout) => {
				Err(AkError::AcquisitionTimeout { secs: self.acquire_timeout.as_secs() })
			}
			_ = abort.notified() => Err(AkError::AcquisitionCancelled),
		};

		// Always tear the drive browser down; on timeout/cancel this is what
		// discards the partially-captured state.
		browser.shutdown().await;

		self.validated(outcome?, "interactive login").await
	}

	async fn drive(&self, browser: &ProbeBrowser, identity: &str) -> Result<AuthSession> {
		let page = ProbeContext::isolated(browser.connection()).await?;
		page.navigate(&self.entry_url, self.navigation_timeout).await?;

		if let Some(field) = &self.identifier_field {
			// Best effort: only the initial identifier, never credentials.
			match page.fill_value(&field.selector, &field.value).await {
				Ok(true) => debug!(target = "ak.acquire", selector = %field.selector, "identifier field pre-filled"),
				Ok(false) => debug!(target = "ak.acquire", selector = %field.selector, "identifier field not present"),
				Err(e) => debug!(target = "ak.acquire", error = %e, "identifier pre-fill failed"),
			}
		}

		loop {
			tokio::time::sleep(self.settle_poll).await;

			// Mid-redirect the execution context comes and goes; failed reads
			// just mean "not settled yet".
			let Ok(url) = page.current_url().await else { continue };
			if !is_authenticated_landing(&url, &self.entry_url, &self.login_url_patterns) {
				continue;
			}
			if let Some(marker) = &self.success_marker {
				if !page.has_selector(marker).await.unwrap_or(false) {
					continue;
				}
			}

			info!(target = "ak.acquire", identity, landing = %url, "authenticated landing detected; capturing");
			let cookies = page.collect_cookies().await?;
			let origins = page.collect_local_storage().await?.into_iter().collect();
			return Ok(AuthSession::new(identity, cookies, origins, now_ts()).with_source_url(url));
		}
	}

	async fn validated(&self, candidate: AuthSession, strategy: &str) -> Result<AuthSession> {
		if candidate.is_empty() {
			return Err(AkError::AcquisitionFailed {
				reason: format!("{strategy} captured no cookies or storage"),
			});
		}

		let report = self.validator.validate(&candidate).await?;
		if report.is_valid() {
			Ok(candidate)
		} else {
			Err(AkError::AcquisitionFailed {
				reason: format!("{strategy} produced a session that failed validation ({})", report.outcome),
			})
		}
	}
}

#[async_trait]
impl Acquire for SessionAcquirer {
	async fn acquire(&self, identity: &str, abort: &Notify) -> Result<AuthSession> {
		let plan = resolve_acquire_plan(AcquireInput {
			live_attach_port: self.live_attach_port,
			interactive: self.interactive,
		});

		let mut live_failure = None;
		if plan.try_live_capture {
			if let Some(port) = self.live_attach_port {
				match self.live_capture(identity, port).await {
					Ok(session) => return Ok(session),
					Err(e) => {
						warn!(target = "ak.acquire", identity, error = %e, "live capture failed");
						live_failure = Some(e);
					}
				}
			}
		}

		if plan.try_interactive {
			return self.interactive_drive(identity, abort).await;
		}

		Err(match live_failure {
			Some(e) => AkError::AcquisitionFailed {
				reason: format!("live capture failed ({e}) and interactive login is only available via `authkeep setup`"),
			},
			None => AkError::AcquisitionFailed {
				reason: "no acquisition strategy available: configure liveAttachPort or run `authkeep setup`".to_string(),
			},
		})
	}
}

/// Whether `url` is an authenticated landing for the application at
/// `entry_url`: same host, http(s), and not a login/IdP page.
pub fn is_authenticated_landing(url: &str, entry_url: &str, login_patterns: &[String]) -> bool {
	if !url.starts_with("http://") && !url.starts_with("https://") {
		return false;
	}
	if matches_login(url, login_patterns) {
		return false;
	}
	same_host(url, entry_url)
}

fn same_host(a: &str, b: &str) -> bool {
	match (url::Url::parse(a), url::Url::parse(b)) {
		(Ok(a), Ok(b)) => match (a.host_str(), b.host_str()) {
			(Some(ha), Some(hb)) => ha.eq_ignore_ascii_case(hb),
			_ => false,
		},
		_ => false,
	}
}

/// Current Unix timestamp in seconds.
pub(crate) fn now_ts() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}
