//! Session validation by live probe.
//!
//! A probe replays the stored cookies and storage into a fresh isolated
//! browser context, navigates to a protected URL, and classifies what it
//! finds. The persisted session is never touched; the probe browser and its
//! context are discarded whatever the outcome. Validity is decided only by
//! the probe: cookie expiry fields are deliberately ignored, since the
//! server is the ground truth and the two can disagree.

use std::time::Duration;

use ak_protocol::{AuthSession, ValidationOutcome, ValidationReport};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{AkError, Result};
use crate::probe::{ProbeBrowser, ProbeContext};

/// Validation seam consumed by the provider and the acquirer.
#[async_trait]
pub trait Validate: Send + Sync {
	/// Checks whether `session` still grants authenticated access.
	async fn validate(&self, session: &AuthSession) -> Result<ValidationReport>;
}

/// Probe-based validator driving a disposable headless browser.
pub struct ProbeValidator {
	probe_url: String,
	login_url_patterns: Vec<String>,
	success_marker: Option<String>,
	navigation_timeout: Duration,
}

impl ProbeValidator {
	pub fn new(
		probe_url: impl Into<String>,
		login_url_patterns: Vec<String>,
		success_marker: Option<String>,
		navigation_timeout: Duration,
	) -> Self {
		Self {
			probe_url: probe_url.into(),
			login_url_patterns,
			success_marker,
			navigation_timeout,
		}
	}

	async fn run_probe(&self, browser: &ProbeBrowser, session: &AuthSession) -> Result<ValidationReport> {
		let context = ProbeContext::isolated(browser.connection()).await?;
		let report = self.probe_in(&context, session).await;
		context.dispose().await;
		report
	}

	async fn probe_in(&self, context: &ProbeContext, session: &AuthSession) -> Result<ValidationReport> {
		context.set_cookies(&session.cookies).await?;

		if !session.origins.is_empty() {
			if let Err(e) = context.seed_local_storage(&session.origins, self.navigation_timeout).await {
				if e.is_unreachable() {
					return Ok(unreachable_report(&e));
				}
				return Err(e);
			}
		}

		if let Err(e) = context.navigate(&self.probe_url, self.navigation_timeout).await {
			if e.is_unreachable() {
				return Ok(unreachable_report(&e));
			}
			return Err(e);
		}

		let observed_url = context.current_url().await?;
		let marker_present = match &self.success_marker {
			Some(selector) => context.has_selector(selector).await?,
			None => true,
		};

		Ok(decide(&observed_url, &self.login_url_patterns, marker_present))
	}
}

#[async_trait]
impl Validate for ProbeValidator {
	async fn validate(&self, session: &AuthSession) -> Result<ValidationReport> {
		if session.is_empty() {
			debug!(target = "ak.validate", identity = %session.identity, "record has nothing to replay");
			return Ok(ValidationReport::rejected(ValidationOutcome::NoSession, None));
		}

		let browser = ProbeBrowser::launch_headless().await?;
		let report = self.run_probe(&browser, session).await;
		browser.shutdown().await;

		let report = report?;
		info!(
			target = "ak.validate",
			identity = %session.identity,
			outcome = %report.outcome,
			observed = report.observed_url.as_deref().unwrap_or("-"),
			"validation probe finished"
		);
		Ok(report)
	}
}

/// Whether `url` looks like a login/IdP page per the configured patterns.
pub fn matches_login(url: &str, patterns: &[String]) -> bool {
	let url_lower = url.to_lowercase();
	patterns.iter().any(|pattern| url_lower.contains(&pattern.to_lowercase()))
}

/// Pure classification of a completed probe navigation.
fn decide(observed_url: &str, login_patterns: &[String], marker_present: bool) -> ValidationReport {
	if matches_login(observed_url, login_patterns) {
		return ValidationReport::rejected(ValidationOutcome::RedirectedToLogin, Some(observed_url.to_string()));
	}
	if !marker_present {
		return ValidationReport::rejected(ValidationOutcome::RedirectedToLogin, Some(observed_url.to_string()));
	}
	ValidationReport::ok(observed_url)
}

fn unreachable_report(error: &AkError) -> ValidationReport {
	debug!(target = "ak.validate", error = %error, "probe could not reach the target environment");
	ValidationReport::rejected(ValidationOutcome::NetworkUnreachable, None)
}
