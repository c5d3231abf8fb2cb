//! One-time interactive acquisition.
//!
//! The only place interactive drive is enabled: it must never run inside
//! the parallel test pool, where concurrent workers would race the same
//! identity-provider flow.

use std::path::Path;
use std::sync::Arc;

use authkeep::{ManagerConfig, SessionAcquirer, SessionProvider};
use tracing::info;

use crate::cli::SetupArgs;
use crate::commands::{effective_identity, store_for, validator_for};
use crate::error::Result;
use crate::output::{OutputFormat, print_success};

pub async fn run(args: SetupArgs, config_path: &Path, format: OutputFormat) -> Result<()> {
	let mut config = ManagerConfig::load(config_path)?;
	config.identity = effective_identity(&config, args.identity);
	if let Some(secs) = args.timeout_secs {
		config.acquire_timeout_secs = secs;
	}

	let store = store_for(&config);
	let record_path = store.path_for(&config.identity);
	let validator = validator_for(&config);
	let acquirer = Arc::new(SessionAcquirer::from_config(&config, Arc::clone(&validator), true));
	let provider = SessionProvider::new(store, validator, acquirer);

	info!(target = "ak.cli", identity = %config.identity, entry = %config.entry_url, "starting setup");

	// Ctrl-C aborts the acquisition; nothing partial is persisted.
	let abort = provider.abort_handle();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			eprintln!();
			eprintln!("Aborting acquisition...");
			abort.notify_one();
		}
	});

	if config.live_attach_port.is_some() {
		eprintln!("Trying live capture from the configured browser first.");
	}
	eprintln!("If a browser window opens, complete the sign-in there (including the second factor).");
	eprintln!("(Bound: {} seconds; Ctrl-C aborts.)", config.acquire_timeout_secs);
	eprintln!();

	let session = provider.get_session(&config.identity).await?;

	eprintln!("Validated session persisted to: {}", record_path.display());
	eprintln!("  Cookies: {}", session.cookies.len());
	eprintln!("  Origins with localStorage: {}", session.origins.len());

	print_success(
		"setup",
		serde_json::json!({
			"identity": session.identity,
			"path": record_path,
			"cookies": session.cookies.len(),
			"origins": session.origins.len(),
			"capturedAt": session.captured_at,
			"sourceUrl": session.source_url,
		}),
		format,
	);
	Ok(())
}
