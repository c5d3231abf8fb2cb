//! Inspect a stored session record.
//!
//! Expiry is shown for diagnosis only; an "expired" cookie here proves
//! nothing either way, the probe verdict (`authkeep check`) is the ground
//! truth.

use std::path::Path;

use authkeep::ManagerConfig;

use crate::cli::ShowArgs;
use crate::commands::{effective_identity, store_for};
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, print_success};

pub async fn run(args: ShowArgs, config_path: &Path, format: OutputFormat) -> Result<()> {
	let config = ManagerConfig::load(config_path)?;
	let identity = effective_identity(&config, args.identity);

	let store = store_for(&config);
	let Some(session) = store.load(&identity)? else {
		return Err(CliError::Validation(format!(
			"no stored session for identity {identity:?}; run `authkeep setup` first"
		)));
	};

	println!("Session record for {identity:?} ({})", store.path_for(&identity).display());
	println!("Captured at (epoch): {}", session.captured_at);
	if let Some(url) = &session.source_url {
		println!("Captured from: {url}");
	}
	println!();

	println!("COOKIES ({}):", session.cookies.len());
	if session.cookies.is_empty() {
		println!("  (none)");
	} else {
		println!("  {:<24} {:<30} {:<12}", "NAME", "DOMAIN", "EXPIRES");
		println!("  {}", "-".repeat(68));
		for cookie in &session.cookies {
			println!("  {:<24} {:<30} {:<12}", cookie.name, cookie.domain, format_expiry(cookie.expires));
		}
	}

	println!();
	println!("LOCAL STORAGE ({} origins):", session.origins.len());
	if session.origins.is_empty() {
		println!("  (none)");
	} else {
		for origin in &session.origins {
			println!("  {}:", origin.origin);
			for entry in &origin.local_storage {
				println!("    {}: {}", entry.name, truncate(&entry.value, 50));
			}
		}
	}

	print_success(
		"show",
		serde_json::json!({
			"identity": identity,
			"capturedAt": session.captured_at,
			"sourceUrl": session.source_url,
			"cookieCount": session.cookies.len(),
			"originCount": session.origins.len(),
			"cookies": session
				.cookies
				.iter()
				.map(|c| serde_json::json!({
					"name": c.name,
					"domain": c.domain,
					"expires": format_expiry(c.expires),
				}))
				.collect::<Vec<_>>(),
		}),
		format,
	);
	Ok(())
}

fn truncate(value: &str, max: usize) -> String {
	if value.len() > max {
		format!("{}...", &value[..max])
	} else {
		value.to_string()
	}
}

fn format_expiry(expires: Option<f64>) -> String {
	let ts = match expires {
		None => return "session".into(),
		Some(ts) if ts < 0.0 => return "session".into(),
		Some(ts) => ts as i64,
	};

	let now = std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs() as i64)
		.unwrap_or(0);

	if ts < now {
		return "expired".into();
	}

	let diff = ts - now;
	match diff {
		d if d < 3600 => format!("{}m", d / 60),
		d if d < 86400 => format!("{}h", d / 3600),
		d => format!("{}d", d / 86400),
	}
}
