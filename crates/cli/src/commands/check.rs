//! Validation verdict for the stored session, without acquiring.

use std::path::Path;

use ak_protocol::ValidationOutcome;
use authkeep::{AkError, ManagerConfig};

use crate::cli::CheckArgs;
use crate::commands::{effective_identity, store_for, validator_for};
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, print_success};

pub async fn run(args: CheckArgs, config_path: &Path, format: OutputFormat) -> Result<()> {
	let config = ManagerConfig::load(config_path)?;
	let identity = effective_identity(&config, args.identity);

	let store = store_for(&config);
	let Some(session) = store.load(&identity)? else {
		return Err(CliError::Validation(format!(
			"no stored session for identity {identity:?}; run `authkeep setup` first"
		)));
	};

	let validator = validator_for(&config);
	let report = validator.validate(&session).await?;

	println!("Identity:  {identity}");
	println!("Record:    {}", store.path_for(&identity).display());
	println!("Verdict:   {}", report.outcome);
	if let Some(url) = &report.observed_url {
		println!("Landed on: {url}");
	}

	print_success(
		"check",
		serde_json::json!({
			"identity": identity,
			"outcome": report.outcome,
			"observedUrl": report.observed_url,
			"capturedAt": session.captured_at,
		}),
		format,
	);

	match report.outcome {
		ValidationOutcome::Ok => Ok(()),
		ValidationOutcome::NetworkUnreachable => Err(AkError::NetworkUnreachable {
			reason: "validation probe could not reach the target environment".to_string(),
		}
		.into()),
		outcome => Err(CliError::Validation(format!(
			"stored session is not usable ({outcome}); run `authkeep setup` to re-acquire"
		))),
	}
}
