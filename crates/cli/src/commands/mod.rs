//! Command dispatch and shared wiring.

mod check;
mod setup;
mod show;

use std::path::PathBuf;
use std::sync::Arc;

use authkeep::{ManagerConfig, ProbeValidator, SessionStore, Validate};

use crate::cli::{Cli, Commands};
use crate::error::Result;

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config_path = cli.config.clone().unwrap_or_else(default_config_path);
	let format = cli.format;

	match cli.command {
		Commands::Setup(args) => setup::run(args, &config_path, format).await,
		Commands::Check(args) => check::run(args, &config_path, format).await,
		Commands::Show(args) => show::run(args, &config_path, format).await,
	}
}

/// Default configuration path under the user config dir.
pub fn default_config_path() -> PathBuf {
	config_base().join("authkeep.json")
}

/// Resolves the session store for a loaded configuration.
pub fn store_for(config: &ManagerConfig) -> SessionStore {
	let root = config.store_root.clone().unwrap_or_else(|| config_base().join("sessions"));
	SessionStore::new(root)
}

/// Builds the probe validator for a loaded configuration.
pub fn validator_for(config: &ManagerConfig) -> Arc<dyn Validate> {
	Arc::new(ProbeValidator::new(
		config.probe_url.clone(),
		config.login_url_patterns.clone(),
		config.success_marker.clone(),
		config.navigation_timeout(),
	))
}

fn config_base() -> PathBuf {
	dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("authkeep")
}

/// Applies per-invocation identity override.
pub fn effective_identity(config: &ManagerConfig, override_identity: Option<String>) -> String {
	override_identity.unwrap_or_else(|| config.identity.clone())
}
