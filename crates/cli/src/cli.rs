use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

/// Root CLI for authkeep.
#[derive(Parser, Debug)]
#[command(name = "authkeep")]
#[command(about = "Authenticated-session lifecycle manager for SSO-guarded e2e suites")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default) or json
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Path to the configuration file (default: user config dir)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// One-time interactive acquisition; persists a validated session.
	Setup(SetupArgs),
	/// Validate the stored session and report the verdict.
	Check(CheckArgs),
	/// Inspect the stored session record.
	Show(ShowArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SetupArgs {
	/// Identity to acquire for (overrides the configured one).
	#[arg(long, value_name = "ID")]
	pub identity: Option<String>,

	/// Bound on the interactive login, in seconds.
	#[arg(id = "timeout", short = 't', long = "timeout", value_name = "SECONDS")]
	pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
	/// Identity to check (overrides the configured one).
	#[arg(long, value_name = "ID")]
	pub identity: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ShowArgs {
	/// Identity to show (overrides the configured one).
	#[arg(long, value_name = "ID")]
	pub identity: Option<String>,
}
