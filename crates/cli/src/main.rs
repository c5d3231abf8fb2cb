use authkeep_cli::{cli::Cli, commands, logging, output};
use clap::Parser;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;

	if let Err(err) = commands::dispatch(cli).await {
		output::print_error("authkeep", &err.to_command_error(), format);
		std::process::exit(err.exit_code());
	}
}
