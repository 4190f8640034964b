//! Command dispatch.

use anyhow::Result;

use super::check::execute_config;
use super::command::{CheckCommand, Cli, Commands};
use super::output::{self, OutputConfig};
use super::token::{execute_token, execute_watch};

/// Run the parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    output::configure(OutputConfig::new(cli.json, cli.quiet));

    match cli.command {
        Commands::Check(CheckCommand::Config(args)) => execute_config(&args.config),
        Commands::Token(args) => execute_token(&args.config, args.force).await,
        Commands::Watch(args) => execute_watch(&args.config).await,
    }
}
