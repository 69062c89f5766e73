//! CLI entry point.
//!
//! Infrastructure is wired only through `bootstrap`; handlers receive the
//! validated configuration.

use clap::{CommandFactory, Parser};

use keystone_cli::{Cli, Commands, bootstrap, handlers, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    logging::init(cli.verbose);

    // No command provided - show help
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    // Load environment variables and validate them before touching any store
    let config = bootstrap::load_config(cli.env_file.as_deref())?;

    match command {
        Commands::CheckConfig => handlers::check_config::execute(&config),
        Commands::Migrate { collections } => {
            handlers::migrate::execute(&config, &collections).await?;
        }
        Commands::Run => handlers::run::execute(config).await?,
    }

    Ok(())
}
