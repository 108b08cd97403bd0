//! Carapace CLI entry point.

use clap::Parser;

use carapace::cli::{Cli, Commands};
use carapace::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match carapace::cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => carapace::cli::handle_error(err, cli.json),
    };

    // Held until exit so buffered file output is flushed.
    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => carapace::cli::handle_error(err, cli.json),
    };

    let source = cli.config.as_ref().map_or_else(
        || "defaults, .carapace/, CARAPACE_* env".to_string(),
        |path| path.display().to_string(),
    );

    let result = match cli.command {
        Commands::Check => carapace::cli::commands::check::execute(config, source, cli.json),
        Commands::Demo(args) => {
            carapace::cli::commands::demo::execute(args, config, cli.json).await
        }
    };

    if let Err(err) = result {
        carapace::cli::handle_error(err, cli.json);
    }
}
