use clap::Parser;

use repowatch_cli::cli::{Cli, Commands};
use repowatch_cli::commands;
use repowatch_cli::error::CliError;
use repowatch_cli::output::OutputWriter;

#[tokio::main]
async fn main() {
    // .env is optional; real environment variables win
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        use colored::Colorize;
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    match &cli.command {
        Commands::Scan(args) => commands::scan::execute(args, cli, &writer).await,
        Commands::Config(args) => {
            commands::config::execute(args, cli.config.as_deref(), &writer).await
        }
    }
}
