//! Main entry point for the data-diff-viewer CLI

use clap::Parser;
use data_diff_viewer::cli::Cli;
use data_diff_viewer::commands::execute_command;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        log::set_max_level(log::LevelFilter::Debug);
    }

    if let Err(e) = execute_command(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
