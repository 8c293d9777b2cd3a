//! Main entry point for the EngageNY chef CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;

use engageny_chef::cli::{handle_run, ChefArgs};
use engageny_chef::utils::logger::init_cli_logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = ChefArgs::parse();

    init_cli_logger(args.verbose);

    handle_run(args).await
}
