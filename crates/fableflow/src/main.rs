//! FableFlow CLI binary.
//!
//! This binary provides command-line access to FableFlow's functionality:
//! - Run the full publishing pipeline on a draft story
//! - Rebuild the book files from an existing illustration plan

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, run_publish, run_render};
    use fableflow::Settings;

    // .env in the working directory supplies API keys during development
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        Commands::Publish { story, output_dir } => {
            let output_dir = output_dir.unwrap_or_else(|| settings.paths.output.clone());
            run_publish(&settings, &story, &output_dir).await?;
        }

        Commands::Render { output_dir } => {
            let output_dir = output_dir.unwrap_or_else(|| settings.paths.output.clone());
            run_render(&settings, &output_dir).await?;
        }
    }

    Ok(())
}
