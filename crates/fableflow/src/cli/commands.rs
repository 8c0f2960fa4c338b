//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// FableFlow - LLM story pipeline with PDF and EPUB book production
#[derive(Parser, Debug)]
#[command(name = "fableflow")]
#[command(about = "Turn a draft story into an illustrated PDF and EPUB book", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a settings file (layered over bundled defaults)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full publishing pipeline on a draft story
    Publish {
        /// Path to the draft story file (markdown with chapter headings)
        #[arg(long)]
        story: PathBuf,

        /// Output directory for pipeline artifacts (overrides settings)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Rebuild the book files from an existing illustration plan
    Render {
        /// Output directory holding image_planner_story.txt and images
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}
