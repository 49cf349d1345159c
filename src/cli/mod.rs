//! CLI module for Faultline
//!
//! Provides commands:
//! - (default) `interactive`: case entry, report display, and follow-up chat
//! - `diagnose`: one-shot diagnosis that prints the rendered report

use crate::app::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod diagnose;
pub mod repl;
pub mod voice;

/// Faultline diagnostic assistant CLI
#[derive(Parser, Debug)]
#[command(name = "faultline")]
#[command(about = "Describe a fault, attach a photo, get a repair plan")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive session (default)
    Interactive,
    /// Diagnose one case and print the report
    Diagnose {
        /// Written description of the problem
        #[arg(short, long, default_value = "")]
        text: String,
        /// Photo of the fault (jpeg, png, webp, heic, heif, gif)
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Voice note transcript
        #[arg(long, default_value = "")]
        transcript: String,
        /// Voice note recording (WAV) to transcribe
        #[arg(long)]
        voice: Option<PathBuf>,
        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Diagnose {
            text,
            image,
            transcript,
            voice,
            json,
        }) => {
            diagnose::run(
                &config,
                diagnose::DiagnoseArgs {
                    text,
                    image,
                    transcript,
                    voice,
                    json,
                },
            )
            .await
        }
        Some(Commands::Interactive) | None => repl::run(&config).await,
    }
}
