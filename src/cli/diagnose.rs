//! One-shot diagnosis command
//!
//! `faultline diagnose --text ... [--image path] [--transcript ...]`

use crate::app::{self, AppConfig};
use anyhow::{bail, Context, Result};
use faultline_core::{format_error_for_cli, render, CaseInput, ImageInput, SubmissionOutcome};
use std::path::PathBuf;

/// Arguments for a one-shot diagnosis
#[derive(Debug)]
pub struct DiagnoseArgs {
    pub text: String,
    pub image: Option<PathBuf>,
    pub transcript: String,
    pub voice: Option<PathBuf>,
    pub json: bool,
}

/// Diagnose one case and print the report
pub async fn run(config: &AppConfig, args: DiagnoseArgs) -> Result<()> {
    let provider = app::resolve_provider(config)?;
    let assistant = app::build_assistant(config, provider);

    let image = args
        .image
        .as_deref()
        .map(ImageInput::from_path)
        .transpose()
        .map_err(|e| anyhow::anyhow!(format_error_for_cli(&e)))?;

    let mut transcript = args.transcript;
    if let Some(path) = &args.voice {
        let spoken = super::voice::transcribe_file(&config.speech, path)
            .await
            .context("Failed to transcribe voice note")?;
        transcript = [transcript.trim(), spoken.trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
    }

    let input = CaseInput::new(args.text, image, transcript);
    let outcome = assistant
        .submit_case(input)
        .await
        .map_err(|e| anyhow::anyhow!(format_error_for_cli(&e)))?;

    match outcome {
        SubmissionOutcome::Committed { alert, .. } => {
            let report = assistant
                .read(|s| s.active_report().cloned())
                .await
                .context("Report missing after commit")?;

            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(report.as_ref())
                        .context("Failed to serialize report")?
                );
            } else {
                if let Some(alert) = alert {
                    println!("{}\n", render::render_alert(&alert));
                }
                print!("{}", render::render_report(&report));
            }
            Ok(())
        }
        SubmissionOutcome::Failed { error } => bail!(format_error_for_cli(&error)),
        SubmissionOutcome::Stale => bail!("Diagnosis was superseded"),
    }
}
