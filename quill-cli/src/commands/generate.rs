//! Synchronous generation command

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use quill_core::domain::request::GenerationRequest;
use std::path::PathBuf;

use crate::commands::display::print_document_summary;
use crate::commands::request::RequestArgs;
use crate::config::Config;

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Write the Markdown body to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the whole document as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_generate(args: GenerateArgs, config: &Config) -> Result<()> {
    let client = config.client();
    let request: GenerationRequest = args.request.into();

    eprintln!("{} '{}'...", "Generating".bold(), request.topic);

    let document = client
        .generate_sync(&request)
        .await
        .context("Generation failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &document.body)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} Wrote {}", "✓".green(), path.display());
        }
        None => {
            println!("{}", document.body);
            println!();
        }
    }

    print_document_summary(&document);

    Ok(())
}
