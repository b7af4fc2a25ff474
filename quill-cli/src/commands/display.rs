//! Terminal rendering of jobs and documents

use colored::*;
use quill_core::domain::document::ContentDocument;
use quill_core::domain::job::{JobFailure, JobStatus};
use quill_core::dto::job::{JobStatusView, JobSummary, StageProgress};

/// Colorize job status for display
pub fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.as_str();
    match status {
        JobStatus::Pending | JobStatus::Queued => status_str.yellow(),
        JobStatus::Processing => status_str.cyan(),
        JobStatus::Completed => status_str.green(),
        JobStatus::Failed => status_str.red(),
        JobStatus::Cancelled => status_str.dimmed(),
    }
}

pub fn print_job_summary(job: &JobSummary) {
    println!("  {} Job {}", "▸".cyan(), job.id.to_string().dimmed());
    println!("    Topic:    {}", job.topic);
    println!("    Status:   {}", colorize_status(job.status));
    println!(
        "    Created:  {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

pub fn print_status(view: &JobStatusView) {
    println!("{}", "Job Status:".bold());
    println!("  ID:        {}", view.id.to_string().cyan());
    println!("  Status:    {}", colorize_status(view.status));
    println!("  Attempts:  {}", view.attempts);
    println!("  Created:   {}", view.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated:   {}", view.updated_at.format("%Y-%m-%d %H:%M:%S"));

    if !view.stages.is_empty() {
        println!("\n{}", "Stages:".bold());
        for stage in &view.stages {
            print_stage(stage);
        }
    }

    if let Some(error) = &view.error {
        print_failure(error);
    }

    if let Some(document) = &view.document {
        println!();
        print_document_summary(document);
    }
}

pub fn print_stage(stage: &StageProgress) {
    let metrics: Vec<String> = stage
        .metrics
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();

    println!(
        "  {} {} {} {}",
        "✓".green(),
        stage.stage.to_string().bold(),
        format!("(attempt {}, {} call(s))", stage.attempt, stage.provider_calls).dimmed(),
        metrics.join(" ").dimmed()
    );
    for warning in &stage.warnings {
        println!("      {} {}", "⚠".yellow(), warning);
    }
}

pub fn print_failure(error: &JobFailure) {
    println!("\n{}", "Error:".bold());
    if let Some(stage) = error.stage {
        println!("  Stage:     {}", stage);
    }
    println!("  Attempts:  {}", error.attempts);
    println!("  {}", error.message.red());
}

pub fn print_document_summary(document: &ContentDocument) {
    println!("{}", "Document:".bold());
    println!("  Title:       {}", document.title.cyan());
    println!("  Meta:        {}", document.meta_description.dimmed());
    println!("  Words:       {}", document.word_count);
    println!("  Headings:    {} (H2: {})", document.headings.len(), document.h2_count());
    println!("  Links:       {}", document.links.len());
    println!(
        "  Scores:      readability {:.1}, seo {:.1}, composite {}",
        document.scores.readability,
        document.scores.seo,
        format!("{:.1}", document.scores.composite).bold()
    );
    for warning in &document.warnings {
        println!("  {} {}", "⚠".yellow(), warning);
    }
}
