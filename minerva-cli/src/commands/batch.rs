//! Batch lookup command implementation

use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use minerva_core::{BookMetadata, Resolver};
use serde::Serialize;
use std::path::Path;

/// A lookup that failed
#[derive(Debug, Serialize)]
struct BatchFailure {
    isbn: String,
    error: String,
}

/// Report written at the end of a batch
#[derive(Debug, Default, Serialize)]
struct BatchReport {
    resolved: Vec<BookMetadata>,
    failed: Vec<BatchFailure>,
}

/// Read ISBNs from a file, one per line, skipping blanks and `#` comments
fn read_isbns(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Look up every ISBN listed in `input` with at most `jobs` requests in flight
pub async fn batch(
    resolver: &Resolver,
    input: &str,
    output: Option<&str>,
    jobs: usize,
) -> Result<()> {
    let contents = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read input file: {}", input))?;
    let isbns = read_isbns(&contents);

    if isbns.is_empty() {
        eprintln!("No ISBNs found in {}", input);
        return Ok(());
    }

    eprintln!("Found {} ISBNs to look up", isbns.len());

    let progress = ProgressBar::new(isbns.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
            .progress_chars("##-"),
    );

    // Results come back in input order
    let progress_ref = &progress;
    let results: Vec<_> = stream::iter(isbns.iter())
        .map(move |isbn| async move {
            let result = resolver.fetch(isbn).await;
            progress_ref.inc(1);
            (isbn, result)
        })
        .buffered(jobs)
        .collect()
        .await;

    progress.finish();

    let mut report = BatchReport::default();
    for (isbn, result) in results {
        match result {
            Ok(book) => report.resolved.push(book),
            Err(e) => {
                tracing::error!("Failed to look up {}: {}", isbn, e);
                report.failed.push(BatchFailure {
                    isbn: isbn.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write report: {}", path))?;
        }
        None => println!("{}", json),
    }

    eprintln!("\nBatch lookup complete:");
    eprintln!("  Resolved: {}", report.resolved.len());
    eprintln!("  Failed:   {}", report.failed.len());

    if !report.failed.is_empty() {
        bail!("Batch lookup completed with {} errors", report.failed.len());
    }

    Ok(())
}
