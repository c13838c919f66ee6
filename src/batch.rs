use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::parser::{Converter, Tally};

/// A stored post as the batch sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub content: String,
}

pub trait DocumentStore {
    /// Every candidate document whose content contains `marker`.
    fn find(&self, marker: &str, limit: Option<usize>) -> Result<Vec<Document>>;

    /// Write back new content. `run_id` tags the revision kept for reverts.
    fn persist(&self, doc: &Document, run_id: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scanned: usize,
    pub updated: usize,
    pub failed: usize,
    pub tally: Tally,
    pub dry_run: bool,
}

pub fn run_id(at: DateTime<Utc>) -> String {
    format!("run-{}", at.format("%Y%m%dT%H%M%S"))
}

/// Convert every candidate document, persisting the ones that changed.
/// A document that fails to persist is counted and skipped; its blocks do
/// not enter the tally.
pub fn run<S: DocumentStore + ?Sized>(
    store: &S,
    converter: &Converter<'_>,
    opts: &RunOptions,
    pb: &ProgressBar,
) -> Result<BatchReport> {
    let started_at = Utc::now();
    let run_id = run_id(started_at);
    let marker = format!("wp:{}/", converter.scanner().namespace());

    let docs = store.find(&marker, opts.limit)?;
    info!(run_id = %run_id, candidates = docs.len(), dry_run = opts.dry_run, "starting batch");
    pb.set_length(docs.len() as u64);

    let mut report = BatchReport {
        run_id,
        started_at,
        finished_at: started_at,
        scanned: 0,
        updated: 0,
        failed: 0,
        tally: Tally::default(),
        dry_run: opts.dry_run,
    };

    for doc in docs {
        report.scanned += 1;
        let conversion = converter.convert(&doc.content);
        pb.inc(1);

        if conversion.text == doc.content {
            debug!(post = doc.id, "nothing to convert");
            continue;
        }

        if !opts.dry_run {
            let updated = Document {
                content: conversion.text,
                ..doc
            };
            if let Err(e) = store.persist(&updated, &report.run_id) {
                warn!(post = updated.id, error = %e, "failed to save post");
                report.failed += 1;
                continue;
            }
            debug!(post = updated.id, title = %updated.title, "saved");
        }

        report.updated += 1;
        report.tally.merge(&conversion.tally);
    }

    report.finished_at = Utc::now();
    info!(
        run_id = %report.run_id,
        scanned = report.scanned,
        updated = report.updated,
        failed = report.failed,
        blocks = report.tally.total(),
        "batch finished"
    );
    Ok(report)
}
