//! Per-target record building and batch processing

use crate::{
    assemble::{assemble, Assembly},
    genbank::{render_record, summary_line},
    overlap::resolve_overlaps,
    store::{SqliteStore, VariantStore},
    utils::{chunk_work, ensure_parent_dirs, log_progress},
    validate::{validate_overlap, Validation},
    window::{resolve_window, FlankWindow},
    FlankConfig, FlankError, FlankResult, FlankWarning,
};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Largest accepted flank size
pub const MAX_FLANK_SIZE: usize = 10_000_000;

/// Everything needed to write the outputs of one target variant
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRecord {
    pub snp_id: String,
    pub window: FlankWindow,
    pub assembly: Assembly,
    pub warnings: Vec<FlankWarning>,
}

impl AnnotatedRecord {
    pub fn sequence_len(&self) -> usize {
        self.assembly.marked_sequence.len()
    }

    pub fn range_begin(&self) -> i64 {
        self.window.range_begin()
    }

    pub fn range_end(&self) -> i64 {
        self.window.range_end(self.sequence_len())
    }

    /// Ids of overlaps left out for lack of frequency data
    pub fn skipped(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                FlankWarning::SkippedOverlap(snp_id) => Some(snp_id.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Result of processing one target, in input order
#[derive(Debug)]
pub struct VariantOutcome {
    pub snp_id: String,
    pub result: FlankResult<AnnotatedRecord>,
}

/// Validate flank configuration
pub fn validate_config(config: &FlankConfig) -> FlankResult<()> {
    if config.flank_size > MAX_FLANK_SIZE {
        return Err(FlankError::InvalidConfig(format!(
            "flank size must not exceed {}",
            MAX_FLANK_SIZE
        )));
    }

    let qualifier = &config.target_qualifier;
    if qualifier.is_empty() || qualifier.chars().any(|c| c.is_whitespace() || c == '"' || c == '=') {
        return Err(FlankError::InvalidConfig(format!(
            "target qualifier must be a single word, got {:?}",
            qualifier
        )));
    }

    Ok(())
}

/// Resolve, validate and assemble the flank record of `snp_id`
pub fn build_record<S: VariantStore + ?Sized>(
    store: &S,
    snp_id: &str,
    config: &FlankConfig,
) -> FlankResult<AnnotatedRecord> {
    let resolved = resolve_window(store, snp_id, config.flank_size)?;
    let mut warnings = Vec::new();

    if resolved.window.clipped_left {
        let warning = FlankWarning::ClippedWindow {
            requested: config.flank_size,
            available: resolved.left_flank_len(),
        };
        log::warn!("{}: {}", snp_id, warning);
        warnings.push(warning);
    }

    let mut validated = Vec::new();
    for overlap in resolve_overlaps(store, &resolved.window)? {
        match validate_overlap(overlap, &resolved.window, &resolved.sequence)? {
            Validation::Accepted(overlap) => validated.push(overlap),
            Validation::Skipped(skipped_id) => warnings.push(FlankWarning::SkippedOverlap(skipped_id)),
        }
    }

    let assembly = assemble(&resolved.sequence, &validated, snp_id);
    log::debug!(
        "{}: {} features, {} bases",
        snp_id,
        assembly.features.len(),
        assembly.marked_sequence.len()
    );

    Ok(AnnotatedRecord {
        snp_id: snp_id.to_string(),
        window: resolved.window,
        assembly,
        warnings,
    })
}

/// Build records for a chunk of targets against one store
///
/// Data errors stay with their target; store failures abort the chunk.
pub fn process_target_chunk<S: VariantStore + ?Sized>(
    store: &S,
    targets: &[String],
    config: &FlankConfig,
) -> FlankResult<Vec<VariantOutcome>> {
    let mut outcomes = Vec::with_capacity(targets.len());
    for snp_id in targets {
        let result = match build_record(store, snp_id, config) {
            Err(e) if !e.is_data_error() => {
                log::error!("Aborting at {}: {}", snp_id, e);
                return Err(e);
            }
            other => other,
        };
        match &result {
            Ok(_) => log::info!("Record for {} assembled", snp_id),
            Err(e) => log::error!("{}: {}", snp_id, e),
        }
        outcomes.push(VariantOutcome {
            snp_id: snp_id.clone(),
            result,
        });
    }
    Ok(outcomes)
}

/// Build records for all `targets`, spreading chunks over `num_processes` workers
///
/// Each worker opens its own read-only connection. Outcomes come back in input order.
pub fn process_targets(
    db_path: &Path,
    targets: &[String],
    config: &FlankConfig,
    num_processes: usize,
) -> FlankResult<Vec<VariantOutcome>> {
    if targets.is_empty() {
        return Ok(Vec::new());
    }

    let chunks = chunk_work(targets, num_processes.max(1));

    let chunk_results: Result<Vec<Vec<VariantOutcome>>, FlankError> = chunks
        .into_par_iter()
        .map(|chunk| {
            let store = SqliteStore::open(db_path)?;
            process_target_chunk(&store, &chunk, config)
        })
        .collect();

    Ok(chunk_results?.into_iter().flatten().collect())
}

/// Where batch outputs go
#[derive(Debug, Clone)]
pub struct BatchOutputs {
    pub output_dir: PathBuf,
    /// Shared summary file, one line per successful target
    pub summary: PathBuf,
    /// Optional per-target TSV report
    pub report: Option<PathBuf>,
}

/// Counts of a finished batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub written: usize,
    /// Failed targets with their diagnostics
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    snp_id: &'a str,
    status: &'static str,
    chrom: Option<&'a str>,
    range_begin: Option<i64>,
    range_end: Option<i64>,
    length: Option<usize>,
    features: Option<usize>,
    skipped: Option<usize>,
    left_clipped: Option<bool>,
    message: String,
}

impl<'a> ReportRow<'a> {
    fn from_outcome(outcome: &'a VariantOutcome) -> Self {
        match &outcome.result {
            Ok(record) => ReportRow {
                snp_id: &outcome.snp_id,
                status: "ok",
                chrom: Some(&record.window.chrom),
                range_begin: Some(record.range_begin()),
                range_end: Some(record.range_end()),
                length: Some(record.sequence_len()),
                features: Some(record.assembly.features.len()),
                skipped: Some(record.skipped().len()),
                left_clipped: Some(record.window.clipped_left),
                message: record
                    .warnings
                    .iter()
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            },
            Err(e) => ReportRow {
                snp_id: &outcome.snp_id,
                status: "failed",
                chrom: None,
                range_begin: None,
                range_end: None,
                length: None,
                features: None,
                skipped: None,
                left_clipped: None,
                message: e.to_string(),
            },
        }
    }
}

/// File name of the record of `snp_id`
pub fn record_file_name(snp_id: &str) -> String {
    let safe: String = snp_id
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}.gb", safe)
}

/// Write record files, summary lines and the optional report, in input order
pub fn write_outputs(
    outcomes: &[VariantOutcome],
    outputs: &BatchOutputs,
    config: &FlankConfig,
    date: NaiveDate,
) -> FlankResult<BatchSummary> {
    std::fs::create_dir_all(&outputs.output_dir)?;
    ensure_parent_dirs(&outputs.summary)?;
    let mut summary_writer = BufWriter::new(File::create(&outputs.summary)?);
    let mut batch = BatchSummary::default();

    for (i, outcome) in outcomes.iter().enumerate() {
        match &outcome.result {
            Ok(record) => {
                let path = outputs.output_dir.join(record_file_name(&record.snp_id));
                let mut record_writer = BufWriter::new(File::create(&path)?);
                record_writer.write_all(render_record(record, config, date).as_bytes())?;
                record_writer.flush()?;

                summary_writer.write_all(summary_line(record).as_bytes())?;
                log::info!("The file for {} is created: {:?}", record.snp_id, path);
                batch.written += 1;
            }
            Err(e) => batch.failed.push((outcome.snp_id.clone(), e.to_string())),
        }
        log_progress(i + 1, outcomes.len(), "Targets written");
    }
    summary_writer.flush()?;

    if let Some(report) = &outputs.report {
        ensure_parent_dirs(report)?;
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(report)?;
        for outcome in outcomes {
            writer.serialize(ReportRow::from_outcome(outcome))?;
        }
        writer.flush()?;
    }

    Ok(batch)
}
