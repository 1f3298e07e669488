//! # seq4primers - SNP flank records for primer design
//!
//! Builds annotated flanking-sequence records around SNPs of interest from a
//! relational SNP store (chromosome sequences, SNP locations and SNP alleles).
//! Every known variant inside the flank is cross-checked against the reference
//! sequence and marked both inline and in a GenBank-style feature table.

pub mod assemble;
pub mod genbank;
pub mod ingest;
pub mod overlap;
pub mod pipeline;
pub mod store;
#[cfg(test)]
mod testing;
pub mod utils;
pub mod validate;
pub mod window;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference marker used by the store for variants without reference bases
pub const GAP: &str = "-";

/// A row of the SNP location relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantLocation {
    pub snp_id: String,
    pub chrom: String,
    /// 1-based first position of the variant
    pub pos_from: i64,
    /// Number of reference bases covered, 0 for an insertion site
    pub len: i64,
    pub reference: Option<String>,
    pub is_common: Option<bool>,
}

impl VariantLocation {
    pub fn new(snp_id: &str, chrom: &str, pos_from: i64, len: i64, reference: Option<&str>) -> Self {
        Self {
            snp_id: snp_id.to_string(),
            chrom: chrom.to_string(),
            pos_from,
            len,
            reference: reference.map(str::to_string),
            is_common: None,
        }
    }

    /// First covered position (1-based, inclusive)
    pub fn begin(&self) -> i64 {
        self.pos_from
    }

    /// Last covered position (1-based, inclusive); `begin() - 1` for insertion sites
    pub fn end(&self) -> i64 {
        self.pos_from + self.len - 1
    }
}

/// One observed allele of a variant with its population frequency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlleleObservation {
    pub allele: String,
    pub freq: Option<f64>,
}

impl AlleleObservation {
    pub fn new(allele: &str, freq: Option<f64>) -> Self {
        Self {
            allele: allele.to_string(),
            freq,
        }
    }

    pub fn is_gap(&self) -> bool {
        self.allele == GAP
    }
}

/// Shape of a variant relative to the reference sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantKind {
    /// Reference bases replaced by other bases
    Substitution,
    /// Bases inserted between two reference bases; the reference is recorded as `-`
    Insertion,
    /// Reference bases that are missing in at least one observed allele
    Deletion,
}

impl VariantKind {
    pub fn resolve(reference: Option<&str>, alleles: &[AlleleObservation]) -> Self {
        match reference {
            Some(GAP) => VariantKind::Insertion,
            _ if alleles.iter().any(AlleleObservation::is_gap) => VariantKind::Deletion,
            _ => VariantKind::Substitution,
        }
    }
}

/// A known variant lying inside a flank window, with its aggregated alleles
#[derive(Debug, Clone, PartialEq)]
pub struct Overlap {
    pub snp_id: String,
    pub pos_from: i64,
    pub len: i64,
    pub reference: Option<String>,
    pub kind: VariantKind,
    pub alleles: Vec<AlleleObservation>,
}

impl Overlap {
    pub fn new(location: &VariantLocation, alleles: Vec<AlleleObservation>) -> Self {
        let kind = VariantKind::resolve(location.reference.as_deref(), &alleles);
        Self {
            snp_id: location.snp_id.clone(),
            pos_from: location.pos_from,
            len: location.len,
            reference: location.reference.clone(),
            kind,
            alleles,
        }
    }

    /// True when no allele of this variant carries a frequency
    pub fn lacks_frequencies(&self) -> bool {
        self.alleles.iter().all(|a| a.freq.is_none())
    }
}

/// Configuration of flank extraction and record rendering
#[derive(Debug, Clone)]
pub struct FlankConfig {
    pub flank_size: usize,           // Bases requested on each side of the target
    pub strict: bool,                // GenBank strict feature keys
    pub target_qualifier: String,    // Qualifier marking the variant of interest
}

impl Default for FlankConfig {
    fn default() -> Self {
        Self {
            flank_size: 500,
            strict: false,
            target_qualifier: "MiHA".to_string(),
        }
    }
}

/// Non-fatal conditions met while building a record
#[derive(Debug, Clone, PartialEq)]
pub enum FlankWarning {
    /// An overlapping variant without frequency data was left out
    SkippedOverlap(String),
    /// The left flank was cut at the chromosome start
    ClippedWindow { requested: usize, available: usize },
}

impl fmt::Display for FlankWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlankWarning::SkippedOverlap(snp_id) => {
                write!(f, "no frequency data for {}, variant skipped", snp_id)
            }
            FlankWarning::ClippedWindow { requested, available } => write!(
                f,
                "left flank truncated: {} of {} bases available",
                available, requested
            ),
        }
    }
}

/// Error types for the seq4primers library
#[derive(Debug, thiserror::Error)]
pub enum FlankError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SNP not found in the location table: {0}")]
    VariantNotFound(String),

    #[error("invalid location of {snp_id}: pos_from={pos_from}, len={len}")]
    InvalidLocation { snp_id: String, pos_from: i64, len: i64 },

    #[error("chromosome {chrom} of {snp_id} not found in the sequence table")]
    ChromosomeNotFound { snp_id: String, chrom: String },

    #[error("no SNP record: {0} has alleles but no reference")]
    InconsistentRecord(String),

    #[error("wrong SNP position: {snp_id} => {reference} <-> {observed}")]
    PositionMismatch {
        snp_id: String,
        reference: String,
        observed: String,
    },

    #[error("no reference allele: {snp_id} => {reference} not among {alleles}")]
    MissingReferenceAllele {
        snp_id: String,
        reference: String,
        alleles: String,
    },

    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Output file {0} already exists")]
    OutputExists(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FlankError {
    /// Data problems scoped to a single target variant
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            FlankError::VariantNotFound(_)
                | FlankError::InvalidLocation { .. }
                | FlankError::ChromosomeNotFound { .. }
                | FlankError::InconsistentRecord(_)
                | FlankError::PositionMismatch { .. }
                | FlankError::MissingReferenceAllele { .. }
                | FlankError::InvalidSequence(_)
        )
    }
}

pub type FlankResult<T> = Result<T, FlankError>;
