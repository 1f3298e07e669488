//! Flank assembly: inline variant codes and case-marked sequence
//!
//! Overlaps are folded left to right over the window sequence. The fold state
//! is a write cursor plus the annotated string built so far; covered bases are
//! replaced by a bracketed code (`[id:...]` for the target, `(id:...)` for
//! neighbours). The bases each feature is located on (anchor bases for
//! insertion sites) are uppercased through a separate emphasis mask, so the
//! window sequence itself is never mutated.

use crate::{
    validate::{LocalSpan, ValidatedOverlap},
    AlleleObservation, Overlap, VariantKind,
};

/// Token used in place of a missing frequency
pub const NO_FREQUENCY: &str = "NA";

/// Significant digits SQLite keeps when printing a REAL
const REAL_DIGITS: i32 = 15;

fn trim_fraction(digits: &str) -> String {
    if !digits.contains('.') {
        return format!("{}.0", digits);
    }
    let trimmed = digits.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Render a real the way SQLite prints it (`%!.15g`): `1.0`, `0.25`, `1.0e-05`
fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0.0".to_string();
    }

    let scientific = format!("{:.*e}", (REAL_DIGITS - 1) as usize, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= REAL_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (REAL_DIGITS - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value))
    }
}

/// Render a frequency the way the store prints reals, `NA` when missing
pub fn format_frequency(freq: Option<f64>) -> String {
    match freq {
        Some(value) => format_real(value),
        None => NO_FREQUENCY.to_string(),
    }
}

/// Inline code for `overlap`: `[id:A/0.9,G/0.1]` for the target, `(id:...)` otherwise
pub fn display_code(overlap: &Overlap, target_id: &str) -> String {
    let pairs: Vec<String> = overlap
        .alleles
        .iter()
        .map(|a| format!("{}/{}", a.allele, format_frequency(a.freq)))
        .collect();
    let body = format!("{}:{}", overlap.snp_id, pairs.join(","));

    if overlap.snp_id == target_id {
        format!("[{}]", body)
    } else {
        format!("({})", body)
    }
}

/// Per-allele tokens of the `frequency` qualifier: `A-0.9`, or `del` for a gap allele
pub fn allele_token(allele: &AlleleObservation) -> String {
    if allele.is_gap() {
        "del".to_string()
    } else {
        format!("{}-{}", allele.allele, format_frequency(allele.freq))
    }
}

/// Fold state: write cursor into the window sequence and the annotated output so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlankFold {
    cursor: usize,
    flanked: String,
}

impl FlankFold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Copy the bases up to `span`, then the code; the cursor never moves backwards
    pub fn step(mut self, sequence: &str, span: LocalSpan, code: &str) -> Self {
        if span.start > self.cursor {
            self.flanked.push_str(&sequence[self.cursor..span.start]);
        }
        self.flanked.push_str(code);
        self.cursor = self.cursor.max(span.end);
        self
    }

    /// Append the tail after the last overlap
    pub fn finish(mut self, sequence: &str) -> String {
        if self.cursor < sequence.len() {
            self.flanked.push_str(&sequence[self.cursor..]);
        }
        self.flanked
    }
}

/// Offsets of called bases, rendered uppercase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmphasisMask {
    marked: Vec<bool>,
}

impl EmphasisMask {
    pub fn new(len: usize) -> Self {
        Self {
            marked: vec![false; len],
        }
    }

    pub fn mark(&mut self, span: LocalSpan) {
        let end = span.end.min(self.marked.len());
        if span.start < end {
            self.marked[span.start..end].fill(true);
        }
    }

    pub fn is_marked(&self, offset: usize) -> bool {
        self.marked.get(offset).copied().unwrap_or(false)
    }

    /// `sequence` with marked offsets uppercased
    pub fn apply(&self, sequence: &str) -> String {
        sequence
            .chars()
            .enumerate()
            .map(|(i, base)| if self.is_marked(i) { base.to_ascii_uppercase() } else { base })
            .collect()
    }
}

/// One entry of the feature table
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledFeature {
    pub snp_id: String,
    pub kind: VariantKind,
    /// 1-based location in the window; anchor bases for insertion sites
    pub bounds: (usize, usize),
    pub allele_tokens: Vec<String>,
    pub is_target: bool,
}

/// Result of folding all overlaps of one window
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub features: Vec<AssembledFeature>,
    /// Window bases interleaved with variant codes
    pub flanked_sequence: String,
    /// Window bases with called bases uppercased
    pub marked_sequence: String,
}

/// Fold validated `overlaps` (ascending by position) over the window `sequence`
pub fn assemble(sequence: &str, overlaps: &[ValidatedOverlap], target_id: &str) -> Assembly {
    let mut mask = EmphasisMask::new(sequence.len());
    let mut features = Vec::with_capacity(overlaps.len());

    let fold = overlaps.iter().fold(FlankFold::new(), |fold, validated| {
        let overlap = &validated.overlap;
        let (first, last) = validated.feature_bounds();
        mask.mark(LocalSpan {
            start: first - 1,
            end: last,
        });
        features.push(AssembledFeature {
            snp_id: overlap.snp_id.clone(),
            kind: overlap.kind,
            bounds: (first, last),
            allele_tokens: overlap.alleles.iter().map(allele_token).collect(),
            is_target: overlap.snp_id == target_id,
        });
        fold.step(sequence, validated.span, &display_code(overlap, target_id))
    });

    Assembly {
        features,
        flanked_sequence: fold.finish(sequence),
        marked_sequence: mask.apply(sequence),
    }
}
