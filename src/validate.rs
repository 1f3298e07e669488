//! Cross-checks of overlapping variants against the fetched window
//!
//! Each overlap must carry a reference that matches the window sequence at its
//! position, and its observed alleles must include that reference. Overlaps
//! without any frequency data are skipped rather than rejected.

use crate::{window::FlankWindow, FlankError, FlankResult, Overlap, VariantKind, GAP};

/// Position of an overlap inside the window sequence
///
/// `start..end` is a 0-based half-open byte range; it is empty for insertion sites,
/// where `start` is the offset the inserted bases would go before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalSpan {
    pub start: usize,
    pub end: usize,
}

impl LocalSpan {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// An overlap that passed every check, with its window-local span
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOverlap {
    pub overlap: Overlap,
    pub span: LocalSpan,
}

impl ValidatedOverlap {
    /// 1-based feature location in the window
    ///
    /// Covered bases give `(first, last)`. Insertion sites are recorded with their
    /// begin and end swapped, which yields the two anchor bases around the site;
    /// a site before the first base of the window is anchored on that base alone.
    pub fn feature_bounds(&self) -> (usize, usize) {
        match self.overlap.kind {
            VariantKind::Insertion => (self.span.start.max(1), self.span.start + 1),
            _ => (self.span.start + 1, self.span.end),
        }
    }
}

/// Outcome of checking one overlap
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Accepted(ValidatedOverlap),
    /// No frequency data; carries the skipped SNP id
    Skipped(String),
}

fn local_span(overlap: &Overlap, window: &FlankWindow, sequence_len: usize) -> Option<LocalSpan> {
    let start = usize::try_from(window.to_local(overlap.pos_from) - 1).ok()?;
    let end = start.checked_add(usize::try_from(overlap.len).ok()?)?;
    (end <= sequence_len).then_some(LocalSpan { start, end })
}

/// Check `overlap` against the lowercased window `sequence`
pub fn validate_overlap(overlap: Overlap, window: &FlankWindow, sequence: &str) -> FlankResult<Validation> {
    if overlap.lacks_frequencies() {
        log::warn!("No frequency data for {}, skipping it", overlap.snp_id);
        return Ok(Validation::Skipped(overlap.snp_id));
    }

    let reference = match overlap.reference.as_deref() {
        Some(reference) if !reference.is_empty() => reference.to_string(),
        _ => return Err(FlankError::InconsistentRecord(overlap.snp_id)),
    };

    let span = local_span(&overlap, window, sequence.len()).ok_or_else(|| FlankError::PositionMismatch {
        snp_id: overlap.snp_id.clone(),
        reference: reference.clone(),
        observed: format!("outside window {}..{}", window.range_begin(), window.range_end(sequence.len())),
    })?;

    let expected = match overlap.kind {
        VariantKind::Insertion => "",
        _ => reference.as_str(),
    };
    let observed = &sequence[span.start..span.end];
    if !observed.eq_ignore_ascii_case(expected) {
        return Err(FlankError::PositionMismatch {
            snp_id: overlap.snp_id,
            reference,
            observed: if observed.is_empty() { GAP.to_string() } else { observed.to_string() },
        });
    }

    if !overlap
        .alleles
        .iter()
        .any(|a| a.allele.eq_ignore_ascii_case(&reference))
    {
        let alleles: Vec<&str> = overlap.alleles.iter().map(|a| a.allele.as_str()).collect();
        return Err(FlankError::MissingReferenceAllele {
            snp_id: overlap.snp_id,
            reference,
            alleles: alleles.join(","),
        });
    }

    Ok(Validation::Accepted(ValidatedOverlap { overlap, span }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlleleObservation, VariantLocation};

    // positions 3..13 of AACCGGTTAACCGGTT
    const WINDOW_SEQ: &str = "ccggttaaccg";

    fn window() -> FlankWindow {
        FlankWindow {
            chrom: "chr1".to_string(),
            window_begin: 3,
            window_end: 13,
            clipped_left: false,
            start_shift: 2,
        }
    }

    fn overlap(snp_id: &str, pos_from: i64, len: i64, reference: Option<&str>, alleles: &[(&str, Option<f64>)]) -> Overlap {
        let location = VariantLocation::new(snp_id, "chr1", pos_from, len, reference);
        let alleles = alleles
            .iter()
            .map(|(allele, freq)| AlleleObservation::new(allele, *freq))
            .collect();
        Overlap::new(&location, alleles)
    }

    #[test]
    fn test_accepts_matching_substitution() {
        let snv = overlap("rs1", 8, 1, Some("T"), &[("T", Some(0.9)), ("C", Some(0.1))]);
        match validate_overlap(snv, &window(), WINDOW_SEQ).unwrap() {
            Validation::Accepted(validated) => {
                assert_eq!(validated.span, LocalSpan { start: 5, end: 6 });
                assert_eq!(validated.feature_bounds(), (6, 6));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reference_compared_case_insensitively() {
        let mnv = overlap("rs2", 5, 3, Some("gGt"), &[("GGT", Some(0.6)), ("AAA", Some(0.4))]);
        assert!(matches!(
            validate_overlap(mnv, &window(), WINDOW_SEQ).unwrap(),
            Validation::Accepted(_)
        ));
    }

    #[test]
    fn test_insertion_site_has_empty_span() {
        let ins = overlap("rs3", 8, 0, Some("-"), &[("-", Some(0.7)), ("A", Some(0.3))]);
        match validate_overlap(ins, &window(), WINDOW_SEQ).unwrap() {
            Validation::Accepted(validated) => {
                assert!(validated.span.is_empty());
                assert_eq!(validated.span.start, 5);
                // anchors are positions 7 and 8, local 5 and 6
                assert_eq!(validated.feature_bounds(), (5, 6));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_insertion_before_first_base() {
        let clipped = FlankWindow {
            chrom: "chr1".to_string(),
            window_begin: -2,
            window_end: 8,
            clipped_left: true,
            start_shift: 0,
        };
        let ins = overlap("rs12", 1, 0, Some("-"), &[("-", Some(0.7)), ("A", Some(0.3))]);
        match validate_overlap(ins, &clipped, "aaccggtt").unwrap() {
            Validation::Accepted(validated) => {
                assert_eq!(validated.span, LocalSpan { start: 0, end: 0 });
                assert_eq!(validated.feature_bounds(), (1, 1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_skips_overlap_without_frequencies() {
        let no_freq = overlap("rs4", 8, 1, Some("T"), &[("T", None), ("C", None)]);
        assert_eq!(
            validate_overlap(no_freq, &window(), WINDOW_SEQ).unwrap(),
            Validation::Skipped("rs4".to_string())
        );

        // skipping wins over a missing reference
        let no_freq_no_ref = overlap("rs5", 8, 1, None, &[("T", None)]);
        assert!(matches!(
            validate_overlap(no_freq_no_ref, &window(), WINDOW_SEQ).unwrap(),
            Validation::Skipped(_)
        ));
    }

    #[test]
    fn test_missing_reference_is_inconsistent() {
        let no_ref = overlap("rs6", 8, 1, None, &[("T", Some(0.5))]);
        assert!(matches!(
            validate_overlap(no_ref, &window(), WINDOW_SEQ),
            Err(FlankError::InconsistentRecord(id)) if id == "rs6"
        ));

        let empty_ref = overlap("rs7", 8, 1, Some(""), &[("T", Some(0.5))]);
        assert!(matches!(
            validate_overlap(empty_ref, &window(), WINDOW_SEQ),
            Err(FlankError::InconsistentRecord(_))
        ));
    }

    #[test]
    fn test_position_mismatch() {
        let wrong = overlap("rs8", 8, 1, Some("G"), &[("G", Some(0.5)), ("T", Some(0.5))]);
        match validate_overlap(wrong, &window(), WINDOW_SEQ) {
            Err(FlankError::PositionMismatch { snp_id, reference, observed }) => {
                assert_eq!(snp_id, "rs8");
                assert_eq!(reference, "G");
                assert_eq!(observed, "t");
            }
            other => panic!("unexpected {:?}", other),
        }

        // a zero-length site only matches the gap reference
        let not_gap = overlap("rs9", 8, 0, Some("T"), &[("T", Some(0.5))]);
        assert!(matches!(
            validate_overlap(not_gap, &window(), WINDOW_SEQ),
            Err(FlankError::PositionMismatch { observed, .. }) if observed == "-"
        ));
    }

    #[test]
    fn test_span_outside_window() {
        let beyond = overlap("rs10", 13, 2, Some("GG"), &[("GG", Some(0.5))]);
        assert!(matches!(
            validate_overlap(beyond, &window(), WINDOW_SEQ),
            Err(FlankError::PositionMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_reference_allele() {
        let bad_alleles = overlap("rs11", 8, 1, Some("T"), &[("A", Some(0.5)), ("C", Some(0.5))]);
        match validate_overlap(bad_alleles, &window(), WINDOW_SEQ) {
            Err(FlankError::MissingReferenceAllele { snp_id, alleles, .. }) => {
                assert_eq!(snp_id, "rs11");
                assert_eq!(alleles, "A,C");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
