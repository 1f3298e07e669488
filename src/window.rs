//! Flank window resolution around a target SNP

use crate::{
    store::{VariantStore, WindowRequest},
    FlankError, FlankResult, VariantLocation,
};

/// Absolute window around a target variant and its mapping to local coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlankWindow {
    pub chrom: String,
    /// Requested first position; zero or negative when the flank runs off the chromosome start
    pub window_begin: i64,
    pub window_end: i64,
    pub clipped_left: bool,
    /// Subtracted from absolute positions to get 1-based positions in the fetched sequence
    pub start_shift: i64,
}

impl FlankWindow {
    /// Plans the window and the store request for `location`
    pub fn plan(location: &VariantLocation, flank_size: usize) -> (Self, WindowRequest) {
        let flank = flank_size as i64;
        let window_begin = location.begin() - flank;
        let window_end = location.end() + flank;
        let clipped_left = window_begin <= 0;
        let left_start = window_begin.max(1);

        let window = FlankWindow {
            chrom: location.chrom.clone(),
            window_begin,
            window_end,
            clipped_left,
            start_shift: left_start - 1,
        };
        let request = WindowRequest {
            left_start,
            left_len: location.begin() - left_start,
            core_start: location.begin(),
            core_len: location.len,
            right_len: flank,
        };
        (window, request)
    }

    /// First absolute position of the fetched sequence
    pub fn range_begin(&self) -> i64 {
        if self.clipped_left {
            1
        } else {
            self.window_begin
        }
    }

    /// Last absolute position of a fetched sequence of `sequence_len` bases
    pub fn range_end(&self, sequence_len: usize) -> i64 {
        self.range_begin() + sequence_len as i64 - 1
    }

    pub fn to_local(&self, absolute: i64) -> i64 {
        absolute - self.start_shift
    }
}

/// Target location, its window and the lowercased window sequence
#[derive(Debug, Clone)]
pub struct ResolvedWindow {
    pub target: VariantLocation,
    pub window: FlankWindow,
    pub sequence: String,
}

impl ResolvedWindow {
    /// Left flank bases actually available
    pub fn left_flank_len(&self) -> usize {
        (self.target.begin() - self.window.range_begin()) as usize
    }
}

/// Look up `snp_id` and fetch its flank window from `store`
pub fn resolve_window<S: VariantStore + ?Sized>(
    store: &S,
    snp_id: &str,
    flank_size: usize,
) -> FlankResult<ResolvedWindow> {
    let target = store
        .locate(snp_id)?
        .ok_or_else(|| FlankError::VariantNotFound(snp_id.to_string()))?;

    if target.pos_from < 1 || target.len < 0 {
        return Err(FlankError::InvalidLocation {
            snp_id: target.snp_id.clone(),
            pos_from: target.pos_from,
            len: target.len,
        });
    }

    let (window, request) = FlankWindow::plan(&target, flank_size);
    let sequence = store
        .fetch_window_sequence(&target.chrom, &request)?
        .ok_or_else(|| FlankError::ChromosomeNotFound {
            snp_id: target.snp_id.clone(),
            chrom: target.chrom.clone(),
        })?;

    // Byte offsets are used as positions downstream
    if !sequence.is_ascii() {
        return Err(FlankError::InvalidSequence(format!(
            "non-ASCII bases in {} around {}",
            target.chrom, target.snp_id
        )));
    }

    log::debug!(
        "{}: window {}..{} on {}, shift {}, {} bases fetched",
        snp_id,
        window.window_begin,
        window.window_end,
        window.chrom,
        window.start_shift,
        sequence.len()
    );

    Ok(ResolvedWindow {
        target,
        window,
        sequence: sequence.to_ascii_lowercase(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_store;

    const CHR1: &str = "AACCGGTTAACCGGTT";

    #[test]
    fn test_plan_unclipped() {
        let location = VariantLocation::new("rs1", "chr1", 8, 1, Some("T"));
        let (window, request) = FlankWindow::plan(&location, 5);

        assert_eq!(window.window_begin, 3);
        assert_eq!(window.window_end, 13);
        assert!(!window.clipped_left);
        assert_eq!(window.start_shift, 2);
        assert_eq!(window.to_local(8), 6);
        assert_eq!(request, WindowRequest {
            left_start: 3,
            left_len: 5,
            core_start: 8,
            core_len: 1,
            right_len: 5,
        });
    }

    #[test]
    fn test_plan_clipped() {
        let location = VariantLocation::new("rs1", "chr1", 3, 2, Some("CC"));
        let (window, request) = FlankWindow::plan(&location, 5);

        assert_eq!(window.window_begin, -2);
        assert!(window.clipped_left);
        assert_eq!(window.start_shift, 0);
        assert_eq!(window.range_begin(), 1);
        assert_eq!(request.left_start, 1);
        assert_eq!(request.left_len, 2);
    }

    #[test]
    fn test_plan_window_starting_at_first_base() {
        let location = VariantLocation::new("rs1", "chr1", 6, 1, Some("G"));
        let (window, _) = FlankWindow::plan(&location, 5);

        assert!(!window.clipped_left);
        assert_eq!(window.start_shift, 0);
        assert_eq!(window.range_begin(), 1);
    }

    #[test]
    fn test_resolve_window() {
        let store = memory_store(
            &[("chr1", CHR1)],
            &[VariantLocation::new("rs1", "chr1", 8, 1, Some("T"))],
            &[],
        );
        let resolved = resolve_window(&store, "rs1", 5).unwrap();

        assert_eq!(resolved.sequence, "ccggttaaccg");
        assert_eq!(resolved.window.range_begin(), 3);
        assert_eq!(resolved.window.range_end(resolved.sequence.len()), 13);
        assert_eq!(resolved.left_flank_len(), 5);
    }

    #[test]
    fn test_resolve_window_clipped_left() {
        let store = memory_store(
            &[("chr1", CHR1)],
            &[VariantLocation::new("rs1", "chr1", 3, 1, Some("C"))],
            &[],
        );
        let resolved = resolve_window(&store, "rs1", 5).unwrap();

        assert!(resolved.window.clipped_left);
        assert_eq!(resolved.sequence, "aaccggtt");
        assert_eq!(resolved.window.range_begin(), 1);
        assert_eq!(resolved.window.range_end(resolved.sequence.len()), 8);
        assert_eq!(resolved.left_flank_len(), 2);
    }

    #[test]
    fn test_resolve_window_insertion_site() {
        let store = memory_store(
            &[("chr1", CHR1)],
            &[VariantLocation::new("rs9", "chr1", 8, 0, Some("-"))],
            &[],
        );
        let resolved = resolve_window(&store, "rs9", 3).unwrap();

        // positions 5..7 then 8..10, nothing in between
        assert_eq!(resolved.sequence, "ggttaa");
        assert_eq!(resolved.window.window_begin, 5);
        assert_eq!(resolved.window.window_end, 10);
    }

    #[test]
    fn test_resolve_window_errors() {
        let store = memory_store(
            &[("chr1", CHR1)],
            &[
                VariantLocation::new("rs1", "chrX", 8, 1, Some("T")),
                VariantLocation::new("rs2", "chr1", 0, 1, Some("T")),
            ],
            &[],
        );

        assert!(matches!(
            resolve_window(&store, "rs404", 5),
            Err(FlankError::VariantNotFound(id)) if id == "rs404"
        ));
        assert!(matches!(
            resolve_window(&store, "rs1", 5),
            Err(FlankError::ChromosomeNotFound { chrom, .. }) if chrom == "chrX"
        ));
        assert!(matches!(
            resolve_window(&store, "rs2", 5),
            Err(FlankError::InvalidLocation { pos_from: 0, .. })
        ));
    }
}
