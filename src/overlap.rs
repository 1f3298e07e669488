//! Known variants inside a flank window

use crate::{store::VariantStore, window::FlankWindow, FlankResult, Overlap};

/// All variants fully contained in `window`, ascending by start position
///
/// Variants sharing a start position keep the order the store returned them in.
pub fn resolve_overlaps<S: VariantStore + ?Sized>(
    store: &S,
    window: &FlankWindow,
) -> FlankResult<Vec<Overlap>> {
    let mut overlaps = store.fetch_overlaps(&window.chrom, window.window_begin, window.window_end)?;
    overlaps.sort_by_key(|overlap| overlap.pos_from);

    log::debug!(
        "{} variants inside {}:{}..{}",
        overlaps.len(),
        window.chrom,
        window.window_begin,
        window.window_end
    );

    Ok(overlaps)
}
