//! Read-only access to the SNP store
//!
//! The store holds three relations: chromosome sequences (`hgChrom`), SNP
//! locations (`SNP_location`) and SNP alleles (`SNP_allele`). Flank assembly
//! only needs a location lookup, a windowed sequence fetch and an interval
//! overlap query, which is what [`VariantStore`] exposes.

use crate::{utils::validate_file_exists, AlleleObservation, FlankResult, Overlap, VariantLocation};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;

const SELECT_LOCATION: &str = "SELECT snp_id, chrom, pos_from, len, reference, is_common
    FROM SNP_location WHERE snp_id = ?1
    ORDER BY rowid LIMIT 1";

const SELECT_WINDOW: &str = "SELECT SUBSTR(seq, ?2, ?3) || SUBSTR(seq, ?4, ?5) || SUBSTR(seq, ?4 + ?5, ?6)
    FROM hgChrom WHERE chrom = ?1";

// Both ends of a variant must fall inside the window. An id with several
// location rows is placed by its first row, as in SELECT_LOCATION.
const SELECT_OVERLAPS: &str = "SELECT l.snp_id, l.chrom, l.pos_from, l.len, l.reference, l.is_common, a.allele, a.freq
    FROM SNP_location AS l INNER JOIN SNP_allele AS a ON a.snp_id = l.snp_id
    WHERE l.chrom = ?1
    AND l.pos_from BETWEEN ?2 AND ?3
    AND l.pos_from + l.len - 1 BETWEEN ?2 AND ?3
    AND l.rowid = (SELECT MIN(rowid) FROM SNP_location WHERE snp_id = l.snp_id)
    ORDER BY l.pos_from, l.rowid, a.rowid";

/// Three consecutive pieces of one chromosome: left flank, variant span, right flank
///
/// Positions are 1-based. The right flank starts right after the variant span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRequest {
    pub left_start: i64,
    pub left_len: i64,
    pub core_start: i64,
    pub core_len: i64,
    pub right_len: i64,
}

/// Query capabilities required to assemble flank records
pub trait VariantStore {
    /// Location of `snp_id`, or `None` if the store does not know it
    fn locate(&self, snp_id: &str) -> FlankResult<Option<VariantLocation>>;

    /// Concatenated sequence of the three window pieces, or `None` for an unknown chromosome
    fn fetch_window_sequence(&self, chrom: &str, request: &WindowRequest) -> FlankResult<Option<String>>;

    /// Variants fully inside `[window_begin, window_end]`, ascending by `pos_from`
    fn fetch_overlaps(&self, chrom: &str, window_begin: i64, window_end: i64) -> FlankResult<Vec<Overlap>>;
}

/// [`VariantStore`] backed by an SQLite database
pub struct SqliteStore {
    connection: Connection,
}

impl SqliteStore {
    /// Opens the database in `path` read-only
    pub fn open<P: AsRef<Path>>(path: P) -> FlankResult<Self> {
        validate_file_exists(&path)?;
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(path, flags)?;
        Ok(SqliteStore { connection })
    }

    /// Wraps an already open connection
    pub fn from_connection(connection: Connection) -> Self {
        SqliteStore { connection }
    }

    fn row_to_location(row: &Row, offset: usize) -> rusqlite::Result<VariantLocation> {
        Ok(VariantLocation {
            snp_id: row.get(offset)?,
            chrom: row.get(offset + 1)?,
            pos_from: row.get(offset + 2)?,
            len: row.get(offset + 3)?,
            reference: row.get(offset + 4)?,
            is_common: row.get(offset + 5)?,
        })
    }
}

impl VariantStore for SqliteStore {
    fn locate(&self, snp_id: &str) -> FlankResult<Option<VariantLocation>> {
        let mut statement = self.connection.prepare_cached(SELECT_LOCATION)?;
        let location = statement
            .query_row(params![snp_id], |row| Self::row_to_location(row, 0))
            .optional()?;
        Ok(location)
    }

    fn fetch_window_sequence(&self, chrom: &str, request: &WindowRequest) -> FlankResult<Option<String>> {
        let mut statement = self.connection.prepare_cached(SELECT_WINDOW)?;
        let sequence: Option<Option<String>> = statement
            .query_row(
                params![
                    chrom,
                    request.left_start,
                    request.left_len,
                    request.core_start,
                    request.core_len,
                    request.right_len,
                ],
                |row| row.get(0),
            )
            .optional()?;
        Ok(sequence.flatten())
    }

    fn fetch_overlaps(&self, chrom: &str, window_begin: i64, window_end: i64) -> FlankResult<Vec<Overlap>> {
        let mut statement = self.connection.prepare_cached(SELECT_OVERLAPS)?;
        let mut rows = statement.query(params![chrom, window_begin, window_end])?;

        // rows of one id are adjacent: a single location row per id, ordered by position
        let mut grouped: Vec<(VariantLocation, Vec<AlleleObservation>)> = Vec::new();
        while let Some(row) = rows.next()? {
            let snp_id: String = row.get(0)?;
            let allele = AlleleObservation {
                allele: row.get(6)?,
                freq: row.get(7)?,
            };
            match grouped.last_mut() {
                Some((location, alleles)) if location.snp_id == snp_id => alleles.push(allele),
                _ => grouped.push((Self::row_to_location(row, 0)?, vec![allele])),
            }
        }

        Ok(grouped
            .into_iter()
            .map(|(location, alleles)| Overlap::new(&location, alleles))
            .collect())
    }
}
