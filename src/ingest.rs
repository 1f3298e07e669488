//! Building the SNP store from tab-separated dumps
//!
//! Inputs are header-less TSV files (optionally gzip compressed) with MySQL
//! style `\N` for NULL values:
//! - chromosomes: `chrom, seq`
//! - locations: `snp_id, chrom, pos_from, len, reference, is_common`
//! - alleles: `snp_id, allele, freq`

use crate::{
    utils::{check_output_writable, ensure_parent_dirs, open_text_reader, validate_file_readable},
    AlleleObservation, FlankResult, VariantLocation,
};
use rusqlite::{params, Connection};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

const NULL_MARKER: &str = "\\N";

const CREATE_CHROMOSOMES: &str = "CREATE TABLE hgChrom (
    chrom TEXT,
    seq TEXT,
    PRIMARY KEY (chrom)
)";

const CREATE_LOCATIONS: &str = "CREATE TABLE SNP_location (
    snp_id TEXT,
    chrom TEXT,
    pos_from INTEGER,
    len INTEGER,
    reference TEXT,
    is_common INTEGER
)";

const CREATE_ALLELES: &str = "CREATE TABLE SNP_allele (
    snp_id TEXT,
    allele TEXT,
    freq REAL DEFAULT NULL,
    PRIMARY KEY (snp_id, allele)
)";

const CREATE_INDEXES: &str = "CREATE INDEX IF NOT EXISTS snp_idx ON SNP_location (snp_id);
    CREATE INDEX IF NOT EXISTS chrom_idx ON SNP_location (chrom);";

#[derive(Debug, Deserialize)]
struct ChromosomeRow {
    chrom: String,
    seq: String,
}

#[derive(Debug, Deserialize)]
struct LocationRow {
    snp_id: String,
    chrom: String,
    pos_from: i64,
    len: i64,
    reference: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    is_common: Option<u8>,
}

impl LocationRow {
    fn into_location(self) -> VariantLocation {
        VariantLocation {
            snp_id: self.snp_id,
            chrom: self.chrom,
            pos_from: self.pos_from,
            len: self.len,
            reference: nullable(self.reference),
            is_common: self.is_common.map(|flag| flag != 0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AlleleRow {
    snp_id: String,
    allele: String,
    // `\N` and anything else that is not a number becomes NULL
    #[serde(default, deserialize_with = "csv::invalid_option")]
    freq: Option<f64>,
}

/// Number of rows loaded into each relation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub chromosomes: usize,
    pub locations: usize,
    pub alleles: usize,
}

fn nullable(value: String) -> Option<String> {
    if value.is_empty() || value == NULL_MARKER {
        None
    } else {
        Some(value)
    }
}

fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(reader)
}

/// Create the three store relations
pub fn create_schema(connection: &Connection) -> FlankResult<()> {
    connection.execute(CREATE_CHROMOSOMES, [])?;
    connection.execute(CREATE_LOCATIONS, [])?;
    connection.execute(CREATE_ALLELES, [])?;
    Ok(())
}

/// Create the lookup indexes; done after loading to keep inserts fast
pub fn create_indexes(connection: &Connection) -> FlankResult<()> {
    connection.execute_batch(CREATE_INDEXES)?;
    Ok(())
}

pub fn insert_chromosome(connection: &Connection, chrom: &str, seq: &str) -> FlankResult<()> {
    let mut statement = connection.prepare_cached("INSERT INTO hgChrom (chrom, seq) VALUES (?1, ?2)")?;
    statement.execute(params![chrom, seq])?;
    Ok(())
}

pub fn insert_location(connection: &Connection, location: &VariantLocation) -> FlankResult<()> {
    let mut statement = connection.prepare_cached(
        "INSERT INTO SNP_location (snp_id, chrom, pos_from, len, reference, is_common)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    statement.execute(params![
        location.snp_id,
        location.chrom,
        location.pos_from,
        location.len,
        location.reference,
        location.is_common,
    ])?;
    Ok(())
}

pub fn insert_allele(connection: &Connection, snp_id: &str, allele: &AlleleObservation) -> FlankResult<()> {
    let mut statement =
        connection.prepare_cached("INSERT INTO SNP_allele (snp_id, allele, freq) VALUES (?1, ?2, ?3)")?;
    statement.execute(params![snp_id, allele.allele, allele.freq])?;
    Ok(())
}

/// Load `chrom, seq` rows in one transaction
pub fn load_chromosomes<R: Read>(connection: &mut Connection, reader: R) -> FlankResult<usize> {
    let transaction = connection.transaction()?;
    let mut count = 0;
    for row in tsv_reader(reader).deserialize::<ChromosomeRow>() {
        let row = row?;
        insert_chromosome(&transaction, &row.chrom, &row.seq)?;
        count += 1;
    }
    transaction.commit()?;
    Ok(count)
}

/// Load `snp_id, chrom, pos_from, len, reference, is_common` rows in one transaction
pub fn load_locations<R: Read>(connection: &mut Connection, reader: R) -> FlankResult<usize> {
    let transaction = connection.transaction()?;
    let mut count = 0;
    for row in tsv_reader(reader).deserialize::<LocationRow>() {
        insert_location(&transaction, &row?.into_location())?;
        count += 1;
    }
    transaction.commit()?;
    Ok(count)
}

/// Load `snp_id, allele, freq` rows in one transaction
pub fn load_alleles<R: Read>(connection: &mut Connection, reader: R) -> FlankResult<usize> {
    let transaction = connection.transaction()?;
    let mut count = 0;
    for row in tsv_reader(reader).deserialize::<AlleleRow>() {
        let row = row?;
        let allele = AlleleObservation {
            allele: row.allele,
            freq: row.freq,
        };
        insert_allele(&transaction, &row.snp_id, &allele)?;
        count += 1;
    }
    transaction.commit()?;
    Ok(count)
}

/// Build a complete store in `output` from the three TSV dumps
///
/// An existing `output` is only replaced when `force` is set.
pub fn build_database<P: AsRef<Path>>(
    chromosomes: P,
    locations: P,
    alleles: P,
    output: P,
    force: bool,
) -> FlankResult<LoadStats> {
    validate_file_readable(&chromosomes)?;
    validate_file_readable(&locations)?;
    validate_file_readable(&alleles)?;

    check_output_writable(&output, force)?;
    if output.as_ref().exists() {
        log::warn!("Replacing existing database {:?}", output.as_ref());
        std::fs::remove_file(&output)?;
    }
    ensure_parent_dirs(&output)?;

    let mut connection = Connection::open(&output)?;
    create_schema(&connection)?;

    let stats = LoadStats {
        chromosomes: load_chromosomes(&mut connection, open_text_reader(&chromosomes)?)?,
        locations: load_locations(&mut connection, open_text_reader(&locations)?)?,
        alleles: load_alleles(&mut connection, open_text_reader(&alleles)?)?,
    };
    log::info!(
        "Loaded {} chromosomes, {} locations, {} alleles",
        stats.chromosomes,
        stats.locations,
        stats.alleles
    );

    create_indexes(&connection)?;
    Ok(stats)
}
