//! Store fixtures shared by unit tests

use crate::ingest::{create_indexes, create_schema, insert_allele, insert_chromosome, insert_location};
use crate::store::SqliteStore;
use crate::{AlleleObservation, VariantLocation};
use rusqlite::Connection;
use std::path::Path;

pub(crate) type AlleleFixture<'a> = (&'a str, &'a str, Option<f64>);

fn populate(
    connection: &Connection,
    chromosomes: &[(&str, &str)],
    locations: &[VariantLocation],
    alleles: &[AlleleFixture],
) {
    create_schema(connection).unwrap();
    for (chrom, seq) in chromosomes {
        insert_chromosome(connection, chrom, seq).unwrap();
    }
    for location in locations {
        insert_location(connection, location).unwrap();
    }
    for (snp_id, allele, freq) in alleles {
        insert_allele(connection, snp_id, &AlleleObservation::new(allele, *freq)).unwrap();
    }
    create_indexes(connection).unwrap();
}

pub(crate) fn memory_store(
    chromosomes: &[(&str, &str)],
    locations: &[VariantLocation],
    alleles: &[AlleleFixture],
) -> SqliteStore {
    let connection = Connection::open_in_memory().unwrap();
    populate(&connection, chromosomes, locations, alleles);
    SqliteStore::from_connection(connection)
}

pub(crate) fn write_database(
    path: &Path,
    chromosomes: &[(&str, &str)],
    locations: &[VariantLocation],
    alleles: &[AlleleFixture],
) {
    let connection = Connection::open(path).unwrap();
    populate(&connection, chromosomes, locations, alleles);
}
