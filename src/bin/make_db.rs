//! CLI binary building the SNP database from tab-separated dumps

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;
use seq4primers_rs::{ingest::build_database, utils::Timer};

#[derive(Parser)]
#[command(name = "make_db")]
#[command(about = "Build the SQLite SNP database used by seq4primers")]
#[command(long_about = "
Loads three header-less, tab-separated files into a new SQLite database:
- chromosomes: chrom, seq
- SNP locations: snp_id, chrom, pos_from, len, reference, is_common
- SNP alleles: snp_id, allele, freq

Files may be gzip compressed. \\N marks a NULL value, as in MySQL dumps.
Indexes on the SNP id and on the chromosome/position are created after loading.
")]
struct Args {
    /// Chromosome sequences
    #[arg(short = 's', long, value_name = "FILE")]
    chromosomes: PathBuf,

    /// SNP locations
    #[arg(short, long, value_name = "FILE")]
    locations: PathBuf,

    /// SNP alleles and frequencies
    #[arg(short, long, value_name = "FILE")]
    alleles: PathBuf,

    /// Path to the output database
    #[arg(short, long, value_name = "FILE", default_value = "data.sqlite")]
    output: PathBuf,

    /// Force overwrite of the output database if it exists
    #[arg(long)]
    force: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    log::info!("Chromosomes: {:?}", args.chromosomes);
    log::info!("Locations: {:?}", args.locations);
    log::info!("Alleles: {:?}", args.alleles);
    log::info!("Output: {:?}", args.output);

    let _timer = Timer::new("Building SNP database");
    let stats = build_database(
        args.chromosomes.as_path(),
        args.locations.as_path(),
        args.alleles.as_path(),
        args.output.as_path(),
        args.force,
    )
    .with_context(|| format!("Failed to build database {:?}", args.output))?;

    log::info!(
        "Database {:?} ready: {} chromosomes, {} locations, {} alleles",
        args.output,
        stats.chromosomes,
        stats.locations,
        stats.alleles
    );

    Ok(())
}
