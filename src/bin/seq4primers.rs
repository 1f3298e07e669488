//! CLI binary for flank records - annotated sequences around target SNPs for primer design

use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;
use seq4primers_rs::{
    pipeline::{process_targets, validate_config, write_outputs, BatchOutputs},
    utils::{check_output_writable, get_num_cpus, validate_file_readable, Timer},
    FlankConfig, FlankError, FlankResult,
};

#[derive(Parser)]
#[command(name = "seq4primers")]
#[command(about = "Flanking sequences with known SNPs annotated, for primer design")]
#[command(long_about = "
For every target SNP this tool fetches the reference sequence around it from
the SNP database, finds all known SNPs inside that window and checks each of
them against the sequence.

Two kinds of output are written:
- <id>.gb: a GenBank-style record with one feature per SNP in the window and
  the window sequence, called bases in upper case
- a summary file with one line per target: the id and the window sequence
  with every SNP replaced by an inline code, [id:A/0.9,G/0.1] for the target
  and (id:...) for its neighbours

SNPs without any allele frequency are left out with a warning. A SNP whose
reference does not match the sequence fails its target only; the other
targets are still written.

Build the database with make_db.
")]
struct Args {
    /// Target SNP id (repeat or separate by spaces for several)
    #[arg(short, long = "snp", value_name = "ID", required = true, num_args = 1..)]
    snps: Vec<String>,

    /// Number of bases on each side of the target
    #[arg(short, long, default_value_t = 500)]
    flank_size: usize,

    /// Path to the SNP database
    #[arg(long, value_name = "FILE", default_value = "db/data.sqlite")]
    db: PathBuf,

    /// Use the standard feature key `variation` instead of `Polymorphism`
    #[arg(long)]
    strict: bool,

    /// Directory for the .gb records
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Summary file with one annotated sequence per target
    #[arg(long, value_name = "FILE", default_value = "seq4primers.txt")]
    summary: PathBuf,

    /// Optional TSV report with the status of every target
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Qualifier marking the target feature
    #[arg(long, default_value = "MiHA")]
    target_qualifier: String,

    /// Number of processes to use for parallel processing
    #[arg(long, default_value_t = get_num_cpus())]
    num_processes: usize,

    /// Force overwrite of the summary and report files if they exist
    #[arg(long)]
    force: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn config(&self) -> FlankConfig {
        FlankConfig {
            flank_size: self.flank_size,
            strict: self.strict,
            target_qualifier: self.target_qualifier.clone(),
        }
    }

    fn outputs(&self) -> BatchOutputs {
        BatchOutputs {
            output_dir: self.output_dir.clone(),
            summary: self.summary.clone(),
            report: self.report.clone(),
        }
    }
}

/// Returns the number of targets that failed
fn run() -> FlankResult<usize> {
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

    log::info!("Starting seq4primers");
    log::info!("Database: {:?}", args.db);
    log::info!("Targets: {}", args.snps.join(", "));
    log::info!("Number of processes: {}", args.num_processes);

    validate_file_readable(&args.db)?;
    check_output_writable(&args.summary, args.force)?;
    if let Some(report) = &args.report {
        check_output_writable(report, args.force)?;
    }

    let config = args.config();
    validate_config(&config)?;
    log::info!(
        "Configuration: flank={}, strict={}, qualifier={}",
        config.flank_size,
        config.strict,
        config.target_qualifier
    );

    let _timer = Timer::new("Building flank records");
    let outcomes = process_targets(&args.db, &args.snps, &config, args.num_processes)?;

    let _timer = Timer::new("Writing records");
    let today = chrono::Local::now().date_naive();
    let batch = write_outputs(&outcomes, &args.outputs(), &config, today)?;

    log::info!("Records written: {}", batch.written);
    for (snp_id, message) in &batch.failed {
        eprintln!("{}: {}", snp_id, message);
    }
    log::info!("Summary written to: {:?}", args.summary);

    Ok(batch.failed.len())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: FlankError) -> ! {
    match error {
        FlankError::FileNotFound(path) => {
            eprintln!("Error: File not found: {}", path);
            eprintln!("Build the SNP database with make_db or pass its path with --db.");
        }
        FlankError::OutputExists(path) => {
            eprintln!("Error: Output file {} already exists", path);
            eprintln!("Use --force to overwrite it.");
        }
        FlankError::InvalidConfig(msg) => {
            eprintln!("Error: Invalid configuration: {}", msg);
            eprintln!("Please check --flank-size and --target-qualifier.");
        }
        FlankError::Sqlite(ref e) => {
            eprintln!("Error: Database error: {}", e);
            eprintln!("Please check that the database was built with make_db.");
        }
        FlankError::Io(ref e) => {
            eprintln!("Error: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
        FlankError::Csv(ref e) => {
            eprintln!("Error: Report writing error: {}", e);
            eprintln!("Please check the report path.");
        }
        other => {
            eprintln!("Error: {}", other);
        }
    }
    std::process::exit(1);
}

fn main() {
    match run() {
        Ok(0) => {}
        Ok(failed) => {
            eprintln!("{} target(s) failed", failed);
            std::process::exit(1);
        }
        Err(e) => handle_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["seq4primers", "-s", "rs1"]).unwrap();
        assert_eq!(args.snps, vec!["rs1"]);
        assert_eq!(args.db, PathBuf::from("db/data.sqlite"));
        assert_eq!(args.summary, PathBuf::from("seq4primers.txt"));
        assert!(args.report.is_none());

        let config = args.config();
        assert_eq!(config.flank_size, 500);
        assert!(!config.strict);
        assert_eq!(config.target_qualifier, "MiHA");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_multiple_targets_and_options() {
        let args = Args::try_parse_from([
            "seq4primers",
            "-s",
            "rs1",
            "rs2",
            "--snp",
            "rs3",
            "-f",
            "50",
            "--strict",
            "--target-qualifier",
            "target",
            "--report",
            "report.tsv",
        ])
        .unwrap();
        assert_eq!(args.snps, vec!["rs1", "rs2", "rs3"]);
        assert_eq!(args.config().flank_size, 50);
        assert!(args.config().strict);
        assert_eq!(args.outputs().report, Some(PathBuf::from("report.tsv")));
    }

    #[test]
    fn test_snp_is_required() {
        assert!(Args::try_parse_from(["seq4primers"]).is_err());
    }

    #[test]
    fn test_invalid_qualifier_rejected() {
        let args = Args::try_parse_from(["seq4primers", "-s", "rs1", "--target-qualifier", "my target"]).unwrap();
        assert!(matches!(validate_config(&args.config()), Err(FlankError::InvalidConfig(_))));
    }
}
