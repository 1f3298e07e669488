fn main() {
    println!("seq4primers-rs - SNP-annotated flanking sequences for primer design");
    println!();
    println!("Tools:");
    println!("  seq4primers - Flank records: SNP ids + SNP database -> .gb records and summary");
    println!("  make_db     - Build the SNP database from tab-separated dumps");
    println!();
    println!("For help with each tool:");
    println!("  cargo run -- --help                  # Flank records");
    println!("  cargo run --bin make_db -- --help    # Database building");
    println!();
    println!("Quick start example:");
    println!("  cargo run --bin make_db -- -s chroms.tsv.gz -l snp_locations.tsv.gz -a snp_alleles.tsv.gz -o db/data.sqlite");
    println!("  cargo run -- -s rs1 rs2 --flank-size 200 --output-dir records");
}
