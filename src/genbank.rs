//! GenBank-style flat-file rendering of annotated flank records

use crate::{assemble::AssembledFeature, pipeline::AnnotatedRecord, FlankConfig};
use chrono::NaiveDate;

/// Bases per line of the ORIGIN block
pub const LINE_WIDTH: usize = 60;
/// Bases per space-separated group of the ORIGIN block
pub const GROUP_WIDTH: usize = 10;

const QUALIFIER_INDENT: usize = 21;

/// `LOCUS` line: right-justified chromosome, sequence length and date
pub fn locus_line(chrom: &str, length: usize, qualifier: &str, date: NaiveDate) -> String {
    format!(
        "LOCUS  {:>24} {} {:>9} bp    DNA     linear   UNA {}\n",
        chrom,
        qualifier,
        length,
        date.format("%d-%b-%Y")
    )
}

/// `DEFINITION` line naming the target and the absolute range of the sequence
pub fn definition_line(record: &AnnotatedRecord) -> String {
    format!(
        "DEFINITION           {} {}:{}..{}\n",
        record.snp_id,
        record.window.chrom,
        record.range_begin(),
        record.range_end()
    )
}

fn feature_key(strict: bool) -> &'static str {
    if strict {
        "variation"
    } else {
        "Polymorphism"
    }
}

fn feature_location(feature: &AssembledFeature) -> String {
    let (first, last) = feature.bounds;
    format!("{}..{}", first, last)
}

fn qualifier(name: &str, value: &str) -> String {
    format!("{}/{}=\"{}\"\n", " ".repeat(QUALIFIER_INDENT), name, value)
}

/// Feature table entry with its qualifiers
pub fn feature_entry(feature: &AssembledFeature, config: &FlankConfig) -> String {
    let mut entry = format!(
        "    {:<17}{}\n",
        feature_key(config.strict),
        feature_location(feature)
    );
    if feature.is_target {
        entry.push_str(&qualifier(&config.target_qualifier, &feature.snp_id));
    }
    entry.push_str(&qualifier("label", &feature.snp_id));
    entry.push_str(&qualifier("frequency", &feature.allele_tokens.join("/")));
    entry
}

/// `ORIGIN` block: numbered lines of 60 bases in groups of 10, closed by `//`
pub fn origin_block(sequence: &str) -> String {
    let mut block = String::from("ORIGIN\n");
    let mut offset = 0;
    while offset < sequence.len() {
        let line_end = (offset + LINE_WIDTH).min(sequence.len());
        block.push_str(&format!("{:>9}", offset + 1));

        let mut group = offset;
        while group < line_end {
            let group_end = (group + GROUP_WIDTH).min(line_end);
            block.push(' ');
            block.push_str(&sequence[group..group_end]);
            group = group_end;
        }
        block.push('\n');
        offset = line_end;
    }
    block.push_str("//\n");
    block
}

/// Complete flat-file record for one target
pub fn render_record(record: &AnnotatedRecord, config: &FlankConfig, date: NaiveDate) -> String {
    let mut text = locus_line(
        &record.window.chrom,
        record.sequence_len(),
        &config.target_qualifier,
        date,
    );
    text.push_str(&definition_line(record));
    text.push_str("FEATURES             Location/Qualifiers\n");
    for feature in &record.assembly.features {
        text.push_str(&feature_entry(feature, config));
    }
    text.push_str(&origin_block(&record.assembly.marked_sequence));
    text
}

/// Line of the shared summary file: id, tab, annotated flank sequence
pub fn summary_line(record: &AnnotatedRecord) -> String {
    format!("{}\t{}\n", record.snp_id, record.assembly.flanked_sequence)
}
