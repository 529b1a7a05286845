/// Prefix carried by chromosome names in annotation files (`chr20`).
pub const CHROMOSOME_PREFIX: &str = "chr";

/// Accession prefix of curated mRNA transcripts.
pub const REFSEQ_PREFIX: &str = "NM_";

pub const EXON_PREFIX: &str = "exon";
pub const CDNA_CHANGE_PREFIX: &str = "c.";
pub const PROTEIN_CHANGE_PREFIX: &str = "p.";

/// Separator of the fields of an encoded consequence record.
pub const RECORD_DELIMITER: char = ',';

/// Every chromosome a human SNV may be keyed under. The index of a name in this
/// list is its one-byte code in the canonical SNV key, so the order is part of
/// the on-disk format.
pub const HUMAN_CHROMOSOMES: [&str; 25] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "MT",
];
