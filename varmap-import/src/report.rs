use std::collections::BTreeMap;
use std::fmt::{self, Display};

use varmap_core::codec::SequenceMismatch;

/// Why a line or a consequence item was left out of the indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// Wrong number of columns or a non-numeric position.
    MalformedLine,
    UnknownChromosome,
    /// Genomic alleles are not single, distinct A/C/G/T bases.
    InvalidAlleles,
    MalformedItem,
    ForeignRefseq,
    /// cDNA or protein change that does not decode.
    InvalidChange,
    StrandMismatch,
    CodonMismatch,
    UnknownProtein,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MalformedLine => "malformed line",
            SkipReason::UnknownChromosome => "unknown chromosome",
            SkipReason::InvalidAlleles => "invalid alleles",
            SkipReason::MalformedItem => "malformed item",
            SkipReason::ForeignRefseq => "foreign refseq",
            SkipReason::InvalidChange => "invalid change",
            SkipReason::StrandMismatch => "strand mismatch",
            SkipReason::CodonMismatch => "codon mismatch",
            SkipReason::UnknownProtein => "unknown protein",
        }
    }

    /// Does the reason discard the whole line rather than one item?
    pub fn is_line_level(&self) -> bool {
        matches!(
            self,
            SkipReason::MalformedLine | SkipReason::UnknownChromosome | SkipReason::InvalidAlleles
        )
    }
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

///
/// Outcome of an import run.
///
/// Sequence mismatches are the diagnostics the caller usually acts on; they
/// are grouped by refseq accession.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportReport {
    pub files: usize,
    pub lines: u64,
    pub items: u64,
    /// Items that made it into both indexes.
    pub mapped_items: u64,
    pub skipped: BTreeMap<SkipReason, u64>,
    pub broken_sequences: BTreeMap<String, Vec<SequenceMismatch>>,
}

impl ImportReport {
    pub fn skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_default() += 1;
    }

    pub fn skipped(&self, reason: SkipReason) -> u64 {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn add_broken_sequence(&mut self, mismatch: SequenceMismatch) {
        self.broken_sequences
            .entry(mismatch.refseq.clone())
            .or_default()
            .push(mismatch);
    }

    pub fn broken_sequence_count(&self) -> usize {
        self.broken_sequences.values().map(Vec::len).sum()
    }
}

impl Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Imported {} mappings from {} lines in {} files ({} items seen)",
            self.mapped_items, self.lines, self.files, self.items
        )?;
        for (reason, count) in &self.skipped {
            let scope = if reason.is_line_level() { "lines" } else { "items" };
            writeln!(f, "  skipped {} ({}): {}", scope, reason, count)?;
        }
        write!(
            f,
            "  broken sequences: {} in {} isoforms",
            self.broken_sequence_count(),
            self.broken_sequences.len()
        )
    }
}
