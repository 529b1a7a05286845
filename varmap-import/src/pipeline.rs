use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use varmap_core::codec::{
    SequenceMismatch, codon_position, decode_mutation, determine_strand, is_sequence_broken,
    strip_notation_prefix,
};
use varmap_core::consts::{CDNA_CHANGE_PREFIX, EXON_PREFIX, PROTEIN_CHANGE_PREFIX};
use varmap_core::models::{Chromosome, ConsequenceRecord, GeneAaKey, Protein, SnvKey};
use varmap_core::utils::get_dynamic_reader;
use varmap_index::{KeyValueIndex, SetElement, WriteSession};
use varmap_proximity::impact::DISTAL_FLANK;
use varmap_proximity::{ProximityMatcher, Window};

use crate::config::ImportConfig;
use crate::error::{ImportError, ImportResult};
use crate::files::SourceFileGlob;
use crate::report::{ImportReport, SkipReason};

/// Separates the consequence items of a source line.
const ITEM_DELIMITER: char = ',';

/// A consequence item that passed every check, ready for both indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    pub record: ConsequenceRecord,
    pub gene_key: GeneAaKey,
}

/// What became of one consequence item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Mapped(Mapping),
    /// The stated reference residue disagrees with the isoform sequence.
    BrokenSequence(SequenceMismatch),
    Skipped(SkipReason),
}

/// Write sessions on the two indexes an import fills.
struct Sinks<'g, 'p> {
    genomic: WriteSession<'g, String>,
    genes: WriteSession<'p, u32>,
}

///
/// Streams source files into the genomic and the gene-change index.
///
/// Each source line is `chrom  pos  ref  alt  consequences` (tab-separated),
/// where consequences is a comma-separated list of
/// `gene:refseq:exonN:c.<change>:p.<change>` items. Lines and items that fail
/// a check are counted and skipped; only store failures end the run.
pub struct MappingImporter<'a> {
    config: &'a ImportConfig,
    proteins: &'a HashMap<String, Protein>,
}

impl<'a> MappingImporter<'a> {
    ///
    /// # Arguments
    /// - config: settings of the run
    /// - proteins: isoforms by refseq accession; items of other isoforms are skipped
    pub fn new(config: &'a ImportConfig, proteins: &'a HashMap<String, Protein>) -> Self {
        MappingImporter { config, proteins }
    }

    ///
    /// Import every source file into the two indexes.
    ///
    /// The indexes are reset first unless the config says otherwise, then
    /// opened (if closed) and filled through one write session each. Both
    /// sessions are flushed after every file, and compacted at the end if the
    /// config asks for it.
    pub fn run(
        &self,
        genomic: &mut KeyValueIndex<String>,
        genes: &mut KeyValueIndex<u32>,
    ) -> ImportResult<ImportReport> {
        self.prepare(genomic, self.config.genomic_capacity_hint)?;
        self.prepare(genes, self.config.gene_capacity_hint)?;

        let files = SourceFileGlob::new(&self.config.mappings_dir, &self.config.file_pattern)?
            .resume_from(self.config.resume_from.as_deref());
        info!(
            "Importing mappings from {} files in {:?}",
            files.len(),
            self.config.mappings_dir
        );

        let mut sinks = Sinks {
            genomic: genomic.scoped_write_session()?,
            genes: genes.scoped_write_session()?,
        };
        let mut report = ImportReport::default();
        let progress = self.progress_bar();

        for path in files {
            progress.set_message(
                path.file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string(),
            );
            self.import_file(&path, &mut sinks, &mut report, &progress)?;

            sinks.genomic.flush_cache()?;
            sinks.genes.flush_cache()?;
            report.files += 1;
        }

        if self.config.compact_after_import {
            sinks.genomic.compact()?;
            sinks.genes.compact()?;
        }
        sinks.genomic.finish()?;
        sinks.genes.finish()?;
        progress.finish_and_clear();

        info!("{}", report);
        Ok(report)
    }

    fn prepare<V: SetElement>(&self, index: &mut KeyValueIndex<V>, capacity_hint: u64) -> ImportResult<()> {
        if self.config.reset_before_import {
            index.close();
            index.reset()?;
        }
        if !index.is_open() {
            index.open(capacity_hint)?;
        }
        index.set_max_buffered_values(self.config.max_buffered_values);
        Ok(())
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg} ({pos} lines)")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb
    }

    fn import_file(
        &self,
        path: &Path,
        sinks: &mut Sinks,
        report: &mut ImportReport,
        progress: &ProgressBar,
    ) -> ImportResult<()> {
        info!("Importing {:?}", path);
        let reader = get_dynamic_reader(path).map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        for bytes in reader.split(b'\n') {
            let bytes = bytes?;
            let Ok(line) = std::str::from_utf8(&bytes) else {
                report.lines += 1;
                debug!("Skipping line that is not UTF-8 in {:?}", path);
                report.skip(SkipReason::MalformedLine);
                progress.inc(1);
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            report.lines += 1;
            self.import_line(line, sinks, report)?;
            progress.inc(1);
        }
        Ok(())
    }

    fn import_line(&self, line: &str, sinks: &mut Sinks, report: &mut ImportReport) -> ImportResult<()> {
        let (snv, consequences) = match self.parse_line(line) {
            Ok(parsed) => parsed,
            Err(reason) => {
                debug!("Skipping line ({}): {}", reason, line);
                report.skip(reason);
                return Ok(());
            }
        };

        let dna_ref = snv.ref_base().to_string();
        let dna_alt = snv.alt_base().to_string();

        for item in consequences.split(ITEM_DELIMITER).filter(|item| !item.is_empty()) {
            report.items += 1;

            match self.map_item(&dna_ref, &dna_alt, item) {
                ItemOutcome::Mapped(mapping) => {
                    let encoded = match mapping.record.encode() {
                        Ok(encoded) => encoded,
                        Err(e) => {
                            debug!("Skipping item {} ({}): {}", item, e, line);
                            report.skip(SkipReason::MalformedItem);
                            continue;
                        }
                    };
                    sinks.genomic.add(snv.to_bytes(), encoded)?;
                    sinks.genes.add(&mapping.gene_key, mapping.record.protein_id)?;
                    report.mapped_items += 1;
                }
                ItemOutcome::BrokenSequence(mismatch) => {
                    debug!("Sequence mismatch: {}", mismatch);
                    report.add_broken_sequence(mismatch);
                }
                ItemOutcome::Skipped(reason) => {
                    debug!("Skipping item {} ({}): {}", item, reason, line);
                    report.skip(reason);
                }
            }
        }
        Ok(())
    }

    ///
    /// Split a source line into its SNV key and the raw consequence list.
    ///
    pub fn parse_line<'l>(&self, line: &'l str) -> Result<(SnvKey, &'l str), SkipReason> {
        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        let &[chrom, pos, dna_ref, dna_alt, consequences] = fields.as_slice() else {
            return Err(SkipReason::MalformedLine);
        };

        let chrom = Chromosome::from_prefixed(chrom, &self.config.chromosome_prefix)
            .map_err(|_| SkipReason::UnknownChromosome)?;
        let pos: u32 = pos.trim().parse().map_err(|_| SkipReason::MalformedLine)?;

        let snv = SnvKey::new(
            chrom,
            pos,
            &dna_ref.trim().to_ascii_uppercase(),
            &dna_alt.trim().to_ascii_uppercase(),
        )
        .map_err(|_| SkipReason::InvalidAlleles)?;

        Ok((snv, consequences))
    }

    ///
    /// Run the checks on one `gene:refseq:exonN:c.<change>:p.<change>` item.
    ///
    /// # Arguments
    /// - dna_ref, dna_alt: genomic alleles of the line
    /// - item: the consequence item
    pub fn map_item(&self, dna_ref: &str, dna_alt: &str, item: &str) -> ItemOutcome {
        let parts: Vec<&str> = item.split(':').collect();
        let &[_gene, refseq, exon, cdna_change, protein_change] = parts.as_slice() else {
            return ItemOutcome::Skipped(SkipReason::MalformedItem);
        };

        let Some(exon) = exon.strip_prefix(EXON_PREFIX) else {
            return ItemOutcome::Skipped(SkipReason::MalformedItem);
        };

        if !refseq.starts_with(&self.config.refseq_prefix) {
            return ItemOutcome::Skipped(SkipReason::ForeignRefseq);
        }

        let cdna = strip_notation_prefix(cdna_change, CDNA_CHANGE_PREFIX).and_then(decode_mutation);
        let aa = strip_notation_prefix(protein_change, PROTEIN_CHANGE_PREFIX).and_then(decode_mutation);
        let (Ok(cdna), Ok(aa)) = (cdna, aa) else {
            return ItemOutcome::Skipped(SkipReason::InvalidChange);
        };

        let strand = match determine_strand(dna_ref, &cdna.reference, dna_alt, &cdna.alternative) {
            Ok(strand) => strand,
            Err(e) => {
                warn!("{} in {}", e, item);
                return ItemOutcome::Skipped(SkipReason::StrandMismatch);
            }
        };

        let expected_aa_pos = codon_position(cdna.position);
        if aa.position != expected_aa_pos {
            warn!(
                "Protein position {} does not match cDNA position {} (codon {}) in {}",
                aa.position, cdna.position, expected_aa_pos, item
            );
            return ItemOutcome::Skipped(SkipReason::CodonMismatch);
        }

        let Some(protein) = self.proteins.get(refseq) else {
            return ItemOutcome::Skipped(SkipReason::UnknownProtein);
        };

        if let Some(mismatch) = is_sequence_broken(protein, aa.position, &aa.reference, &aa.alternative) {
            return ItemOutcome::BrokenSequence(mismatch);
        }

        let is_ptm_related = ProximityMatcher::for_protein(protein)
            .any_within(aa.position, Window::symmetric(u32::from(DISTAL_FLANK)));

        ItemOutcome::Mapped(Mapping {
            gene_key: GeneAaKey::new(&protein.gene_name, &aa.reference, aa.position, &aa.alternative),
            record: ConsequenceRecord {
                strand,
                aa_ref: aa.reference,
                aa_alt: aa.alternative,
                cdna_pos: cdna.position,
                exon: exon.to_string(),
                protein_id: protein.id,
                is_ptm_related,
            },
        })
    }
}

/// Convenience wrapper around [MappingImporter::run].
pub fn import_mappings(
    config: &ImportConfig,
    proteins: &HashMap<String, Protein>,
    genomic: &mut KeyValueIndex<String>,
    genes: &mut KeyValueIndex<u32>,
) -> ImportResult<ImportReport> {
    MappingImporter::new(config, proteins).run(genomic, genes)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use varmap_core::models::Strand;

    #[fixture]
    fn proteins() -> HashMap<String, Protein> {
        let sequence = format!("{}F{}", "A".repeat(560), "A".repeat(50));
        let protein = Protein::new(1, "NM_001171933", "CDH23", &sequence).with_sites(vec![565]);
        HashMap::from([(protein.refseq.clone(), protein)])
    }

    #[fixture]
    fn config() -> ImportConfig {
        ImportConfig::default()
    }

    #[rstest]
    fn test_map_item(config: ImportConfig, proteins: HashMap<String, Protein>) {
        let importer = MappingImporter::new(&config, &proteins);
        let outcome = importer.map_item("T", "C", "CDH23:NM_001171933:exon12:c.T1681C:p.F561L");

        let ItemOutcome::Mapped(mapping) = outcome else {
            panic!("item was not mapped: {:?}", outcome);
        };
        assert_eq!(mapping.record.strand, Strand::Forward);
        assert_eq!(mapping.record.encode().unwrap(), "+,F,L,1681,12,1,1");
        assert_eq!(mapping.gene_key.as_str(), "CDH23 F561L");
    }

    #[rstest]
    #[case("CDH23:NM_001171933:exon12:c.T1681C", SkipReason::MalformedItem)]
    #[case("CDH23:NM_001171933:12:c.T1681C:p.F561L", SkipReason::MalformedItem)]
    #[case("CDH23:XM_001171933:exon12:c.T1681C:p.F561L", SkipReason::ForeignRefseq)]
    #[case("CDH23:NM_001171933:exon12:T1681C:p.F561L", SkipReason::InvalidChange)]
    #[case("CDH23:NM_001171933:exon12:c.T1681C:p.F", SkipReason::InvalidChange)]
    #[case("CDH23:NM_001171933:exon12:c.G1681A:p.F561L", SkipReason::StrandMismatch)]
    #[case("CDH23:NM_001171933:exon12:c.T1681C:p.F560L", SkipReason::CodonMismatch)]
    #[case("CDH23:NM_000001:exon12:c.T1681C:p.F561L", SkipReason::UnknownProtein)]
    fn test_map_item_skips(
        config: ImportConfig,
        proteins: HashMap<String, Protein>,
        #[case] item: &str,
        #[case] reason: SkipReason,
    ) {
        let importer = MappingImporter::new(&config, &proteins);
        assert_eq!(importer.map_item("T", "C", item), ItemOutcome::Skipped(reason));
    }

    #[rstest]
    fn test_map_item_broken_sequence(config: ImportConfig, proteins: HashMap<String, Protein>) {
        let importer = MappingImporter::new(&config, &proteins);
        // codon 562 holds an A, not an F
        let outcome = importer.map_item("T", "C", "CDH23:NM_001171933:exon12:c.T1684C:p.F562L");

        let ItemOutcome::BrokenSequence(mismatch) = outcome else {
            panic!("expected a sequence mismatch: {:?}", outcome);
        };
        assert_eq!(mismatch.aa_pos, 562);
        assert_eq!(mismatch.actual.as_deref(), Some("A"));
    }

    #[rstest]
    fn test_parse_line(config: ImportConfig, proteins: HashMap<String, Protein>) {
        let importer = MappingImporter::new(&config, &proteins);

        let (snv, consequences) = importer
            .parse_line("chr10\t73000000\tt\tc\tCDH23:NM_001171933:exon12:c.T1681C:p.F561L\n")
            .unwrap();
        assert_eq!(snv, SnvKey::parse("10", "73000000", "T", "C").unwrap());
        assert_eq!(consequences, "CDH23:NM_001171933:exon12:c.T1681C:p.F561L");
    }

    #[rstest]
    #[case("chr10\t73000000\tT\tC", SkipReason::MalformedLine)]
    #[case("chr10\tpos\tT\tC\tx", SkipReason::MalformedLine)]
    #[case("10\t73000000\tT\tC\tx", SkipReason::UnknownChromosome)]
    #[case("chrUn\t73000000\tT\tC\tx", SkipReason::UnknownChromosome)]
    #[case("chr10\t73000000\tTA\tC\tx", SkipReason::InvalidAlleles)]
    #[case("chr10\t73000000\tT\tT\tx", SkipReason::InvalidAlleles)]
    fn test_parse_line_rejects(
        config: ImportConfig,
        proteins: HashMap<String, Protein>,
        #[case] line: &str,
        #[case] reason: SkipReason,
    ) {
        let importer = MappingImporter::new(&config, &proteins);
        assert_eq!(importer.parse_line(line), Err(reason));
    }
}
