use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;

use log::{debug, warn};

use varmap_core::codec::decode_mutation;
use varmap_core::consts::{CHROMOSOME_PREFIX, PROTEIN_CHANGE_PREFIX};
use varmap_core::models::{ConsequenceRecord, GeneAaKey, Protein, SnvKey};
use varmap_index::KeyValueIndex;

use crate::collaborators::{MutationRegistry, ProteinRepository};
use crate::error::{QueryError, QueryResult};
use crate::report::{QueryKind, SearchReport, SearchResult};

/// Separates the alternative alleles of a VCF record.
const ALT_DELIMITER: char = ',';

///
/// Answers "what does this change mean for the proteome" from the two
/// indexes.
///
/// Absent keys and queries that cannot be parsed give empty results; only
/// store and collaborator failures are errors.
pub struct QueryService<'a, P, M>
where
    P: ProteinRepository,
    M: MutationRegistry,
{
    genomic: &'a KeyValueIndex<String>,
    genes: &'a KeyValueIndex<u32>,
    proteins: &'a P,
    mutations: &'a M,
}

impl<'a, P, M> QueryService<'a, P, M>
where
    P: ProteinRepository,
    M: MutationRegistry,
{
    pub fn new(
        genomic: &'a KeyValueIndex<String>,
        genes: &'a KeyValueIndex<u32>,
        proteins: &'a P,
        mutations: &'a M,
    ) -> Self {
        QueryService {
            genomic,
            genes,
            proteins,
            mutations,
        }
    }

    fn proteins_by_id(&self, ids: &[u32]) -> QueryResult<HashMap<u32, Protein>> {
        let proteins = self
            .proteins
            .proteins_by_ids(ids)
            .map_err(QueryError::Collaborator)?;
        Ok(proteins.into_iter().map(|p| (p.id, p)).collect())
    }

    ///
    /// Look up a genomic SNV.
    ///
    /// # Arguments
    /// - chrom: chromosome name, with or without the `chr` prefix
    /// - pos: 1-based position
    /// - ref_base, alt_base: single bases
    pub fn search_genomic(
        &self,
        chrom: &str,
        pos: &str,
        ref_base: &str,
        alt_base: &str,
    ) -> QueryResult<Vec<SearchResult>> {
        let chrom = chrom.strip_prefix(CHROMOSOME_PREFIX).unwrap_or(chrom);
        let key = match SnvKey::parse(chrom, pos, ref_base, alt_base) {
            Ok(key) => key,
            Err(e) => {
                debug!("Not a genomic variant: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut stored: Vec<String> = self.genomic.lookup(key.to_bytes())?.into_iter().collect();
        stored.sort_unstable();

        // one record per (protein, position, alt)
        let mut records: BTreeMap<(u32, u32, String), ConsequenceRecord> = BTreeMap::new();
        for encoded in stored {
            match ConsequenceRecord::decode(&encoded) {
                Ok(record) => {
                    let identity = (record.protein_id, record.aa_pos(), record.aa_alt.clone());
                    records.entry(identity).or_insert(record);
                }
                Err(e) => warn!("Skipping stored record '{}' of {}: {}", encoded, key, e),
            }
        }

        let mut ids: Vec<u32> = records.keys().map(|(id, _, _)| *id).collect();
        ids.dedup();
        let proteins = self.proteins_by_id(&ids)?;

        let mut results = Vec::with_capacity(records.len());
        for ((protein_id, aa_pos, aa_alt), record) in records {
            let Some(protein) = proteins.get(&protein_id) else {
                warn!("Protein {} of {} is not known to the repository", protein_id, key);
                continue;
            };
            let (mutation, is_mutation_novel) = self
                .mutations
                .get_or_create(protein, aa_pos, &aa_alt)
                .map_err(QueryError::Collaborator)?;

            results.push(SearchResult {
                protein: protein.clone(),
                mutation,
                is_mutation_novel,
                kind: QueryKind::Genomic,
                aa_ref: record.aa_ref.clone(),
                aa_pos,
                aa_alt,
                consequence: Some(record),
            });
        }
        Ok(results)
    }

    ///
    /// Look up an amino-acid change of a gene, on every isoform it was mapped to.
    ///
    pub fn search_proteomic(
        &self,
        gene: &str,
        aa_ref: &str,
        aa_pos: u32,
        aa_alt: &str,
    ) -> QueryResult<Vec<SearchResult>> {
        let key = GeneAaKey::new(gene, aa_ref, aa_pos, aa_alt);

        let mut ids: Vec<u32> = self.genes.lookup(&key)?.into_iter().collect();
        ids.sort_unstable();
        let proteins = self.proteins_by_id(&ids)?;

        let aa_ref = aa_ref.to_ascii_uppercase();
        let aa_alt = aa_alt.to_ascii_uppercase();

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(protein) = proteins.get(&id) else {
                warn!("Protein {} of {} is not known to the repository", id, key);
                continue;
            };
            let (mutation, is_mutation_novel) = self
                .mutations
                .get_or_create(protein, aa_pos, &aa_alt)
                .map_err(QueryError::Collaborator)?;

            results.push(SearchResult {
                protein: protein.clone(),
                mutation,
                is_mutation_novel,
                kind: QueryKind::Proteomic,
                aa_ref: aa_ref.clone(),
                aa_pos,
                aa_alt: aa_alt.clone(),
                consequence: None,
            });
        }
        Ok(results)
    }

    ///
    /// [QueryService::search_proteomic] for a change written as `R123H` or `p.R123H`.
    ///
    pub fn search_proteomic_text(&self, gene: &str, change: &str) -> QueryResult<Vec<SearchResult>> {
        let change = change.strip_prefix(PROTEIN_CHANGE_PREFIX).unwrap_or(change);
        match decode_mutation(change) {
            Ok(change) => {
                self.search_proteomic(gene, &change.reference, change.position, &change.alternative)
            }
            Err(e) => {
                debug!("Not a protein change: {}", e);
                Ok(Vec::new())
            }
        }
    }

    fn search_genomic_alts(
        &self,
        report: &mut SearchReport,
        chrom: &str,
        pos: &str,
        ref_base: &str,
        alts: &str,
    ) -> QueryResult<()> {
        let chrom = chrom.strip_prefix(CHROMOSOME_PREFIX).unwrap_or(chrom);

        for alt in alts.split(ALT_DELIMITER).filter(|alt| !alt.is_empty()) {
            let query = format!("{}{} {} {} {}", CHROMOSOME_PREFIX, chrom, pos, ref_base, alt);
            if report.repeat(&query) {
                continue;
            }
            let results = self.search_genomic(chrom, pos, ref_base, alt)?;
            report.insert(query, results);
        }
        Ok(())
    }

    ///
    /// Run a free-text query with one variant per line.
    ///
    /// A line is either genomic, `chr20 14370 G A` (the alternative may list
    /// several alleles separated by commas), or proteomic, `TP53 R273H`.
    /// Other lines are collected as badly formatted.
    pub fn search_text(&self, text: &str) -> QueryResult<SearchReport> {
        let mut report = SearchReport::default();

        for line in text.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [] => continue,
                [chrom, pos, ref_base, alts] => {
                    self.search_genomic_alts(&mut report, chrom, pos, ref_base, alts)?
                }
                [gene, change] => {
                    let query = format!("{} {}", gene, change).to_ascii_uppercase();
                    if report.repeat(&query) {
                        continue;
                    }
                    let results = self.search_proteomic_text(gene, &change.to_ascii_uppercase())?;
                    report.insert(query, results);
                }
                _ => report.badly_formatted.push(line.trim().to_string()),
            }
        }
        Ok(report)
    }

    ///
    /// Run every record of a VCF file as a genomic query.
    ///
    /// Header lines are skipped; records with fewer than five columns are
    /// collected as badly formatted.
    pub fn search_vcf<R: BufRead>(&self, reader: R) -> QueryResult<SearchReport> {
        let mut report = SearchReport::default();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            let &[chrom, pos, _id, ref_base, alts, ..] = fields.as_slice() else {
                report.badly_formatted.push(line.to_string());
                continue;
            };
            self.search_genomic_alts(&mut report, chrom, pos, ref_base, alts)?;
        }
        Ok(report)
    }
}
