use std::collections::HashMap;

use varmap_core::models::{ConsequenceRecord, Mutation, Protein};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Genomic,
    Proteomic,
}

///
/// One protein-level hit of a query.
///
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub protein: Protein,
    pub mutation: Mutation,
    /// The mutation identity was created by this query.
    pub is_mutation_novel: bool,
    pub kind: QueryKind,
    pub aa_ref: String,
    pub aa_pos: u32,
    pub aa_alt: String,
    /// Stored consequence, for genomic queries.
    pub consequence: Option<ConsequenceRecord>,
}

/// Hits of one distinct query line and how often it was asked.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults {
    pub query: String,
    pub count: u32,
    pub results: Vec<SearchResult>,
}

///
/// Results of a multi-line text or VCF query, in the order queries first
/// appeared.
///
#[derive(Debug, Default, Clone)]
pub struct SearchReport {
    pub queries: Vec<QueryResults>,
    pub badly_formatted: Vec<String>,
    positions: HashMap<String, usize>,
}

impl SearchReport {
    /// Count a repeat of a query seen before. Returns false for a new query.
    pub(crate) fn repeat(&mut self, query: &str) -> bool {
        match self.positions.get(query) {
            Some(idx) => {
                self.queries[*idx].count += 1;
                true
            }
            None => false,
        }
    }

    pub(crate) fn insert(&mut self, query: String, results: Vec<SearchResult>) {
        self.positions.insert(query.clone(), self.queries.len());
        self.queries.push(QueryResults {
            query,
            count: 1,
            results,
        });
    }

    pub fn get(&self, query: &str) -> Option<&QueryResults> {
        self.positions.get(query).map(|idx| &self.queries[*idx])
    }

    /// Every hit of every query.
    pub fn results(&self) -> impl Iterator<Item = &SearchResult> {
        self.queries.iter().flat_map(|q| q.results.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty() && self.badly_formatted.is_empty()
    }
}
