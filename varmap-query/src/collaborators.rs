//! Seams to the persistence layer that owns proteins and mutations.
use std::collections::HashMap;

use anyhow::Result;

use varmap_core::models::{Mutation, Protein};

pub trait ProteinRepository {
    ///
    /// Fetch proteins by id. Ids without a protein are left out of the result.
    ///
    fn proteins_by_ids(&self, ids: &[u32]) -> Result<Vec<Protein>>;
}

pub trait MutationRegistry {
    ///
    /// Get the mutation identity for a substitution, creating it when it does
    /// not exist yet.
    ///
    /// # Returns
    /// The mutation and whether it was created by this call.
    fn get_or_create(&self, protein: &Protein, position: u32, alt: &str) -> Result<(Mutation, bool)>;
}

impl ProteinRepository for HashMap<u32, Protein> {
    fn proteins_by_ids(&self, ids: &[u32]) -> Result<Vec<Protein>> {
        Ok(ids.iter().filter_map(|id| self.get(id)).cloned().collect())
    }
}
