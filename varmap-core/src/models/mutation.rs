use std::fmt::{self, Display};

///
/// A proteomic mutation identity: a substitution at one position of one
/// isoform. Instances are materialized by the persistence layer, which owns
/// the `id`.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mutation {
    pub id: u64,
    pub protein_id: u32,
    pub position: u32,
    pub alt: String,
}

impl Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Mutation in protein {}, at {} aa, substitution to: {}>",
            self.protein_id, self.position, self.alt
        )
    }
}
