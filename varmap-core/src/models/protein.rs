use std::fmt::{self, Display};

///
/// One protein isoform, as supplied by the persistence layer.
///
/// Only the sequence and the PTM site positions are read by varmap. Site
/// positions are 1-based and must be sorted strictly ascending: the proximity
/// search relies on it and never re-sorts. [Protein::with_sites] establishes
/// the order for callers that cannot guarantee it.
///
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Protein {
    pub id: u32,
    pub refseq: String,
    pub gene_name: String,
    pub sequence: String,
    pub sites: Vec<u32>,
}

impl Protein {
    pub fn new(id: u32, refseq: &str, gene_name: &str, sequence: &str) -> Self {
        Protein {
            id,
            refseq: refseq.to_string(),
            gene_name: gene_name.to_string(),
            sequence: sequence.to_string(),
            sites: Vec::new(),
        }
    }

    ///
    /// Attach site positions, sorting and de-duplicating them.
    ///
    pub fn with_sites(mut self, mut sites: Vec<u32>) -> Self {
        sites.sort_unstable();
        sites.dedup();
        self.sites = sites;
        self
    }

    /// Length of the amino-acid sequence.
    pub fn length(&self) -> usize {
        self.sequence.len()
    }

    ///
    /// Residue at a 1-based position, `None` when outside of the sequence.
    ///
    pub fn residue_at(&self, pos: u32) -> Option<char> {
        let idx = (pos as usize).checked_sub(1)?;
        self.sequence.as_bytes().get(idx).map(|b| *b as char)
    }

    pub fn has_sorted_sites(&self) -> bool {
        self.sites.windows(2).all(|w| w[0] < w[1])
    }
}

impl Display for Protein {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Protein {} with seq of {} aa from {} gene>",
            self.refseq,
            self.length(),
            self.gene_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_residue_at_is_one_based() {
        let protein = Protein::new(1, "NM_0001", "TP53", "MEEP");
        assert_eq!(protein.residue_at(1), Some('M'));
        assert_eq!(protein.residue_at(4), Some('P'));
        assert_eq!(protein.residue_at(5), None);
        assert_eq!(protein.residue_at(0), None);
    }

    #[rstest]
    fn test_with_sites_sorts_and_dedups() {
        let protein = Protein::new(1, "NM_0001", "TP53", "MEEP").with_sites(vec![50, 10, 50, 3]);
        assert_eq!(protein.sites, vec![3, 10, 50]);
        assert!(protein.has_sorted_sites());
    }
}
