use std::fmt::{self, Display};
use std::str::FromStr;

use crate::consts::HUMAN_CHROMOSOMES;
use crate::errors::CodecError;

///
/// One of the human chromosomes variants can be keyed under.
///
/// Internally this is the position of the name in [HUMAN_CHROMOSOMES], which
/// doubles as the chromosome byte of the canonical SNV key.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chromosome(u8);

impl Chromosome {
    ///
    /// Resolve a chromosome from its one-byte code.
    ///
    pub fn from_code(code: u8) -> Option<Self> {
        ((code as usize) < HUMAN_CHROMOSOMES.len()).then_some(Chromosome(code))
    }

    pub fn code(&self) -> u8 {
        self.0
    }

    pub fn name(&self) -> &'static str {
        HUMAN_CHROMOSOMES[self.0 as usize]
    }

    ///
    /// Parse a chromosome name the way annotation files spell it, e.g. `chr20`.
    ///
    /// # Arguments
    /// - raw: the name as read from the file
    /// - prefix: the prefix every name must carry (usually `chr`)
    pub fn from_prefixed(raw: &str, prefix: &str) -> Result<Self, CodecError> {
        let name = raw.strip_prefix(prefix).ok_or_else(|| {
            CodecError::Format(format!(
                "Chromosome '{}' does not start with '{}'",
                raw, prefix
            ))
        })?;
        name.parse()
    }
}

impl FromStr for Chromosome {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HUMAN_CHROMOSOMES
            .iter()
            .position(|name| *name == s)
            .map(|idx| Chromosome(idx as u8))
            .ok_or_else(|| CodecError::Format(format!("Unknown human chromosome: '{}'", s)))
    }
}

impl Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
