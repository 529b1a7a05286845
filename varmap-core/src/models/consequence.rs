use std::fmt::{self, Display};

use crate::codec::codon_position;
use crate::consts::RECORD_DELIMITER;
use crate::errors::CodecError;

/// Coding orientation of a transcript relative to the reference genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn as_char(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl TryFrom<&str> for Strand {
    type Error = CodecError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            other => Err(CodecError::Format(format!("Invalid strand: '{}'", other))),
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

///
/// One isoform-level effect of an SNV, as stored in the genomic index.
///
/// The encoded form is the fields joined by [RECORD_DELIMITER] in this order:
/// strand, aa_ref, aa_alt, cdna_pos, exon, protein_id, is_ptm_related (`1`/`0`).
/// There is no escaping, so no field may contain the delimiter.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsequenceRecord {
    pub strand: Strand,
    pub aa_ref: String,
    pub aa_alt: String,
    pub cdna_pos: u32,
    pub exon: String,
    pub protein_id: u32,
    pub is_ptm_related: bool,
}

const RECORD_FIELDS: usize = 7;

impl ConsequenceRecord {
    /// Amino-acid position the cDNA position falls into.
    pub fn aa_pos(&self) -> u32 {
        codon_position(self.cdna_pos)
    }

    pub fn encode(&self) -> Result<String, CodecError> {
        for (name, value) in [
            ("aa_ref", &self.aa_ref),
            ("aa_alt", &self.aa_alt),
            ("exon", &self.exon),
        ] {
            if value.contains(RECORD_DELIMITER) {
                return Err(CodecError::Format(format!(
                    "Field {} contains the record delimiter '{}': '{}'",
                    name, RECORD_DELIMITER, value
                )));
            }
        }

        let d = RECORD_DELIMITER;
        Ok(format!(
            "{}{d}{}{d}{}{d}{}{d}{}{d}{}{d}{}",
            self.strand,
            self.aa_ref,
            self.aa_alt,
            self.cdna_pos,
            self.exon,
            self.protein_id,
            if self.is_ptm_related { '1' } else { '0' },
        ))
    }

    pub fn decode(encoded: &str) -> Result<Self, CodecError> {
        let fields: Vec<&str> = encoded.split(RECORD_DELIMITER).collect();
        if fields.len() != RECORD_FIELDS {
            return Err(CodecError::Format(format!(
                "Encoded record must have {} fields, got {}: '{}'",
                RECORD_FIELDS,
                fields.len(),
                encoded
            )));
        }

        let number = |name: &str, value: &str| -> Result<u32, CodecError> {
            value
                .parse()
                .map_err(|_| CodecError::Format(format!("Field {} is not a number: '{}'", name, value)))
        };

        let is_ptm_related = match fields[6] {
            "1" => true,
            "0" => false,
            other => {
                return Err(CodecError::Format(format!(
                    "Field is_ptm_related must be 0 or 1, got '{}'",
                    other
                )));
            }
        };

        Ok(ConsequenceRecord {
            strand: Strand::try_from(fields[0])?,
            aa_ref: fields[1].to_string(),
            aa_alt: fields[2].to_string(),
            cdna_pos: number("cdna_pos", fields[3])?,
            exon: fields[4].to_string(),
            protein_id: number("protein_id", fields[5])?,
            is_ptm_related,
        })
    }
}

///
/// Amino-acid change scoped to a gene: the key of the gene-change index.
///
/// The key is the literal string `"<GENE> <aa_ref><aa_pos><aa_alt>"`, upper-cased
/// so lookups do not depend on how the user typed the gene name.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneAaKey(String);

impl GeneAaKey {
    pub fn new(gene: &str, aa_ref: &str, aa_pos: u32, aa_alt: &str) -> Self {
        GeneAaKey(
            format!("{} {}{}{}", gene.trim(), aa_ref, aa_pos, aa_alt).to_ascii_uppercase(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<[u8]> for GeneAaKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Display for GeneAaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn record() -> ConsequenceRecord {
        ConsequenceRecord {
            strand: Strand::Reverse,
            aa_ref: "F".to_string(),
            aa_alt: "L".to_string(),
            cdna_pos: 1681,
            exon: "12".to_string(),
            protein_id: 7,
            is_ptm_related: true,
        }
    }

    #[rstest]
    fn test_encode_record(record: ConsequenceRecord) {
        assert_eq!(record.encode().unwrap(), "-,F,L,1681,12,7,1");
    }

    #[rstest]
    fn test_decode_encoded_record(record: ConsequenceRecord) {
        let decoded = ConsequenceRecord::decode("-,F,L,1681,12,7,1").unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.aa_pos(), 561);
    }

    #[rstest]
    fn test_encode_rejects_delimiter_in_field(mut record: ConsequenceRecord) {
        record.exon = "12,13".to_string();
        let result = record.encode();
        assert!(matches!(result, Err(CodecError::Format(_))));
    }

    #[rstest]
    #[case("-,F,L,1681,12,7")]
    #[case("-,F,L,1681,12,7,1,extra")]
    #[case("*,F,L,1681,12,7,1")]
    #[case("-,F,L,abc,12,7,1")]
    #[case("-,F,L,1681,12,7,yes")]
    fn test_decode_rejects_malformed(#[case] encoded: &str) {
        assert!(ConsequenceRecord::decode(encoded).is_err());
    }

    #[rstest]
    fn test_gene_key_is_upper_cased() {
        let key = GeneAaKey::new("cdh23", "f", 561, "l");
        assert_eq!(key.as_str(), "CDH23 F561L");
        assert_eq!(key, GeneAaKey::new("CDH23", "F", 561, "L"));
    }
}
