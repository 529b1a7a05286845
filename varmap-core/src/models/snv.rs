use std::fmt::{self, Display};

use super::Chromosome;
use crate::errors::CodecError;

/// Length of [SnvKey::to_bytes]: chromosome code, 4 position bytes, ref, alt.
pub const SNV_KEY_LEN: usize = 7;

///
/// Canonical identity of a single-nucleotide variant.
///
/// Keys are stored in the genomic index in their byte form, see [SnvKey::to_bytes].
/// The position is big-endian there so byte order follows genomic order
/// within a chromosome.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnvKey {
    pub chrom: Chromosome,
    pub pos: u32,
    pub ref_base: u8,
    pub alt_base: u8,
}

fn validate_base(base: &str, role: &str) -> Result<u8, CodecError> {
    match base.as_bytes() {
        [b @ (b'A' | b'C' | b'G' | b'T')] => Ok(*b),
        _ => Err(CodecError::Format(format!(
            "{} allele of an SNV must be a single A/C/G/T base, got '{}'",
            role, base
        ))),
    }
}

impl SnvKey {
    pub fn new(chrom: Chromosome, pos: u32, ref_base: &str, alt_base: &str) -> Result<Self, CodecError> {
        let ref_base = validate_base(ref_base, "Reference")?;
        let alt_base = validate_base(alt_base, "Alternative")?;

        if ref_base == alt_base {
            return Err(CodecError::DataInconsistency(format!(
                "Reference and alternative alleles are identical: '{}'",
                ref_base as char
            )));
        }

        Ok(SnvKey {
            chrom,
            pos,
            ref_base,
            alt_base,
        })
    }

    ///
    /// Build a key from the raw text fields of a query or input line.
    ///
    /// # Arguments
    /// - chrom: chromosome name without prefix, e.g. `20`
    /// - pos: 1-based position as text
    /// - ref_base, alt_base: single bases; lower case is accepted
    pub fn parse(chrom: &str, pos: &str, ref_base: &str, alt_base: &str) -> Result<Self, CodecError> {
        let chrom: Chromosome = chrom.parse()?;
        let pos: u32 = pos
            .parse()
            .map_err(|_| CodecError::Format(format!("Position is not a number: '{}'", pos)))?;

        SnvKey::new(
            chrom,
            pos,
            &ref_base.to_ascii_uppercase(),
            &alt_base.to_ascii_uppercase(),
        )
    }

    pub fn to_bytes(&self) -> [u8; SNV_KEY_LEN] {
        let pos = self.pos.to_be_bytes();
        [
            self.chrom.code(),
            pos[0],
            pos[1],
            pos[2],
            pos[3],
            self.ref_base,
            self.alt_base,
        ]
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let bytes: &[u8; SNV_KEY_LEN] = bytes.try_into().map_err(|_| {
            CodecError::Format(format!(
                "SNV key must be {} bytes long, got {}",
                SNV_KEY_LEN,
                bytes.len()
            ))
        })?;

        let chrom = Chromosome::from_code(bytes[0])
            .ok_or_else(|| CodecError::Format(format!("Unknown chromosome code: {}", bytes[0])))?;
        let pos = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);

        SnvKey::new(
            chrom,
            pos,
            &(bytes[5] as char).to_string(),
            &(bytes[6] as char).to_string(),
        )
    }

    pub fn ref_base(&self) -> char {
        self.ref_base as char
    }

    pub fn alt_base(&self) -> char {
        self.alt_base as char
    }
}

impl Display for SnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chr{} {} {} {}",
            self.chrom,
            self.pos,
            self.ref_base(),
            self.alt_base()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_key_bytes_are_reversible() {
        let key = SnvKey::parse("20", "14370", "G", "A").unwrap();
        let bytes = key.to_bytes();

        assert_eq!(bytes, [19, 0, 0, 0x38, 0x22, b'G', b'A']);
        assert_eq!(SnvKey::from_bytes(&bytes).unwrap(), key);
    }

    #[rstest]
    fn test_parse_accepts_lower_case_bases() {
        let key = SnvKey::parse("X", "100", "c", "t").unwrap();
        assert_eq!(key.ref_base(), 'C');
        assert_eq!(key.alt_base(), 'T');
        assert_eq!(key.to_string(), "chrX 100 C T");
    }

    #[rstest]
    #[case("20", "pos", "G", "A")]
    #[case("20", "-1", "G", "A")]
    #[case("99", "10", "G", "A")]
    #[case("20", "10", "GT", "A")]
    #[case("20", "10", "G", "N")]
    #[case("20", "10", "G", "G")]
    fn test_parse_rejects_invalid_fields(
        #[case] chrom: &str,
        #[case] pos: &str,
        #[case] r: &str,
        #[case] a: &str,
    ) {
        assert!(SnvKey::parse(chrom, pos, r, a).is_err());
    }

    #[rstest]
    fn test_from_bytes_rejects_wrong_length() {
        assert!(SnvKey::from_bytes(&[1, 2, 3]).is_err());
        assert!(SnvKey::from_bytes(&[200, 0, 0, 0, 1, b'A', b'C']).is_err());
    }

    #[rstest]
    fn test_byte_order_follows_position() {
        let a = SnvKey::parse("1", "255", "A", "C").unwrap().to_bytes();
        let b = SnvKey::parse("1", "256", "A", "C").unwrap().to_bytes();
        assert!(a < b);
    }
}
