//! Parsing and consistency checks for mutation descriptors.
//!
//! Source files describe each consequence with a cDNA change (`c.T1681C`) and a
//! protein change (`p.F561L`). The functions here decode those, decide which
//! strand the transcript lies on and check the stated residues against the
//! isoform sequence.
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::{CodecError, CodecResult};
use crate::models::{Protein, Strand};

///
/// A decoded `<ref><pos><alt>` change descriptor.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Substitution {
    pub reference: String,
    pub position: u32,
    pub alternative: String,
}

fn is_residue_symbol(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'*'
}

///
/// Decode a `<ref><digits><alt>` change descriptor such as `T1681C` or `R273*`.
///
/// Reference and alternative are runs of ASCII letters (or `*` for a stop);
/// the position is a decimal number without leading zeros.
///
/// # Arguments
/// - text: descriptor without any `c.`/`p.` notation prefix
pub fn decode_mutation(text: &str) -> CodecResult<Substitution> {
    let bytes = text.as_bytes();
    let invalid = |reason: &str| CodecError::Format(format!("Invalid mutation '{}': {}", text, reason));

    let ref_end = bytes
        .iter()
        .position(|b| !is_residue_symbol(*b))
        .unwrap_or(bytes.len());
    let digits_end = bytes[ref_end..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map_or(bytes.len(), |offset| ref_end + offset);

    let reference = &text[..ref_end];
    let digits = &text[ref_end..digits_end];
    let alternative = &text[digits_end..];

    if reference.is_empty() {
        return Err(invalid("missing reference"));
    }
    if digits.is_empty() {
        return Err(invalid("missing position"));
    }
    if digits.starts_with('0') {
        return Err(invalid("position must be a positive number without leading zeros"));
    }
    if alternative.is_empty() {
        return Err(invalid("missing alternative"));
    }
    if !alternative.bytes().all(is_residue_symbol) {
        return Err(invalid("unexpected characters after the position"));
    }

    let position = digits
        .parse::<u32>()
        .map_err(|_| invalid("position out of range"))?;

    Ok(Substitution {
        reference: reference.to_string(),
        position,
        alternative: alternative.to_string(),
    })
}

///
/// Inverse of [decode_mutation].
///
pub fn encode_mutation(reference: &str, position: u32, alternative: &str) -> String {
    format!("{}{}{}", reference, position, alternative)
}

impl FromStr for Substitution {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_mutation(s)
    }
}

impl Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            encode_mutation(&self.reference, self.position, &self.alternative)
        )
    }
}

///
/// Remove a notation prefix such as `c.` or `p.` from a change descriptor.
///
pub fn strip_notation_prefix<'a>(text: &'a str, prefix: &str) -> CodecResult<&'a str> {
    text.strip_prefix(prefix).ok_or_else(|| {
        CodecError::Format(format!(
            "Mutation '{}' does not start with '{}'",
            text, prefix
        ))
    })
}

/// Watson-Crick complement of a single nucleotide.
pub fn complement(base: char) -> Option<char> {
    match base.to_ascii_uppercase() {
        'A' => Some('T'),
        'T' => Some('A'),
        'C' => Some('G'),
        'G' => Some('C'),
        _ => None,
    }
}

/// Reverse complement of a nucleotide run, `None` if any base is not A/C/G/T.
pub fn reverse_complement(seq: &str) -> Option<String> {
    seq.chars().rev().map(complement).collect()
}

///
/// Infer the strand of a transcript from the genomic and the cDNA alleles.
///
/// The transcript is on the forward strand when the cDNA alleles equal the
/// genomic ones, and on the reverse strand when their complements do. Exactly
/// one of the two must hold; anything else is reported as an inconsistency
/// rather than guessed.
pub fn determine_strand(
    dna_ref: &str,
    cdna_ref: &str,
    dna_alt: &str,
    cdna_alt: &str,
) -> CodecResult<Strand> {
    let dna_ref = dna_ref.to_ascii_uppercase();
    let dna_alt = dna_alt.to_ascii_uppercase();
    let cdna_ref = cdna_ref.to_ascii_uppercase();
    let cdna_alt = cdna_alt.to_ascii_uppercase();

    let (Some(rc_ref), Some(rc_alt)) = (reverse_complement(&cdna_ref), reverse_complement(&cdna_alt))
    else {
        return Err(CodecError::DataInconsistency(format!(
            "cDNA alleles {}>{} are not nucleotides",
            cdna_ref, cdna_alt
        )));
    };

    let forward = dna_ref == cdna_ref && dna_alt == cdna_alt;
    let reverse = rc_ref == dna_ref && rc_alt == dna_alt;

    match (forward, reverse) {
        (true, false) => Ok(Strand::Forward),
        (false, true) => Ok(Strand::Reverse),
        (true, true) => Err(CodecError::DataInconsistency(format!(
            "Strand is ambiguous for genomic {}>{} and cDNA {}>{}",
            dna_ref, dna_alt, cdna_ref, cdna_alt
        ))),
        (false, false) => Err(CodecError::DataInconsistency(format!(
            "Neither strand reconciles genomic {}>{} with cDNA {}>{}",
            dna_ref, dna_alt, cdna_ref, cdna_alt
        ))),
    }
}

///
/// Amino-acid position of the codon containing a 1-based cDNA position.
///
pub fn codon_position(cdna_pos: u32) -> u32 {
    cdna_pos.saturating_sub(1) / 3 + 1
}

///
/// A disagreement between a stated reference residue and the isoform sequence.
///
/// These are diagnostics: the import collects them per refseq and hands them
/// back to the caller.
///
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceMismatch {
    pub refseq: String,
    pub aa_pos: u32,
    /// Residue(s) stated by the source file.
    pub expected: String,
    /// Residue(s) found in the sequence; `None` when the position lies past its end.
    pub actual: Option<String>,
    pub alt: String,
}

impl Display for SequenceMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            Some(actual) => write!(
                f,
                "{}: expected {} at {} but sequence has {} (alt: {})",
                self.refseq, self.expected, self.aa_pos, actual, self.alt
            ),
            None => write!(
                f,
                "{}: position {} is outside of the sequence (expected {}, alt: {})",
                self.refseq, self.aa_pos, self.expected, self.alt
            ),
        }
    }
}

///
/// Compare the residue(s) at a 1-based position with the stated reference.
///
/// # Returns
/// `None` when the sequence agrees, a [SequenceMismatch] describing the
/// disagreement otherwise.
pub fn is_sequence_broken(
    protein: &Protein,
    aa_pos: u32,
    aa_ref: &str,
    aa_alt: &str,
) -> Option<SequenceMismatch> {
    let actual = (aa_pos as usize)
        .checked_sub(1)
        .and_then(|start| protein.sequence.get(start..start + aa_ref.len()));

    if actual == Some(aa_ref) {
        return None;
    }

    Some(SequenceMismatch {
        refseq: protein.refseq.clone(),
        aa_pos,
        expected: aa_ref.to_string(),
        actual: actual.map(str::to_string),
        alt: aa_alt.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn protein() -> Protein {
        Protein::new(1, "NM_003955", "SOCS3", "MVTHSKFPAAGMSRPLDTS")
    }

    #[rstest]
    #[case("T1681C", "T", 1681, "C")]
    #[case("F561L", "F", 561, "L")]
    #[case("R273*", "R", 273, "*")]
    #[case("Ala12Val", "Ala", 12, "Val")]
    fn test_decode_mutation(
        #[case] text: &str,
        #[case] reference: &str,
        #[case] position: u32,
        #[case] alternative: &str,
    ) {
        let change = decode_mutation(text).unwrap();
        assert_eq!(change.reference, reference);
        assert_eq!(change.position, position);
        assert_eq!(change.alternative, alternative);
        // decoding is lossless
        assert_eq!(change.to_string(), text);
    }

    #[rstest]
    #[case("")]
    #[case("1681C")]
    #[case("T1681")]
    #[case("TC")]
    #[case("T0C")]
    #[case("T01C")]
    #[case("T16-81C")]
    #[case("T1681C2")]
    #[case("T99999999999C")]
    #[case("c.T1681C")]
    fn test_decode_mutation_rejects(#[case] text: &str) {
        assert!(matches!(decode_mutation(text), Err(CodecError::Format(_))));
    }

    #[rstest]
    fn test_strip_notation_prefix() {
        assert_eq!(strip_notation_prefix("c.T1681C", "c.").unwrap(), "T1681C");
        assert!(strip_notation_prefix("T1681C", "c.").is_err());
        assert!(strip_notation_prefix("p.F561L", "c.").is_err());
    }

    #[rstest]
    #[case("G", "G", "A", "A", Strand::Forward)]
    #[case("G", "C", "A", "T", Strand::Reverse)]
    #[case("a", "T", "g", "C", Strand::Reverse)]
    fn test_determine_strand(
        #[case] dna_ref: &str,
        #[case] cdna_ref: &str,
        #[case] dna_alt: &str,
        #[case] cdna_alt: &str,
        #[case] expected: Strand,
    ) {
        assert_eq!(
            determine_strand(dna_ref, cdna_ref, dna_alt, cdna_alt).unwrap(),
            expected
        );
    }

    #[rstest]
    #[case("G", "T", "A", "C")]
    #[case("G", "G", "A", "T")]
    #[case("N", "N", "A", "A")]
    fn test_determine_strand_inconsistent(
        #[case] dna_ref: &str,
        #[case] cdna_ref: &str,
        #[case] dna_alt: &str,
        #[case] cdna_alt: &str,
    ) {
        let result = determine_strand(dna_ref, cdna_ref, dna_alt, cdna_alt);
        assert!(matches!(result, Err(CodecError::DataInconsistency(_))));
    }

    #[rstest]
    #[case(1, 1)]
    #[case(3, 1)]
    #[case(4, 2)]
    #[case(1681, 561)]
    #[case(1683, 561)]
    #[case(1684, 562)]
    fn test_codon_position(#[case] cdna_pos: u32, #[case] aa_pos: u32) {
        assert_eq!(codon_position(cdna_pos), aa_pos);
    }

    #[rstest]
    fn test_sequence_agrees(protein: Protein) {
        assert_eq!(is_sequence_broken(&protein, 1, "M", "K"), None);
        assert_eq!(is_sequence_broken(&protein, 7, "F", "L"), None);
    }

    #[rstest]
    fn test_sequence_mismatch(protein: Protein) {
        let broken = is_sequence_broken(&protein, 2, "K", "E").unwrap();
        assert_eq!(broken.refseq, "NM_003955");
        assert_eq!(broken.aa_pos, 2);
        assert_eq!(broken.expected, "K");
        assert_eq!(broken.actual.as_deref(), Some("V"));
        assert_eq!(broken.alt, "E");
    }

    #[rstest]
    #[case(0)]
    #[case(20)]
    #[case(1000)]
    fn test_sequence_position_out_of_range(protein: Protein, #[case] aa_pos: u32) {
        let broken = is_sequence_broken(&protein, aa_pos, "M", "K").unwrap();
        assert_eq!(broken.actual, None);
    }
}
