//! # varmap-core
//!
//! Shared models and codecs for relating genomic single-nucleotide variants to
//! their amino-acid consequences on protein isoforms.
//!
//! The crate holds everything the other varmap crates agree on:
//!
//! - [`models`]: canonical SNV keys, consequence records, gene/amino-acid keys and
//!   the protein/mutation shapes handed in by the persistence layer.
//! - [`codec`]: parsing of `<ref><pos><alt>` change descriptors, strand inference,
//!   codon arithmetic and reference-sequence checks.
//! - [`utils`]: readers for plain and gzip-compressed inputs.
//!
//! ```rust
//! use varmap_core::codec::{decode_mutation, determine_strand};
//! use varmap_core::models::Strand;
//!
//! let change = decode_mutation("T1681C").unwrap();
//! assert_eq!(change.position, 1681);
//!
//! // genomic G>A read on the reverse strand is cDNA C>T
//! let strand = determine_strand("G", "C", "A", "T").unwrap();
//! assert_eq!(strand, Strand::Reverse);
//! ```
pub mod codec;
pub mod consts;
pub mod errors;
pub mod models;
pub mod utils;

pub use errors::*;
