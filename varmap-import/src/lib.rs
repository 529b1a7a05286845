//! # varmap-import
//!
//! Batch import of genome-to-proteome mappings. Source files list, for each
//! genomic SNV, its consequences on every isoform; the importer checks each
//! consequence (strand, codon arithmetic, reference residue) and adds the
//! ones that hold up to the genomic and the gene-change index.
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::path::Path;
//!
//! use varmap_import::{ImportConfig, MappingImporter};
//! use varmap_index::KeyValueIndex;
//!
//! let config = ImportConfig::try_from(Path::new("import.toml")).unwrap();
//! let proteins = HashMap::new(); // refseq -> Protein, from the persistence layer
//!
//! let mut genomic: KeyValueIndex<String> = KeyValueIndex::new("db/dna_to_protein");
//! let mut genes: KeyValueIndex<u32> = KeyValueIndex::new("db/gene_to_isoform");
//!
//! let report = MappingImporter::new(&config, &proteins)
//!     .run(&mut genomic, &mut genes)
//!     .unwrap();
//! println!("{}", report);
//! ```
pub mod config;
pub mod error;
pub mod files;
pub mod pipeline;
pub mod report;

// re-exports
pub use self::config::ImportConfig;
pub use self::error::{ImportConfigError, ImportError, ImportResult};
pub use self::pipeline::{ItemOutcome, Mapping, MappingImporter, import_mappings};
pub use self::report::{ImportReport, SkipReason};
