//! # varmap-index
//!
//! A durable, set-valued key-value index. Keys are arbitrary bytes, values
//! are sets of one [SetElement] type (`String` or `u32`).
//!
//! The two indexes of varmap are instances of it:
//!
//! - genomic: canonical SNV key bytes to encoded consequence records (`String`)
//! - gene change: `"<GENE> <ref><pos><alt>"` to protein ids (`u32`)
//!
//! ```rust
//! use varmap_index::KeyValueIndex;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut index: KeyValueIndex<u32> = KeyValueIndex::new(dir.path().join("gene_changes"));
//! index.open(1_000).unwrap();
//!
//! let mut session = index.scoped_write_session().unwrap();
//! session.add("TP53 R273H", 7).unwrap();
//! session.add("TP53 R273H", 7).unwrap();
//! session.finish().unwrap();
//!
//! assert_eq!(index.lookup("TP53 R273H").unwrap().len(), 1);
//! assert!(index.lookup("TP53 R273C").unwrap().is_empty());
//! ```
pub mod element;
pub mod error;
pub mod index;
pub mod metadata;
pub mod session;
mod shard;

// re-exports
pub use self::element::{ElementKind, SetElement};
pub use self::error::StorageError;
pub use self::index::{IndexStats, KeyValueIndex};
pub use self::session::WriteSession;
