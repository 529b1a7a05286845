//! # varmap-query
//!
//! Queries over the genomic and the gene-change index. Proteins and mutation
//! identities live in a persistence layer outside of varmap; the
//! [ProteinRepository] and [MutationRegistry] traits are the seams to it.
pub mod collaborators;
pub mod error;
pub mod report;
pub mod service;

// re-exports
pub use self::collaborators::{MutationRegistry, ProteinRepository};
pub use self::error::{QueryError, QueryResult};
pub use self::report::{QueryKind, QueryResults, SearchReport, SearchResult};
pub use self::service::QueryService;
