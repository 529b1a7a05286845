pub mod chromosome;
pub mod consequence;
pub mod mutation;
pub mod protein;
pub mod snv;

// re-export for cleaner imports
pub use self::chromosome::Chromosome;
pub use self::consequence::{ConsequenceRecord, GeneAaKey, Strand};
pub use self::mutation::Mutation;
pub use self::protein::Protein;
pub use self::snv::{SNV_KEY_LEN, SnvKey};
