use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use varmap_core::consts::{CHROMOSOME_PREFIX, REFSEQ_PREFIX};
use varmap_index::index::DEFAULT_MAX_BUFFERED_VALUES;

use crate::error::ImportConfigError;

///
/// Settings of an import run, usually read from a TOML file.
///
/// Every field has a default, so a config file only lists what it changes:
///
/// ```toml
/// mappings_dir = "data/200616/all_variants"
/// reset_before_import = false
/// resume_from = "annot_12.txt.gz"
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ImportConfig {
    /// Directory with the source files
    pub mappings_dir: PathBuf,
    /// Glob for the source files inside `mappings_dir`
    pub file_pattern: String,
    /// Only isoforms whose accession carries this prefix are imported
    pub refseq_prefix: String,
    /// Prefix of the chromosome names in the source files
    pub chromosome_prefix: String,
    /// Expected keys in the genomic index
    pub genomic_capacity_hint: u64,
    /// Expected keys in the gene-change index
    pub gene_capacity_hint: u64,
    /// Values each write session buffers before flushing on its own
    pub max_buffered_values: usize,
    /// Destroy both indexes before importing. With `false` the run adds to
    /// whatever is already stored.
    pub reset_before_import: bool,
    /// Skip source files whose name sorts before this one
    pub resume_from: Option<String>,
    /// Merge the sorted runs of both indexes into one per shard at the end
    pub compact_after_import: bool,
    pub show_progress: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            mappings_dir: PathBuf::from("data/mappings"),
            file_pattern: "annot_*.txt.gz".to_string(),
            refseq_prefix: REFSEQ_PREFIX.to_string(),
            chromosome_prefix: CHROMOSOME_PREFIX.to_string(),
            genomic_capacity_hint: 500_000_000,
            gene_capacity_hint: 200_000_000,
            max_buffered_values: DEFAULT_MAX_BUFFERED_VALUES,
            reset_before_import: true,
            resume_from: None,
            compact_after_import: true,
            show_progress: false,
        }
    }
}

impl TryFrom<&Path> for ImportConfig {
    type Error = ImportConfigError;

    fn try_from(path: &Path) -> Result<Self, Self::Error> {
        let toml_str = read_to_string(path)?;
        let config = toml::from_str(&toml_str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.toml");
        std::fs::write(
            &path,
            "mappings_dir = \"/data/mappings\"\nreset_before_import = false\nresume_from = \"annot_2.txt.gz\"\n",
        )
        .unwrap();

        let config = ImportConfig::try_from(path.as_path()).unwrap();
        assert_eq!(config.mappings_dir, PathBuf::from("/data/mappings"));
        assert_eq!(config.reset_before_import, false);
        assert_eq!(config.resume_from.as_deref(), Some("annot_2.txt.gz"));
        assert_eq!(config.file_pattern, "annot_*.txt.gz");
        assert_eq!(config.refseq_prefix, "NM_");
        assert!(config.compact_after_import);
    }

    #[rstest]
    fn test_empty_config_is_default() {
        let config: ImportConfig = toml::from_str("").unwrap();
        assert_eq!(config, ImportConfig::default());
    }

    #[rstest]
    fn test_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.toml");
        std::fs::write(&path, "genomic_capacity_hint = \"lots\"").unwrap();

        let result = ImportConfig::try_from(path.as_path());
        assert!(matches!(result, Err(ImportConfigError::Toml(_))));
    }

    #[rstest]
    fn test_missing_config_file() {
        let result = ImportConfig::try_from(Path::new("does/not/exist.toml"));
        assert!(matches!(result, Err(ImportConfigError::Io(_))));
    }
}
