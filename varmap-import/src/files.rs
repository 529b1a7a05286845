use std::path::{Path, PathBuf};

use glob::glob;

use crate::error::ImportResult;

///
/// Source files matching a pattern in a directory, in name order.
///
pub struct SourceFileGlob {
    curr: usize,
    files: Vec<PathBuf>,
}

impl SourceFileGlob {
    pub fn new(dir: &Path, pattern: &str) -> ImportResult<Self> {
        let pattern = dir.join(pattern);
        let mut files = glob(&pattern.to_string_lossy())?.collect::<Result<Vec<_>, _>>()?;
        files.sort();

        Ok(SourceFileGlob { curr: 0, files })
    }

    ///
    /// Drop the files whose name sorts before `first`, so an interrupted run
    /// can pick up where it stopped.
    ///
    pub fn resume_from(mut self, first: Option<&str>) -> Self {
        if let Some(first) = first {
            self.files.retain(|path| {
                path.file_name()
                    .is_some_and(|name| &*name.to_string_lossy() >= first)
            });
        }
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Iterator for SourceFileGlob {
    type Item = PathBuf;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.files.get(self.curr).cloned();
        self.curr += 1;
        result
    }
}
