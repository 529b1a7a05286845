use std::fmt::{self, Display};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

/// Type of the values stored in an index, recorded in `index.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    U32,
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Text => write!(f, "text"),
            ElementKind::U32 => write!(f, "u32"),
        }
    }
}

///
/// A value that can live in the set of an index entry.
///
/// Encoding happens when a value is added, so invalid values are rejected at
/// insertion time and never reach the disk.
///
pub trait SetElement: Sized + Clone + Eq + Hash {
    const KIND: ElementKind;

    fn encode(&self) -> Result<Vec<u8>>;

    fn decode(bytes: &[u8]) -> Result<Self>;
}

impl SetElement for String {
    const KIND: ElementKind = ElementKind::Text;

    fn encode(&self) -> Result<Vec<u8>> {
        if self.is_empty() {
            return Err(StorageError::InvalidElement(
                "text elements must not be empty".to_string(),
            ));
        }
        Ok(self.as_bytes().to_vec())
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| StorageError::InvalidElement(format!("text element is not UTF-8: {}", e)))
    }
}

impl SetElement for u32 {
    const KIND: ElementKind = ElementKind::U32;

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(self.to_le_bytes().to_vec())
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 4] = bytes.try_into().map_err(|_| {
            StorageError::InvalidElement(format!("u32 element must be 4 bytes, got {}", bytes.len()))
        })?;
        Ok(u32::from_le_bytes(bytes))
    }
}
