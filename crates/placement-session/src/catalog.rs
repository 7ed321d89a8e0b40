use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Parts marked when no catalog is configured.
pub const DEFAULT_PARTS: [&str; 6] = [
    "Left Eye",
    "Right Eye",
    "Nose Tip",
    "Mouth Center",
    "Left Brow",
    "Right Brow",
];

/// Ordered list of unique, non-blank part names.
///
/// Placements on both images are index-aligned with this list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct PartCatalog {
    names: Vec<String>,
}

impl PartCatalog {
    pub fn new<I, S>(names: I) -> Result<Self, SessionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(SessionError::EmptyCatalog);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(SessionError::BlankPartName { index });
            }
            if !seen.insert(name.as_str()) {
                return Err(SessionError::DuplicatePart(name.clone()));
            }
        }

        Ok(Self { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always `false` for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }
}

impl Default for PartCatalog {
    fn default() -> Self {
        Self {
            names: DEFAULT_PARTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TryFrom<Vec<String>> for PartCatalog {
    type Error = SessionError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<PartCatalog> for Vec<String> {
    fn from(catalog: PartCatalog) -> Self {
        catalog.names
    }
}
