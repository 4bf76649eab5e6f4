//! Region catalog and name normalization
//!
//! A closed, ordered catalog mapping region codes to canonical display names.
//! Normalization resolves free-text region names to a code by case-insensitive
//! exact match against the display names. Nothing is trimmed and nothing is
//! fuzzy-matched: "CARAGA" and "caraga" match, "Caraga Region" does not.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use super::philippines::PHILIPPINE_REGIONS;

/// Canonical identifier for an administrative region (e.g. "PH13")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCode(String);

impl RegionCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RegionCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RegionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionEntry {
    pub code: RegionCode,
    pub name: String,
    /// Lowercased name used for matching
    #[serde(skip)]
    folded: String,
}

impl RegionEntry {
    fn new(code: &str, name: &str) -> Self {
        Self {
            code: RegionCode::new(code),
            name: name.to_string(),
            folded: name.to_lowercase(),
        }
    }
}

/// Errors building a catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Duplicate region code: {0}")]
    DuplicateCode(String),

    #[error("Empty region code for name {0:?}")]
    EmptyCode(String),
}

/// Closed catalog of region codes and display names
#[derive(Debug, Clone)]
pub struct RegionCatalog {
    entries: Vec<RegionEntry>,
}

impl RegionCatalog {
    /// Build a catalog from `(code, name)` pairs, in iteration order.
    ///
    /// Codes must be unique and non-empty. Duplicate names are accepted; such
    /// names resolve to the first entry carrying them.
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut built = Vec::new();

        for (code, name) in entries {
            if code.is_empty() {
                return Err(CatalogError::EmptyCode(name.to_string()));
            }
            if !seen.insert(code) {
                return Err(CatalogError::DuplicateCode(code.to_string()));
            }
            built.push(RegionEntry::new(code, name));
        }

        Ok(Self { entries: built })
    }

    /// The built-in catalog of Philippine regions
    pub fn philippines() -> &'static RegionCatalog {
        static CATALOG: OnceLock<RegionCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| Self {
            entries: PHILIPPINE_REGIONS
                .iter()
                .map(|(code, name)| RegionEntry::new(code, name))
                .collect(),
        })
    }

    /// Resolve a free-text region name to its code.
    ///
    /// `None` and the empty string never match.
    pub fn normalize(&self, name: Option<&str>) -> Option<&RegionCode> {
        let name = name.filter(|n| !n.is_empty())?;
        let folded = name.to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.folded == folded)
            .map(|entry| &entry.code)
    }

    /// Display name for a code
    pub fn name_of(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.code.as_str() == code)
            .map(|entry| entry.name.as_str())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.name_of(code).is_some()
    }

    pub fn entries(&self) -> &[RegionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
