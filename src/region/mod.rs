//! Region Normalizer
//!
//! Maps free-text region names to canonical [`RegionCode`]s drawn from a
//! closed [`RegionCatalog`].

mod catalog;
mod philippines;

pub use catalog::{CatalogError, RegionCatalog, RegionCode, RegionEntry};
