//! Aggregation Engine
//!
//! Groups case records by a key (location, normalized region code, or raw region
//! text) after optional year/month filtering, summing cases and deaths per group.
//!
//! Everything here is a pure function of its arguments: no I/O, no mutation of
//! the input records, and the same input always yields the same output.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::records::CaseRecord;
use crate::region::{RegionCatalog, RegionCode};

/// Errors parsing aggregation parameters
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("Invalid year {0:?}: expected 4 digits")]
    InvalidYear(String),

    #[error("Invalid month {0:?}: expected 01-12")]
    InvalidMonth(String),

    #[error("Invalid grouping {0:?}: expected location, region or region_name")]
    InvalidGroupBy(String),
}

/// What to group records by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// Raw location (city) text
    #[default]
    Location,
    /// Normalized region code; unmatched names group under the empty key
    Region,
    /// Raw region text as entered
    RegionName,
}

impl FromStr for GroupBy {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "location" | "city" => Ok(GroupBy::Location),
            "region" => Ok(GroupBy::Region),
            "region_name" => Ok(GroupBy::RegionName),
            _ => Err(FilterError::InvalidGroupBy(s.to_string())),
        }
    }
}

impl std::fmt::Display for GroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupBy::Location => write!(f, "location"),
            GroupBy::Region => write!(f, "region"),
            GroupBy::RegionName => write!(f, "region_name"),
        }
    }
}

/// Optional year and month filter on the record date.
///
/// The year is matched against the leading four characters of the ISO date and
/// the month by looking for `-MM-` in it. Records without a date never match an
/// active filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    month: Option<String>,
}

impl DateFilter {
    /// Build a filter from optional query strings. Empty strings mean "any".
    pub fn new(year: Option<&str>, month: Option<&str>) -> Result<Self, FilterError> {
        let year = match year.filter(|y| !y.is_empty()) {
            Some(y) if y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()) => {
                Some(y.to_string())
            }
            Some(y) => return Err(FilterError::InvalidYear(y.to_string())),
            None => None,
        };

        let month = match month.filter(|m| !m.is_empty()) {
            Some(m)
                if m.len() == 2
                    && m.bytes().all(|b| b.is_ascii_digit())
                    && ("01"..="12").contains(&m) =>
            {
                Some(m.to_string())
            }
            Some(m) => return Err(FilterError::InvalidMonth(m.to_string())),
            None => None,
        };

        Ok(Self { year, month })
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn month(&self) -> Option<&str> {
        self.month.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.year.is_some() || self.month.is_some()
    }

    pub fn matches(&self, record: &CaseRecord) -> bool {
        if !self.is_active() {
            return true;
        }

        let date = record.date_string();
        if date.is_empty() {
            return false;
        }

        if let Some(year) = &self.year {
            if date.get(..4) != Some(year.as_str()) {
                return false;
            }
        }
        if let Some(month) = &self.month {
            if !date.contains(&format!("-{}-", month)) {
                return false;
            }
        }
        true
    }
}

/// Summed case and death counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub cases: u64,
    pub deaths: u64,
}

impl Totals {
    pub fn add_record(&mut self, record: &CaseRecord) {
        self.cases = self.cases.saturating_add(record.cases);
        self.deaths = self.deaths.saturating_add(record.deaths);
    }
}

/// Totals for one grouping key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateBucket {
    pub key: String,
    pub total_cases: u64,
    pub total_deaths: u64,
}

impl AggregateBucket {
    fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            total_cases: 0,
            total_deaths: 0,
        }
    }

    fn add(&mut self, record: &CaseRecord) {
        self.total_cases = self.total_cases.saturating_add(record.cases);
        self.total_deaths = self.total_deaths.saturating_add(record.deaths);
    }
}

/// Region code to totals, ordered by code
pub type RegionTotals = BTreeMap<RegionCode, Totals>;

/// Group filtered records by key, returning buckets in first-seen key order.
///
/// Records with an empty key (or, for [`GroupBy::Region`], an unmatched region
/// name) are kept under the empty key, so bucket totals always add up to the
/// totals of the filtered records.
pub fn aggregate(
    records: &[CaseRecord],
    catalog: &RegionCatalog,
    group_by: GroupBy,
    filter: &DateFilter,
) -> Vec<AggregateBucket> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<AggregateBucket> = Vec::new();

    for record in records.iter().filter(|r| filter.matches(r)) {
        let key = group_key(record, catalog, group_by);
        let slot = *index.entry(key).or_insert_with(|| {
            buckets.push(AggregateBucket::new(key));
            buckets.len() - 1
        });
        buckets[slot].add(record);
    }

    buckets
}

/// Per-region totals for records whose region name resolves in the catalog.
///
/// Unmatched names contribute nothing; see [`unmatched_regions`].
pub fn region_totals(
    records: &[CaseRecord],
    catalog: &RegionCatalog,
    filter: &DateFilter,
) -> RegionTotals {
    let mut totals = RegionTotals::new();

    for record in records.iter().filter(|r| filter.matches(r)) {
        if let Some(code) = catalog.normalize(Some(&record.region)) {
            totals.entry(code.clone()).or_default().add_record(record);
        }
    }

    totals
}

/// Records whose region name has no catalog match, grouped by the raw name
pub fn unmatched_regions(
    records: &[CaseRecord],
    catalog: &RegionCatalog,
    filter: &DateFilter,
) -> Vec<AggregateBucket> {
    let misses: Vec<CaseRecord> = records
        .iter()
        .filter(|r| catalog.normalize(Some(&r.region)).is_none())
        .cloned()
        .collect();
    aggregate(&misses, catalog, GroupBy::RegionName, filter)
}

/// Distinct years present in record dates, in first-seen order
pub fn available_years(records: &[CaseRecord]) -> Vec<String> {
    let mut years: Vec<String> = Vec::new();
    for record in records {
        let date = record.date_string();
        if let Some(year) = date.split('-').next().filter(|y| !y.is_empty()) {
            if !years.iter().any(|y| y == year) {
                years.push(year.to_string());
            }
        }
    }
    years
}

fn group_key<'a>(record: &'a CaseRecord, catalog: &'a RegionCatalog, group_by: GroupBy) -> &'a str {
    match group_by {
        GroupBy::Location => &record.location,
        GroupBy::RegionName => &record.region,
        GroupBy::Region => catalog
            .normalize(Some(&record.region))
            .map(RegionCode::as_str)
            .unwrap_or(""),
    }
}
