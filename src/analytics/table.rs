//! Record table: search, column filters, sorting and pagination over records
//!
//! Works on the cached record list; nothing here touches the store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::records::CaseRecord;

pub const DEFAULT_PER_PAGE: usize = 8;
pub const MAX_PER_PAGE: usize = 100;

/// Column a table can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Location,
    Region,
    Cases,
    Deaths,
    Date,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "location" => Ok(SortField::Location),
            "region" => Ok(SortField::Region),
            "cases" => Ok(SortField::Cases),
            "deaths" => Ok(SortField::Deaths),
            "date" => Ok(SortField::Date),
            other => Err(format!("unknown sort field {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order {:?}: expected asc or desc", other)),
        }
    }
}

/// Table query. Every filter is optional; an empty query returns the first page
/// of records in store order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    /// Global search across location, region, cases and deaths
    pub search: Option<String>,
    pub location: Option<String>,
    pub region: Option<String>,
    pub cases: Option<u64>,
    pub deaths: Option<u64>,
    pub date: Option<NaiveDate>,
    pub sort: Option<SortField>,
    pub order: SortOrder,
    /// 1-based page number
    pub page: usize,
    pub per_page: usize,
}

impl Default for RecordQuery {
    fn default() -> Self {
        Self {
            search: None,
            location: None,
            region: None,
            cases: None,
            deaths: None,
            date: None,
            sort: None,
            order: SortOrder::Asc,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// One page of matching records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPage {
    /// Records matching the filters, across all pages
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub pages: usize,
    pub records: Vec<CaseRecord>,
}

impl RecordQuery {
    pub fn matches(&self, record: &CaseRecord) -> bool {
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = contains_folded(&record.location, &needle)
                || contains_folded(&record.region, &needle)
                || record.cases.to_string().contains(&needle)
                || record.deaths.to_string().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(location) = self.location.as_deref() {
            if !contains_folded(&record.location, &location.to_lowercase()) {
                return false;
            }
        }
        if let Some(region) = self.region.as_deref() {
            if !contains_folded(&record.region, &region.to_lowercase()) {
                return false;
            }
        }
        if self.cases.is_some_and(|cases| record.cases != cases) {
            return false;
        }
        if self.deaths.is_some_and(|deaths| record.deaths != deaths) {
            return false;
        }
        if self.date.is_some() && record.date != self.date {
            return false;
        }
        true
    }

    /// Filter, sort and slice out the requested page
    pub fn apply(&self, records: &[CaseRecord]) -> RecordPage {
        let mut matching: Vec<&CaseRecord> = records.iter().filter(|r| self.matches(r)).collect();

        if let Some(field) = self.sort {
            matching.sort_by(|a, b| {
                let ordering = compare(a, b, field);
                match self.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let per_page = self.per_page.clamp(1, MAX_PER_PAGE);
        let page = self.page.max(1);
        let total = matching.len();

        let records = matching
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .cloned()
            .collect();

        RecordPage {
            total,
            page,
            per_page,
            pages: total.div_ceil(per_page),
            records,
        }
    }
}

fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    haystack.to_lowercase().contains(folded_needle)
}

fn compare(a: &CaseRecord, b: &CaseRecord, field: SortField) -> Ordering {
    match field {
        SortField::Location => a.location.cmp(&b.location),
        SortField::Region => a.region.cmp(&b.region),
        SortField::Cases => a.cases.cmp(&b.cases),
        SortField::Deaths => a.deaths.cmp(&b.deaths),
        // undated records sort first
        SortField::Date => a.date.cmp(&b.date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, location: &str, region: &str, cases: u64, deaths: u64, date: Option<&str>) -> CaseRecord {
        CaseRecord {
            id: id.to_string(),
            location: location.to_string(),
            region: region.to_string(),
            cases,
            deaths,
            date: date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            year: None,
        }
    }

    fn sample() -> Vec<CaseRecord> {
        vec![
            record("1", "Butuan", "CARAGA", 12, 1, Some("2021-06-05")),
            record("2", "Manila", "NATIONAL CAPITAL REGION", 7, 0, Some("2021-07-01")),
            record("3", "Surigao", "caraga", 5, 2, None),
            record("4", "Quezon City", "NATIONAL CAPITAL REGION", 21, 0, Some("2022-01-10")),
        ]
    }

    fn ids(page: &RecordPage) -> Vec<&str> {
        page.records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_empty_query_keeps_store_order() {
        let page = RecordQuery::default().apply(&sample());
        assert_eq!(ids(&page), vec!["1", "2", "3", "4"]);
        assert_eq!(page.total, 4);
        assert_eq!(page.pages, 1);
    }

    #[test]
    fn test_global_search() {
        let query = RecordQuery {
            search: Some("CARAGA".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&sample())), vec!["1", "3"]);

        let query = RecordQuery {
            search: Some("2".to_string()),
            ..Default::default()
        };
        // cases 12, deaths 2, cases 21
        assert_eq!(ids(&query.apply(&sample())), vec!["1", "3", "4"]);
    }

    #[test]
    fn test_column_filters() {
        let records = sample();

        let query = RecordQuery {
            location: Some("city".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&records)), vec!["4"]);

        let query = RecordQuery {
            cases: Some(7),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&records)), vec!["2"]);

        let query = RecordQuery {
            region: Some("national".to_string()),
            deaths: Some(0),
            date: NaiveDate::from_ymd_opt(2022, 1, 10),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&records)), vec!["4"]);
    }

    #[test]
    fn test_sorting() {
        let query = RecordQuery {
            sort: Some(SortField::Cases),
            order: SortOrder::Desc,
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&sample())), vec!["4", "1", "2", "3"]);

        let query = RecordQuery {
            sort: Some(SortField::Date),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(&sample())), vec!["3", "1", "2", "4"]);
    }

    #[test]
    fn test_pagination() {
        let records: Vec<CaseRecord> = (0..20)
            .map(|i| record(&i.to_string(), "Town", "CAR", i, 0, None))
            .collect();

        let page = RecordQuery {
            page: 3,
            ..Default::default()
        }
        .apply(&records);
        assert_eq!(page.total, 20);
        assert_eq!(page.pages, 3);
        assert_eq!(ids(&page), vec!["16", "17", "18", "19"]);

        let beyond = RecordQuery {
            page: 9,
            ..Default::default()
        }
        .apply(&records);
        assert!(beyond.records.is_empty());

        let capped = RecordQuery {
            per_page: 10_000,
            page: 0,
            ..Default::default()
        }
        .apply(&records);
        assert_eq!(capped.per_page, MAX_PER_PAGE);
        assert_eq!(capped.page, 1);
        assert_eq!(capped.records.len(), 20);
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!("Cases".parse::<SortField>().unwrap(), SortField::Cases);
        assert!("population".parse::<SortField>().is_err());
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
    }
}
