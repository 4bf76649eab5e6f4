//! Chart series for the dashboard view

use serde::Serialize;

use super::aggregate::{aggregate, available_years, AggregateBucket, DateFilter, GroupBy};
use crate::records::CaseRecord;
use crate::region::RegionCatalog;

/// One scatter point: cases against deaths for a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScatterPoint {
    pub x: u64,
    pub y: u64,
}

/// Aggregated buckets plus the parallel series charts are drawn from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub group_by: GroupBy,
    pub filter: DateFilter,
    pub labels: Vec<String>,
    pub cases: Vec<u64>,
    pub deaths: Vec<u64>,
    pub scatter: Vec<ScatterPoint>,
    pub total_cases: u64,
    pub total_deaths: u64,
    /// Years present in the unfiltered records, for the year picker
    pub years: Vec<String>,
    pub buckets: Vec<AggregateBucket>,
}

impl DashboardView {
    pub fn build(
        records: &[CaseRecord],
        catalog: &RegionCatalog,
        group_by: GroupBy,
        filter: DateFilter,
    ) -> Self {
        let buckets = aggregate(records, catalog, group_by, &filter);

        let labels = buckets.iter().map(|b| b.key.clone()).collect();
        let cases: Vec<u64> = buckets.iter().map(|b| b.total_cases).collect();
        let deaths: Vec<u64> = buckets.iter().map(|b| b.total_deaths).collect();
        let scatter = buckets
            .iter()
            .map(|b| ScatterPoint {
                x: b.total_cases,
                y: b.total_deaths,
            })
            .collect();

        Self {
            group_by,
            total_cases: cases.iter().fold(0u64, |acc, n| acc.saturating_add(*n)),
            total_deaths: deaths.iter().fold(0u64, |acc, n| acc.saturating_add(*n)),
            years: available_years(records),
            filter,
            labels,
            cases,
            deaths,
            scatter,
            buckets,
        }
    }
}
