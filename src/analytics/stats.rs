//! Statistical Enrichment
//!
//! Mean case/death counts across regions and the color ladder the choropleth
//! uses. The relative ladder bands regions against the mean so that the map
//! shows how regions compare, not absolute magnitudes.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::aggregate::RegionTotals;

/// Mean counts across all regions present in a totals mapping
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RegionStats {
    pub mean_cases: f64,
    pub mean_deaths: f64,
    /// Number of regions the means were taken over
    pub regions: usize,
}

impl RegionStats {
    /// Compute means; an empty mapping yields zeros
    pub fn from_totals(totals: &RegionTotals) -> Self {
        if totals.is_empty() {
            return Self::default();
        }

        let n = totals.len() as f64;
        let cases: f64 = totals.values().map(|t| t.cases as f64).sum();
        let deaths: f64 = totals.values().map(|t| t.deaths as f64).sum();

        Self {
            mean_cases: cases / n,
            mean_deaths: deaths / n,
            regions: totals.len(),
        }
    }
}

/// Which threshold ladder to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    /// Multiples of the mean case count
    #[default]
    Relative,
    /// Fixed case-count thresholds
    Absolute,
}

impl FromStr for ScaleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relative" => Ok(ScaleKind::Relative),
            "absolute" => Ok(ScaleKind::Absolute),
            other => Err(format!("unknown scale {:?}: expected relative or absolute", other)),
        }
    }
}

/// One band of the ladder: counts strictly above `above` get `color`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub above: f64,
    pub color: &'static str,
}

/// Ordered case-count thresholds mapped to fill colors, darkest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorScale {
    bands: Vec<LegendEntry>,
    floor: &'static str,
}

const RELATIVE_COLORS: [&str; 6] = [
    "#800026", "#BD0026", "#E31A1C", "#FC4E2A", "#FEB24C", "#FFEDA0",
];
const RELATIVE_MULTIPLIERS: [f64; 5] = [1.5, 1.0, 0.75, 0.5, 0.25];

const ABSOLUTE_COLORS: [&str; 8] = [
    "#800026", "#BD0026", "#E31A1C", "#FC4E2A", "#FD8D3C", "#FEB24C", "#FED976", "#FFEDA0",
];
const ABSOLUTE_THRESHOLDS: [f64; 7] = [1000.0, 500.0, 200.0, 100.0, 50.0, 20.0, 10.0];

impl ColorScale {
    /// Six bands: above 1.5x, 1x, 0.75x, 0.5x, 0.25x the mean, and below
    pub fn relative(mean_cases: f64) -> Self {
        let mean = if mean_cases.is_finite() && mean_cases > 0.0 {
            mean_cases
        } else {
            0.0
        };

        Self {
            bands: RELATIVE_MULTIPLIERS
                .iter()
                .zip(RELATIVE_COLORS)
                .map(|(m, color)| LegendEntry {
                    above: m * mean,
                    color,
                })
                .collect(),
            floor: RELATIVE_COLORS[5],
        }
    }

    /// Fixed ladder: 1000, 500, 200, 100, 50, 20, 10 cases, and below
    pub fn absolute() -> Self {
        Self {
            bands: ABSOLUTE_THRESHOLDS
                .iter()
                .zip(ABSOLUTE_COLORS)
                .map(|(&above, color)| LegendEntry { above, color })
                .collect(),
            floor: ABSOLUTE_COLORS[7],
        }
    }

    pub fn for_kind(kind: ScaleKind, stats: &RegionStats) -> Self {
        match kind {
            ScaleKind::Relative => Self::relative(stats.mean_cases),
            ScaleKind::Absolute => Self::absolute(),
        }
    }

    /// Color for a case count: the first band whose threshold is exceeded
    pub fn color_for(&self, cases: u64) -> &'static str {
        let cases = cases as f64;
        self.bands
            .iter()
            .find(|band| cases > band.above)
            .map(|band| band.color)
            .unwrap_or(self.floor)
    }

    /// Band position for a count, 0 = darkest
    pub fn band_index(&self, cases: u64) -> usize {
        let cases = cases as f64;
        self.bands
            .iter()
            .position(|band| cases > band.above)
            .unwrap_or(self.bands.len())
    }

    pub fn legend(&self) -> &[LegendEntry] {
        &self.bands
    }

    pub fn floor_color(&self) -> &'static str {
        self.floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::aggregate::Totals;
    use crate::region::RegionCode;

    fn totals(entries: &[(&str, u64, u64)]) -> RegionTotals {
        entries
            .iter()
            .map(|(code, cases, deaths)| {
                (
                    RegionCode::new(*code),
                    Totals {
                        cases: *cases,
                        deaths: *deaths,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_mean_of_empty_is_zero() {
        let stats = RegionStats::from_totals(&RegionTotals::new());
        assert_eq!(stats.mean_cases, 0.0);
        assert_eq!(stats.mean_deaths, 0.0);
        assert_eq!(stats.regions, 0);
    }

    #[test]
    fn test_means() {
        let stats = RegionStats::from_totals(&totals(&[("PH00", 30, 3), ("PH13", 10, 0)]));
        assert_eq!(stats.mean_cases, 20.0);
        assert_eq!(stats.mean_deaths, 1.5);
        assert_eq!(stats.regions, 2);
    }

    #[test]
    fn test_relative_bands() {
        let scale = ColorScale::relative(100.0);
        assert_eq!(scale.legend().len(), 5);
        assert_eq!(scale.color_for(151), "#800026");
        assert_eq!(scale.color_for(150), "#BD0026");
        assert_eq!(scale.color_for(101), "#BD0026");
        assert_eq!(scale.color_for(80), "#E31A1C");
        assert_eq!(scale.color_for(60), "#FC4E2A");
        assert_eq!(scale.color_for(30), "#FEB24C");
        assert_eq!(scale.color_for(25), "#FFEDA0");
        assert_eq!(scale.color_for(0), "#FFEDA0");
    }

    #[test]
    fn test_absolute_bands() {
        let scale = ColorScale::absolute();
        assert_eq!(scale.color_for(1001), "#800026");
        assert_eq!(scale.color_for(1000), "#BD0026");
        assert_eq!(scale.color_for(15), "#FED976");
        assert_eq!(scale.color_for(10), "#FFEDA0");
    }

    #[test]
    fn test_intensity_is_monotonic() {
        for scale in [ColorScale::relative(37.5), ColorScale::absolute(), ColorScale::relative(0.0)] {
            let mut previous = usize::MAX;
            for cases in 0..2000 {
                let band = scale.band_index(cases);
                assert!(band <= previous, "band rose at {}", cases);
                previous = band;
            }
        }
    }

    #[test]
    fn test_zero_mean_scale() {
        let scale = ColorScale::relative(0.0);
        assert_eq!(scale.color_for(0), scale.floor_color());
        assert_eq!(scale.color_for(1), "#800026");

        let nan = ColorScale::relative(f64::NAN);
        assert_eq!(nan, scale);
    }

    #[test]
    fn test_scale_kind_parse() {
        assert_eq!("Relative".parse::<ScaleKind>().unwrap(), ScaleKind::Relative);
        assert_eq!("absolute".parse::<ScaleKind>().unwrap(), ScaleKind::Absolute);
        assert!("log".parse::<ScaleKind>().is_err());
    }
}
