//! Case record types
//!
//! This module defines the records that flow between the store gateway and the
//! analytics code:
//! - `CaseRecord`: a stored, strongly-typed case report
//! - `NewCaseRecord`: a case report that has not been persisted yet
//!
//! Stored documents are loosely typed (fields may be missing, strings where
//! numbers are expected, dates in several shapes). Every backend decodes them
//! through [`CaseRecord::from_document`], which coerces malformed fields to
//! defaults so nothing downstream ever sees a negative count or a bad date.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// ISO calendar date format used for stored and serialized dates
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// A single dengue case report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CaseRecord {
    /// Opaque document identifier assigned by the store
    pub id: String,
    /// City or municipality text as entered
    #[serde(default)]
    pub location: String,
    /// Free-form region name as entered
    #[serde(default)]
    pub region: String,
    /// Reported cases
    #[serde(default)]
    pub cases: u64,
    /// Reported deaths
    #[serde(default)]
    pub deaths: u64,
    /// Report date, `None` when absent or unparseable
    #[serde(default, deserialize_with = "deserialize_lenient_date")]
    pub date: Option<NaiveDate>,
    /// Reporting year column carried by imported files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl CaseRecord {
    /// Decode a loosely-typed stored document into a typed record.
    ///
    /// Counts accept integers, floats and numeric strings; anything negative or
    /// unparseable becomes 0. Dates accept `YYYY-MM-DD` or RFC 3339 strings.
    /// `region` falls back to the legacy `regions` field.
    pub fn from_document(id: impl Into<String>, fields: &Map<String, Value>) -> Self {
        let region = match fields.get("region") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => coerce_text(fields.get("regions")),
        };

        Self {
            id: id.into(),
            location: coerce_text(fields.get("location")),
            region,
            cases: coerce_count(fields.get("cases")),
            deaths: coerce_count(fields.get("deaths")),
            date: coerce_date(fields.get("date")),
            year: coerce_year(fields.get("year")),
        }
    }

    /// The date as an ISO string, empty when there is no valid date
    pub fn date_string(&self) -> String {
        format_date(self.date)
    }
}

/// A case report to be written to the store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCaseRecord {
    #[serde(default)]
    pub location: String,
    #[serde(default, alias = "regions")]
    pub region: String,
    #[serde(default)]
    pub cases: u64,
    #[serde(default)]
    pub deaths: u64,
    #[serde(default, deserialize_with = "deserialize_lenient_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl NewCaseRecord {
    /// Create a record with no counts and no date
    pub fn new(location: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            region: region.into(),
            ..Default::default()
        }
    }

    /// Builder method: set case count
    pub fn cases(mut self, cases: u64) -> Self {
        self.cases = cases;
        self
    }

    /// Builder method: set death count
    pub fn deaths(mut self, deaths: u64) -> Self {
        self.deaths = deaths;
        self
    }

    /// Builder method: set report date
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Builder method: set reporting year
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Encode as a stored document. Missing dates are written as `""`.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("location".into(), Value::String(self.location.clone()));
        fields.insert("region".into(), Value::String(self.region.clone()));
        fields.insert("cases".into(), Value::from(self.cases));
        fields.insert("deaths".into(), Value::from(self.deaths));
        fields.insert("date".into(), Value::String(format_date(self.date)));
        fields.insert(
            "year".into(),
            self.year.map(Value::from).unwrap_or(Value::Null),
        );
        fields
    }

    /// Attach a store-assigned id
    pub fn into_record(self, id: impl Into<String>) -> CaseRecord {
        CaseRecord {
            id: id.into(),
            location: self.location,
            region: self.region,
            cases: self.cases,
            deaths: self.deaths,
            date: self.date,
            year: self.year,
        }
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(ISO_DATE_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parse an ISO date or an RFC 3339 timestamp (taken in UTC)
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, ISO_DATE_FORMAT) {
        return Some(date);
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Parse a count, coercing negatives and garbage to 0
pub fn parse_count(s: &str) -> u64 {
    let s = s.trim();
    if let Ok(n) = s.parse::<u64>() {
        return n;
    }

    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f > 0.0 => f.trunc() as u64,
        _ => 0,
    }
}

fn coerce_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_else(|| match n.as_f64() {
            Some(f) if f.is_finite() && f > 0.0 => f.trunc() as u64,
            _ => 0,
        }),
        Some(Value::String(s)) => parse_count(s),
        _ => 0,
    }
}

fn coerce_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn coerce_date(value: Option<&Value>) -> Option<NaiveDate> {
    match value {
        Some(Value::String(s)) => parse_iso_date(s),
        _ => None,
    }
}

fn coerce_year(value: Option<&Value>) -> Option<i32> {
    match value {
        Some(Value::Number(n)) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn deserialize_lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_iso_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_from_document_well_formed() {
        let doc = fields(json!({
            "location": "Manila",
            "region": "NATIONAL CAPITAL REGION",
            "cases": 12,
            "deaths": 1,
            "date": "2021-06-05",
            "year": 2021
        }));

        let record = CaseRecord::from_document("abc", &doc);
        assert_eq!(record.id, "abc");
        assert_eq!(record.location, "Manila");
        assert_eq!(record.cases, 12);
        assert_eq!(record.deaths, 1);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2021, 6, 5));
        assert_eq!(record.year, Some(2021));
    }

    #[test]
    fn test_from_document_coerces_malformed_fields() {
        let doc = fields(json!({
            "location": "Cebu",
            "cases": "17",
            "deaths": -3,
            "date": "Invalid Date",
            "year": "n/a"
        }));

        let record = CaseRecord::from_document("x", &doc);
        assert_eq!(record.cases, 17);
        assert_eq!(record.deaths, 0);
        assert_eq!(record.date, None);
        assert_eq!(record.year, None);
        assert_eq!(record.region, "");
        assert_eq!(record.date_string(), "");
    }

    #[test]
    fn test_from_document_missing_fields_default() {
        let record = CaseRecord::from_document("empty", &Map::new());
        assert_eq!(record.location, "");
        assert_eq!(record.cases, 0);
        assert_eq!(record.deaths, 0);
        assert_eq!(record.date, None);
    }

    #[test]
    fn test_legacy_regions_field() {
        let doc = fields(json!({ "location": "Butuan", "regions": "CARAGA", "cases": 4 }));
        let record = CaseRecord::from_document("legacy", &doc);
        assert_eq!(record.region, "CARAGA");
    }

    #[test]
    fn test_rfc3339_date_is_taken_in_utc() {
        assert_eq!(
            parse_iso_date("2021-06-05T23:30:00-02:00"),
            NaiveDate::from_ymd_opt(2021, 6, 6)
        );
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(" 42 "), 42);
        assert_eq!(parse_count("3.9"), 3);
        assert_eq!(parse_count("-5"), 0);
        assert_eq!(parse_count("NaN"), 0);
        assert_eq!(parse_count("abc"), 0);
        assert_eq!(parse_count(""), 0);
    }

    #[test]
    fn test_new_record_document_round_trip() {
        let new = NewCaseRecord::new("Davao", "REGION XI-DAVAO REGION")
            .cases(9)
            .deaths(2)
            .date(NaiveDate::from_ymd_opt(2022, 1, 31).unwrap());

        let record = CaseRecord::from_document("d1", &new.to_document());
        assert_eq!(record, new.into_record("d1"));
    }

    #[test]
    fn test_new_record_accepts_empty_date_string() {
        let new: NewCaseRecord = serde_json::from_value(json!({
            "location": "Iloilo",
            "regions": "REGION VI-WESTERN VISAYAS",
            "cases": 3,
            "date": ""
        }))
        .unwrap();

        assert_eq!(new.region, "REGION VI-WESTERN VISAYAS");
        assert_eq!(new.date, None);
        assert_eq!(new.to_document()["date"], json!(""));
    }
}
