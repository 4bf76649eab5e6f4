//! CSV Import
//!
//! Case report exports carry a header row followed by two rows of sheet
//! metadata before the data proper, so the first two data rows are skipped by
//! default. Recognized columns are `loc`, `cases`, `deaths`, `date`
//! (day/month/year), `Region` and `year`; header names match case-insensitively
//! and other columns are ignored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use super::{ImportError, ImportProgress};
use crate::records::{parse_count, NewCaseRecord, RecordStore};

pub const DEFAULT_SKIP_ROWS: usize = 2;
pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

/// Column positions found in the header row
#[derive(Debug, Default)]
struct ColumnMap {
    location: Option<usize>,
    cases: Option<usize>,
    deaths: Option<usize>,
    date: Option<usize>,
    region: Option<usize>,
    year: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut columns = Self::default();

        for (idx, header) in headers.iter().enumerate() {
            let slot = match header.to_lowercase().as_str() {
                "loc" | "location" => &mut columns.location,
                "cases" => &mut columns.cases,
                "deaths" => &mut columns.deaths,
                "date" => &mut columns.date,
                "region" => &mut columns.region,
                "year" => &mut columns.year,
                _ => continue,
            };
            // first occurrence wins
            if slot.is_none() {
                *slot = Some(idx);
            }
        }

        columns
    }

    fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.cases.is_none()
            && self.deaths.is_none()
            && self.date.is_none()
            && self.region.is_none()
            && self.year.is_none()
    }
}

/// CSV importer for case report exports
#[derive(Debug, Clone)]
pub struct CaseCsvImporter {
    /// Leading data rows dropped unconditionally
    skip_rows: usize,
    /// chrono format for the `date` column
    date_format: String,
}

/// A data row ready to be written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRow {
    /// 1-based line in the source file
    pub line: u64,
    pub record: NewCaseRecord,
}

/// Output of the parse phase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedImport {
    pub rows: Vec<ParsedRow>,
    /// Data rows read, skipped rows included
    pub rows_read: usize,
    pub rows_skipped: usize,
}

/// A row the store refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFailure {
    pub line: u64,
    pub location: String,
    pub error: String,
}

/// Outcome of the write phase
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub written: usize,
    pub failures: Vec<RowFailure>,
}

impl ImportReport {
    /// Every parsed row was written
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Default for CaseCsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseCsvImporter {
    pub fn new() -> Self {
        Self {
            skip_rows: DEFAULT_SKIP_ROWS,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }

    /// Set how many leading data rows to drop
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    /// Set the date format string
    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    pub fn skip_rows(&self) -> usize {
        self.skip_rows
    }

    /// Parse a date cell; unparseable dates become `None`
    fn parse_date(&self, raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        NaiveDate::parse_from_str(raw, &self.date_format).ok()
    }

    /// Parse CSV from any reader. Fails as a whole on malformed input.
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<ParsedImport, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        if headers.is_empty() || headers.iter().all(str::is_empty) {
            return Err(ImportError::Parse("missing header row".to_string()));
        }

        let columns = ColumnMap::from_headers(&headers);
        if columns.is_empty() {
            return Err(ImportError::Parse(format!(
                "no recognized columns in header: {}",
                headers.iter().collect::<Vec<_>>().join(",")
            )));
        }

        let mut rows = Vec::new();
        let mut rows_read = 0;
        let mut rows_skipped = 0;

        for result in reader.records() {
            let record = result?;
            rows_read += 1;

            if rows_read <= self.skip_rows {
                rows_skipped += 1;
                continue;
            }

            let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

            let parsed = NewCaseRecord {
                location: cell(columns.location).to_string(),
                region: cell(columns.region).to_string(),
                cases: parse_count(cell(columns.cases)),
                deaths: parse_count(cell(columns.deaths)),
                date: self.parse_date(cell(columns.date)),
                year: cell(columns.year).trim().parse().ok(),
            };

            rows.push(ParsedRow {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                record: parsed,
            });
        }

        Ok(ParsedImport {
            rows,
            rows_read,
            rows_skipped,
        })
    }

    pub fn parse_str(&self, csv_data: &str) -> Result<ParsedImport, ImportError> {
        self.parse_reader(csv_data.as_bytes())
    }

    pub fn parse_path(&self, path: &Path) -> Result<ParsedImport, ImportError> {
        let file = std::fs::File::open(path)?;
        self.parse_reader(file)
    }

    /// Write parsed rows one at a time, in file order.
    ///
    /// A row the store rejects is recorded and the import moves on. Rows
    /// already written stay written.
    pub async fn import_into(
        &self,
        store: &dyn RecordStore,
        collection: &str,
        parsed: ParsedImport,
        progress: Option<&ImportProgress>,
    ) -> ImportReport {
        let mut report = ImportReport {
            rows_read: parsed.rows_read,
            rows_skipped: parsed.rows_skipped,
            ..Default::default()
        };

        if let Some(progress) = progress {
            progress.begin(parsed.rows.len()).await;
        }

        for row in parsed.rows {
            match store.insert(collection, &row.record).await {
                Ok(_) => {
                    report.written += 1;
                    if let Some(progress) = progress {
                        progress.row_written().await;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        collection = %collection,
                        row = row.line,
                        error = %e,
                        "Failed to write imported row"
                    );
                    report.failures.push(RowFailure {
                        line: row.line,
                        location: row.record.location,
                        error: e.to_string(),
                    });
                    if let Some(progress) = progress {
                        progress.row_failed().await;
                    }
                }
            }
        }

        if let Some(progress) = progress {
            progress.finish().await;
        }

        tracing::info!(
            collection = %collection,
            written = report.written,
            failed = report.failures.len(),
            skipped = report.rows_skipped,
            "CSV import finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ImportState;
    use crate::records::{CaseRecord, MemoryStore, StoreError, StoreResult};
    use async_trait::async_trait;

    const HEADER: &str = "loc,cases,deaths,date,Region,year";

    fn export(rows: &[&str]) -> String {
        let mut data = String::from(HEADER);
        data.push('\n');
        data.push_str("Sheet 1,,,,,\n");
        data.push_str("generated,,,,,\n");
        for row in rows {
            data.push_str(row);
            data.push('\n');
        }
        data
    }

    /// Rejects inserts for one location
    struct RejectingStore {
        inner: MemoryStore,
        reject: &'static str,
    }

    #[async_trait]
    impl RecordStore for RejectingStore {
        fn name(&self) -> &str {
            "rejecting"
        }

        async fn list(&self, collection: &str) -> StoreResult<Vec<CaseRecord>> {
            self.inner.list(collection).await
        }

        async fn insert(&self, collection: &str, record: &NewCaseRecord) -> StoreResult<String> {
            if record.location == self.reject {
                return Err(StoreError::Unavailable);
            }
            self.inner.insert(collection, record).await
        }

        async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
            self.inner.delete(collection, id).await
        }
    }

    #[test]
    fn test_metadata_rows_are_skipped() {
        let data = export(&["Manila,12,1,5/6/2021,NATIONAL CAPITAL REGION,2021"]);
        let parsed = CaseCsvImporter::new().parse_str(&data).unwrap();

        assert_eq!(parsed.rows_read, 3);
        assert_eq!(parsed.rows_skipped, 2);
        assert_eq!(parsed.rows.len(), 1);

        let row = &parsed.rows[0];
        assert_eq!(row.line, 4);
        assert_eq!(row.record.location, "Manila");
        assert_eq!(row.record.region, "NATIONAL CAPITAL REGION");
        assert_eq!(row.record.cases, 12);
        assert_eq!(row.record.deaths, 1);
        assert_eq!(row.record.date, NaiveDate::from_ymd_opt(2021, 6, 5));
        assert_eq!(row.record.year, Some(2021));
    }

    #[test]
    fn test_skip_rows_is_configurable() {
        let data = "loc,cases\nCebu,3\nDavao,4\n";
        let parsed = CaseCsvImporter::new().with_skip_rows(0).parse_str(data).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows_skipped, 0);
    }

    #[test]
    fn test_short_file_skips_everything() {
        let data = "loc,cases\nCebu,3\n";
        let parsed = CaseCsvImporter::new().parse_str(data).unwrap();
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.rows_skipped, 1);
    }

    #[test]
    fn test_coercions() {
        let data = export(&[
            "Iloilo,-4,abc,31/02/2021,REGION VI-WESTERN VISAYAS,n/a",
            "Tacloban,7.8,,,REGION VIII-EASTERN VISAYAS,",
            "Ragged,5",
        ]);
        let parsed = CaseCsvImporter::new().parse_str(&data).unwrap();
        assert_eq!(parsed.rows.len(), 3);

        let first = &parsed.rows[0].record;
        assert_eq!(first.cases, 0);
        assert_eq!(first.deaths, 0);
        assert_eq!(first.date, None);
        assert_eq!(first.year, None);

        assert_eq!(parsed.rows[1].record.cases, 7);

        let ragged = &parsed.rows[2].record;
        assert_eq!(ragged.cases, 5);
        assert_eq!(ragged.region, "");
    }

    #[test]
    fn test_blank_lines_and_header_case() {
        let data = " LOC , Cases ,REGION\n\nmeta,,\n\nmeta,,\nButuan,10,CARAGA\n\n";
        let parsed = CaseCsvImporter::new().parse_str(data).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].record.location, "Butuan");
        assert_eq!(parsed.rows[0].record.region, "CARAGA");
    }

    #[test]
    fn test_custom_date_format() {
        let data = "loc,date\nPasig,2021-06-05\n";
        let parsed = CaseCsvImporter::new()
            .with_skip_rows(0)
            .with_date_format("%Y-%m-%d")
            .parse_str(data)
            .unwrap();
        assert_eq!(parsed.rows[0].record.date, NaiveDate::from_ymd_opt(2021, 6, 5));
    }

    #[test]
    fn test_parse_failures() {
        let importer = CaseCsvImporter::new();

        assert!(matches!(importer.parse_str(""), Err(ImportError::Parse(_))));
        assert!(matches!(
            importer.parse_str("foo,bar\n1,2\n"),
            Err(ImportError::Parse(_))
        ));

        let invalid_utf8: &[u8] = b"loc,cases\nm,1\nm,1\n\xff\xfe,1\n";
        assert!(matches!(
            importer.parse_reader(invalid_utf8),
            Err(ImportError::Csv(_))
        ));
    }

    #[test]
    fn test_parse_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.csv");
        std::fs::write(&path, export(&["Butuan,10,1,01/01/2022,CARAGA,2022"])).unwrap();

        let parsed = CaseCsvImporter::new().parse_path(&path).unwrap();
        assert_eq!(parsed.rows.len(), 1);

        let missing = CaseCsvImporter::new().parse_path(&dir.path().join("missing.csv"));
        assert!(matches!(missing, Err(ImportError::Io(_))));
    }

    #[tokio::test]
    async fn test_import_writes_all_rows() {
        let store = MemoryStore::new();
        let progress = ImportProgress::new();
        let importer = CaseCsvImporter::new();
        let parsed = importer
            .parse_str(&export(&[
                "Butuan,10,1,01/01/2022,CARAGA,2022",
                "Surigao,5,0,02/01/2022,caraga,2022",
            ]))
            .unwrap();

        let report = importer
            .import_into(&store, "cases", parsed, Some(&progress))
            .await;

        assert!(report.is_complete());
        assert_eq!(report.written, 2);
        assert_eq!(store.len("cases").await, 2);

        let status = progress.status().await;
        assert_eq!(status.state, ImportState::Completed);
        assert_eq!(status.written, 2);
    }

    #[tokio::test]
    async fn test_single_row_export_stores_iso_date() {
        let store = MemoryStore::new();
        let importer = CaseCsvImporter::new();
        let parsed = importer
            .parse_str(&export(&["Manila,3,0,05/06/2021,NCR,2021"]))
            .unwrap();

        let report = importer.import_into(&store, "cases", parsed, None).await;
        assert_eq!(report.written, 1);

        let records = store.list("cases").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date_string(), "2021-06-05");
        assert_eq!(records[0].region, "NCR");
    }

    #[tokio::test]
    async fn test_partial_import_continues_after_failure() {
        let store = RejectingStore {
            inner: MemoryStore::new(),
            reject: "Bad",
        };
        let progress = ImportProgress::new();
        let importer = CaseCsvImporter::new();
        let parsed = importer
            .parse_str(&export(&["Good,1,0,,,", "Bad,2,0,,,", "Also good,3,0,,,"]))
            .unwrap();

        let report = importer
            .import_into(&store, "cases", parsed, Some(&progress))
            .await;

        assert!(!report.is_complete());
        assert_eq!(report.written, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].location, "Bad");
        assert_eq!(report.failures[0].line, 5);

        let stored: Vec<String> = store
            .list("cases")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.location)
            .collect();
        assert_eq!(stored, vec!["Good", "Also good"]);
        assert_eq!(progress.status().await.state, ImportState::Partial);
    }
}
