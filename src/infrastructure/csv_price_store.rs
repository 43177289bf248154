//! Price history from a CSV file.
//!
//! Expected columns are `timestamp,close` (also accepted: `Date`/`Close`
//! and `close_price`). Extra columns are ignored. Timestamps may be RFC 3339,
//! `YYYY-MM-DD HH:MM:SS` (UTC) or a bare `YYYY-MM-DD`.

use crate::domain::errors::ForecastError;
use crate::domain::market::{FetchOrder, InstrumentId, PricePoint, PriceSeries};
use crate::domain::ports::PriceStore;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize)]
struct PriceRecord {
    #[serde(alias = "Date", alias = "date")]
    timestamp: String,
    #[serde(alias = "Close", alias = "close_price")]
    close: f64,
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

/// Parse a price CSV into a chronological series. Row order does not matter.
pub fn read_series<R: Read>(reader: R) -> Result<PriceSeries, ForecastError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut points = Vec::new();

    for (idx, result) in rdr.deserialize().enumerate() {
        // header is line 1
        let line = idx + 2;
        let record: PriceRecord = result.map_err(|e| ForecastError::InvalidSeries {
            reason: format!("line {}: {}", line, e),
        })?;
        let timestamp =
            parse_timestamp(&record.timestamp).ok_or_else(|| ForecastError::InvalidSeries {
                reason: format!("line {}: unrecognised timestamp '{}'", line, record.timestamp),
            })?;
        points.push(PricePoint::new(timestamp, record.close));
    }

    PriceSeries::from_unordered(points)
}

/// Read-only store over a single-instrument CSV file.
///
/// The file holds one instrument, so the requested id is not checked.
pub struct CsvPriceStore {
    path: PathBuf,
    series: PriceSeries,
}

impl CsvPriceStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ForecastError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| {
            ForecastError::store(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let series = read_series(BufReader::new(file))?;
        info!("Loaded {} prices from {:?}", series.len(), path);
        Ok(Self { path, series })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }
}

#[async_trait]
impl PriceStore for CsvPriceStore {
    async fn fetch_series(
        &self,
        _instrument_id: &InstrumentId,
        order: FetchOrder,
        limit: usize,
    ) -> Result<PriceSeries, ForecastError> {
        let points = self.series.points();
        let take = limit.min(points.len());
        let slice = match order {
            FetchOrder::Earliest => &points[..take],
            FetchOrder::Latest => &points[points.len() - take..],
        };
        PriceSeries::new(slice.to_vec())
    }
}
