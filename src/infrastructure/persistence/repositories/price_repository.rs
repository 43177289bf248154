use crate::domain::errors::ForecastError;
use crate::domain::market::{FetchOrder, InstrumentId, PricePoint, PriceSeries};
use crate::domain::ports::PriceStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// Close prices in the `instrument_prices` table.
pub struct SqlitePriceStore {
    pool: SqlitePool,
}

impl SqlitePriceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert every point of `series`. Returns the number of rows written.
    pub async fn insert_series(
        &self,
        instrument_id: &InstrumentId,
        series: &PriceSeries,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for point in series.points() {
            let close = Decimal::from_f64(point.close)
                .with_context(|| format!("Close {} is not representable", point.close))?;
            let result = sqlx::query(
                r#"
                INSERT INTO instrument_prices (instrument_id, timestamp, close_price)
                VALUES (?, ?, ?)
                ON CONFLICT(instrument_id, timestamp) DO UPDATE SET
                    close_price = excluded.close_price
                "#,
            )
            .bind(instrument_id.to_string())
            .bind(point.timestamp.timestamp_millis())
            .bind(close.normalize().to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to save price")?;
            written += result.rows_affected();
        }

        tx.commit().await.context("Failed to commit price import")?;
        info!("Persisted {} prices for {}", written, instrument_id);
        Ok(written)
    }

    pub async fn count(&self, instrument_id: &InstrumentId) -> Result<usize> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM instrument_prices WHERE instrument_id = ?")
            .bind(instrument_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        Ok(count as usize)
    }

    fn map_rows_to_points(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<PricePoint>> {
        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            let millis: i64 = row.try_get("timestamp")?;
            let raw: String = row.try_get("close_price")?;

            let timestamp = DateTime::from_timestamp_millis(millis)
                .with_context(|| format!("Invalid timestamp {}", millis))?;
            let close = Decimal::from_str(&raw)
                .ok()
                .and_then(|d| d.to_f64())
                .with_context(|| format!("Invalid close price '{}'", raw))?;

            points.push(PricePoint::new(timestamp, close));
        }
        Ok(points)
    }
}

#[async_trait]
impl PriceStore for SqlitePriceStore {
    async fn fetch_series(
        &self,
        instrument_id: &InstrumentId,
        order: FetchOrder,
        limit: usize,
    ) -> Result<PriceSeries, ForecastError> {
        let sql = match order {
            FetchOrder::Earliest => {
                "SELECT timestamp, close_price FROM instrument_prices WHERE instrument_id = ? ORDER BY timestamp ASC LIMIT ?"
            }
            FetchOrder::Latest => {
                "SELECT timestamp, close_price FROM instrument_prices WHERE instrument_id = ? ORDER BY timestamp DESC LIMIT ?"
            }
        };

        let rows = sqlx::query(sql)
            .bind(instrument_id.to_string())
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(ForecastError::store)?;

        let mut points = Self::map_rows_to_points(rows).map_err(|e| ForecastError::InvalidSeries {
            reason: format!("{:#}", e),
        })?;
        if order == FetchOrder::Latest {
            points.reverse();
        }

        debug!(
            "Fetched {} prices for {} ({:?})",
            points.len(),
            instrument_id,
            order
        );
        PriceSeries::new(points)
    }
}
