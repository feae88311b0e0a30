// Turns scraped table rows into validated holidays
use crate::date_parser;
use crate::holiday::{Holiday, RawRow};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use thiserror::Error;
use tracing::{debug, info};

// Failures of the upstream fetch. Any of these fails the whole refresh.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("request error: {0}")]
    Fetch(String),

    #[error("status code error: {status} {reason}")]
    HttpStatus { status: u16, reason: String },

    #[error("html parse error: {0}")]
    ParseDocument(String),
}

// Supplies the raw rows of the holidays table, header row already removed
#[async_trait]
pub trait RowFetcher: Send + Sync + 'static {
    async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError>;
}

pub struct HolidaySource<F: RowFetcher> {
    fetcher: F,
}

impl<F: RowFetcher> HolidaySource<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Fetches the table and extracts this year's holidays from it.
    pub async fn fetch_holidays(&self) -> Result<Vec<Holiday>, SourceError> {
        let rows = self.fetcher.fetch_rows().await?;
        let row_count = rows.len();
        let holidays = extract(rows, Utc::now().year());
        info!(
            "extracted {} holidays from {} table rows",
            holidays.len(),
            row_count
        );
        Ok(holidays)
    }
}

/// Builds holidays from raw rows, in row order.
///
/// Rows with fewer than two cells, or whose date text does not parse, are dropped
/// without failing the batch.
pub fn extract<I>(rows: I, reference_year: i32) -> Vec<Holiday>
where
    I: IntoIterator<Item = RawRow>,
{
    rows.into_iter()
        .filter_map(|row| {
            let (Some(date_text), Some(description)) = (row.date_text(), row.description())
            else {
                debug!("skipping row with {} cells", row.cells.len());
                return None;
            };

            match date_parser::parse(date_text.trim(), reference_year) {
                Ok(date) => Some(Holiday::new(date, description.trim())),
                Err(err) => {
                    debug!("skipping row {:?}: {}", date_text.trim(), err);
                    None
                }
            }
        })
        .collect()
}
