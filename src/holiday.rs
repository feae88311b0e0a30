use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// A bank holiday as served to clients
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Holiday {
    pub date: DateTime<Utc>,
    pub description: String,
}

impl Holiday {
    pub fn new(date: DateTime<Utc>, description: impl Into<String>) -> Self {
        Self {
            date,
            description: description.into(),
        }
    }
}

/// One table row as scraped from the holidays page, before any trimming or parsing.
///
/// The first cell holds the date text and the second the description. Rows with
/// fewer than two cells are carried as-is and skipped during extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    pub fn date_text(&self) -> Option<&str> {
        self.cells.first().map(String::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.cells.get(1).map(String::as_str)
    }
}

impl From<(&str, &str)> for RawRow {
    fn from((date_text, description): (&str, &str)) -> Self {
        Self::new([date_text, description])
    }
}

// Body of GET /api/feriados
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HolidaysResponse {
    #[serde(rename = "feriados")]
    pub holidays: Vec<Holiday>,
    pub total: usize,
}

impl From<&[Holiday]> for HolidaysResponse {
    fn from(holidays: &[Holiday]) -> Self {
        Self {
            total: holidays.len(),
            holidays: holidays.to_vec(),
        }
    }
}

// Body of GET /api/health
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: String,
}

impl HealthResponse {
    pub fn ok(now: DateTime<Utc>) -> Self {
        Self {
            status: "ok".to_string(),
            time: now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}
