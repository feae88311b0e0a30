// HTTP fetch and HTML table walk for the BCRA bank holidays page
use crate::holiday::RawRow;
use crate::source::{RowFetcher, SourceError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_HOLIDAYS_URL: &str = "https://www.bcra.gob.ar/consulta-feriados-bancarios/";

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub url: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_HOLIDAYS_URL.to_string(),
            timeout_ms: 30_000,
            user_agent: format!("feriados/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

pub struct BcraScraper {
    client: reqwest::Client,
    config: ScraperConfig,
}

impl BcraScraper {
    pub fn new(config: ScraperConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SourceError::Fetch(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl RowFetcher for BcraScraper {
    async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        debug!("fetching holidays page from {}", self.config.url);

        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| SourceError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        // A body cut short by the connection is a transport failure, only an
        // undecodable one is a document problem
        let body = response.text().await.map_err(|e| {
            if e.is_decode() {
                SourceError::ParseDocument(e.to_string())
            } else {
                SourceError::Fetch(e.to_string())
            }
        })?;

        parse_rows(&body)
    }
}

/// Walks every `table tr` of the document, skipping the first (header) row, and
/// returns the cell texts of each row that has at least two `td` cells.
pub fn parse_rows(html: &str) -> Result<Vec<RawRow>, SourceError> {
    let table_selector = selector("table")?;
    let row_selector = selector("table tr")?;
    let cell_selector = selector("td")?;

    let document = Html::parse_document(html);
    if document.select(&table_selector).next().is_none() {
        return Err(SourceError::ParseDocument(
            "no holiday table found in document".to_string(),
        ));
    }

    let rows = document
        .select(&row_selector)
        .skip(1)
        .map(|row| {
            row.select(&cell_selector)
                .map(|cell| cell.text().collect::<String>())
                .collect::<Vec<_>>()
        })
        .filter(|cells| cells.len() >= 2)
        .map(|cells| RawRow { cells })
        .collect();

    Ok(rows)
}

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css)
        .map_err(|e| SourceError::ParseDocument(format!("invalid selector {:?}: {}", css, e)))
}
