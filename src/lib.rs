// Bank holiday service: scrapes the BCRA holiday table and serves it as JSON,
// refreshing at most once per TTL window

pub mod cache;
pub mod config;
pub mod date_parser;
pub mod fetcher;
pub mod holiday;
pub mod server;
pub mod service;
pub mod source;

// Re-export key types for convenience
pub use cache::{
    CacheConfig, CacheStatsReport, Clock, HolidayCache, ManualClock, Snapshot, SnapshotCache,
    SystemClock,
};
pub use config::{ConfigError, ServiceConfig};
pub use date_parser::{month_from_name, parse as parse_date, DateParseError};
pub use fetcher::{BcraScraper, ScraperConfig};
pub use holiday::{HealthResponse, Holiday, HolidaysResponse, RawRow};
pub use service::HolidayService;
pub use source::{extract, HolidaySource, RowFetcher, SourceError};
