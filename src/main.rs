use actix_web::web;
use anyhow::Context;
use feriados::{BcraScraper, HolidayCache, HolidayService, HolidaySource, ServiceConfig};
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default level
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .compact()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    let config = ServiceConfig::from_env().context("loading configuration")?;

    let scraper = BcraScraper::new(config.scraper.clone()).context("building HTTP client")?;
    tracing::info!(
        "holidays from {} (ttl {}s, timeout {}ms)",
        scraper.url(),
        config.cache.ttl_seconds,
        config.scraper.timeout_ms
    );
    let cache = Arc::new(HolidayCache::new(config.cache.clone()));
    let service = web::Data::new(HolidayService::new(cache, HolidaySource::new(scraper)));

    let (host, port) = config.bind_address();
    feriados::server::run(service, host, port)
        .await
        .context("running HTTP server")
}
