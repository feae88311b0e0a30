// HTTP layer: JSON holiday list and health check
use crate::cache::SnapshotCache;
use crate::holiday::{HealthResponse, HolidaysResponse};
use crate::service::HolidayService;
use crate::source::RowFetcher;
use actix_web::http::header;
use actix_web::{web, App, HttpResponse, HttpServer};
use chrono::Utc;
use tracing::{error, info};

pub fn configure<C, F>(cfg: &mut web::ServiceConfig)
where
    C: SnapshotCache,
    F: RowFetcher,
{
    cfg.service(
        web::resource("/api/feriados")
            .route(web::get().to(holidays::<C, F>))
            .default_service(web::to(method_not_allowed)),
    )
    .service(web::resource("/api/health").route(web::route().to(health)));
}

async fn holidays<C, F>(service: web::Data<HolidayService<C, F>>) -> HttpResponse
where
    C: SnapshotCache,
    F: RowFetcher,
{
    match service.get_holidays().await {
        Ok(holidays) => HttpResponse::Ok()
            .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
            .json(HolidaysResponse::from(holidays.as_slice())),
        Err(err) => {
            error!("error grabbing feriados: {}", err);
            HttpResponse::InternalServerError()
                .content_type("text/plain; charset=utf-8")
                .body(format!("error grabbing feriados: {}", err))
        }
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse::ok(Utc::now()))
}

async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().body("not allowed")
}

pub async fn run<C, F>(
    service: web::Data<HolidayService<C, F>>,
    host: String,
    port: u16,
) -> std::io::Result<()>
where
    C: SnapshotCache,
    F: RowFetcher,
{
    info!("server: http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .configure(configure::<C, F>)
    })
    .bind((host, port))?
    .run()
    .await
}
