use actix_web::web;
use crate::services::metrics_service::{export_in_flight_csv, stats};

pub fn ops_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            .route("/stats", web::get().to(stats))
            .route("/in_flight.csv", web::get().to(export_in_flight_csv))
    );
}
