use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::basic_auth::{check_basic_auth, unauthorized_response};
use crate::config::BasicAuthConfig;
use crate::queue::JobQueue;
use crate::utils::constants::DEFAULT_LIMIT;
use crate::utils::job_info::{to_csv, JobInfo};

/// Shared state for the operational endpoints.
#[derive(Clone)]
pub struct OpsState {
    pub queue: Arc<dyn JobQueue>,
    pub basic_auth: Option<BasicAuthConfig>,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

pub async fn stats(req: HttpRequest, state: web::Data<OpsState>) -> impl Responder {
    if !check_basic_auth(&req, state.basic_auth.as_ref()) {
        return unauthorized_response();
    }

    let pending = state.queue.pending_depth().await;
    let in_flight = state.queue.in_flight_depth().await;
    match (pending, in_flight) {
        (Ok(pending), Ok(in_flight)) => {
            HttpResponse::Ok().json(json!({ "pending": pending, "inFlight": in_flight }))
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to read queue depths");
            HttpResponse::InternalServerError().json(json!({ "error": "queue unavailable" }))
        }
    }
}

pub async fn export_in_flight_csv(
    req: HttpRequest,
    state: web::Data<OpsState>,
    query: web::Query<LimitQuery>,
) -> impl Responder {
    if !check_basic_auth(&req, state.basic_auth.as_ref()) {
        return unauthorized_response();
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let payloads = match state.queue.peek_in_flight(limit).await {
        Ok(payloads) => payloads,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read in-flight jobs");
            return HttpResponse::InternalServerError().body("queue unavailable");
        }
    };

    let rows: Vec<JobInfo> = payloads.iter().map(|p| JobInfo::from_payload(p)).collect();
    match to_csv(&rows) {
        Ok(data) => HttpResponse::Ok()
            .content_type("text/csv")
            .append_header(("Content-Disposition", "attachment; filename=in_flight.csv"))
            .body(data),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Failed to render CSV");
            HttpResponse::InternalServerError().finish()
        }
    }
}
