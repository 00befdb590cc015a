use actix_web::error::JsonPayloadError;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use serde_json::json;
use tracing::{debug, error, warn};

use crate::engine::RelayEngine;
use crate::error::{RelayError, Result};
use crate::models::{EventKind, TransactionEvent};

/// Route table plus a JSON extractor that answers 400 before admission,
/// so a malformed payload never burns its group id
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(malformed_event))
        .service(index)
        .service(add_transaction)
        .service(update_transaction);
}

/// Service identity, useful as a reachability probe
#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "app_name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Webhook entry point for newly stored transaction groups
#[post("/transaction/add")]
async fn add_transaction(
    engine: web::Data<RelayEngine>,
    event: web::Json<TransactionEvent>,
) -> HttpResponse {
    respond(engine.handle_event(EventKind::Created, &event).await)
}

/// Webhook entry point for updated transaction groups
#[post("/transaction/update")]
async fn update_transaction(
    engine: web::Data<RelayEngine>,
    event: web::Json<TransactionEvent>,
) -> HttpResponse {
    respond(engine.handle_event(EventKind::Updated, &event).await)
}

/// Every non-error outcome answers 200 so the webhook sender does not
/// redeliver no-ops forever; mutation failures answer 500
fn respond(result: Result<crate::engine::Outcome>) -> HttpResponse {
    match result {
        Ok(outcome) => {
            debug!(?outcome, "delivery handled");
            HttpResponse::Ok().body("OK")
        }
        Err(err) => {
            error!(error = %err, "delivery failed");
            HttpResponse::InternalServerError().json(json!({ "message": err.to_string() }))
        }
    }
}

fn malformed_event(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    let reason = RelayError::MalformedEvent(err.to_string());
    warn!(path = %req.path(), error = %reason, "rejecting event");
    actix_web::error::InternalError::from_response(
        err,
        HttpResponse::BadRequest().json(json!({ "message": reason.to_string() })),
    )
    .into()
}
