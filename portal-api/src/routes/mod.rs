use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use points::{store::LedgerStore, Clock};
use serde_json::json;
use tracing::debug;

use crate::{errors::ApiError, metrics};

pub mod auth;
pub mod config;
pub mod earn;
pub mod user;

#[actix_web::get("/api/health")]
async fn health_check() -> impl Responder {
    debug!("Health check request arrived");
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}

/// JSON extractor config that reports body errors in the API's error shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

pub fn configure<S, C>(cfg: &mut web::ServiceConfig)
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    cfg.service(health_check)
        .service(metrics::metrics_endpoint)
        .configure(earn::configure::<S, C>)
        .configure(auth::configure)
        .configure(user::configure)
        .configure(config::configure);
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::Value;

    use super::*;

    #[actix_web::test]
    async fn health_reports_ok() {
        let app = test::init_service(App::new().service(health_check)).await;
        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
    }

    #[actix_web::test]
    async fn metrics_are_exposed() {
        metrics::EARN_REQUESTS.with_label_values(&["awarded"]).inc_by(0);
        let app = test::init_service(App::new().service(metrics::metrics_endpoint)).await;
        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("earn_requests_total"));
    }
}
