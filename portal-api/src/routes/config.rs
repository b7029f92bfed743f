use actix_web::{web, HttpResponse};
use common::db;
use serde_json::{json, Map, Value};

use crate::{errors::ApiError, AppState};

#[actix_web::get("/rules")]
async fn rules(app_state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let AppState { pool } = &**app_state;
    let configs = db::list_points_config(pool).await?;

    let rules: Map<String, Value> = configs
        .into_iter()
        .map(|c| {
            (
                c.key,
                json!({ "value": c.value, "description": c.description }),
            )
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "rules": rules })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/config").service(rules));
}
