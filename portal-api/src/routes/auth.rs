use actix_web::{web, HttpResponse};
use common::db;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use crate::{errors::ApiError, AppState};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 128, message = "Missing walletAddr"))]
    pub wallet_addr: String,
}

/// Resolves a wallet to its user row, creating it on first login. Wallet
/// signature checks happen before this point.
#[actix_web::post("/login")]
async fn login(
    req: web::Json<LoginRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let AppState { pool } = &**app_state;
    let wallet_addr = req.wallet_addr.trim();

    info!("Login for wallet {}", wallet_addr);
    let (user, created) = db::find_or_create_user(pool, wallet_addr).await?;

    let body = json!({
        "success": true,
        "created": created,
        "user": {
            "id": user.id,
            "walletAddr": user.wallet_addr,
            "points": user.points,
            "avatar": user.avatar,
            "createdAt": user.created_at,
        }
    });

    if created {
        Ok(HttpResponse::Created().json(body))
    } else {
        Ok(HttpResponse::Ok().json(body))
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/auth").service(login));
}
