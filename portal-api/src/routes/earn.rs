use std::time::Instant;

use actix_web::{web, HttpResponse, ResponseError};
use points::{store::LedgerStore, Clock, EarnOutcome, EarnReport, PointsEngine};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::{auth::WalletIdentity, errors::ApiError, metrics};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EarnRequest {
    #[validate(
        required(message = "Missing gameId"),
        range(min = 1, message = "Missing gameId")
    )]
    pub game_id: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0, message = "duration must be non-negative"))]
    pub duration: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "adClicks must be non-negative"))]
    pub ad_clicks: i64,
    pub session_id: Option<String>,
}

#[derive(Serialize)]
struct EarnResponse {
    success: bool,
    #[serde(flatten)]
    outcome: EarnOutcome,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[validate(
        required(message = "Missing gameId"),
        range(min = 1, message = "Missing gameId")
    )]
    pub game_id: Option<i32>,
}

pub fn configure<S, C>(cfg: &mut web::ServiceConfig)
where
    S: LedgerStore + 'static,
    C: Clock + 'static,
{
    cfg.service(
        web::scope("/api/points")
            .route("/earn", web::post().to(earn::<S, C>))
            .route("/session", web::post().to(start_session::<S, C>)),
    );
}

async fn earn<S: LedgerStore + 'static, C: Clock + 'static>(
    engine: web::Data<PointsEngine<S, C>>,
    identity: WalletIdentity,
    req: web::Json<EarnRequest>,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let result = settle_earn(&engine, &identity, req.into_inner()).await;

    match result {
        Ok(outcome) => {
            metrics::record_earn(&outcome, started.elapsed().as_secs_f64());
            Ok(HttpResponse::Ok().json(EarnResponse {
                success: true,
                outcome,
            }))
        }
        Err(e) => {
            metrics::record_earn_failure(e.status_code().as_u16());
            Err(e)
        }
    }
}

async fn settle_earn<S: LedgerStore, C: Clock>(
    engine: &PointsEngine<S, C>,
    identity: &WalletIdentity,
    req: EarnRequest,
) -> Result<EarnOutcome, ApiError> {
    req.validate()?;
    let game_id = req
        .game_id
        .ok_or_else(|| ApiError::BadRequest("Missing gameId".to_string()))?;

    let report = EarnReport {
        game_id,
        duration: req.duration,
        ad_clicks: req.ad_clicks,
        session_token: req.session_id,
    };

    Ok(engine.earn(&identity.wallet_addr, report).await?)
}

async fn start_session<S: LedgerStore + 'static, C: Clock + 'static>(
    engine: web::Data<PointsEngine<S, C>>,
    identity: WalletIdentity,
    req: web::Json<StartSessionRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let game_id = req
        .game_id
        .ok_or_else(|| ApiError::BadRequest("Missing gameId".to_string()))?;

    let session = engine
        .start_session(&identity.wallet_addr, game_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "sessionId": session.token,
        "gameId": session.game_id,
        "startedAt": session.started_at,
    })))
}
