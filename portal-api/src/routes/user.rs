use actix_web::{web, HttpResponse};
use common::db;
use points::PointsError;
use serde::Deserialize;
use serde_json::json;

use crate::{auth::WalletIdentity, errors::ApiError, AppState};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

impl HistoryQuery {
    fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

#[actix_web::get("/profile")]
async fn profile(
    identity: WalletIdentity,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let AppState { pool } = &**app_state;

    let user = db::find_user_by_wallet(pool, &identity.wallet_addr)
        .await?
        .ok_or(PointsError::NotFound)?;
    let stats = db::get_user_stats(pool, user.id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "user": {
            "id": user.id,
            "walletAddr": user.wallet_addr,
            "points": user.points,
            "avatar": user.avatar,
            "createdAt": user.created_at,
        },
        "stats": stats,
    })))
}

#[actix_web::get("/history")]
async fn history(
    identity: WalletIdentity,
    query: web::Query<HistoryQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let AppState { pool } = &**app_state;
    let page = query.page();
    let limit = query.limit();
    let offset = query.offset();

    let user = db::find_user_by_wallet(pool, &identity.wallet_addr)
        .await?
        .ok_or(PointsError::NotFound)?;
    let (history, total) = db::get_game_play_history(pool, user.id, limit, offset).await?;

    let has_more = offset.saturating_add(history.len() as i64) < total;
    Ok(HttpResponse::Ok().json(json!({
        "history": history,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "totalPages": (total + limit - 1) / limit,
            "hasMore": has_more,
        }
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/user").service(profile).service(history));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_query_clamps_paging() {
        let q = HistoryQuery {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), MAX_PAGE_SIZE);

        let q = HistoryQuery {
            page: None,
            limit: None,
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn history_offset_saturates_on_huge_pages() {
        let q = HistoryQuery {
            page: Some(3),
            limit: Some(20),
        };
        assert_eq!(q.offset(), 40);

        let q = HistoryQuery {
            page: Some(i64::MAX),
            limit: Some(MAX_PAGE_SIZE),
        };
        assert_eq!(q.offset(), i64::MAX);
    }
}
