use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};

use crate::auth::WALLET_HEADER;

mod rate_limiter;

pub use rate_limiter::RateLimiter;

pub fn configure_cors(allowed_origins: &[String]) -> Cors {
    // No configured origins means any origin, as the mobile client sends none
    if allowed_origins.is_empty() {
        return Cors::permissive();
    }

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(WALLET_HEADER),
        ])
        .supports_credentials()
        .max_age(3600);

    for origin in allowed_origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}
