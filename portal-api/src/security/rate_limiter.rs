use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error, Error,
};
use futures::future::{ok, LocalBoxFuture, Ready};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    task::{Context, Poll},
    time::{Duration, Instant},
};

const WINDOW: Duration = Duration::from_secs(60);

/// Fixed one-minute window per client IP, shared by every worker it is
/// cloned into.
#[derive(Clone)]
pub struct RateLimiter {
    requests_per_minute: usize,
    ip_tracking: Arc<Mutex<HashMap<String, (usize, Instant)>>>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: usize) -> Self {
        RateLimiter {
            requests_per_minute,
            ip_tracking: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimiterMiddleware {
            service,
            requests_per_minute: self.requests_per_minute,
            ip_tracking: self.ip_tracking.clone(),
        })
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    requests_per_minute: usize,
    ip_tracking: Arc<Mutex<HashMap<String, (usize, Instant)>>>,
}

impl<S> RateLimiterMiddleware<S> {
    fn admit(&self, ip: &str) -> bool {
        let mut ip_map = self.ip_tracking.lock().unwrap_or_else(|e| e.into_inner());
        admit_at(&mut ip_map, self.requests_per_minute, ip, Instant::now())
    }
}

fn admit_at(
    ip_map: &mut HashMap<String, (usize, Instant)>,
    requests_per_minute: usize,
    ip: &str,
    now: Instant,
) -> bool {
    // Drop clients whose window has lapsed so the map tracks only active IPs
    ip_map.retain(|_, (_, started)| now.duration_since(*started) <= WINDOW);

    match ip_map.get_mut(ip) {
        Some((count, _)) => {
            if *count >= requests_per_minute {
                return false;
            }
            *count += 1;
        }
        None => {
            ip_map.insert(ip.to_string(), (1, now));
        }
    }
    true
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let exempt = matches!(req.path(), "/api/health" | "/metrics");

        if !exempt {
            let ip = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();

            if !self.admit(&ip) {
                return Box::pin(async move {
                    Err(error::ErrorTooManyRequests(
                        "Rate limit exceeded. Try again later.",
                    ))
                });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{test, web, App, HttpResponse};

    use super::*;

    async fn ok_handler() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[::core::prelude::v1::test]
    fn stale_windows_are_swept() {
        let mut ip_map = HashMap::new();
        let start = Instant::now();

        assert!(admit_at(&mut ip_map, 1, "10.0.0.1", start));
        assert!(!admit_at(&mut ip_map, 1, "10.0.0.1", start));
        assert!(admit_at(&mut ip_map, 1, "10.0.0.2", start));
        assert_eq!(ip_map.len(), 2);

        let later = start + WINDOW + Duration::from_secs(1);
        assert!(admit_at(&mut ip_map, 1, "10.0.0.3", later));
        assert_eq!(ip_map.len(), 1);
        assert!(ip_map.contains_key("10.0.0.3"));

        assert!(admit_at(&mut ip_map, 1, "10.0.0.1", later));
    }

    #[actix_web::test]
    async fn rejects_requests_over_the_limit() {
        let app = test::init_service(
            App::new()
                .wrap(RateLimiter::new(2))
                .route("/api/points/earn", web::post().to(ok_handler))
                .route("/api/health", web::get().to(ok_handler)),
        )
        .await;

        for _ in 0..2 {
            let req = test::TestRequest::post().uri("/api/points/earn").to_request();
            assert!(test::call_service(&app, req).await.status().is_success());
        }

        let req = test::TestRequest::post().uri("/api/points/earn").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.as_response_error().status_code().as_u16(), 429);

        let req = test::TestRequest::get().uri("/api/health").to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }
}
