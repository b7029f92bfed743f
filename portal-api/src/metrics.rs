use actix_web::{HttpResponse, Responder};
use lazy_static::lazy_static;
use points::EarnOutcome;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use tracing::error;

// Points Metrics
lazy_static! {
    pub static ref EARN_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "earn_requests_total",
        "Earn calls by outcome",
        &["outcome"]
    )
    .unwrap();
    pub static ref POINTS_AWARDED: IntCounter =
        register_int_counter!("points_awarded_total", "Total points awarded").unwrap();
    pub static ref TIER_CAP_CLIPS: IntCounter = register_int_counter!(
        "tier_cap_clips_total",
        "Sessions whose tier points were reduced by the per-game daily cap"
    )
    .unwrap();
    pub static ref AD_CLICKS_REJECTED: IntCounter = register_int_counter!(
        "ad_clicks_rejected_total",
        "Reported ad clicks beyond the per-user daily cap"
    )
    .unwrap();
    pub static ref EARN_DURATION: Histogram = register_histogram!(
        "earn_duration_seconds",
        "Time taken to settle an earn call",
        vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .unwrap();
}

pub fn record_earn(outcome: &EarnOutcome, duration_secs: f64) {
    EARN_DURATION.observe(duration_secs);
    if outcome.replayed {
        EARN_REQUESTS.with_label_values(&["replayed"]).inc();
        return;
    }
    EARN_REQUESTS.with_label_values(&["awarded"]).inc();
    POINTS_AWARDED.inc_by(outcome.earned_points.max(0) as u64);
    if outcome.tier_clipped {
        TIER_CAP_CLIPS.inc();
    }
    AD_CLICKS_REJECTED.inc_by(outcome.rejected_ad_clicks.max(0) as u64);
}

pub fn record_earn_failure(status: u16) {
    let outcome = match status {
        400 => "invalid",
        401 => "unauthorized",
        404 => "not_found",
        _ => "error",
    };
    EARN_REQUESTS.with_label_values(&[outcome]).inc();
}

#[actix_web::get("/metrics")]
pub async fn metrics_endpoint() -> impl Responder {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    match encoder.encode(&prometheus::gather(), &mut buffer) {
        Ok(()) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            HttpResponse::InternalServerError().finish()
        }
    }
}
