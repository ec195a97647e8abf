use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

fn cors(public_base_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match public_base_url.trim_end_matches('/').parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(public_base_url, "PUBLIC_BASE_URL is not a valid origin, CORS disabled");
            layer
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let public_base_url = state.config.public_base_url.clone();

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/bookings/create", post(handlers::bookings::create_booking))
        .route("/api/bookings/promo", post(handlers::bookings::create_promo_booking))
        .route("/api/bookings/reschedule", post(handlers::client::reschedule))
        .route("/api/bookings/lookup", post(handlers::client::lookup))
        .route("/api/bookings/mine", get(handlers::client::my_bookings))
        .route("/api/otp/send", post(handlers::client::send_otp))
        .route("/api/otp/verify", post(handlers::client::verify_otp))
        .route(
            "/api/payments/create-checkout",
            post(handlers::payments::create_checkout),
        )
        .route("/api/payments/webhook", post(handlers::payments::webhook))
        .route("/api/admin/login", post(handlers::admin::login))
        .route("/api/admin/logout", post(handlers::admin::logout))
        .route("/api/admin/stats", get(handlers::admin::get_stats))
        .route("/api/admin/bookings", get(handlers::admin::list_bookings))
        .route(
            "/api/admin/bookings/:id",
            get(handlers::admin::get_booking).patch(handlers::admin::update_booking),
        )
        .route("/api/admin/calendar", get(handlers::admin::get_calendar))
        .route("/api/admin/revenue", get(handlers::admin::get_revenue))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&public_base_url))
        .with_state(state)
}
