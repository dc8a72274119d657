//! HTTP surface for the rate aggregator.
//!
//! `GET /currency-rates` runs one aggregation cycle per request and always answers 200;
//! upstream or storage trouble only shrinks the lists.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use currency_rates::market_data::{RateAggregator, RatesSnapshot};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<RateAggregator>,
}

impl AppState {
    pub fn new(aggregator: RateAggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/currency-rates", get(currency_rates))
        .layer(middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn currency_rates(State(state): State<AppState>) -> Json<RatesSnapshot> {
    let started = Instant::now();
    let snapshot = state.aggregator.current_rates().await;
    info!(
        fiat = snapshot.fiat.len(),
        crypto = snapshot.crypto.len(),
        took_ms = started.elapsed().as_millis() as u64,
        "served currency rates"
    );
    Json(snapshot)
}

/// Reuse a non-blank incoming `X-Request-ID` or mint a UUIDv4, expose it on both the request
/// and the response, and run the rest of the stack inside a span carrying it.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = match request.headers().get(REQUEST_ID_HEADER) {
        Some(value) if value.to_str().is_ok_and(|s| !s.trim().is_empty()) => value.clone(),
        _ => HeaderValue::from_str(&Uuid::new_v4().to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("unknown")),
    };
    request.headers_mut().insert(REQUEST_ID_HEADER, id.clone());

    let span = info_span!(
        "request",
        request_id = id.to_str().unwrap_or_default(),
        method = %request.method(),
        path = %request.uri().path(),
    );
    let mut response = next.run(request).instrument(span).await;
    response.headers_mut().insert(REQUEST_ID_HEADER, id);
    response
}
