use super::handler::AppState;
use crate::server::telemetry::{decrement_requests_inflight, increment_requests_inflight};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Keeps the `requests_inflight` gauge balanced even if the handler panics.
struct InFlightGauge;

impl InFlightGauge {
    fn start() -> Self {
        increment_requests_inflight();
        Self
    }
}

impl Drop for InFlightGauge {
    fn drop(&mut self) {
        decrement_requests_inflight();
    }
}

/// Registers the request as a unit of in-flight work for as long as its
/// handler runs, so a drain waits for responses already being produced.
pub async fn track_in_flight(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let _unit = state.service.inflight().enter();
    let _gauge = InFlightGauge::start();
    next.run(request).await
}
