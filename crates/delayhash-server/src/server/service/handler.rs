//! HTTP routes for the deferred hashing service.
//!
//! | Route           | Method     | Response                                     |
//! |-----------------|------------|----------------------------------------------|
//! | `/hash`         | `POST`     | `<id>\n`, or an empty body without password  |
//! | `/hash/{id}`    | `GET`      | `<digest>\n`, or 404 while pending/unknown   |
//! | `/stats`        | `GET`      | `{"total": N, "average": M}`                 |
//! | `/shutdown`     | `GET/POST` | starts a graceful shutdown                   |
//! | `/healthz`      | `GET`      | `SERVING` or 503 `NOT_SERVING`               |
//!
//! Any other method on `/hash` is answered with 404.

use super::middleware::track_in_flight;
use crate::server::telemetry::{
    increment_lookups, increment_submissions, increment_submissions_ignored,
    increment_submissions_refused, record_submit_duration,
};
use axum::{
    Json, Router,
    extract::{Form, Path, State, rejection::FormRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use delayhash::{Error, SharedShutdown, ShutdownState, StatsSnapshot, SubmissionService};
use serde::Deserialize;
use tokio::time::Instant;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: SubmissionService,
    pub shutdown: SharedShutdown,
}

impl AppState {
    pub fn new(service: SubmissionService, shutdown: SharedShutdown) -> Self {
        Self { service, shutdown }
    }
}

/// Form body of `POST /hash`.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub password: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/hash", post(submit).fallback(not_found))
        .route("/hash/{id}", get(lookup))
        .route("/stats", get(stats))
        .route("/shutdown", get(shutdown).post(shutdown))
        .route("/healthz", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), track_in_flight))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// A missing or unparsable form is treated as an empty password, which the
/// service ignores.
#[tracing::instrument(skip_all)]
async fn submit(
    State(state): State<AppState>,
    form: Result<Form<SubmitForm>, FormRejection>,
) -> Result<String, Error> {
    let start = Instant::now();
    let password = form.map(|Form(form)| form.password).unwrap_or_default();

    match state.service.submit_since(password, start) {
        Ok(Some(id)) => {
            increment_submissions();
            record_submit_duration(start.elapsed().as_micros() as f64);
            Ok(format!("{id}\n"))
        }
        Ok(None) => {
            increment_submissions_ignored();
            Ok(String::new())
        }
        Err(e) => {
            increment_submissions_refused();
            tracing::warn!("Refusing submission: {e}");
            Err(e)
        }
    }
}

#[tracing::instrument(skip_all, fields(id = %id))]
async fn lookup(State(state): State<AppState>, Path(id): Path<String>) -> Result<String, Error> {
    match state.service.lookup_raw(&id) {
        Ok(digest) => {
            increment_lookups(true);
            Ok(format!("{digest}\n"))
        }
        Err(e) => {
            increment_lookups(false);
            tracing::warn!("Missing index {id}");
            Err(e)
        }
    }
}

async fn stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.service.stats())
}

async fn shutdown(State(state): State<AppState>) -> &'static str {
    if state.shutdown.request_shutdown() {
        tracing::info!("Shutdown requested over HTTP");
    }
    "Shutting down HTTP server\n"
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.shutdown.state() {
        ShutdownState::Running => (StatusCode::OK, "SERVING\n"),
        ShutdownState::Draining | ShutdownState::Terminated => {
            (StatusCode::SERVICE_UNAVAILABLE, "NOT_SERVING\n")
        }
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, header},
    };
    use core::time::Duration;
    use delayhash::{InFlightTracker, ShutdownCoordinator};
    use tower::ServiceExt;

    const DELAY: Duration = Duration::from_secs(5);
    /// SHA-512 of `angryMonkey`, standard base64 with padding.
    const ANGRY_MONKEY: &str =
        "ZEHhWB65gUlzdVwtDQArEyx+KVLzp/aTaRaPlBzYRIFj6vjFdqEb0Q5B8zVKCZ0vKbZPZklJz0Fd7su2A+gf7Q==";

    fn state() -> AppState {
        let inflight = InFlightTracker::new();
        let shutdown = ShutdownCoordinator::shared(inflight.clone(), Duration::from_secs(60));
        let service = SubmissionService::new(DELAY, inflight, shutdown.admission_token());
        AppState::new(service, shutdown)
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, String) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn post_form(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn post_returns_id_then_digest() {
        let state = state();

        let (status, body) = send(&state, post_form("/hash", "password=angryMonkey")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1\n");

        let (status, _) = send(&state, get("/hash/1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        tokio::time::sleep(DELAY + Duration::from_millis(1)).await;
        let (status, body) = send(&state, get("/hash/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("{ANGRY_MONKEY}\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn post_without_password_does_nothing() {
        let state = state();

        let empty = Request::builder()
            .method(Method::POST)
            .uri("/hash")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&state, empty).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        let (status, body) = send(&state, post_form("/hash", "password=")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());

        assert_eq!(state.service.stats().total, 0);
        assert!(state.service.inflight().is_empty());
    }

    #[tokio::test]
    async fn get_on_hash_is_not_found() {
        let (status, _) = send(&state(), get("/hash")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_ids_are_not_found() {
        let state = state();
        send(&state, post_form("/hash", "password=angryMonkey")).await;
        assert!(state.service.inflight().drain(Duration::from_secs(60)).await);

        let (status, _) = send(&state, get("/hash/1")).await;
        assert_eq!(status, StatusCode::OK);
        for uri in ["/hash/999", "/hash/abc", "/hash/-1", "/hash/01", "/hash/0001", "/hash/+1"] {
            let (status, _) = send(&state, get(uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stats_reports_totals() {
        let state = state();

        let (status, body) = send(&state, get("/stats")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"total":0,"average":0}"#);
        let snapshot: StatsSnapshot = serde_json::from_str(&body).unwrap();
        assert_eq!(snapshot, StatsSnapshot { total: 0, average: 0 });

        send(&state, post_form("/hash", "password=a")).await;
        send(&state, post_form("/hash", "password=b")).await;

        let (_, body) = send(&state, get("/stats")).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["average"], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_refuses_new_submissions() {
        let state = state();
        let (status, _) = send(&state, get("/healthz")).await;
        assert_eq!(status, StatusCode::OK);

        send(&state, post_form("/hash", "password=early")).await;

        let (status, body) = send(&state, post_form("/shutdown", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Shutting down HTTP server\n");
        assert_eq!(state.shutdown.state(), ShutdownState::Draining);

        let (status, _) = send(&state, post_form("/hash", "password=late")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, body) = send(&state, get("/healthz")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "NOT_SERVING\n");

        // A second request is a no-op, and the admitted work still drains.
        send(&state, get("/shutdown")).await;
        assert_eq!(state.shutdown.run().await, delayhash::ShutdownOutcome::Drained);
        assert!(state.service.lookup_raw("1").is_ok());
        assert_eq!(state.service.stats().total, 1);
    }

    #[tokio::test]
    async fn requests_are_released_after_responding() {
        let state = state();
        send(&state, get("/stats")).await;
        send(&state, get("/hash/1")).await;
        assert!(state.service.inflight().is_empty());
    }
}
