use crate::config::Config;
use crate::errors::AppError;
use crate::models::{CustomerInput, CustomerRecord, ScoringResponse};
use crate::scoring_client::ScoringAdapter;
use crate::views::{render_form, render_score};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the remote scoring endpoint.
    pub adapter: ScoringAdapter,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let adapter = ScoringAdapter::new(&config)?;
        Ok(Self { config, adapter })
    }
}

/// Form and scoring API routes. Health is mounted separately so it can bypass rate limiting.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index).post(submit_form))
        .route("/api/v1/score", post(score_customer))
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /
///
/// Empty input form.
pub async fn index() -> Html<String> {
    Html(render_form(&HashMap::new(), &[]))
}

/// POST /
///
/// Validates the submitted form, scores it and renders the result. Any failure
/// re-renders the form with every submitted value intact plus the error messages.
pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    tracing::info!("POST / - form submission with {} fields", form.len());

    let outcome = match CustomerRecord::from_form(&form) {
        Ok(record) => state.adapter.score(&record).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(response) => (StatusCode::OK, Html(render_score(&response))).into_response(),
        Err(e) => {
            e.log();
            (
                e.status_code(),
                Html(render_form(&form, &e.user_messages())),
            )
                .into_response()
        }
    }
}

/// POST /api/v1/score
///
/// JSON variant of the form: takes a camelCase customer record and returns the
/// normalized scoring response.
///
/// # Returns
///
/// * `Response` - The risk label and optional distribution as JSON, or an error body.
///   Bodies that parse but do not fit the record are 422; a missing content type or
///   broken JSON keeps the status axum assigns to the rejection.
pub async fn score_customer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CustomerInput>, JsonRejection>,
) -> Response {
    let input = match payload {
        Ok(Json(input)) => input,
        Err(JsonRejection::JsonDataError(rejection)) => {
            return AppError::ValidationError(vec![rejection.body_text()]).into_response();
        }
        Err(rejection) => {
            tracing::debug!("Rejected scoring request: {}", rejection.body_text());
            return (
                rejection.status(),
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    tracing::info!("POST /api/v1/score");

    match score_input(&state, input).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn score_input(
    state: &AppState,
    input: CustomerInput,
) -> Result<ScoringResponse, AppError> {
    let record = CustomerRecord::try_from(input)?;
    state.adapter.score(&record).await
}
