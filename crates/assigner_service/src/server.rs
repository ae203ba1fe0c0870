use crate::config::ServiceConfig;
use crate::errors::ServiceError;
use crate::request::ticket_from_json;
use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use ticket_assigner_core::{AssignerError, ModelMetadata, PersistedModel, Pipeline};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Routes served by [`build_router`], as listed in the 404 response
pub const AVAILABLE_ENDPOINTS: [&str; 3] = ["GET /health", "POST /predict", "GET /model/info"];

/// Process-wide state: the loaded pipeline plus request bookkeeping.
///
/// The pipeline is never written after construction.
pub struct AppState {
    pipeline: Pipeline,
    metadata: ModelMetadata,
    start_time: Instant,
    req_count: AtomicU64,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(pipeline: Pipeline, metadata: ModelMetadata) -> Self {
        Self {
            pipeline,
            metadata,
            start_time: Instant::now(),
            req_count: AtomicU64::new(0),
        }
    }

    /// Load and validate the model named by `config`
    pub fn load(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let model = PersistedModel::load_json(&config.model_path)?;
        if config.verify_hash {
            model.verify_hash_file(config.hash_path())?;
            debug!("Model hash matches {}", config.hash_path().display());
        }

        let metadata = model.metadata.clone();
        let pipeline = Pipeline::from_artifact(model)?;
        Ok(Self::new(pipeline, metadata))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn request_count(&self) -> u64 {
        self.req_count.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<AssignerError> for ApiError {
    fn from(err: AssignerError) -> Self {
        match err {
            AssignerError::InvalidInput(msg) => Self::bad_request(msg),
            AssignerError::UntrainedModel => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                AssignerError::UntrainedModel.to_string(),
            ),
            other => Self::internal(format!("prediction failed: {other}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

#[derive(Debug, Serialize)]
struct PredictResponse {
    assignee: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
    model_metadata: ModelMetadata,
    uptime_secs: u64,
    req_total: u64,
}

#[derive(Debug, Serialize)]
struct ModelInfoResponse {
    assignees: Vec<String>,
    vocabulary_size: usize,
    training_samples: usize,
    tree_count: usize,
    metadata: ModelMetadata,
}

#[derive(Debug, Serialize)]
struct NotFoundResponse {
    error: &'static str,
    available_endpoints: [&'static str; 3],
}

/// Serve until `shutdown` resolves
pub async fn start_server<F>(state: AppState, addr: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(Arc::new(state));
    let listener = bind_listener(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind listener on {addr}"))
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/predict", post(handle_predict))
        .route("/model/info", get(handle_model_info))
        .fallback(handle_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn count_requests(State(state): State<SharedState>, req: Request, next: Next) -> Response {
    state.req_count.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}

async fn handle_predict(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| {
        warn!("Rejected prediction request: {}", rejection.body_text());
        ApiError::bad_request(rejection.body_text())
    })?;

    let ticket = ticket_from_json(&body)?;
    let assignee = state.pipeline.predict_ticket(&ticket)?;
    debug!(assignee, "Predicted assignee");

    Ok(Json(PredictResponse {
        assignee: assignee.to_string(),
    }))
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model_loaded: state.pipeline.is_fitted(),
        model_metadata: state.metadata.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        req_total: state.request_count(),
    })
}

async fn handle_model_info(State(state): State<SharedState>) -> Json<ModelInfoResponse> {
    Json(ModelInfoResponse {
        assignees: state.pipeline.labels().to_vec(),
        vocabulary_size: state.pipeline.vocabulary_size(),
        training_samples: state.metadata.training_samples,
        tree_count: state.pipeline.tree_count(),
        metadata: state.metadata.clone(),
    })
}

async fn handle_not_found() -> (StatusCode, Json<NotFoundResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            error: "Endpoint not found",
            available_endpoints: AVAILABLE_ENDPOINTS,
        }),
    )
}
