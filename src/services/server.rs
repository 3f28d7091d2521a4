//! HTTP proxy in front of the language model, so browsers never see the
//! server-side API key.

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use log::{info, warn};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::core::config::Config;
use crate::services::generator::{
    DirectClient, ErrorResponse, GenerateError, GenerateResponse, GenerationClient, SkitRequest,
};

pub const GENERATE_PATH: &str = "/api/generate";

/// Maps generation failures onto HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    MethodNotAllowed,
    Internal(String),
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Validation(e) => ApiError::BadRequest(e.to_string()),
            GenerateError::MissingCredential => {
                ApiError::Internal("Server configuration error: API key not set".to_string())
            }
            GenerateError::Configuration(msg) => {
                ApiError::Internal(format!("Server configuration error: {}", msg))
            }
            GenerateError::Upstream(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    client: Arc<dyn GenerationClient>,
}

/// POST /api/generate - validate, forward upstream, return the raw skit text
async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<SkitRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

    info!(
        "Generate request: topic={:?} tone={:?} people={:?}",
        request.topic, request.tone, request.num_people
    );
    match state.client.generate(&request).await {
        Ok(script) => Ok(Json(GenerateResponse { script })),
        Err(e) => {
            warn!("Generate request failed: {}", e);
            Err(e.into())
        }
    }
}

const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::OPTIONS,
    Method::PATCH,
    Method::DELETE,
    Method::POST,
    Method::PUT,
];

const ALLOWED_HEADERS: [HeaderName; 9] = [
    HeaderName::from_static("x-csrf-token"),
    HeaderName::from_static("x-requested-with"),
    header::ACCEPT,
    HeaderName::from_static("accept-version"),
    header::CONTENT_LENGTH,
    HeaderName::from_static("content-md5"),
    header::CONTENT_TYPE,
    header::DATE,
    HeaderName::from_static("x-api-version"),
];

/// Bare OPTIONS requests get the same allow lists as a browser preflight.
async fn preflight() -> impl IntoResponse {
    let methods: Vec<_> = ALLOWED_METHODS.iter().map(Method::as_str).collect();
    let allowed_headers = ALLOWED_HEADERS;
    let headers: Vec<_> = allowed_headers.iter().map(HeaderName::as_str).collect();
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, methods.join(", ")),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, headers.join(", ")),
        ],
    )
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS)
}

pub fn router(client: Arc<dyn GenerationClient>, static_dir: Option<&str>) -> Router {
    let mut app = Router::new()
        .route(
            GENERATE_PATH,
            post(generate).options(preflight).fallback(method_not_allowed),
        )
        .layer(cors())
        .with_state(AppState { client });

    if let Some(dir) = static_dir {
        info!("Serving static files from {}", dir);
        app = app.fallback_service(ServeDir::new(dir));
    }
    app
}

pub async fn serve(config: &Config) -> Result<()> {
    let client = DirectClient::from_config(&config.llm)?;
    if !client.is_configured() {
        warn!("Starting without an API key; generate requests will fail until one is set");
    }

    let app = router(Arc::new(client), config.server.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("Skit proxy listening on http://{}", listener.local_addr()?);
    info!("  POST {}  - generate a skit", GENERATE_PATH);

    axum::serve(listener, app).await?;
    Ok(())
}
