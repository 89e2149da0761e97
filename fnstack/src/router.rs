//! HTTP router for fnstack

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use fnstack_core::{ErrorCode, RuntimeError};
use fnstack_runtime::{
    construct_global_scope, twiml::DocumentKinds, ApiClientFactory, ClientFactory, Dispatcher,
    Function, FunctionRegistry, InboundRequest, Invoker, LocalDiscovery, ScopeDependencies,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, info};

use crate::config::Config;

/// Largest request body handed to a function
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for the router
pub struct AppState {
    functions: Arc<FunctionRegistry>,
    invoker: Invoker,
    assets_dir: Option<PathBuf>,
}

impl AppState {
    /// Build the scope, install it process-wide and wire the invoker
    pub fn new(config: &Config, functions: Arc<FunctionRegistry>) -> Self {
        Self::with_factory(config, functions, Arc::new(ApiClientFactory))
    }

    pub fn with_factory(
        config: &Config,
        functions: Arc<FunctionRegistry>,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        let runtime_config = config.runtime_config();
        let assets_dir = config.runtime.assets_dir.clone();
        let discovery = Arc::new(LocalDiscovery::new(
            assets_dir.clone(),
            Arc::clone(&functions),
        ));
        let scope = construct_global_scope(
            &runtime_config,
            ScopeDependencies {
                factory: Arc::clone(&factory),
                discovery,
            },
        );

        let kinds = config
            .runtime
            .markup_kinds
            .iter()
            .fold(DocumentKinds::default(), |kinds, kind| kinds.with_kind(kind.as_str()));

        info!(
            url = %runtime_config.url,
            functions = functions.len(),
            assets_dir = ?assets_dir,
            "Runtime ready"
        );

        Self {
            functions,
            invoker: Invoker::new(runtime_config, scope, factory)
                .with_dispatcher(Dispatcher::new(kinds)),
            assets_dir,
        }
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(health_check))
        .fallback(dispatch)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "functions": state.functions.names(),
    }))
}

/// Functions first, then assets, then 404
async fn dispatch(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let name = path.trim_matches('/');

    if !name.is_empty() {
        if let Some(function) = state.functions.get(name) {
            return invoke(&state, name, function, request).await;
        }
    }

    if let Some(dir) = &state.assets_dir {
        if let Ok(response) = ServeDir::new(dir).oneshot(request).await {
            if response.status() != StatusCode::NOT_FOUND {
                return response.map(Body::new);
            }
        }
        debug!(path = %path, "No asset at path");
        return error_response(
            RuntimeError::new(ErrorCode::AssetNotFound, format!("No function or asset at {}", path))
                .with_resource(path.as_str()),
        );
    }

    error_response(
        RuntimeError::new(ErrorCode::FunctionNotFound, format!("No function at {}", path))
            .with_resource(path.as_str()),
    )
}

async fn invoke(
    state: &AppState,
    name: &str,
    function: Arc<dyn Function>,
    request: Request,
) -> Response {
    let query = request.uri().query().map(str::to_string);
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let body = match to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(_) => {
            return error_response(
                RuntimeError::new(
                    ErrorCode::PayloadTooLarge,
                    format!("Request body exceeds {} bytes", MAX_BODY_BYTES),
                )
                .with_resource(name),
            )
        }
    };

    let inbound = InboundRequest::from_parts(query.as_deref(), content_type.as_deref(), &body);
    state
        .invoker
        .invoke(name, function, inbound)
        .await
        .into_response()
}

fn error_response(error: RuntimeError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        error.to_json(),
    )
        .into_response()
}
