use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{Method, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use haven_core::{GatewayErrorBody, GatewayReply, GatewayRequest};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::providers::{CompletionRequest, ProviderError};
use crate::state::GatewayState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Run the HTTP server
pub async fn run(
    state: Arc<GatewayState>,
    bind_addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Gateway listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/chat",
            post(chat_handler).fallback(method_not_allowed_handler),
        )
        .with_state(state)
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn error_response(status: StatusCode, body: GatewayErrorBody) -> Response {
    (status, Json(body)).into_response()
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Any method other than POST on /api/chat
async fn method_not_allowed_handler() -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        GatewayErrorBody::new("Method Not Allowed"),
    )
}

/// Chat relay handler - POST /api/chat
async fn chat_handler(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<GatewayRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected chat request body: {}", rejection.body_text());
            return error_response(
                StatusCode::BAD_REQUEST,
                GatewayErrorBody::new(rejection.body_text()),
            );
        }
    };

    let Some(upstream) = state.upstream() else {
        error!("No upstream credential configured");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            GatewayErrorBody::missing_upstream_credential(),
        );
    };

    let model = request
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.default_model().to_string());
    let completion = CompletionRequest::from_messages(model, request.messages);
    if let Err(reason) = completion.validate() {
        return error_response(StatusCode::BAD_REQUEST, GatewayErrorBody::new(reason));
    }

    info!(
        model = %completion.model,
        messages = completion.messages().len(),
        "Relaying chat request"
    );

    match tokio::time::timeout(state.timeout(), upstream.complete(&completion)).await {
        Ok(Ok(reply)) => (StatusCode::OK, Json(GatewayReply { reply })).into_response(),
        Ok(Err(ProviderError::ApiError { status, message })) => {
            warn!(status, "Upstream API error");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            let details =
                serde_json::from_str::<Value>(&message).unwrap_or(Value::String(message));
            error_response(
                status,
                GatewayErrorBody::new("Upstream API Error").with_details(details),
            )
        }
        Ok(Err(e)) => {
            error!("Upstream call failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                GatewayErrorBody::new(e.to_string()),
            )
        }
        Err(_) => {
            warn!(
                timeout_secs = state.timeout().as_secs(),
                "Upstream call timed out"
            );
            error_response(
                StatusCode::GATEWAY_TIMEOUT,
                GatewayErrorBody::new("Request Timeout"),
            )
        }
    }
}
