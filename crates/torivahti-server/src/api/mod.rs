mod control;
mod products;
mod settings;

use std::path::Path;
use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use torivahti_bot::Bot;

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<Bot>,
}

/// Uniform failure body; the status code carries the HTTP-level meaning,
/// the message is for the UI.
pub(super) struct ApiFailure {
    pub status: StatusCode,
    pub message: String,
}

impl ApiFailure {
    pub(super) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(super) fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(serde_json::json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn build_app(state: AppState, images_dir: &Path) -> Router {
    Router::new()
        .route("/api/products", get(products::list_products))
        .route(
            "/api/settings",
            get(settings::get_settings).post(settings::update_settings),
        )
        .route("/api/valuate", post(control::trigger_valuations))
        .route("/api/fetch", post(control::fetch_products))
        .route("/api/status", get(control::status))
        .route("/api/start", post(control::start_bot))
        .route("/api/stop", post(control::stop_bot))
        .nest_service("/images", ServeDir::new(images_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors()),
        )
        .with_state(state)
}
