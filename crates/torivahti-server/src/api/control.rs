use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::AppState;

pub(super) async fn trigger_valuations(State(state): State<AppState>) -> Json<Value> {
    let outcome = state.bot.trigger_valuations().await;
    Json(serde_json::json!({
        "success": outcome.started,
        "message": outcome.message,
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct FetchRequest {
    num_products: u32,
}

/// Kicks the multi-page fetch off in the background and returns
/// immediately; progress lands in the log and the store.
pub(super) async fn fetch_products(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> Json<Value> {
    let bot = Arc::clone(&state.bot);
    let num_products = request.num_products;
    tokio::spawn(async move {
        let outcome = bot.fetch_multiple_pages(num_products).await;
        tracing::info!(
            pages = outcome.pages_processed,
            new_items = outcome.new_items,
            "manual fetch finished"
        );
    });
    Json(serde_json::json!({
        "success": true,
        "message": format!("Fetching up to {num_products} products in the background"),
    }))
}

pub(super) async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "success": true,
        "running": state.bot.is_running(),
        "product_count": state.bot.item_store().len().await,
    }))
}

pub(super) async fn start_bot(State(state): State<AppState>) -> Json<Value> {
    let started = state.bot.start().await;
    Json(serde_json::json!({
        "success": true,
        "running": true,
        "message": if started { "Bot started" } else { "Bot already running" },
    }))
}

pub(super) async fn stop_bot(State(state): State<AppState>) -> Json<Value> {
    state.bot.stop().await;
    Json(serde_json::json!({
        "success": true,
        "running": false,
        "message": "Bot stopped",
    }))
}
