use axum::extract::State;
use axum::Json;

use super::AppState;

/// All stored items, newest discovery first.
pub(super) async fn list_products(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut products = state.bot.item_store().all().await;
    products.sort_by(|a, b| b.discovered_at.cmp(&a.discovered_at));
    Json(serde_json::json!({ "success": true, "products": products }))
}
