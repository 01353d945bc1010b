use axum::extract::State;
use axum::Json;
use serde_json::Value;

use torivahti_core::{Settings, SettingsPatch};
use torivahti_store::StoreError;

use super::{ApiFailure, AppState};

/// Placeholder the UI sees instead of stored credentials. Posting it back
/// unchanged keeps the stored value.
const CREDENTIAL_MASK: &str = "***MASKED***";

/// JSON pointers to the credential fields that must never leave the
/// process in cleartext.
const MASKED_FIELDS: &[&str] = &["/openai/api_key", "/login/password"];

pub(super) async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiFailure> {
    let settings = state.bot.settings_store().snapshot().await;
    Ok(Json(serde_json::json!({
        "success": true,
        "settings": masked(&settings)?,
    })))
}

pub(super) async fn update_settings(
    State(state): State<AppState>,
    Json(mut patch): Json<SettingsPatch>,
) -> Result<Json<Value>, ApiFailure> {
    if let Some(openai) = &mut patch.openai {
        if openai.api_key.as_deref() == Some(CREDENTIAL_MASK) {
            openai.api_key = None;
        }
    }
    if let Some(login) = &mut patch.login {
        if login.password.as_deref() == Some(CREDENTIAL_MASK) {
            login.password = None;
        }
    }

    match state.bot.settings_store().update(&patch).await {
        Ok(updated) => Ok(Json(serde_json::json!({
            "success": true,
            "settings": masked(&updated)?,
        }))),
        Err(StoreError::Validation(e)) => Err(ApiFailure::bad_request(e.to_string())),
        Err(e) => {
            tracing::error!(error = %e, "failed to persist settings");
            Err(ApiFailure::internal("failed to persist settings"))
        }
    }
}

fn masked(settings: &Settings) -> Result<Value, ApiFailure> {
    let mut value = serde_json::to_value(settings).map_err(|e| {
        tracing::error!(error = %e, "failed to serialize settings");
        ApiFailure::internal("failed to serialize settings")
    })?;
    for pointer in MASKED_FIELDS {
        if let Some(field) = value.pointer_mut(pointer) {
            if field.as_str().is_some_and(|v| !v.is_empty()) {
                *field = Value::String(CREDENTIAL_MASK.to_owned());
            }
        }
    }
    Ok(value)
}
