//! Inference configuration editing.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{AppState, CurrentUser};
use crate::error::AppError;
use crate::inference::{InferenceConfig, InferenceConfigUpdate, ModelCatalog};

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigurationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[schema(value_type = Object)]
    pub config: InferenceConfig,
    #[schema(value_type = Object)]
    pub models: Option<ModelCatalog>,
}

/// Request body: `{"config": {"active_model", "key", "page_limit", "prompt"}}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfigurationParams {
    pub config: InferenceConfigUpdate,
}

#[utoipa::path(
    get,
    path = "/configuration/edit",
    responses(
        (status = 200, description = "Current inference config and selectable models", body = ConfigurationResponse),
        (status = 422, description = "Config file missing or unreadable")
    ),
    tag = "Configuration"
)]
pub async fn edit_configuration(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> Result<Json<ConfigurationResponse>, AppError> {
    let config = InferenceConfig::load(&state.inference_config_path).await?;
    let models = ModelCatalog::load(&state.inference_models_path)
        .await
        .map_err(|e| tracing::warn!("{}", e))
        .ok();

    Ok(Json(ConfigurationResponse {
        notice: None,
        config,
        models,
    }))
}

#[utoipa::path(
    patch,
    path = "/configuration",
    request_body = ConfigurationParams,
    responses(
        (status = 200, description = "Config rewritten", body = ConfigurationResponse),
        (status = 422, description = "Config file could not be updated")
    ),
    tag = "Configuration"
)]
pub async fn update_configuration(
    State(state): State<AppState>,
    _current: CurrentUser,
    Json(params): Json<ConfigurationParams>,
) -> Result<Json<ConfigurationResponse>, AppError> {
    let config = InferenceConfig::update_file(&state.inference_config_path, &params.config)
        .await
        .map_err(|e| AppError::Unprocessable(format!("Error updating configuration: {}", e)))?;
    tracing::info!("Inference configuration updated (model {})", config.active_model);

    Ok(Json(ConfigurationResponse {
        notice: Some("Configuration updated successfully".to_string()),
        config,
        models: None,
    }))
}
