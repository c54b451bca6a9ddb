//! Inference settings and the editable JSON configuration file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::client::InferenceError;

/// How the summary endpoint is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_endpoint() -> String {
    "http://localhost:9000/2015-03-31/functions/function/invocations".to_string()
}

fn default_model() -> String {
    "gemini-1.5-pro-latest".to_string()
}

fn default_page_limit() -> u32 {
    7
}

fn default_timeout() -> u64 {
    300
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            page_limit: default_page_limit(),
            timeout: default_timeout(),
        }
    }
}

/// Contents of the inference `config.json`.
///
/// Only the four editable fields are typed; anything else in the file is
/// kept in `extra` and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default)]
    pub active_model: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub page_limit: i64,
    #[serde(default)]
    pub prompt: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Submitted form for `PATCH /configuration`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct InferenceConfigUpdate {
    #[serde(default)]
    pub active_model: String,
    #[serde(default)]
    pub key: String,
    /// Accepts a number or a numeric string; anything else becomes 0.
    #[serde(default)]
    #[schema(value_type = i64)]
    pub page_limit: Value,
    #[serde(default)]
    pub prompt: String,
}

fn coerce_integer(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .enumerate()
                .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && *c == '-'))
                .map(|(_, c)| c)
                .collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    }
}

impl InferenceConfig {
    pub async fn load(path: &Path) -> Result<Self, InferenceError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| InferenceError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| InferenceError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply the four editable fields.
    pub fn apply(&mut self, update: &InferenceConfigUpdate) {
        self.active_model = update.active_model.clone();
        self.key = update.key.clone();
        self.page_limit = coerce_integer(&update.page_limit);
        self.prompt = update.prompt.clone();
    }

    /// Write the file back, pretty-printed.
    pub async fn save(&self, path: &Path) -> Result<(), InferenceError> {
        let pretty = serde_json::to_string_pretty(self)
            .map_err(|e| InferenceError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InferenceError::Config(format!("{}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(path, pretty)
            .await
            .map_err(|e| InferenceError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load, apply the update and save in one step.
    pub async fn update_file(
        path: &Path,
        update: &InferenceConfigUpdate,
    ) -> Result<Self, InferenceError> {
        let mut config = Self::load(path).await?;
        config.apply(update);
        config.save(path).await?;
        Ok(config)
    }
}

/// The selectable models listed in `models.json`, kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCatalog(pub Value);

impl ModelCatalog {
    pub async fn load(path: &Path) -> Result<Self, InferenceError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| InferenceError::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map(ModelCatalog)
            .map_err(|e| InferenceError::Config(format!("{}: {}", path.display(), e)))
    }
}
