//! Configuration management for ASAP PDF using the prefer crate.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::inference::InferenceSettings;
use crate::repository::DbContext;
use crate::storage::StorageSettings;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "asap-pdf.db";

/// Default web server bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

const INFERENCE_CONFIG_FILENAME: &str = "config.json";
const INFERENCE_MODELS_FILENAME: &str = "models.json";

/// Runtime settings after config file, flags and environment are merged.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base directory for the database and inference files.
    pub data_dir: PathBuf,
    /// Database filename within data_dir.
    pub database_filename: String,
    /// Full database URL; wins over data_dir/database_filename when set.
    pub database_url: Option<String>,
    /// Disable TLS for PostgreSQL connections.
    pub no_tls: bool,
    /// Address the web server listens on.
    pub bind: String,
    /// Take the client address from `X-Forwarded-For`/`X-Real-IP`. Only
    /// enable behind a reverse proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
    pub inference: InferenceSettings,
    /// Editable inference config (`active_model`, `key`, `page_limit`, `prompt`).
    pub inference_config_path: PathBuf,
    /// Models offered on the configuration page.
    pub inference_models_path: PathBuf,
    /// Object store for PDFs; `None` leaves version lookups empty.
    pub storage: Option<StorageSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        // ~/Documents/asap-pdf, falling back to home then the current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("asap-pdf");
        Self::with_data_dir(data_dir)
    }
}

impl Settings {
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            inference_config_path: data_dir.join(INFERENCE_CONFIG_FILENAME),
            inference_models_path: data_dir.join(INFERENCE_MODELS_FILENAME),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            no_tls: false,
            bind: DEFAULT_BIND.to_string(),
            trust_proxy_headers: false,
            inference: InferenceSettings::default(),
            storage: None,
        }
    }

    pub fn database_url(&self) -> String {
        match self.database_url {
            Some(ref url) => url.clone(),
            None => format!("sqlite:{}", self.database_path().display()),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// True for PostgreSQL (assumed to exist) or an existing SQLite file.
    pub fn database_exists(&self) -> bool {
        self.database_url.is_some() || self.database_path().exists()
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })
    }

    pub fn create_db_context(&self) -> Result<DbContext, diesel::result::Error> {
        DbContext::from_url(&self.database_url(), self.no_tls)
    }
}

/// Contents of an `asap-pdf.{toml,yaml,json}` config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub data_dir: Option<String>,
    /// Database filename, or a full `sqlite:`/`postgres://` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_proxy_headers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference: Option<InferenceSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_config: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_models: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageSettings>,

    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover and load a config file, falling back to defaults.
    pub async fn load() -> Self {
        match prefer::load("asap-pdf").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await.unwrap_or_else(|e| {
                    tracing::warn!("{}", e);
                    Self::default()
                }),
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load from an explicit path, choosing the parser by extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory containing the config file.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Expand `~` and resolve relative paths against `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            let data_dir = self.resolve_path(data_dir, base_dir);
            settings.inference_config_path = data_dir.join(INFERENCE_CONFIG_FILENAME);
            settings.inference_models_path = data_dir.join(INFERENCE_MODELS_FILENAME);
            settings.data_dir = data_dir;
        }
        if let Some(ref database) = self.database {
            if database.contains("://") || database.starts_with("sqlite:") {
                settings.database_url = Some(database.clone());
            } else {
                settings.database_filename = database.clone();
            }
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        if let Some(no_tls) = self.no_tls {
            settings.no_tls = no_tls;
        }
        if let Some(trust) = self.trust_proxy_headers {
            settings.trust_proxy_headers = trust;
        }
        if let Some(ref inference) = self.inference {
            settings.inference = inference.clone();
        }
        if let Some(ref path) = self.inference_config {
            settings.inference_config_path = self.resolve_path(path, base_dir);
        }
        if let Some(ref path) = self.inference_models {
            settings.inference_models_path = self.resolve_path(path, base_dir);
        }
        if let Some(ref storage) = self.storage {
            settings.storage = Some(match storage {
                StorageSettings::Filesystem { root } => StorageSettings::Filesystem {
                    root: self.resolve_path(&root.to_string_lossy(), base_dir),
                },
                other => other.clone(),
            });
        }
    }

    /// SHA-256 of the serialized config, for change detection.
    pub fn hash(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Resolve relative paths from the current directory instead of the config file's.
    pub use_cwd: bool,
    /// Data directory or database file (`--target`).
    pub data: Option<PathBuf>,
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

fn is_db_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
        || path.is_file()
}

/// Look for a config file inside the data directory.
fn find_config_in_dir(data_dir: &Path) -> Option<PathBuf> {
    let extensions = ["json", "yaml", "yml", "toml"];
    for basename in ["asap-pdf", "config"] {
        for ext in extensions {
            let path = data_dir.join(format!("{}.{}", basename, ext));
            // config.json in the data dir is the inference config, not ours
            if basename == "config" && ext == "json" {
                continue;
            }
            if path.exists() {
                return Some(path);
            }
        }
    }
    None
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Storage settings from `S3_*` variables, layered over any configured S3 store.
fn storage_from_env(current: Option<StorageSettings>) -> Option<StorageSettings> {
    let bucket = env_nonempty("S3_BUCKET");
    let base = match current {
        Some(StorageSettings::S3 { .. }) => current,
        _ if bucket.is_some() => None,
        other => return other,
    };

    let (mut bucket_v, mut region, mut endpoint, mut key_id, mut secret, mut path_style) =
        match base {
            Some(StorageSettings::S3 {
                bucket,
                region,
                endpoint,
                access_key_id,
                secret_access_key,
                force_path_style,
            }) => (
                bucket,
                region,
                endpoint,
                access_key_id,
                secret_access_key,
                force_path_style,
            ),
            _ => (String::new(), None, None, None, None, false),
        };

    if let Some(b) = bucket {
        bucket_v = b;
    }
    region = env_nonempty("S3_REGION").or(region);
    endpoint = env_nonempty("S3_ENDPOINT").or(endpoint);
    key_id = env_nonempty("S3_ACCESS_KEY_ID").or(key_id);
    secret = env_nonempty("S3_SECRET_ACCESS_KEY").or(secret);
    if env_nonempty("S3_FORCE_PATH_STYLE").is_some() {
        path_style = env_flag("S3_FORCE_PATH_STYLE");
    }

    Some(StorageSettings::S3 {
        bucket: bucket_v,
        region,
        endpoint,
        access_key_id: key_id,
        secret_access_key: secret,
        force_path_style: path_style,
    })
}

async fn load_file_config(options: &LoadOptions, data_dir: Option<&Path>) -> Config {
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("{}", e);
                Config::default()
            });
    }

    if let Some(dir) = data_dir {
        if let Some(config_path) = find_config_in_dir(dir) {
            tracing::debug!("Found config in data dir: {}", config_path.display());
            return Config::load_from_path(&config_path)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("{}", e);
                    Config::default()
                });
        }
    }

    Config::load().await
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let target = options.data.as_deref().map(absolute);
    let (data_dir_override, db_file_override) = match target {
        Some(ref path) if is_db_file(path) => (
            path.parent().map(Path::to_path_buf),
            path.file_name().map(|n| n.to_string_lossy().into_owned()),
        ),
        Some(ref path) => (Some(path.clone()), None),
        None => (None, None),
    };

    let config = load_file_config(&options, data_dir_override.as_deref()).await;

    let mut settings = Settings::default();
    let base_dir = if options.use_cwd {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    } else {
        config
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    };
    config.apply_to_settings(&mut settings, &base_dir);

    // --target wins over the config file
    if let Some(dir) = data_dir_override {
        settings.inference_config_path = dir.join(INFERENCE_CONFIG_FILENAME);
        settings.inference_models_path = dir.join(INFERENCE_MODELS_FILENAME);
        settings.data_dir = dir;
    }
    if let Some(filename) = db_file_override {
        settings.database_filename = filename;
    }

    // Environment wins over everything
    if let Some(url) = env_nonempty("DATABASE_URL") {
        tracing::debug!(
            "Using DATABASE_URL from environment: {}",
            crate::repository::util::redact_url_password(&url)
        );
        settings.database_url = Some(url);
    }
    if env_flag("ASAP_NO_TLS") {
        settings.no_tls = true;
    }
    if env_flag("ASAP_TRUST_PROXY") {
        settings.trust_proxy_headers = true;
    }
    settings.storage = storage_from_env(settings.storage.take());

    (settings, config)
}
