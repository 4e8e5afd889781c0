use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::utils::embedding::EmbeddingBackend;

#[derive(Clone, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
}

fn default_storage_kind() -> StorageKind {
    StorageKind::Local
}

/// Load-once-at-startup configuration. Constructed in the binary and handed
/// to each component explicitly; nothing reads it from ambient state.
#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,
    pub http_port: u16,
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_query_model")]
    pub query_model: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_capability_timeout_secs")]
    pub capability_timeout_secs: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    // Token signing settings are part of the configuration boundary; the
    // three core endpoints themselves are unauthenticated.
    #[serde(default)]
    pub jwt_secret_key: String,
    #[serde(default = "default_jwt_algorithm")]
    pub jwt_algorithm: String,
    #[serde(default = "default_access_token_expire_minutes")]
    pub access_token_expire_minutes: u64,
    #[serde(default)]
    pub debug: bool,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> u32 {
    1536
}

fn default_query_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_capability_timeout_secs() -> u64 {
    120
}

fn default_max_upload_bytes() -> usize {
    10_000_000
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

fn default_access_token_expire_minutes() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            surrealdb_address: "mem://".to_string(),
            surrealdb_username: "root".to_string(),
            surrealdb_password: "root".to_string(),
            surrealdb_namespace: "docqa".to_string(),
            surrealdb_database: "docqa".to_string(),
            data_dir: default_data_dir(),
            storage: default_storage_kind(),
            http_port: 8000,
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            embedding_backend: EmbeddingBackend::default(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            query_model: default_query_model(),
            api_prefix: default_api_prefix(),
            capability_timeout_secs: default_capability_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
            jwt_secret_key: String::new(),
            jwt_algorithm: default_jwt_algorithm(),
            access_token_expire_minutes: default_access_token_expire_minutes(),
            debug: false,
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
