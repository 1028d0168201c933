use std::env;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
const DEFAULT_GENERATION_MODEL: &str = "llama3:8b-instruct-q4_K_M";
const DEFAULT_CONTEXT_CHAR_BUDGET: usize = 15_000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Connection settings for the persistence store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the REST-accessible store that holds subjects, documents,
    /// chunks, and cached unit preps.
    pub base_url: String,
    /// Optional service key sent with every store request.
    pub service_key: Option<String>,
}

/// Settings for the embedding provider.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Base URL of the model runtime exposing the embeddings endpoint.
    pub base_url: String,
    /// Embedding model identifier passed to the provider.
    pub model: String,
    /// Dimensionality of the produced vectors; chunks whose vectors do not
    /// match are rejected before persistence.
    pub dimension: usize,
}

/// Settings for the generation provider.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Base URL of the model runtime exposing generate/chat endpoints.
    pub base_url: String,
    /// Generation model identifier passed to the provider.
    pub model: String,
}

/// Tuning knobs for the retrieval fallback ladder and prompt context sizing.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// When no subject is supplied, fall back to the most recently created
    /// subject. This widens scope and should be disabled in deployments where
    /// subjects belong to different users.
    pub allow_scope_widening: bool,
    /// Page size used by the non-semantic paginated chunk fetch.
    pub fallback_page_size: usize,
    /// Number of chunks kept from the paginated fallback fetch.
    pub fallback_context_chunks: usize,
    /// Number of chunks pulled for the broad study-plan context.
    pub plan_context_chunks: usize,
    /// Maximum number of characters of retrieved context placed in a prompt.
    pub context_char_budget: usize,
}

/// Runtime configuration for the Cramkit server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Persistence store settings.
    pub store: StoreConfig,
    /// Embedding provider settings.
    pub embedding: EmbeddingConfig,
    /// Generation provider settings.
    pub generation: GenerationConfig,
    /// Retrieval policy settings.
    pub retrieval: RetrievalConfig,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation
    /// along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let ollama_url =
            load_env_optional("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        Ok(Self {
            store: StoreConfig {
                base_url: load_env("STORE_URL")?,
                service_key: load_env_optional("STORE_SERVICE_KEY"),
            },
            embedding: EmbeddingConfig {
                base_url: ollama_url.clone(),
                model: load_env_optional("EMBEDDING_MODEL")
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
                dimension: parse_optional("EMBEDDING_DIMENSION")?
                    .unwrap_or(DEFAULT_EMBEDDING_DIMENSION),
            },
            generation: GenerationConfig {
                base_url: ollama_url,
                model: load_env_optional("GENERATION_MODEL")
                    .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            },
            retrieval: RetrievalConfig {
                allow_scope_widening: parse_bool_optional("ALLOW_SCOPE_WIDENING")?.unwrap_or(true),
                fallback_page_size: 1000,
                fallback_context_chunks: 15,
                plan_context_chunks: 40,
                context_char_budget: parse_optional("CONTEXT_CHAR_BUDGET")?
                    .unwrap_or(DEFAULT_CONTEXT_CHAR_BUDGET),
            },
            server_port: parse_optional("SERVER_PORT")?,
        })
    }
}

/// Load environment variables from `.env` and build the configuration,
/// logging a redacted summary.
pub fn init_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        store_url = %config.store.base_url,
        model_url = %config.generation.base_url,
        embedding_model = %config.embedding.model,
        generation_model = %config.generation.model,
        embedding_dimension = config.embedding.dimension,
        server_port = ?config.server_port,
        scope_widening = config.retrieval.allow_scope_widening,
        "Loaded configuration"
    );
    Ok(config)
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_bool_optional(key: &str) -> Result<Option<bool>, ConfigError> {
    load_env_optional(key)
        .map(|value| match value.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue(key.to_string())),
        })
        .transpose()
}
