use crate::storage::{BackendLocal, StorageManager};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.yaml";

/// Default similarity threshold for vector search (strictly greater than)
const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;
/// Vector hit count below which the lexical fallback runs
const DEFAULT_FALLBACK_FLOOR: usize = 5;
/// Overall cap on search results
const DEFAULT_RESULT_LIMIT: usize = 10;

const DEFAULT_EMBEDDING_MODEL: &str = "embedding-001";
const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Tunables of the hybrid search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Vector candidates must score strictly above this
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Lexical fallback fires when vector hits are fewer than this
    #[serde(default = "default_fallback_floor")]
    pub fallback_floor: usize,

    /// Combined cap for vector + lexical results
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            fallback_floor: DEFAULT_FALLBACK_FLOOR,
            result_limit: DEFAULT_RESULT_LIMIT,
        }
    }
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_fallback_floor() -> usize {
    DEFAULT_FALLBACK_FLOOR
}

fn default_result_limit() -> usize {
    DEFAULT_RESULT_LIMIT
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Gemini,
    Local,
}

/// Configuration of the embedding provider.
///
/// The Gemini API key is read from `GEMINI_API_KEY`, never from this file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProvider,

    /// Model name (e.g. "embedding-001" for gemini, "bge-base-en-v1.5" for local)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Base URL of the Gemini API
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,

    /// Transport timeout for one provider call
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Expected vector length; provider payloads of any other length are rejected
    #[serde(default)]
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
            dimensions: None,
        }
    }
}

impl EmbeddingConfig {
    /// Vector length payloads must have: the configured `dimensions`, else
    /// the published size of a known Gemini model. Local models report
    /// their own size once loaded.
    pub fn expected_dimensions(&self) -> Option<usize> {
        self.dimensions.or_else(|| match self.provider {
            EmbeddingProvider::Gemini => gemini_model_dimensions(&self.model),
            EmbeddingProvider::Local => None,
        })
    }
}

fn gemini_model_dimensions(model: &str) -> Option<usize> {
    match model.trim().trim_start_matches("models/") {
        "embedding-001" | "text-embedding-004" => Some(768),
        "gemini-embedding-001" => Some(3072),
        _ => None,
    }
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_gemini_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    DEFAULT_EMBEDDING_TIMEOUT_SECS
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let search = &self.search;
        if !(-1.0..=1.0).contains(&search.similarity_threshold) {
            bail!(
                "search.similarity_threshold must be between -1.0 and 1.0, got {}",
                search.similarity_threshold
            );
        }

        if search.result_limit == 0 {
            bail!("search.result_limit must be greater than 0");
        }

        if search.fallback_floor > search.result_limit {
            bail!(
                "search.fallback_floor ({}) cannot exceed search.result_limit ({})",
                search.fallback_floor,
                search.result_limit
            );
        }

        if self.embedding.timeout_secs == 0 {
            bail!("embedding.timeout_secs must be greater than 0");
        }

        if self.embedding.dimensions == Some(0) {
            bail!("embedding.dimensions must be greater than 0 when set");
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        let store = BackendLocal::new(base_path)
            .with_context(|| format!("couldnt open config directory {base_path}"))?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }
}
