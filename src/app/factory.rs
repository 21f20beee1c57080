use crate::{
    app::service::AppService,
    artifacts::BackendCsv,
    config::{Config, EmbeddingConfig, EmbeddingProvider},
    semantic::{Embedder, GeminiEmbedder},
};
use anyhow::{Context, Result};
use homedir::my_home;
use std::sync::Arc;
use std::time::Duration;

/// Application factory for creating and configuring application components
pub struct AppFactory;

impl AppFactory {
    /// Build the service: CSV store under the base path plus the configured embedder.
    pub fn create_app_service(paths: &AppPaths, config: &Config) -> Result<AppService> {
        let store = BackendCsv::load(&paths.base_path)
            .with_context(|| format!("couldnt load artifacts from {}", paths.base_path))?;
        let embedder = Self::create_embedder(&config.embedding, paths)?;

        Ok(AppService::new(Arc::new(store), embedder, config.search))
    }

    pub fn create_embedder(
        config: &EmbeddingConfig,
        paths: &AppPaths,
    ) -> Result<Arc<dyn Embedder>> {
        match config.provider {
            EmbeddingProvider::Gemini => {
                let api_key = std::env::var("GEMINI_API_KEY")
                    .context("GEMINI_API_KEY must be set for the gemini embedding provider")?;
                let embedder = GeminiEmbedder::new(
                    &api_key,
                    &config.endpoint,
                    &config.model,
                    config.expected_dimensions(),
                    Duration::from_secs(config.timeout_secs),
                )?;
                log::info!(
                    "Using gemini embeddings at {} ({:?} dims expected)",
                    embedder.endpoint(),
                    embedder.dimensions()
                );
                Ok(Arc::new(embedder))
            }
            #[cfg(feature = "local-embeddings")]
            EmbeddingProvider::Local => {
                let embedder = crate::semantic::LocalEmbedder::new(
                    &config.model,
                    std::path::PathBuf::from(&paths.base_path),
                )?;
                if let Some(expected) = config.dimensions {
                    anyhow::ensure!(
                        embedder.dimensions() == Some(expected),
                        "embedding.dimensions is {expected} but '{}' produces {:?}",
                        config.model,
                        embedder.dimensions()
                    );
                }
                log::info!(
                    "Using local embeddings '{}' ({:?} dims)",
                    embedder.name(),
                    embedder.dimensions()
                );
                Ok(Arc::new(embedder))
            }
            #[cfg(not(feature = "local-embeddings"))]
            EmbeddingProvider::Local => {
                let _ = paths;
                anyhow::bail!("local embeddings require the `local-embeddings` feature")
            }
        }
    }

    /// Get application paths, creating the base directory if needed
    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;

        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths { base_path })
    }

    /// Load and validate configuration
    pub fn create_config(paths: &AppPaths) -> Result<Config> {
        Config::load_with(&paths.base_path)
    }

    fn get_base_path() -> Result<String> {
        if let Ok(base_path) = std::env::var("SEMMARK_BASE_PATH") {
            return Ok(base_path);
        }

        let home = my_home()
            .context("Could not determine home directory")?
            .context("Home directory path is empty")?;
        Ok(format!("{}/.local/share/semmark", home.to_string_lossy()))
    }

    /// Bearer token required for write requests to the daemon
    pub fn parse_auth_token() -> Option<String> {
        std::env::var("SEMMARK_AUTH_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Application paths structure
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: String,
}
