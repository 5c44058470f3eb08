//! Pipeline configuration
//!
//! One aggregate config covering every stage, loadable from TOML. Every
//! section defaults independently so a config file only needs the keys it
//! overrides.

use chorus_allocator::AllocatorConfig;
use chorus_dispatch::DispatchConfig;
use chorus_domain::ProviderId;
use chorus_extractor::ExtractorConfig;
use chorus_graph::BlastConfig;
use chorus_substrate::{ClusterConfig, SubstrateConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Aggregate configuration for one pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Providers to fan the prompt step out to, in request order.
    #[serde(default)]
    pub providers: Vec<ProviderId>,

    /// Provider used for the mapping fan-out, when dispatch-backed mapping
    /// is in use.
    #[serde(default)]
    pub mapper_provider: Option<ProviderId>,

    /// Embedding dimension requested from the backend.
    #[serde(default = "default_embedding_dimension")]
    pub embedding_dimension: usize,

    /// Fan-out dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Statement extraction settings.
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Substrate geometry settings.
    #[serde(default)]
    pub substrate: SubstrateConfig,

    /// Clustering settings.
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Evidence allocation settings.
    #[serde(default)]
    pub allocator: AllocatorConfig,

    /// Blast-radius settings.
    #[serde(default)]
    pub blast: BlastConfig,
}

fn default_embedding_dimension() -> usize {
    128
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            mapper_provider: None,
            embedding_dimension: default_embedding_dimension(),
            dispatch: DispatchConfig::default(),
            extractor: ExtractorConfig::default(),
            substrate: SubstrateConfig::default(),
            cluster: ClusterConfig::default(),
            allocator: AllocatorConfig::default(),
            blast: BlastConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Fails when the document is not valid TOML or a key has the wrong
    /// type; missing keys fall back to defaults.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config.embedding_dimension, 128);
        assert!(config.providers.is_empty());
        assert_eq!(config.dispatch.health.failure_threshold, 3);
    }

    #[test]
    fn test_partial_override() {
        let config = PipelineConfig::from_toml(
            r#"
            providers = ["alpha", "beta"]
            embedding_dimension = 64

            [dispatch]
            default_deadline_secs = 30

            [blast]
            max_axes = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0], ProviderId::new("alpha"));
        assert_eq!(config.embedding_dimension, 64);
        assert_eq!(config.dispatch.default_deadline_secs, Some(30));
        assert_eq!(config.blast.max_axes, 2);
        // Untouched sections keep their defaults.
        assert_eq!(config.substrate.k_neighbors, 4);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(PipelineConfig::from_toml("providers = 3").is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = PipelineConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back = PipelineConfig::from_toml(&text).unwrap();
        assert_eq!(back.embedding_dimension, config.embedding_dimension);
        assert_eq!(back.blast.max_axes, config.blast.max_axes);
    }
}
