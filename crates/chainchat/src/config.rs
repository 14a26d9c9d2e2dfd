//! TOML configuration parsing and validation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use chainchat_core::prompt::ContextPlacement;

/// The assistant persona used when the config does not override it.
///
/// This is the instructional text prepended to every model invocation;
/// it frames the assistant around the two bundled textbooks.
pub const DEFAULT_PERSONA: &str = "\
You are a knowledgeable supply chain management assistant.
You can help with various aspects of supply chain management, including:
- Inventory Management
- Logistics & Transportation
- Demand Forecasting
- Procurement & Supplier Management
- Warehouse Operations
- Supply Chain Analytics
- Risk Management & Resilience
- Sustainability in Supply Chain

You have also been provided with additional knowledge from two supply chain management textbooks:
1. \"Fundamentals of Supply Chain Management\"
2. \"Supply Chain Management: Strategy, Planning, and Operation\"

These textbooks cover core principles, strategies, and best practices in supply chain management.
When answering questions, incorporate relevant concepts from these textbooks when applicable.
Be concise, practical, and provide actionable insights based on academic knowledge and industry best practices.";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub chunks: ChunksConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunksConfig {
    /// JSON chunk files produced by the preprocessing step.
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Scoring strategy: `"lexical"` or `"embedding"`.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Maximum chunks injected into the prompt.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            max_results: default_max_results(),
        }
    }
}

fn default_strategy() -> String {
    "lexical".to_string()
}
fn default_max_results() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Model identifier sent to the chat-completions endpoint.
    #[serde(default = "default_model")]
    pub name: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            temperature: default_temperature(),
            base_url: default_base_url(),
            timeout_secs: default_model_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"disabled"` or `"openai"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersonaConfig {
    /// Persona text; falls back to [`DEFAULT_PERSONA`].
    #[serde(default = "default_persona_text")]
    pub text: String,
    /// Whether retrieved context is merged into the system or user turn.
    #[serde(default = "default_placement")]
    pub context_placement: ContextPlacement,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            text: default_persona_text(),
            context_placement: default_placement(),
        }
    }
}

fn default_persona_text() -> String {
    DEFAULT_PERSONA.to_string()
}
fn default_placement() -> ContextPlacement {
    ContextPlacement::User
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunks.paths.is_empty() {
        anyhow::bail!("chunks.paths must list at least one chunk file");
    }

    match config.retrieval.strategy.as_str() {
        "lexical" | "embedding" => {}
        other => anyhow::bail!(
            "Unknown retrieval strategy: '{}'. Must be lexical or embedding.",
            other
        ),
    }

    if config.retrieval.max_results < 1 {
        anyhow::bail!("retrieval.max_results must be >= 1");
    }

    if !(0.0..=2.0).contains(&config.model.temperature) {
        anyhow::bail!("model.temperature must be in [0.0, 2.0]");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.retrieval.strategy == "embedding" && !config.embedding.is_enabled() {
        anyhow::bail!("retrieval.strategy = \"embedding\" requires an embedding provider");
    }

    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse(
            r#"
            [chunks]
            paths = ["./data/pdf-chunks.json"]
            "#,
        )
        .unwrap();
        assert_eq!(config.retrieval.strategy, "lexical");
        assert_eq!(config.retrieval.max_results, 5);
        assert_eq!(config.model.name, "gpt-4o-mini");
        assert_eq!(config.model.temperature, 0.7);
        assert_eq!(config.persona.context_placement, ContextPlacement::User);
        assert!(config.persona.text.contains("supply chain management assistant"));
        assert!(!config.embedding.is_enabled());
    }

    #[test]
    fn test_empty_chunk_paths_rejected() {
        let err = parse("[chunks]\npaths = []").unwrap_err();
        assert!(err.to_string().contains("at least one chunk file"));
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let err = parse(
            r#"
            [chunks]
            paths = ["c.json"]
            [retrieval]
            strategy = "hybrid"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unknown retrieval strategy"));
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let err = parse(
            r#"
            [chunks]
            paths = ["c.json"]
            [model]
            temperature = 3.5
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_embedding_strategy_requires_provider() {
        let err = parse(
            r#"
            [chunks]
            paths = ["c.json"]
            [retrieval]
            strategy = "embedding"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("requires an embedding provider"));
    }

    #[test]
    fn test_embedding_provider_requires_model_and_dims() {
        let err = parse(
            r#"
            [chunks]
            paths = ["c.json"]
            [embedding]
            provider = "openai"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("embedding.model"));
    }

    #[test]
    fn test_full_config_parses() {
        let config = parse(
            r#"
            [chunks]
            paths = ["a.json", "b.json"]

            [retrieval]
            strategy = "embedding"
            max_results = 8

            [model]
            name = "gpt-4o"
            temperature = 0.2
            base_url = "http://localhost:11434/v1"

            [embedding]
            provider = "openai"
            model = "text-embedding-3-small"
            dims = 1536

            [server]
            bind = "0.0.0.0:8080"

            [persona]
            text = "You are terse."
            context_placement = "system"
            "#,
        )
        .unwrap();
        assert_eq!(config.chunks.paths.len(), 2);
        assert_eq!(config.retrieval.max_results, 8);
        assert_eq!(config.persona.context_placement, ContextPlacement::System);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }
}
