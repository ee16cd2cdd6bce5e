//! Configuration structures and loading.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Frequently asked questions offered by the chat front end.
    #[serde(default = "default_faq")]
    pub faq: Vec<String>,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub documents: DocumentsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            faq: default_faq(),
            model: ModelConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            chat: ChatConfig::default(),
            documents: DocumentsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&paths.config_file)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        debug!("Loading config from {:?}", path);
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &PathBuf) -> ConfigResult<()> {
        let default_config = Self::default_config_string();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, default_config)?;
        Ok(())
    }

    /// Set a single value by dotted key (e.g. `retrieval.k`), then validate.
    pub fn set(&mut self, key: &str, value: &str) -> ConfigResult<()> {
        fn parse<T: FromStr>(key: &str, value: &str) -> ConfigResult<T> {
            value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            })
        }

        match key {
            "model.provider" => {
                let provider = match value.trim().to_lowercase().as_str() {
                    "openai" => ProviderKind::OpenAi,
                    "ollama" => ProviderKind::Ollama,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        })
                    }
                };
                self.model.switch_provider(provider);
            }
            "model.model_id" => self.model.model_id = value.trim().to_string(),
            "model.embedding_model" => self.model.embedding_model = value.trim().to_string(),
            "model.temperature" => self.model.temperature = parse(key, value)?,
            "model.host" => self.model.host = Some(value.trim().to_string()),
            "model.timeout_seconds" => self.model.timeout_seconds = parse(key, value)?,
            "chunking.chunk_size" => self.chunking.chunk_size = parse(key, value)?,
            "chunking.chunk_overlap" => self.chunking.chunk_overlap = parse(key, value)?,
            "retrieval.k" => self.retrieval.k = parse(key, value)?,
            "retrieval.fetch_k" => self.retrieval.fetch_k = parse(key, value)?,
            "retrieval.mmr_lambda" => self.retrieval.mmr_lambda = parse(key, value)?,
            "retrieval.mode" => {
                self.retrieval.mode = match value.trim().to_lowercase().as_str() {
                    "similarity" => RetrievalMode::Similarity,
                    "diversity" | "mmr" => RetrievalMode::Diversity,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        })
                    }
                }
            }
            "chat.condense_question" => self.chat.condense_question = parse(key, value)?,
            "chat.history_turns" => self.chat.history_turns = parse(key, value)?,
            "chat.greeting" => self.chat.greeting = value.to_string(),
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }

        self.validate()
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunking.chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.k == 0 {
            return Err(ConfigError::Invalid("retrieval.k must be positive".into()));
        }
        if self.retrieval.fetch_k < self.retrieval.k {
            return Err(ConfigError::Invalid(format!(
                "retrieval.fetch_k ({}) must be at least retrieval.k ({})",
                self.retrieval.fetch_k, self.retrieval.k
            )));
        }
        if !(0.0..=1.0).contains(&self.retrieval.mmr_lambda) {
            return Err(ConfigError::Invalid("retrieval.mmr_lambda must be within 0.0..=1.0".into()));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid("model.temperature must be within 0.0..=2.0".into()));
        }
        Ok(())
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Fieldguide Configuration
# Question answering over equipment manuals

[model]
# Provider: "openai" or "ollama"
provider = "openai"

# Chat model used to answer questions
model_id = "gpt-3.5-turbo-0125"

# Model used to embed chunks and questions
embedding_model = "text-embedding-ada-002"

# Sampling temperature (0.0 = deterministic)
temperature = 0.0

# API base URL. Leave unset to use the provider default.
# host = "https://api.openai.com/v1"

# API key. OPENAI_API_KEY in the environment takes precedence.
# api_key = "sk-..."

# Request timeout in seconds
timeout_seconds = 120

[chunking]
# Maximum characters per chunk
chunk_size = 2500
# Characters shared between neighbouring chunks of a page
chunk_overlap = 150

[retrieval]
# Number of chunks handed to the model
k = 2
# Candidates fetched before diversity re-ranking
fetch_k = 4
# "diversity" (maximal marginal relevance) or "similarity"
mode = "diversity"
# 1.0 = pure relevance, 0.0 = pure diversity
mmr_lambda = 0.5

[chat]
# Rewrite follow-up questions into standalone questions before retrieval
condense_question = true
# Number of recent turns rendered into prompts (0 = all)
history_turns = 0
greeting = "How can I help you?"

[documents]
# Loaded when no documents are given on the command line
defaults = ["docs/compressor_user_manual.pdf"]
"#
        .to_string()
    }
}

/// Which language-model backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Chat model used when none is configured.
    pub fn default_chat_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-3.5-turbo-0125",
            ProviderKind::Ollama => "llama3",
        }
    }

    /// Embedding model used when none is configured.
    pub fn default_embedding_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "text-embedding-ada-002",
            ProviderKind::Ollama => "nomic-embed-text",
        }
    }

    /// Base URL used when `model.host` is unset.
    pub fn default_host(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Ollama => "http://localhost:11434",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    pub model_id: String,
    pub embedding_model: String,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl ModelConfig {
    /// Configured host or the provider default, without a trailing slash.
    pub fn resolved_host(&self) -> String {
        self.host
            .as_deref()
            .unwrap_or_else(|| self.provider.default_host())
            .trim_end_matches('/')
            .to_string()
    }

    /// Change provider, carrying over only model names the user chose.
    /// Models still at the old provider's defaults move to the new ones.
    pub fn switch_provider(&mut self, provider: ProviderKind) {
        let old = self.provider;
        if self.model_id == old.default_chat_model() {
            self.model_id = provider.default_chat_model().to_string();
        }
        if self.embedding_model == old.default_embedding_model() {
            self.embedding_model = provider.default_embedding_model().to_string();
        }
        self.provider = provider;
    }

    /// API key from `OPENAI_API_KEY`, falling back to the config file.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model_id: ProviderKind::OpenAi.default_chat_model().to_string(),
            embedding_model: ProviderKind::OpenAi.default_embedding_model().to_string(),
            temperature: 0.0,
            host: None,
            api_key: None,
            timeout_seconds: 120,
        }
    }
}

/// Text chunking settings, in characters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2500,
            chunk_overlap: 150,
        }
    }
}

/// How retrieved chunks are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Rank by vector similarity only.
    Similarity,
    /// Maximal marginal relevance over the `fetch_k` nearest neighbours.
    #[default]
    #[serde(alias = "mmr")]
    Diversity,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Similarity => "similarity",
            RetrievalMode::Diversity => "diversity",
        }
    }
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub k: usize,
    pub fetch_k: usize,
    pub mode: RetrievalMode,
    pub mmr_lambda: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 2,
            fetch_k: 4,
            mode: RetrievalMode::Diversity,
            mmr_lambda: 0.5,
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub condense_question: bool,
    pub history_turns: usize,
    pub greeting: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            condense_question: true,
            history_turns: 0,
            greeting: "How can I help you?".to_string(),
        }
    }
}

/// Documents loaded when the caller supplies none.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    pub defaults: Vec<String>,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            defaults: vec!["docs/compressor_user_manual.pdf".to_string()],
        }
    }
}

fn default_faq() -> Vec<String> {
    [
        "What are preventive measures to mitigate the risk of electric shock?",
        "What are the most important components of the compressor unit?",
        "What considerations should be made regarding the installation site when setting up the compressor?",
        "What precautions should be taken prior to initiating the compressor to prevent issues?",
        "What are the potential factors and solutions for addressing the compressor unit's cessation of operation prior to reaching the desired discharge pressure level?",
        "What are potential solutions to address the absence or inadequate discharge capability?",
        "Which factors should engineers consider and what preparations are necessary when inspecting the safety valve?",
        "What steps are necessary when shutting down the plant for a prolonged duration?",
        "What is the noise level of Compressor and refrigeration dryer on air receiver (RSDK-B 5.5)?",
        "What is the difference between on and off status of the pressure switch?",
    ]
    .iter()
    .map(|q| q.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.chunking.chunk_size, 2500);
        assert_eq!(config.chunking.chunk_overlap, 150);
        assert_eq!(config.retrieval.k, 2);
        assert_eq!(config.retrieval.fetch_k, 4);
        assert_eq!(config.retrieval.mode, RetrievalMode::Diversity);
        assert_eq!(config.model.provider, ProviderKind::OpenAi);
        assert_eq!(config.faq.len(), 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.model.model_id, deserialized.model.model_id);
        assert_eq!(config.retrieval.mode, deserialized.retrieval.mode);
        assert_eq!(config.faq, deserialized.faq);
    }

    #[test]
    fn test_default_config_string_parses() {
        let config: Config = toml::from_str(&Config::default_config_string()).unwrap();
        assert_eq!(config.chunking.chunk_size, 2500);
        assert_eq!(config.chat.greeting, "How can I help you?");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [model]
            provider = "ollama"
            model_id = "mistral"

            [retrieval]
            mode = "mmr"
            "#
        )
        .unwrap();

        let path = temp_file.path().to_path_buf();
        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.model.provider, ProviderKind::Ollama);
        assert_eq!(config.model.model_id, "mistral");
        assert_eq!(config.model.resolved_host(), "http://localhost:11434");
        assert_eq!(config.retrieval.mode, RetrievalMode::Diversity);
        // Defaults should still work
        assert_eq!(config.retrieval.k, 2);
    }

    #[test]
    fn test_invalid_overlap_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
            [chunking]
            chunk_size = 100
            chunk_overlap = 100
            "#
        )
        .unwrap();

        let err = Config::load_from(&temp_file.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_fetch_k_must_cover_k() {
        let mut config = Config::default();
        config.retrieval.k = 5;
        config.retrieval.fetch_k = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_set_dotted_keys() {
        let mut config = Config::default();
        config.set("retrieval.mode", "similarity").unwrap();
        config.set("retrieval.k", "3").unwrap();
        config.set("model.provider", "Ollama").unwrap();

        assert_eq!(config.retrieval.mode, RetrievalMode::Similarity);
        assert_eq!(config.retrieval.k, 3);
        assert_eq!(config.model.provider, ProviderKind::Ollama);

        assert!(matches!(
            config.set("retrieval.k", "many"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("ui.color", "true"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_provider_switch_moves_default_models() {
        let mut config = Config::default();
        config.set("model.provider", "ollama").unwrap();
        assert_eq!(config.model.embedding_model, "nomic-embed-text");
        assert_eq!(config.model.model_id, "llama3");

        config.set("model.model_id", "mistral").unwrap();
        config.set("model.provider", "openai").unwrap();
        assert_eq!(config.model.embedding_model, "text-embedding-ada-002");
        assert_eq!(config.model.model_id, "mistral");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.retrieval.mode = RetrievalMode::Similarity;
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.retrieval.mode, RetrievalMode::Similarity);
    }
}
