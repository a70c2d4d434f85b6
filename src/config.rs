use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// File name looked up in the working directory for project-level settings.
pub const PROJECT_CONFIG_FILE: &str = "robot-rag.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub lexical: LexicalConfig,
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    /// Retrieval policy YAML; built-in defaults when unset.
    #[serde(default)]
    pub policy_path: Option<PathBuf>,
}

impl Config {
    /// Resolve configuration: defaults, then either the explicit file or the
    /// global and project files, then `ROBOT_RAG_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, project_dir: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("ROBOT_RAG_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(RagError::MissingConfig(format!(
                        "config file {} not found",
                        path.display()
                    )));
                }
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&project_dir.join(PROJECT_CONFIG_FILE))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// Parse a single TOML document on top of the defaults.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let patch: ConfigPatch =
            toml::from_str(raw).map_err(|err| RagError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("robot-rag/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| RagError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| RagError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.server {
            self.server.merge(patch);
        }
        if let Some(patch) = patch.lexical {
            self.lexical.merge(patch);
        }
        if let Some(patch) = patch.vector {
            self.vector.merge(patch);
        }
        if let Some(patch) = patch.embedding {
            self.embedding.merge(patch);
        }
        if let Some(patch) = patch.rerank {
            self.rerank.merge(patch);
        }
        if let Some(patch) = patch.answer {
            self.answer.merge(patch);
        }
        if let Some(path) = patch.policy_path {
            self.policy_path = Some(path);
        }
    }

    /// Apply `ROBOT_RAG_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        if let Some(value) = env.string("ROBOT_RAG_BIND") {
            self.server.bind = value;
        }
        if let Some(value) = env.string("ROBOT_RAG_MEDIA_BASE_URL") {
            self.server.media_base_url = value;
        }

        if let Some(value) = env.string("ROBOT_RAG_MEILI_URL") {
            self.lexical.url = value;
        }
        if let Some(value) = env.string("ROBOT_RAG_MEILI_KEY") {
            self.lexical.api_key = Some(value);
        }
        if let Some(value) = env.string("ROBOT_RAG_MEILI_INDEX") {
            self.lexical.index = value;
        }

        if let Some(value) = env.string("ROBOT_RAG_QDRANT_URL") {
            self.vector.url = value;
        }
        if let Some(value) = env.string("ROBOT_RAG_QDRANT_API_KEY") {
            self.vector.api_key = Some(value);
        }
        if let Some(value) = env.string("ROBOT_RAG_QDRANT_COLLECTION") {
            self.vector.collection = value;
        }

        if let Some(value) = env.string("ROBOT_RAG_EMBEDDING_URL") {
            self.embedding.url = value;
        }
        if let Some(value) = env.string("ROBOT_RAG_EMBEDDING_MODEL") {
            self.embedding.model = value;
        }
        if let Some(value) = env.string("ROBOT_RAG_EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(value);
        }
        if let Some(value) = env.string("ROBOT_RAG_IMAGE_EMBEDDING_URL") {
            self.embedding.image_url = Some(value);
        }
        if let Some(value) = env.string("ROBOT_RAG_IMAGE_EMBEDDING_MODEL") {
            self.embedding.image_model = Some(value);
        }

        if let Some(value) = env.string("ROBOT_RAG_RERANK_URL") {
            self.rerank.url = Some(value);
        }
        if let Some(value) = env.string("ROBOT_RAG_RERANK_MODEL") {
            self.rerank.model = Some(value);
        }

        if let Some(value) = env.bool("ROBOT_RAG_ANSWER_ENABLED") {
            self.answer.enabled = value;
        }
        if let Some(value) = env.string("ROBOT_RAG_ANSWER_URL") {
            self.answer.url = value;
        }
        if let Some(value) = env.string("ROBOT_RAG_ANSWER_MODEL") {
            self.answer.model = value;
        }
        if let Some(value) = env.string("ROBOT_RAG_ANSWER_API_KEY") {
            self.answer.api_key = Some(value);
        }
        if let Some(value) = env.f32("ROBOT_RAG_ANSWER_TEMPERATURE")? {
            self.answer.temperature = value;
        }
        if let Some(value) = env.u32("ROBOT_RAG_ANSWER_MAX_TOKENS")? {
            self.answer.max_tokens = value;
        }

        if let Some(value) = env.string("ROBOT_RAG_POLICY") {
            self.policy_path = Some(PathBuf::from(value));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    /// Prefix joined with a figure's media path to form its URL.
    pub media_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            media_base_url: "/media".to_string(),
        }
    }
}

impl ServerConfig {
    fn merge(&mut self, patch: ServerPatch) {
        if let Some(value) = patch.bind {
            self.bind = value;
        }
        if let Some(value) = patch.media_base_url {
            self.media_base_url = value;
        }
    }
}

/// Meilisearch index holding the lexical documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub index: String,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7700".to_string(),
            api_key: None,
            index: "robot_elements".to_string(),
        }
    }
}

impl LexicalConfig {
    fn merge(&mut self, patch: LexicalPatch) {
        if let Some(value) = patch.url {
            self.url = value;
        }
        if let Some(value) = patch.api_key {
            self.api_key = Some(value);
        }
        if let Some(value) = patch.index {
            self.index = value;
        }
    }
}

/// Qdrant collection with named `text` and `image` vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub text_vector: String,
    pub image_vector: String,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection: "robot_elements".to_string(),
            text_vector: "text".to_string(),
            image_vector: "image".to_string(),
        }
    }
}

impl VectorConfig {
    fn merge(&mut self, patch: VectorPatch) {
        if let Some(value) = patch.url {
            self.url = value;
        }
        if let Some(value) = patch.api_key {
            self.api_key = Some(value);
        }
        if let Some(value) = patch.collection {
            self.collection = value;
        }
        if let Some(value) = patch.text_vector {
            self.text_vector = value;
        }
        if let Some(value) = patch.image_vector {
            self.image_vector = value;
        }
    }
}

/// OpenAI-compatible embedding endpoints. The image endpoint embeds query
/// text into the image vector space; without it the image branch is off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub image_url: Option<String>,
    pub image_model: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8081/v1".to_string(),
            api_key: None,
            model: "BAAI/bge-small-en-v1.5".to_string(),
            image_url: None,
            image_model: None,
        }
    }
}

impl EmbeddingConfig {
    fn merge(&mut self, patch: EmbeddingPatch) {
        if let Some(value) = patch.url {
            self.url = value;
        }
        if let Some(value) = patch.api_key {
            self.api_key = Some(value);
        }
        if let Some(value) = patch.model {
            self.model = value;
        }
        if let Some(value) = patch.image_url {
            self.image_url = Some(value);
        }
        if let Some(value) = patch.image_model {
            self.image_model = Some(value);
        }
    }
}

/// Cross-encoder service; reranking is skipped when no URL is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerankConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl RerankConfig {
    fn merge(&mut self, patch: RerankPatch) {
        if let Some(value) = patch.url {
            self.url = Some(value);
        }
        if let Some(value) = patch.api_key {
            self.api_key = Some(value);
        }
        if let Some(value) = patch.model {
            self.model = Some(value);
        }
    }
}

/// OpenAI-compatible chat completion endpoint for answer generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerConfig {
    pub enabled: bool,
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Number of citations given to the generator as context.
    pub context_results: usize,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 400,
            context_results: 6,
        }
    }
}

impl AnswerConfig {
    fn merge(&mut self, patch: AnswerPatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.url {
            self.url = value;
        }
        if let Some(value) = patch.api_key {
            self.api_key = Some(value);
        }
        if let Some(value) = patch.model {
            self.model = value;
        }
        if let Some(value) = patch.temperature {
            self.temperature = value;
        }
        if let Some(value) = patch.max_tokens {
            self.max_tokens = value;
        }
        if let Some(value) = patch.context_results {
            self.context_results = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub server: Option<ServerPatch>,
    pub lexical: Option<LexicalPatch>,
    pub vector: Option<VectorPatch>,
    pub embedding: Option<EmbeddingPatch>,
    pub rerank: Option<RerankPatch>,
    pub answer: Option<AnswerPatch>,
    pub policy_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ServerPatch {
    pub bind: Option<String>,
    pub media_base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct LexicalPatch {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub index: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct VectorPatch {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub collection: Option<String>,
    pub text_vector: Option<String>,
    pub image_vector: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EmbeddingPatch {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub image_url: Option<String>,
    pub image_model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RerankPatch {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AnswerPatch {
    pub enabled: Option<bool>,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub context_results: Option<usize>,
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.string(key).map(|value| {
            matches!(
                value.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    fn u32(&self, key: &str) -> Result<Option<u32>> {
        match self.string(key) {
            Some(value) => value.parse::<u32>().map(Some).map_err(|err| {
                RagError::Config(format!("invalid {key} value {value}: {err}"))
            }),
            None => Ok(None),
        }
    }

    fn f32(&self, key: &str) -> Result<Option<f32>> {
        match self.string(key) {
            Some(value) => value.parse::<f32>().map(Some).map_err(|err| {
                RagError::Config(format!("invalid {key} value {value}: {err}"))
            }),
            None => Ok(None),
        }
    }
}
