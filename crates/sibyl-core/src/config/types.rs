use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub corpus: CorpusConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalSettings,
    pub timeouts: TimeoutConfig,
    pub gateway: GatewayConfig,
}

/// Chat backend selector. `Auto` picks from available credentials at
/// startup, preferring `OpenAi` because only it serves embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Auto,
    OpenAi,
    Claude,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::OpenAi => "openai",
            Self::Claude => "claude",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub openai_model: String,
    pub claude_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub openai_base_url: String,
    pub claude_base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Auto,
            openai_model: "gpt-4".into(),
            claude_model: "claude-3-sonnet-20240229".into(),
            embedding_model: "text-embedding-ada-002".into(),
            temperature: 0.7,
            max_tokens: 1024,
            openai_base_url: "https://api.openai.com/v1".into(),
            claude_base_url: "https://api.anthropic.com".into(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub dir: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self { dir: "docs".into() }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    pub dir: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: "rag_index".into(),
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub score_threshold: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            score_threshold: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub llm_seconds: u64,
    pub embedding_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_seconds: 120,
            embedding_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
    /// Requests allowed per client IP per 60-second window.
    pub rate_limit: u32,
    pub max_body_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8090,
            rate_limit: 120,
            max_body_size: 1_048_576,
        }
    }
}
