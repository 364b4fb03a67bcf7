use super::Config;

impl Config {
    #[allow(clippy::too_many_lines)]
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SIBYL_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid SIBYL_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SIBYL_OPENAI_MODEL") {
            self.llm.openai_model = v;
        }
        if let Ok(v) = std::env::var("SIBYL_CLAUDE_MODEL") {
            self.llm.claude_model = v;
        }
        if let Ok(v) = std::env::var("SIBYL_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("SIBYL_TEMPERATURE")
            && let Ok(t) = v.parse::<f32>()
        {
            self.llm.temperature = t;
        }
        if let Ok(v) = std::env::var("SIBYL_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.llm.max_tokens = n;
        }
        if let Ok(v) = std::env::var("SIBYL_OPENAI_BASE_URL") {
            self.llm.openai_base_url = v;
        }
        if let Ok(v) = std::env::var("SIBYL_CLAUDE_BASE_URL") {
            self.llm.claude_base_url = v;
        }
        if let Ok(v) = std::env::var("SIBYL_CORPUS_DIR") {
            self.corpus.dir = v;
        }
        if let Ok(v) = std::env::var("SIBYL_INDEX_DIR") {
            self.index.dir = v;
        }
        if let Ok(v) = std::env::var("SIBYL_CHUNK_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.index.chunk_size = n;
        }
        if let Ok(v) = std::env::var("SIBYL_CHUNK_OVERLAP")
            && let Ok(n) = v.parse::<usize>()
        {
            self.index.chunk_overlap = n;
        }
        if let Ok(v) = std::env::var("SIBYL_TOP_K")
            && let Ok(n) = v.parse::<usize>()
        {
            self.retrieval.top_k = n;
        }
        if let Ok(v) = std::env::var("SIBYL_SCORE_THRESHOLD")
            && let Ok(t) = v.parse::<f32>()
        {
            self.retrieval.score_threshold = t.clamp(0.0, 1.0);
        }
        if let Ok(v) = std::env::var("SIBYL_TIMEOUT_LLM")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.llm_seconds = secs;
        }
        if let Ok(v) = std::env::var("SIBYL_TIMEOUT_EMBEDDING")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.embedding_seconds = secs;
        }
        if let Ok(v) = std::env::var("SIBYL_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("SIBYL_GATEWAY_PORT")
            && let Ok(port) = v.parse::<u16>()
        {
            self.gateway.port = port;
        }
        if let Ok(v) = std::env::var("SIBYL_GATEWAY_RATE_LIMIT")
            && let Ok(n) = v.parse::<u32>()
        {
            self.gateway.rate_limit = n;
        }
        if let Ok(v) = std::env::var("SIBYL_GATEWAY_MAX_BODY")
            && let Ok(bytes) = v.parse::<usize>()
        {
            self.gateway.max_body_size = bytes;
        }
    }
}
