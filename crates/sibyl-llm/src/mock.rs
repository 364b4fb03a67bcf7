//! Test-only mock LLM provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::provider::{LlmProvider, Message};

/// Default dimension of the deterministic test embedder.
pub const MOCK_EMBED_DIM: usize = 64;

type Embedder = dyn Fn(&str) -> Vec<f32> + Send + Sync;

/// Scripted chat and embedding backend for tests.
///
/// Chat pops scripted responses in order, falling back to the default
/// response (or, in echo mode, to the concatenated prompt text, which lets
/// grounding tests verify that passage content reached the model). Embedding
/// uses a deterministic hashed bag-of-words vector unless a custom embedder
/// is supplied. Both calls are counted.
#[derive(Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Result<String, String>>>>,
    default_response: String,
    echo: bool,
    fail_chat: bool,
    supports_embeddings: bool,
    embedder: Arc<Embedder>,
    chat_calls: Arc<AtomicUsize>,
    embed_calls: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("echo", &self.echo)
            .field("fail_chat", &self.fail_chat)
            .field("supports_embeddings", &self.supports_embeddings)
            .field("chat_calls", &self.chat_calls.load(Ordering::SeqCst))
            .field("embed_calls", &self.embed_calls.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            echo: false,
            fail_chat: false,
            supports_embeddings: true,
            embedder: Arc::new(|text| hashed_bag_of_words(text, MOCK_EMBED_DIM)),
            chat_calls: Arc::new(AtomicUsize::new(0)),
            embed_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self::with_script(responses.into_iter().map(Ok).collect())
    }

    /// Script chat outcomes in order; an `Err` entry makes that call fail
    /// while later entries still run.
    #[must_use]
    pub fn with_script(script: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(script)),
            ..Self::default()
        }
    }

    /// Chat fails with a scripted error; embeddings keep working.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    /// Chat returns the full prompt text joined with newlines.
    #[must_use]
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn without_embeddings(mut self) -> Self {
        self.supports_embeddings = false;
        self
    }

    #[must_use]
    pub fn with_embedder(
        mut self,
        embedder: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static,
    ) -> Self {
        self.embedder = Arc::new(embedder);
        self
    }

    #[must_use]
    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_chat {
            return Err(crate::LlmError::Other("mock LLM error".into()));
        }
        if self.echo {
            let joined: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
            return Ok(joined.join("\n"));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            responses.remove(0).map_err(crate::LlmError::Other)
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::LlmError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.supports_embeddings {
            Ok((self.embedder)(text))
        } else {
            Err(crate::LlmError::EmbedUnsupported { provider: "mock" })
        }
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}

/// Deterministic token-count embedding: each lowercased alphanumeric token
/// hashes to one dimension, so texts sharing words score higher under cosine
/// similarity. Good enough to make retrieval tests meaningful without a
/// network call.
#[must_use]
pub fn hashed_bag_of_words(text: &str, dim: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dim];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let lower = token.to_lowercase();
        let hash = blake3::hash(lower.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        #[allow(clippy::cast_possible_truncation)]
        let slot = (u64::from_le_bytes(bytes) % dim as u64) as usize;
        vector[slot] += 1.0;
    }
    vector
}
