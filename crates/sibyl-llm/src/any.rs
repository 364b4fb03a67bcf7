use crate::claude::ClaudeProvider;
#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::openai::OpenAiProvider;
use crate::provider::{EmbedFuture, LlmProvider, Message};

/// Generates a match over all `AnyProvider` variants, binding the inner
/// provider and evaluating the given closure for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::OpenAi($p) => $expr,
            AnyProvider::Claude($p) => $expr,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $expr,
        }
    };
}

/// Concrete provider chosen once at startup from the available credentials.
#[derive(Debug, Clone)]
pub enum AnyProvider {
    OpenAi(OpenAiProvider),
    Claude(ClaudeProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl AnyProvider {
    /// Return a cloneable closure that calls `embed()` on this provider,
    /// for handing the embedding capability across a `dyn` boundary.
    pub fn embed_fn(&self) -> impl Fn(&str) -> EmbedFuture + Send + Sync + use<> {
        let provider = std::sync::Arc::new(self.clone());
        move |text: &str| -> EmbedFuture {
            let p = std::sync::Arc::clone(&provider);
            let owned = text.to_owned();
            Box::pin(async move { p.embed(&owned).await })
        }
    }
}

impl LlmProvider for AnyProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, crate::LlmError> {
        delegate_provider!(self, |p| p.chat(messages).await)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, crate::LlmError> {
        delegate_provider!(self, |p| p.embed(text).await)
    }

    fn supports_embeddings(&self) -> bool {
        delegate_provider!(self, |p| p.supports_embeddings())
    }

    fn name(&self) -> &str {
        delegate_provider!(self, |p| p.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claude() -> AnyProvider {
        AnyProvider::Claude(ClaudeProvider::new(
            "key".into(),
            "https://api.anthropic.com".into(),
            "claude-3-sonnet-20240229".into(),
            1024,
            0.7,
        ))
    }

    fn openai(embedding_model: Option<&str>) -> AnyProvider {
        AnyProvider::OpenAi(OpenAiProvider::new(
            "key".into(),
            "https://api.openai.com/v1".into(),
            "gpt-4".into(),
            1024,
            0.7,
            embedding_model.map(Into::into),
        ))
    }

    #[test]
    fn name_delegates() {
        assert_eq!(openai(None).name(), "openai");
        assert_eq!(claude().name(), "claude");
    }

    #[test]
    fn supports_embeddings_delegates() {
        assert!(openai(Some("text-embedding-ada-002")).supports_embeddings());
        assert!(!openai(None).supports_embeddings());
        assert!(!claude().supports_embeddings());
    }

    #[test]
    fn debug_names_variant() {
        assert!(format!("{:?}", claude()).contains("Claude"));
        assert!(format!("{:?}", openai(None)).contains("OpenAi"));
    }

    #[test]
    fn clone_preserves_name() {
        assert_eq!(claude().clone().name(), "claude");
    }

    #[tokio::test]
    async fn claude_embed_delegates_error() {
        let err = claude().embed("test").await.unwrap_err();
        assert!(err.to_string().contains("embedding not supported by"));
    }

    #[cfg(feature = "mock")]
    #[tokio::test]
    async fn embed_fn_calls_through() {
        let mock = MockProvider::default().with_embedder(|_| vec![0.5, 0.5]);
        let provider = AnyProvider::Mock(mock.clone());
        let embed = provider.embed_fn();
        let vector = embed("text").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.5]);
        assert_eq!(mock.embed_calls(), 1);
    }

    #[cfg(feature = "mock")]
    #[tokio::test]
    async fn mock_variant_chats() {
        let provider = AnyProvider::Mock(MockProvider::with_responses(vec!["hi".into()]));
        let reply = provider.chat(&[Message::user("q")]).await.unwrap();
        assert_eq!(reply, "hi");
    }
}
