//! The question-answering orchestrator.

use std::sync::Arc;
use std::time::Duration;

use sibyl_llm::{AnyProvider, LlmError, LlmProvider, Message};
use sibyl_memory::{
    RetrievalConfig, RetrieveError, RetrievedPassage, Retriever, Turn, VectorStore,
};

use crate::config::Config;
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct AssistantOptions {
    pub retrieval: RetrievalConfig,
    pub llm_timeout: Duration,
    pub embedding_timeout: Duration,
}

impl Default for AssistantOptions {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            llm_timeout: Duration::from_secs(120),
            embedding_timeout: Duration::from_secs(30),
        }
    }
}

impl AssistantOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            retrieval: RetrievalConfig {
                top_k: config.retrieval.top_k,
                score_threshold: config.retrieval.score_threshold,
            },
            llm_timeout: Duration::from_secs(config.timeouts.llm_seconds),
            embedding_timeout: Duration::from_secs(config.timeouts.embedding_seconds),
        }
    }
}

/// A grounded answer plus the passages it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<RetrievedPassage>,
}

#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error("Vector store not initialized. Please run indexing first.")]
    IndexNotReady,

    #[error("{0}")]
    Retrieval(#[from] RetrieveError),

    #[error("{0}")]
    Completion(#[from] LlmError),

    #[error("{stage} call timed out after {seconds}s")]
    Timeout { stage: &'static str, seconds: u64 },
}

impl AskError {
    /// The answer-shaped string both surfaces present in place of an
    /// answer. No failure terminates a session.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::IndexNotReady => self.to_string(),
            other => format!("Error generating response: {other}"),
        }
    }
}

/// Orchestrates one question: retrieve passages, assemble the grounded
/// prompt with the session history, call the chat provider, record the
/// turn. Constructed once and shared read-only across sessions; only the
/// per-question `Session` is mutated, and only after a fully successful
/// round.
pub struct Assistant {
    provider: AnyProvider,
    store: Option<Arc<dyn VectorStore>>,
    retriever: Option<Retriever>,
    llm_timeout: Duration,
    embedding_timeout: Duration,
}

impl Assistant {
    /// A missing store leaves the assistant in a degraded state where
    /// every question answers with the indexing notice.
    #[must_use]
    pub fn new(
        provider: AnyProvider,
        store: Option<Arc<dyn VectorStore>>,
        options: AssistantOptions,
    ) -> Self {
        let retriever = store.as_ref().map(|s| {
            Retriever::new(
                Arc::clone(s),
                Box::new(provider.embed_fn()),
                options.retrieval.clone(),
            )
        });
        Self {
            provider,
            store,
            retriever,
            llm_timeout: options.llm_timeout,
            embedding_timeout: options.embedding_timeout,
        }
    }

    #[must_use]
    pub fn index_ready(&self) -> bool {
        self.retriever.is_some()
    }

    #[must_use]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Passages in the open index; zero when no index is open.
    pub async fn passage_count(&self) -> usize {
        match &self.store {
            Some(store) => store.point_count().await.unwrap_or(0),
            None => 0,
        }
    }

    /// Answer one question within a session.
    ///
    /// Without an open index this returns [`AskError::IndexNotReady`]
    /// before any provider call. On failure the session memory is left
    /// untouched; the turn is recorded only when a reply came back.
    ///
    /// # Errors
    ///
    /// Returns an error when retrieval or completion fails or times out.
    pub async fn ask(&self, session: &mut Session, question: &str) -> Result<Answer, AskError> {
        let Some(retriever) = &self.retriever else {
            return Err(AskError::IndexNotReady);
        };

        let passages = tokio::time::timeout(self.embedding_timeout, retriever.retrieve(question))
            .await
            .map_err(|_| AskError::Timeout {
                stage: "embedding",
                seconds: self.embedding_timeout.as_secs(),
            })??;

        let messages = build_messages(&passages, session.memory.turns(), question);
        tracing::debug!(
            passages = passages.len(),
            history = session.memory.len(),
            "asking provider"
        );

        let text = tokio::time::timeout(self.llm_timeout, self.provider.chat(&messages))
            .await
            .map_err(|_| AskError::Timeout {
                stage: "completion",
                seconds: self.llm_timeout.as_secs(),
            })??;

        session.memory.record(question, text.as_str());
        Ok(Answer {
            text,
            sources: passages,
        })
    }
}

/// System instructions with the passage context block, the full turn
/// history as alternating user/assistant messages, then the new question.
fn build_messages(passages: &[RetrievedPassage], history: &[Turn], question: &str) -> Vec<Message> {
    use std::fmt::Write as _;

    let mut system = String::from(
        "You are Sibyl, a customer support assistant. Answer questions using \
         only the documentation excerpts below. When the excerpts do not cover \
         the question, say so instead of guessing.\n\nDocumentation excerpts:\n",
    );
    if passages.is_empty() {
        system.push_str("\n(no relevant excerpts were found)\n");
    }
    for passage in passages {
        let _ = write!(
            system,
            "\n[{} #{}]\n{}\n",
            passage.source, passage.chunk_index, passage.content
        );
    }

    let mut messages = Vec::with_capacity(2 + history.len() * 2);
    messages.push(Message::system(system));
    for turn in history {
        messages.push(Message::user(turn.question.as_str()));
        messages.push(Message::assistant(turn.answer.as_str()));
    }
    messages.push(Message::user(question));
    messages
}

#[cfg(test)]
mod tests {
    use sibyl_llm::Role;
    use sibyl_llm::mock::{MOCK_EMBED_DIM, MockProvider, hashed_bag_of_words};
    use sibyl_memory::{InMemoryVectorStore, VectorPoint};
    use std::collections::HashMap;

    use super::*;

    fn passage_point(id: u64, content: &str) -> VectorPoint {
        VectorPoint {
            id,
            vector: hashed_bag_of_words(content, MOCK_EMBED_DIM),
            payload: HashMap::from([
                ("content".into(), serde_json::json!(content)),
                ("source".into(), serde_json::json!("docs/pricing.txt")),
                ("content_type".into(), serde_json::json!("text/plain")),
                ("chunk_index".into(), serde_json::json!(id)),
            ]),
        }
    }

    async fn indexed_store(passages: &[&str]) -> Arc<InMemoryVectorStore> {
        let store = Arc::new(InMemoryVectorStore::new());
        let points = passages
            .iter()
            .enumerate()
            .map(|(i, p)| passage_point(i as u64, p))
            .collect();
        store.upsert(points).await.unwrap();
        store
    }

    fn assistant(mock: &MockProvider, store: Option<Arc<InMemoryVectorStore>>) -> Assistant {
        Assistant::new(
            AnyProvider::Mock(mock.clone()),
            store.map(|s| s as Arc<dyn VectorStore>),
            AssistantOptions::default(),
        )
    }

    #[tokio::test]
    async fn missing_index_answers_without_provider_calls() {
        let mock = MockProvider::default();
        let asker = assistant(&mock, None);
        let mut session = Session::new();

        let err = asker.ask(&mut session, "anything").await.unwrap_err();

        assert_eq!(
            err.user_message(),
            "Vector store not initialized. Please run indexing first."
        );
        assert_eq!(mock.chat_calls(), 0);
        assert_eq!(mock.embed_calls(), 0);
        assert!(session.memory.is_empty());
        assert!(!asker.index_ready());
    }

    #[tokio::test]
    async fn answer_is_grounded_in_retrieved_passages() {
        let store = indexed_store(&[
            "Pricing is tiered by seat count.",
            "Support is included with every plan.",
        ])
        .await;
        let mock = MockProvider::echoing();
        let asker = assistant(&mock, Some(store));
        let mut session = Session::new();

        let answer = asker
            .ask(&mut session, "What is included with support?")
            .await
            .unwrap();

        assert!(answer.text.contains("included"));
        assert!(!answer.sources.is_empty());
        assert_eq!(answer.sources[0].source, "docs/pricing.txt");
        assert_eq!(session.memory.len(), 1);
    }

    #[tokio::test]
    async fn history_is_replayed_into_later_prompts() {
        let store = indexed_store(&["Refunds are issued within 14 days."]).await;
        let mock = MockProvider::echoing();
        let asker = assistant(&mock, Some(store));
        let mut session = Session::new();
        session.memory.record("What about refunds?", "Within 14 days.");

        let answer = asker.ask(&mut session, "And after that?").await.unwrap();

        assert!(answer.text.contains("What about refunds?"));
        assert!(answer.text.contains("Within 14 days."));
        assert!(answer.text.contains("And after that?"));
    }

    #[tokio::test]
    async fn failed_turn_never_reaches_memory() {
        let store = indexed_store(&["Billing happens monthly."]).await;
        let mock = MockProvider::with_script(vec![
            Ok("answer one".into()),
            Err("provider down".into()),
            Ok("answer three".into()),
        ]);
        let asker = assistant(&mock, Some(store));
        let mut session = Session::new();

        asker.ask(&mut session, "first question").await.unwrap();
        let err = asker
            .ask(&mut session, "second question")
            .await
            .unwrap_err();

        // the third question's prompt carries turn 1 and no trace of the
        // failed round
        let prompt = build_messages(&[], session.memory.turns(), "third question");
        assert!(prompt.iter().any(|m| m.content == "first question"));
        assert!(prompt.iter().all(|m| !m.content.contains("second question")));

        asker.ask(&mut session, "third question").await.unwrap();

        assert!(err.user_message().starts_with("Error generating response:"));
        assert_eq!(session.memory.len(), 2);
        assert_eq!(session.memory.turns()[0].question, "first question");
        assert_eq!(session.memory.turns()[1].question, "third question");
    }

    #[tokio::test]
    async fn embedding_failure_is_a_per_question_error() {
        let store = indexed_store(&["Some passage."]).await;
        let mock = MockProvider::default().without_embeddings();
        let asker = assistant(&mock, Some(store));
        let mut session = Session::new();

        let err = asker.ask(&mut session, "question").await.unwrap_err();

        assert!(matches!(err, AskError::Retrieval(_)));
        assert!(err.user_message().starts_with("Error generating response:"));
        assert_eq!(mock.chat_calls(), 0);
        assert!(session.memory.is_empty());
    }

    #[tokio::test]
    async fn passage_count_reflects_store() {
        let store = indexed_store(&["one", "two", "three"]).await;
        let asker = assistant(&MockProvider::default(), Some(store));
        assert_eq!(asker.passage_count().await, 3);

        let empty = assistant(&MockProvider::default(), None);
        assert_eq!(empty.passage_count().await, 0);
    }

    #[test]
    fn prompt_layout_is_system_history_question() {
        let history = vec![Turn {
            question: "q1".into(),
            answer: "a1".into(),
        }];
        let passages = vec![RetrievedPassage {
            content: "passage text".into(),
            source: "docs/a.txt".into(),
            chunk_index: 0,
            score: 0.9,
        }];

        let messages = build_messages(&passages, &history, "q2");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("passage text"));
        assert!(messages[0].content.contains("docs/a.txt"));
        assert_eq!(messages[1].content, "q1");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].content, "a1");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].content, "q2");
    }

    #[test]
    fn empty_retrieval_is_noted_in_the_prompt() {
        let messages = build_messages(&[], &[], "q");
        assert!(messages[0].content.contains("no relevant excerpts"));
    }
}
