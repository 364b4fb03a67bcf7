//! Document ingestion, vector index, retrieval, and conversation history.

pub mod conversation;
pub mod document;
pub mod in_memory_store;
pub mod retriever;
pub mod snapshot;
pub mod vector_store;

/// Embedding function shared between indexing and retrieval. Both sides
/// must use the same one or scores are meaningless.
pub type EmbedFn = Box<dyn Fn(&str) -> sibyl_llm::EmbedFuture + Send + Sync>;

pub use conversation::{ConversationMemory, Turn};
pub use document::{
    Chunk, Document, DocumentError, DocumentLoader, DocumentMetadata, IngestReport,
    IngestionPipeline, SplitterConfig, TextSplitter, loader_for_extension,
};
pub use in_memory_store::InMemoryVectorStore;
pub use retriever::{RetrievalConfig, RetrieveError, RetrievedPassage, Retriever};
pub use snapshot::{IndexMeta, SnapshotStore};
pub use vector_store::{ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};
