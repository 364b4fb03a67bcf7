//! Corpus ingestion: walk → load → split → embed → store.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;

use super::loader::loader_for_extension;
use super::{Document, DocumentError, DocumentLoader, TextSplitter};
use crate::EmbedFn;
use crate::vector_store::{VectorPoint, VectorStore};

/// Summary of an ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub chunks_indexed: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

pub struct IngestionPipeline {
    splitter: TextSplitter,
    store: Arc<dyn VectorStore>,
    embed_fn: EmbedFn,
    next_id: AtomicU64,
}

impl IngestionPipeline {
    #[must_use]
    pub fn new(splitter: TextSplitter, store: Arc<dyn VectorStore>, embed_fn: EmbedFn) -> Self {
        Self {
            splitter,
            store,
            embed_fn,
            next_id: AtomicU64::new(0),
        }
    }

    /// Ingest a document: split → embed each chunk → store. Returns the
    /// chunk count. Point ids are assigned sequentially across the whole
    /// run, preserving insertion order in the index.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or storage fails; per-file isolation
    /// lives in [`IngestionPipeline::ingest_dir`].
    pub async fn ingest(&self, document: Document) -> Result<usize, DocumentError> {
        let chunks = self.splitter.split(&document);
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut points = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let vector = (self.embed_fn)(&chunk.content).await?;
            let payload = json!({
                "source": chunk.metadata.source,
                "content_type": chunk.metadata.content_type,
                "chunk_index": chunk.chunk_index,
                "content": chunk.content,
            });
            let serde_json::Value::Object(map) = payload else {
                unreachable!("payload literal is an object");
            };
            points.push(VectorPoint {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                vector,
                payload: map.into_iter().collect(),
            });
        }

        let count = points.len();
        self.store.upsert(points).await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns an error if loading, embedding, or storage fails.
    pub async fn load_and_ingest(
        &self,
        loader: &(dyn DocumentLoader + '_),
        path: &Path,
    ) -> Result<usize, DocumentError> {
        let documents = loader.load(path).await?;
        let mut total = 0;
        for doc in documents {
            total += self.ingest(doc).await?;
        }
        Ok(total)
    }

    /// Walk the corpus recursively (hidden files skipped, gitignore
    /// honored), route each file by extension, and ingest it. A failure on
    /// one file is logged and recorded in the report; the batch continues.
    ///
    /// # Errors
    ///
    /// Only returns an error when the walk itself cannot start; per-file
    /// failures land in `IngestReport::errors`.
    pub async fn ingest_dir(&self, root: &Path) -> Result<IngestReport, DocumentError> {
        let start = std::time::Instant::now();
        let mut report = IngestReport::default();

        let entries: Vec<_> = ignore::WalkBuilder::new(root)
            .hidden(true)
            .git_ignore(true)
            .build()
            .flatten()
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
            .collect();

        let total = entries.len();
        tracing::info!(total, root = %root.display(), "ingestion started");

        for entry in &entries {
            report.files_scanned += 1;
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

            let Some(loader) = loader_for_extension(ext) else {
                tracing::info!(file = %path.display(), "skipping unsupported file type");
                report.files_skipped += 1;
                continue;
            };

            match self.load_and_ingest(&*loader, path).await {
                Ok(0) => {}
                Ok(count) => {
                    report.files_indexed += 1;
                    report.chunks_indexed += count;
                    tracing::info!(file = %path.display(), chunks = count, "indexed");
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "failed to ingest file");
                    report.errors.push(format!("{}: {e}", path.display()));
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::document::splitter::SplitterConfig;
    use crate::document::types::DocumentMetadata;
    use crate::in_memory_store::InMemoryVectorStore;
    use sibyl_llm::mock::{MOCK_EMBED_DIM, hashed_bag_of_words};

    fn make_document(content: &str) -> Document {
        Document {
            content: content.to_owned(),
            metadata: DocumentMetadata {
                source: "test".to_owned(),
                content_type: "text/plain".to_owned(),
                extra: HashMap::new(),
            },
        }
    }

    fn bag_embed() -> EmbedFn {
        Box::new(|text: &str| {
            let v = hashed_bag_of_words(text, MOCK_EMBED_DIM);
            Box::pin(async move { Ok(v) })
        })
    }

    fn error_embed() -> EmbedFn {
        Box::new(|_: &str| {
            Box::pin(async { Err(sibyl_llm::LlmError::Other("mock embed error".into())) })
        })
    }

    fn pipeline(store: Arc<InMemoryVectorStore>, embed: EmbedFn) -> IngestionPipeline {
        IngestionPipeline::new(
            TextSplitter::new(SplitterConfig::default()),
            store,
            embed,
        )
    }

    #[tokio::test]
    async fn ingest_empty_document_returns_zero() {
        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(Arc::clone(&store), bag_embed());
        assert_eq!(p.ingest(make_document("")).await.unwrap(), 0);
        assert_eq!(store.point_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ingest_stores_payload_fields() {
        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(Arc::clone(&store), bag_embed());
        let count = p.ingest(make_document("hello world")).await.unwrap();
        assert_eq!(count, 1);

        let hits = store
            .search(hashed_bag_of_words("hello world", MOCK_EMBED_DIM), 1)
            .await
            .unwrap();
        assert_eq!(hits[0].payload.get("content").unwrap(), "hello world");
        assert_eq!(hits[0].payload.get("source").unwrap(), "test");
        assert_eq!(hits[0].payload.get("chunk_index").unwrap(), 0);
    }

    #[tokio::test]
    async fn ids_are_sequential_across_documents() {
        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(Arc::clone(&store), bag_embed());
        p.ingest(make_document("first document")).await.unwrap();
        p.ingest(make_document("second document")).await.unwrap();

        assert_eq!(store.point_count().await.unwrap(), 2);
        let drained = store.take_points().unwrap();
        assert_eq!(drained[0].id, 0);
        assert_eq!(drained[1].id, 1);
    }

    #[tokio::test]
    async fn embedding_error_propagates() {
        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(store, error_embed());
        assert!(p.ingest(make_document("content")).await.is_err());
    }

    #[tokio::test]
    async fn ingest_dir_routes_and_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.txt"), "plain text content").unwrap();
        std::fs::write(dir.path().join("notes.md"), "# markdown content").unwrap();
        std::fs::write(dir.path().join("skip.exe"), "binary").unwrap();
        // a .docx that is not a zip archive fails to load but must not
        // abort the batch
        std::fs::write(dir.path().join("broken.docx"), "not a zip").unwrap();

        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(Arc::clone(&store), bag_embed());
        let report = p.ingest_dir(dir.path()).await.unwrap();

        assert_eq!(report.files_scanned, 4);
        assert_eq!(report.files_indexed, 2);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("broken.docx"));
        assert_eq!(report.chunks_indexed, 2);
        assert_eq!(store.point_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn ingest_dir_empty_corpus_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(store, bag_embed());
        let report = p.ingest_dir(dir.path()).await.unwrap();
        assert_eq!(report.files_scanned, 0);
        assert_eq!(report.chunks_indexed, 0);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn ingest_dir_walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/deep.txt"), "nested content").unwrap();

        let store = Arc::new(InMemoryVectorStore::new());
        let p = pipeline(Arc::clone(&store), bag_embed());
        let report = p.ingest_dir(dir.path()).await.unwrap();
        assert_eq!(report.files_indexed, 1);
    }
}
