use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use crate::vector_store::{
    ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError, rank_points,
};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Insertion-ordered store used for staging during indexing and in tests.
/// Upserting a point whose id already exists replaces it in place, so
/// insertion order stays stable.
pub struct InMemoryVectorStore {
    points: RwLock<Vec<VectorPoint>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            points: RwLock::new(Vec::new()),
        }
    }

    /// Drain the staged points for snapshot publication.
    ///
    /// # Errors
    ///
    /// Returns an error if the inner lock is poisoned.
    pub fn take_points(&self) -> Result<Vec<VectorPoint>, VectorStoreError> {
        let mut points = self
            .points
            .write()
            .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
        Ok(std::mem::take(&mut *points))
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorStore")
            .finish_non_exhaustive()
    }
}

impl VectorStore for InMemoryVectorStore {
    fn upsert(&self, new_points: Vec<VectorPoint>) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        Box::pin(async move {
            let mut points = self
                .points
                .write()
                .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
            for p in new_points {
                if let Some(existing) = points.iter_mut().find(|e| e.id == p.id) {
                    *existing = p;
                } else {
                    points.push(p);
                }
            }
            Ok(())
        })
    }

    fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        Box::pin(async move {
            let points = self
                .points
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            Ok(rank_points(&points, &vector, limit))
        })
    }

    fn point_count(&self) -> BoxFuture<'_, Result<usize, VectorStoreError>> {
        Box::pin(async move {
            let points = self
                .points
                .read()
                .map_err(|e| VectorStoreError::Search(e.to_string()))?;
            Ok(points.len())
        })
    }
}
