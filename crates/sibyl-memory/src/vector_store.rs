use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("upsert error: {0}")]
    Upsert(String),
    #[error("search error: {0}")]
    Search(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("dimension mismatch: index holds {expected}-dim vectors, query has {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("store is read-only; rebuild the index to change it")]
    ReadOnly,
}

/// One embedded passage. Ids are assigned in insertion order during indexing
/// and double as the deterministic tie-break key at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ScoredVectorPoint {
    pub id: u64,
    pub score: f32,
    pub payload: HashMap<String, serde_json::Value>,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait VectorStore: Send + Sync {
    fn upsert(&self, points: Vec<VectorPoint>) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>>;

    fn point_count(&self) -> BoxFuture<'_, Result<usize, VectorStoreError>>;
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Rank points against a query vector: score descending, insertion id
/// ascending on ties, truncated to `limit`.
pub(crate) fn rank_points(
    points: &[VectorPoint],
    query: &[f32],
    limit: usize,
) -> Vec<ScoredVectorPoint> {
    let mut scored: Vec<ScoredVectorPoint> = points
        .iter()
        .map(|p| ScoredVectorPoint {
            id: p.id,
            score: cosine_similarity(query, &p.vector),
            payload: p.payload.clone(),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < f32::EPSILON);
    }

    #[test]
    fn cosine_similarity_zero_norm_scores_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < f32::EPSILON);
    }

    #[test]
    fn rank_points_orders_by_score_then_id() {
        let points = vec![
            VectorPoint {
                id: 2,
                vector: vec![1.0, 0.0],
                payload: HashMap::new(),
            },
            VectorPoint {
                id: 0,
                vector: vec![1.0, 0.0],
                payload: HashMap::new(),
            },
            VectorPoint {
                id: 1,
                vector: vec![0.0, 1.0],
                payload: HashMap::new(),
            },
        ];
        let ranked = rank_points(&points, &[1.0, 0.0], 10);
        // ids 0 and 2 tie at score 1.0; insertion id breaks the tie
        assert_eq!(ranked[0].id, 0);
        assert_eq!(ranked[1].id, 2);
        assert_eq!(ranked[2].id, 1);
    }

    #[test]
    fn rank_points_truncates_to_limit() {
        let points: Vec<VectorPoint> = (0..10)
            .map(|i| VectorPoint {
                id: i,
                vector: vec![1.0, 0.0],
                payload: HashMap::new(),
            })
            .collect();
        assert_eq!(rank_points(&points, &[1.0, 0.0], 3).len(), 3);
    }

    #[test]
    fn vector_point_serde_round_trip() {
        let point = VectorPoint {
            id: 7,
            vector: vec![0.1, 0.2],
            payload: HashMap::from([("content".into(), serde_json::json!("hello"))]),
        };
        let json = serde_json::to_string(&point).unwrap();
        let back: VectorPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 7);
        assert_eq!(back.payload.get("content").unwrap(), "hello");
    }
}
