//! Versioned on-disk index snapshots.
//!
//! A snapshot is an immutable directory (`meta.json` + `points.json`) named
//! `snapshot-NNNNNN`; the `CURRENT` file holds the name of the active one and
//! is swapped atomically at publish time. A serving process keeps the
//! snapshot it opened, so rebuilds never race with queries.

use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::vector_store::{
    ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError, rank_points,
};

pub const INDEX_FORMAT_VERSION: u32 = 1;

const CURRENT_FILE: &str = "CURRENT";
const SNAPSHOT_PREFIX: &str = "snapshot-";
const META_FILE: &str = "meta.json";
const POINTS_FILE: &str = "points.json";

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMeta {
    pub format_version: u32,
    pub dimension: usize,
    pub embedding_model: String,
    pub points: usize,
    pub created_at_secs: u64,
}

impl IndexMeta {
    #[must_use]
    pub fn new(dimension: usize, embedding_model: impl Into<String>, points: usize) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            dimension,
            embedding_model: embedding_model.into(),
            points,
            created_at_secs: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }
}

/// Read-only view of one published snapshot, loaded fully into memory.
pub struct SnapshotStore {
    name: String,
    meta: IndexMeta,
    points: Vec<VectorPoint>,
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("name", &self.name)
            .field("points", &self.points.len())
            .field("dimension", &self.meta.dimension)
            .finish()
    }
}

impl SnapshotStore {
    /// Open the snapshot named by `CURRENT`. `Ok(None)` means the index has
    /// never been built (missing directory or `CURRENT` file), which is not
    /// an error: the caller degrades to "index not initialized" answers.
    ///
    /// # Errors
    ///
    /// Returns an error when `CURRENT` names a snapshot that cannot be read
    /// or parsed, or the format version is unknown.
    pub fn open(dir: &Path) -> Result<Option<Self>, VectorStoreError> {
        let current_path = dir.join(CURRENT_FILE);
        if !current_path.exists() {
            return Ok(None);
        }

        let name = std::fs::read_to_string(&current_path)?.trim().to_owned();
        let snapshot_dir = dir.join(&name);

        let meta: IndexMeta =
            serde_json::from_str(&std::fs::read_to_string(snapshot_dir.join(META_FILE))?)?;
        if meta.format_version != INDEX_FORMAT_VERSION {
            return Err(VectorStoreError::Search(format!(
                "unsupported index format version {}",
                meta.format_version
            )));
        }

        let points: Vec<VectorPoint> =
            serde_json::from_str(&std::fs::read_to_string(snapshot_dir.join(POINTS_FILE))?)?;

        tracing::info!(
            snapshot = %name,
            points = points.len(),
            dimension = meta.dimension,
            "opened index snapshot"
        );

        Ok(Some(Self { name, meta, points }))
    }

    /// Write a new snapshot directory, atomically swap `CURRENT` to it, and
    /// prune everything but the new snapshot and its immediate predecessor.
    /// Returns the new snapshot name.
    ///
    /// # Errors
    ///
    /// Returns an error on any filesystem or serialization failure; a failed
    /// publish never moves `CURRENT`.
    pub fn publish(
        dir: &Path,
        points: &[VectorPoint],
        meta: &IndexMeta,
    ) -> Result<String, VectorStoreError> {
        std::fs::create_dir_all(dir)?;

        let previous = read_current(dir);
        let name = next_snapshot_name(dir)?;
        let snapshot_dir = dir.join(&name);
        std::fs::create_dir(&snapshot_dir)?;

        write_synced(&snapshot_dir.join(META_FILE), &serde_json::to_vec_pretty(meta)?)?;
        write_synced(&snapshot_dir.join(POINTS_FILE), &serde_json::to_vec(points)?)?;

        // tmp-then-rename keeps CURRENT pointing at a complete snapshot even
        // if the process dies mid-publish
        let tmp = dir.join(format!("{CURRENT_FILE}.tmp"));
        write_synced(&tmp, name.as_bytes())?;
        std::fs::rename(&tmp, dir.join(CURRENT_FILE))?;

        prune(dir, &name, previous.as_deref())?;

        tracing::info!(snapshot = %name, points = points.len(), "published index snapshot");
        Ok(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }
}

impl VectorStore for SnapshotStore {
    fn upsert(&self, _points: Vec<VectorPoint>) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        Box::pin(async { Err(VectorStoreError::ReadOnly) })
    }

    fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        Box::pin(async move {
            if self.points.is_empty() {
                return Ok(Vec::new());
            }
            if vector.len() != self.meta.dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    expected: self.meta.dimension,
                    got: vector.len(),
                });
            }
            Ok(rank_points(&self.points, &vector, limit))
        })
    }

    fn point_count(&self) -> BoxFuture<'_, Result<usize, VectorStoreError>> {
        Box::pin(async move { Ok(self.points.len()) })
    }
}

fn read_current(dir: &Path) -> Option<String> {
    std::fs::read_to_string(dir.join(CURRENT_FILE))
        .ok()
        .map(|s| s.trim().to_owned())
}

fn next_snapshot_name(dir: &Path) -> Result<String, VectorStoreError> {
    let mut max_seq = 0u64;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(seq) = parse_snapshot_seq(&entry.file_name().to_string_lossy()) {
            max_seq = max_seq.max(seq);
        }
    }
    Ok(format!("{SNAPSHOT_PREFIX}{:06}", max_seq + 1))
}

fn parse_snapshot_seq(name: &str) -> Option<u64> {
    name.strip_prefix(SNAPSHOT_PREFIX)?.parse().ok()
}

fn write_synced(path: &PathBuf, bytes: &[u8]) -> Result<(), VectorStoreError> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn prune(dir: &Path, keep: &str, previous: Option<&str>) -> Result<(), VectorStoreError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if parse_snapshot_seq(&name).is_none() || name == keep || Some(name.as_str()) == previous {
            continue;
        }
        if let Err(e) = std::fs::remove_dir_all(entry.path()) {
            tracing::warn!(snapshot = %name, error = %e, "failed to prune old snapshot");
        }
    }
    Ok(())
}
