//! NeuroGraph Graph - Assembly and persistence
//!
//! Builds the unified in-memory knowledge graph from extraction output and
//! persists immutable snapshots through one capability interface with two
//! backends:
//! - Local file (JSON/CSV serialization, atomic writes)
//! - Graph database (SurrealDB, idempotent upserts)

use async_trait::async_trait;

use neurograph_core::{ConnectionStatus, RelationTriple, Result};

pub mod builder;
pub mod local_store;
pub mod surrealdb_store;

pub use builder::{GraphBuilder, GraphSnapshot};
pub use local_store::LocalFileStore;
pub use surrealdb_store::SurrealDbStore;

/// Outcome summary of a persistence run
#[derive(Debug, Clone)]
pub struct PersistReport {
    /// Entities written or upserted
    pub entities_written: usize,

    /// Relations written or upserted
    pub relations_written: usize,

    /// Triples dropped for falling below the confidence threshold
    pub skipped_below_threshold: usize,

    /// Human-readable destination (path or database URL)
    pub destination: String,
}

/// Capability interface over persistence backends
///
/// Both implementations are safe to invoke repeatedly with the same snapshot
/// without creating duplicate nodes or edges. On failure the snapshot stays
/// untouched in memory so persistence can be retried without re-running
/// extraction.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Persist a graph snapshot
    async fn persist(&self, snapshot: &GraphSnapshot) -> Result<PersistReport>;

    /// Connectivity pre-check, callable independently of persistence
    async fn test_connection(&self) -> Result<ConnectionStatus>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Split a snapshot's relations at the confidence threshold
///
/// Returns the relations to persist and the count of dropped ones.
pub(crate) fn eligible_relations(
    snapshot: &GraphSnapshot,
    min_confidence: f32,
) -> (Vec<&RelationTriple>, usize) {
    let (kept, dropped): (Vec<_>, Vec<_>) = snapshot
        .relations
        .iter()
        .partition(|t| t.confidence >= min_confidence);
    (kept, dropped.len())
}
