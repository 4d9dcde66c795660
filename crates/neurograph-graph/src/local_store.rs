//! Local file persistence backend
//!
//! Serializes graph snapshots to JSON or CSV under a configured output
//! directory. Writes go through a temp file followed by an atomic rename so a
//! crash mid-write never leaves a truncated graph file, and an exclusive
//! advisory lock keeps concurrent runs from interleaving.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use neurograph_core::{
    ConnectionStatus, Entity, EntityType, EvidenceSpan, LocalFileConfig, NeuroGraphError,
    OutputFormat, Polarity, RelationTriple, Result,
};

use crate::{eligible_relations, GraphBuilder, GraphSnapshot, GraphStore, PersistReport};

const JSON_FILE: &str = "knowledge_graph.json";
const CSV_FILE: &str = "knowledge_graph.csv";
const LOCK_FILE: &str = ".neurograph.lock";

// ============================================================================
// File schema
// ============================================================================

/// On-disk JSON document
#[derive(Debug, Serialize, Deserialize)]
struct GraphDocument {
    entities: Vec<EntityRecord>,
    relations: Vec<RelationRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntityRecord {
    id: String,
    #[serde(rename = "type")]
    entity_type: EntityType,
    surface_forms: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RelationRecord {
    subject: String,
    predicate: String,
    object: String,
    confidence: f32,
    #[serde(default = "default_polarity")]
    polarity: Polarity,
    evidence: Vec<EvidenceSpan>,
}

fn default_polarity() -> Polarity {
    Polarity::Positive
}

impl GraphDocument {
    fn from_snapshot(snapshot: &GraphSnapshot, relations: &[&RelationTriple]) -> Self {
        Self {
            entities: snapshot
                .entities
                .iter()
                .map(|e| EntityRecord {
                    id: e.canonical_id.clone(),
                    entity_type: e.entity_type,
                    surface_forms: e.surface_forms.iter().cloned().collect(),
                })
                .collect(),
            relations: relations
                .iter()
                .map(|t| RelationRecord {
                    subject: t.subject_id.clone(),
                    predicate: t.predicate.clone(),
                    object: t.object_id.clone(),
                    confidence: t.confidence,
                    polarity: t.polarity,
                    evidence: t.evidence.clone(),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Store
// ============================================================================

/// Persists snapshots as files in a local output directory
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    output_dir: PathBuf,
    format: OutputFormat,
    min_confidence: f32,
}

impl LocalFileStore {
    pub fn new(config: &LocalFileConfig, min_confidence: f32) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            format: config.format,
            min_confidence,
        }
    }

    /// Path the next persist call will write to
    pub fn output_path(&self) -> PathBuf {
        match self.format {
            OutputFormat::Json => self.output_dir.join(JSON_FILE),
            OutputFormat::Csv => self.output_dir.join(CSV_FILE),
        }
    }

    /// Rebuild a snapshot from a previously written JSON graph file
    ///
    /// Used by cumulative mode to resume an existing graph, and by the export
    /// command to re-serialize it.
    pub fn load_json(path: &Path) -> Result<GraphSnapshot> {
        let data = fs::read_to_string(path)
            .map_err(|e| NeuroGraphError::PersistenceWrite(format!("read {path:?}: {e}")))?;
        let document: GraphDocument = serde_json::from_str(&data)
            .map_err(|e| NeuroGraphError::PersistenceWrite(format!("parse {path:?}: {e}")))?;

        let mut builder = GraphBuilder::new();
        for record in document.entities {
            let mut entity = Entity::new(record.id, record.entity_type);
            entity.surface_forms.extend(record.surface_forms);
            builder.add_entity(entity);
        }
        for record in document.relations {
            let mut triple = RelationTriple::new(
                record.subject,
                record.predicate,
                record.object,
                record.confidence,
            )
            .with_polarity(record.polarity);
            triple.evidence = record.evidence;
            builder.add_triple(triple);
        }
        Ok(builder.snapshot())
    }

    fn write_json(&self, snapshot: &GraphSnapshot, relations: &[&RelationTriple]) -> Result<()> {
        let document = GraphDocument::from_snapshot(snapshot, relations);
        let payload = serde_json::to_vec_pretty(&document)
            .map_err(|e| NeuroGraphError::PersistenceWrite(format!("serialize graph: {e}")))?;
        self.write_atomic(&self.output_dir.join(JSON_FILE), &payload)
    }

    fn write_csv(&self, relations: &[&RelationTriple]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(["subject", "predicate", "object", "confidence"])
            .map_err(|e| NeuroGraphError::PersistenceWrite(format!("csv header: {e}")))?;
        for triple in relations {
            writer
                .write_record([
                    triple.subject_id.as_str(),
                    triple.predicate.as_str(),
                    triple.object_id.as_str(),
                    &format!("{:.2}", triple.confidence),
                ])
                .map_err(|e| NeuroGraphError::PersistenceWrite(format!("csv row: {e}")))?;
        }
        let payload = writer
            .into_inner()
            .map_err(|e| NeuroGraphError::PersistenceWrite(format!("csv flush: {e}")))?;
        self.write_atomic(&self.output_dir.join(CSV_FILE), &payload)
    }

    /// Temp file in the target directory, then rename over the destination
    fn write_atomic(&self, path: &Path, payload: &[u8]) -> Result<()> {
        let temp = NamedTempFile::new_in(&self.output_dir)
            .map_err(|e| NeuroGraphError::PersistenceWrite(format!("create temp file: {e}")))?;
        fs::write(temp.path(), payload)
            .map_err(|e| NeuroGraphError::PersistenceWrite(format!("write temp file: {e}")))?;
        temp.persist(path)
            .map_err(|e| NeuroGraphError::PersistenceWrite(format!("rename into {path:?}: {e}")))?;
        debug!(path = %path.display(), bytes = payload.len(), "graph file written");
        Ok(())
    }

    /// Exclusive advisory lock held for the duration of a persist call
    fn acquire_lock(&self) -> Result<File> {
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.output_dir.join(LOCK_FILE))
            .map_err(|e| NeuroGraphError::PersistenceWrite(format!("open lock file: {e}")))?;
        lock.lock_exclusive()
            .map_err(|e| NeuroGraphError::PersistenceWrite(format!("acquire lock: {e}")))?;
        Ok(lock)
    }
}

#[async_trait]
impl GraphStore for LocalFileStore {
    async fn persist(&self, snapshot: &GraphSnapshot) -> Result<PersistReport> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            NeuroGraphError::PersistenceWrite(format!(
                "create output directory {:?}: {e}",
                self.output_dir
            ))
        })?;
        let lock = self.acquire_lock()?;

        let (relations, skipped) = eligible_relations(snapshot, self.min_confidence);
        match self.format {
            OutputFormat::Json => self.write_json(snapshot, &relations)?,
            OutputFormat::Csv => self.write_csv(&relations)?,
        }

        let _ = fs2::FileExt::unlock(&lock);

        let destination = self.output_path().display().to_string();
        info!(
            destination = %destination,
            entities = snapshot.entities.len(),
            relations = relations.len(),
            skipped,
            "graph persisted to local file"
        );
        Ok(PersistReport {
            entities_written: snapshot.entities.len(),
            relations_written: relations.len(),
            skipped_below_threshold: skipped,
            destination,
        })
    }

    /// Checks that the output directory can be created and written to
    async fn test_connection(&self) -> Result<ConnectionStatus> {
        let probe = (|| -> std::io::Result<()> {
            fs::create_dir_all(&self.output_dir)?;
            let file = NamedTempFile::new_in(&self.output_dir)?;
            drop(file);
            Ok(())
        })();

        Ok(match probe {
            Ok(()) => ConnectionStatus::Reachable,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                ConnectionStatus::AuthFailed(format!("{:?} is not writable: {e}", self.output_dir))
            }
            Err(e) => ConnectionStatus::Unreachable(format!(
                "output directory {:?} unavailable: {e}",
                self.output_dir
            )),
        })
    }

    fn name(&self) -> &str {
        "local-file"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_snapshot() -> GraphSnapshot {
        let mut builder = GraphBuilder::new();

        let mut stress = Entity::new("stress", EntityType::Environment);
        stress.surface_forms.insert("Chronic stress".to_string());
        builder.add_entity(stress);
        builder.add_entity(Entity::new("amygdala activation", EntityType::NeuralPattern));

        builder.add_triple(
            RelationTriple::new("stress", "increases", "amygdala activation", 0.9).with_evidence(
                EvidenceSpan {
                    sentence_index: 0,
                    text: "Chronic stress increases amygdala activation.".to_string(),
                },
            ),
        );
        builder.add_triple(RelationTriple::new("stress", "impairs", "memory", 0.2));
        builder.snapshot()
    }

    fn store(dir: &TempDir, format: OutputFormat) -> LocalFileStore {
        LocalFileStore::new(
            &LocalFileConfig {
                output_dir: dir.path().to_path_buf(),
                format,
            },
            0.5,
        )
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, OutputFormat::Json);
        let snapshot = sample_snapshot();

        let report = store.persist(&snapshot).await.unwrap();
        assert_eq!(report.entities_written, 2);
        assert_eq!(report.relations_written, 1);
        assert_eq!(report.skipped_below_threshold, 1);

        let loaded = LocalFileStore::load_json(&store.output_path()).unwrap();
        assert_eq!(loaded.entities.len(), 2);
        assert_eq!(loaded.relations.len(), 1);
        assert_eq!(loaded.relations[0].subject_id, "stress");
        assert_eq!(loaded.relations[0].confidence, 0.9);
        assert_eq!(loaded.relations[0].evidence.len(), 1);
        assert!(loaded
            .entity("stress")
            .unwrap()
            .surface_forms
            .contains("Chronic stress"));
    }

    #[tokio::test]
    async fn test_repeated_persist_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, OutputFormat::Json);
        let snapshot = sample_snapshot();

        store.persist(&snapshot).await.unwrap();
        let first = fs::read_to_string(store.output_path()).unwrap();
        store.persist(&snapshot).await.unwrap();
        let second = fs::read_to_string(store.output_path()).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_csv_export() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, OutputFormat::Csv);

        store.persist(&sample_snapshot()).await.unwrap();
        let contents = fs::read_to_string(store.output_path()).unwrap();

        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("subject,predicate,object,confidence"));
        assert_eq!(
            lines.next(),
            Some("stress,increases,amygdala activation,0.90")
        );
        // Below-threshold triple is dropped
        assert_eq!(lines.next(), None);
    }

    #[tokio::test]
    async fn test_connection_check_on_writable_directory() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, OutputFormat::Json);
        let status = store.test_connection().await.unwrap();
        assert!(status.is_reachable());
    }

    #[tokio::test]
    async fn test_output_directory_created_on_demand() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("deep").join("output");
        let store = LocalFileStore::new(
            &LocalFileConfig {
                output_dir: nested.clone(),
                format: OutputFormat::Json,
            },
            0.0,
        );

        store.persist(&sample_snapshot()).await.unwrap();
        assert!(store.output_path().exists());
    }

    #[test]
    fn test_load_json_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(JSON_FILE);
        fs::write(&path, "{ not json").unwrap();
        assert!(LocalFileStore::load_json(&path).is_err());
    }

    #[test]
    fn test_load_json_tolerates_missing_polarity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(JSON_FILE);
        fs::write(
            &path,
            r#"{"entities":[{"id":"stress","type":"ENVIRONMENT","surface_forms":["stress"]}],
                "relations":[{"subject":"stress","predicate":"impairs","object":"memory",
                "confidence":0.7,"evidence":[]}]}"#,
        )
        .unwrap();

        let snapshot = LocalFileStore::load_json(&path).unwrap();
        assert_eq!(snapshot.relations[0].polarity, Polarity::Positive);
    }
}
