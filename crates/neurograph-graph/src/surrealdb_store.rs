//! SurrealDB persistence backend
//!
//! Upserts entity nodes keyed by canonical id and relation edges keyed by
//! their merge key, so re-persisting the same snapshot never duplicates
//! records. Matched relations keep the maximum confidence seen.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::{debug, info, warn};

use neurograph_core::{
    ConnectionStatus, DatabaseConfig, Entity, EvidenceSpan, NeuroGraphError, RelationTriple, Result,
};

use crate::{eligible_relations, GraphSnapshot, GraphStore, PersistReport};

/// Strip the scheme prefix; the surrealdb client adds it itself
fn host_of(url: &str) -> &str {
    url.strip_prefix("ws://")
        .or_else(|| url.strip_prefix("wss://"))
        .unwrap_or(url)
}

/// SurrealDB-backed graph store
pub struct SurrealDbStore {
    client: Surreal<Client>,
    config: DatabaseConfig,
    min_confidence: f32,
}

impl SurrealDbStore {
    /// Connect, authenticate, and select the target namespace/database
    pub async fn connect(config: &DatabaseConfig, min_confidence: f32) -> Result<Self> {
        let client = Surreal::new::<Ws>(host_of(&config.url)).await.map_err(|e| {
            NeuroGraphError::Connection {
                status: ConnectionStatus::Unreachable(e.to_string()),
                hint: format!("check that SurrealDB is running at {}", config.url),
            }
        })?;

        client
            .signin(Root {
                username: &config.user,
                password: &config.pass,
            })
            .await
            .map_err(|e| NeuroGraphError::Connection {
                status: ConnectionStatus::AuthFailed(e.to_string()),
                hint: "check the configured username and password".to_string(),
            })?;

        client
            .use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| NeuroGraphError::Database(format!("namespace selection failed: {e}")))?;

        debug!(url = %config.url, ns = %config.namespace, db = %config.database, "connected");
        Ok(Self {
            client,
            config: config.clone(),
            min_confidence,
        })
    }

    /// Initialize schema (run once on setup)
    pub async fn init_schema(&self) -> Result<()> {
        self.client
            .query(
                r#"
                DEFINE TABLE entity SCHEMAFULL;
                DEFINE FIELD entity_type ON entity TYPE string;
                DEFINE FIELD surface_forms ON entity TYPE array<string>;
                DEFINE FIELD updated_at ON entity TYPE datetime;
                DEFINE INDEX idx_entity_type ON entity FIELDS entity_type;

                DEFINE TABLE relation SCHEMAFULL;
                DEFINE FIELD subject ON relation TYPE string;
                DEFINE FIELD predicate ON relation TYPE string;
                DEFINE FIELD object ON relation TYPE string;
                DEFINE FIELD confidence ON relation TYPE float;
                DEFINE FIELD polarity ON relation TYPE string;
                DEFINE FIELD evidence ON relation TYPE array;
                DEFINE INDEX idx_relation_predicate ON relation FIELDS predicate;
            "#,
            )
            .await
            .map_err(|e| NeuroGraphError::Database(format!("schema init failed: {e}")))?;
        Ok(())
    }

    async fn upsert_entity(&self, entity: &Entity) -> Result<()> {
        let record = EntityRecord::from(entity);
        let _: Option<EntityRecord> = self
            .client
            .upsert(("entity", entity.canonical_id.as_str()))
            .content(record)
            .await
            .map_err(|e| {
                NeuroGraphError::Database(format!(
                    "upsert entity {}: {e}",
                    entity.canonical_id
                ))
            })?;
        Ok(())
    }

    /// Upsert keyed by the triple's merge key; on match the stored confidence
    /// only ever goes up
    async fn upsert_relation(&self, triple: &RelationTriple) -> Result<()> {
        let record = RelationRecord::from(triple);
        let key = format!(
            "{}|{}|{}",
            triple.subject_id, triple.predicate, triple.object_id
        );

        let existing: Option<RelationRecord> = self
            .client
            .select(("relation", key.as_str()))
            .await
            .map_err(|e| NeuroGraphError::Database(format!("select relation {key}: {e}")))?;

        let merged = match existing {
            Some(prior) if prior.confidence > record.confidence => RelationRecord {
                confidence: prior.confidence,
                polarity: prior.polarity,
                ..record
            },
            _ => record,
        };

        let _: Option<RelationRecord> = self
            .client
            .upsert(("relation", key.as_str()))
            .content(merged)
            .await
            .map_err(|e| NeuroGraphError::Database(format!("upsert relation {key}: {e}")))?;
        Ok(())
    }
}

/// Standalone connectivity pre-check; reports rather than fails
pub async fn test_connection(config: &DatabaseConfig) -> ConnectionStatus {
    let client = match Surreal::new::<Ws>(host_of(&config.url)).await {
        Ok(client) => client,
        Err(e) => return ConnectionStatus::Unreachable(e.to_string()),
    };

    let signin = client
        .signin(Root {
            username: &config.user,
            password: &config.pass,
        })
        .await;
    match signin {
        Ok(_) => ConnectionStatus::Reachable,
        Err(e) => ConnectionStatus::AuthFailed(e.to_string()),
    }
}

// ============================================================================
// Database records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntityRecord {
    entity_type: String,
    surface_forms: Vec<String>,
    updated_at: surrealdb::sql::Datetime,
}

impl From<&Entity> for EntityRecord {
    fn from(entity: &Entity) -> Self {
        Self {
            entity_type: entity.entity_type.as_str().to_string(),
            surface_forms: entity.surface_forms.iter().cloned().collect(),
            updated_at: chrono::Utc::now().into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RelationRecord {
    subject: String,
    predicate: String,
    object: String,
    confidence: f32,
    polarity: String,
    evidence: Vec<EvidenceSpan>,
}

impl From<&RelationTriple> for RelationRecord {
    fn from(triple: &RelationTriple) -> Self {
        Self {
            subject: triple.subject_id.clone(),
            predicate: triple.predicate.clone(),
            object: triple.object_id.clone(),
            confidence: triple.confidence,
            polarity: triple.polarity.to_string(),
            evidence: triple.evidence.clone(),
        }
    }
}

#[async_trait]
impl GraphStore for SurrealDbStore {
    async fn persist(&self, snapshot: &GraphSnapshot) -> Result<PersistReport> {
        let (relations, skipped) = eligible_relations(snapshot, self.min_confidence);

        for entity in &snapshot.entities {
            self.upsert_entity(entity).await?;
        }
        for triple in &relations {
            self.upsert_relation(triple).await?;
        }

        if skipped > 0 {
            warn!(skipped, "relations below confidence threshold not persisted");
        }
        info!(
            url = %self.config.url,
            entities = snapshot.entities.len(),
            relations = relations.len(),
            "graph persisted to database"
        );
        Ok(PersistReport {
            entities_written: snapshot.entities.len(),
            relations_written: relations.len(),
            skipped_below_threshold: skipped,
            destination: self.config.url.clone(),
        })
    }

    async fn test_connection(&self) -> Result<ConnectionStatus> {
        // Already authenticated at construction; verify the session is alive
        match self.client.query("RETURN 1").await {
            Ok(_) => Ok(ConnectionStatus::Reachable),
            Err(e) => Ok(ConnectionStatus::Unreachable(e.to_string())),
        }
    }

    fn name(&self) -> &str {
        "surrealdb"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_of_strips_scheme() {
        assert_eq!(host_of("ws://localhost:8000"), "localhost:8000");
        assert_eq!(host_of("wss://db.example.com"), "db.example.com");
        assert_eq!(host_of("localhost:8000"), "localhost:8000");
    }

    #[tokio::test]
    async fn test_connection_check_reports_unreachable_host() {
        let config = DatabaseConfig {
            url: "ws://127.0.0.1:1".to_string(),
            ..DatabaseConfig::default()
        };
        let status = test_connection(&config).await;
        assert!(matches!(status, ConnectionStatus::Unreachable(_)));
    }

    #[tokio::test]
    async fn test_connect_surfaces_unreachable_as_connection_error() {
        let config = DatabaseConfig {
            url: "ws://127.0.0.1:1".to_string(),
            ..DatabaseConfig::default()
        };
        let result = SurrealDbStore::connect(&config, 0.5).await;
        assert!(matches!(
            result,
            Err(NeuroGraphError::Connection {
                status: ConnectionStatus::Unreachable(_),
                ..
            })
        ));
    }
}
