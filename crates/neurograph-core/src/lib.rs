//! NeuroGraph Core - Domain models and shared types
//!
//! This crate defines the core abstractions used throughout the NeuroGraph
//! system:
//! - Knowledge graph models (entities, relation triples, evidence)
//! - Document/session context passed through the pipeline
//! - Common error types
//! - Connectivity check status
//! - Configuration management

pub mod config;

pub use config::{
    ConfigError, DatabaseConfig, LocalFileConfig, OutputFormat, PipelineConfig, StorageMode,
};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for NeuroGraph operations
#[derive(Error, Debug)]
pub enum NeuroGraphError {
    /// The annotation capability produced no usable sentences for a
    /// non-empty input. The document is skipped, never silently swallowed.
    #[error("Unparsable text: {0}")]
    UnparsableText(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Graph database connectivity failure, with a remediation hint.
    #[error("Connection failed ({status}): {hint}")]
    Connection {
        status: ConnectionStatus,
        hint: String,
    },

    /// A partial write was detected. The graph snapshot is left in memory so
    /// persistence can be retried without re-running extraction.
    #[error("Persistence write failed: {0}")]
    PersistenceWrite(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, NeuroGraphError>;

// ============================================================================
// Connectivity Check
// ============================================================================

/// Result of the graph database connectivity pre-check.
///
/// Tri-state, suitable for direct display: the check itself never fails
/// with an unhandled fault, it reports what it found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum ConnectionStatus {
    /// Host reachable and credentials accepted
    Reachable,
    /// Host reachable but authentication was rejected
    AuthFailed(String),
    /// Host could not be reached (includes protocol/version mismatches)
    Unreachable(String),
}

impl ConnectionStatus {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }

    /// Human-diagnosable message for display
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Reachable => "connection established".to_string(),
            Self::AuthFailed(reason) => {
                format!("authentication failed: {reason}; check username and password")
            }
            Self::Unreachable(reason) => {
                format!("host unreachable: {reason}; check the URL and that the server is running")
            }
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reachable => write!(f, "reachable"),
            Self::AuthFailed(_) => write!(f, "auth-failure"),
            Self::Unreachable(_) => write!(f, "unreachable"),
        }
    }
}

// ============================================================================
// Entity Model
// ============================================================================

/// Domain categories for extracted entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    NeuralRegion,
    NeuralPattern,
    Environment,
    Trait,
    Unknown,
}

impl EntityType {
    /// Get the string representation (graph database node label)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeuralRegion => "NEURAL_REGION",
            Self::NeuralPattern => "NEURAL_PATTERN",
            Self::Environment => "ENVIRONMENT",
            Self::Trait => "TRAIT",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse from a node label
    pub fn from_label(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NEURAL_REGION" => Some(Self::NeuralRegion),
            "NEURAL_PATTERN" => Some(Self::NeuralPattern),
            "ENVIRONMENT" => Some(Self::Environment),
            "TRAIT" => Some(Self::Trait),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Tie-break rank for classification: lower wins.
    ///
    /// NeuralRegion > NeuralPattern > Environment > Trait; Unknown always
    /// loses against a classified type.
    pub fn priority(&self) -> u8 {
        match self {
            Self::NeuralRegion => 0,
            Self::NeuralPattern => 1,
            Self::Environment => 2,
            Self::Trait => 3,
            Self::Unknown => 4,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Location of an entity mention within a processed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Document the mention came from
    pub document_id: Uuid,

    /// Sentence index within the normalized text
    pub sentence_index: usize,

    /// Byte offset of the mention start within the sentence
    pub start: usize,

    /// Byte offset of the mention end within the sentence
    pub end: usize,
}

/// A de-duplicated entity in the knowledge graph
///
/// Two mentions normalizing to the same `canonical_id` are the same entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Normalized lowercase identity, alias-resolved
    pub canonical_id: String,

    /// Domain category
    pub entity_type: EntityType,

    /// Surface forms seen in the source text
    pub surface_forms: BTreeSet<String>,

    /// Document offsets of every mention, in processing order
    pub source_spans: Vec<SourceSpan>,
}

impl Entity {
    /// Create a new entity from its first mention
    pub fn new(canonical_id: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            canonical_id: canonical_id.into(),
            entity_type,
            surface_forms: BTreeSet::new(),
            source_spans: Vec::new(),
        }
    }

    /// Record a mention of this entity
    pub fn record_mention(&mut self, surface: impl Into<String>, span: SourceSpan) {
        self.surface_forms.insert(surface.into());
        self.source_spans.push(span);
    }

    /// Fold another record of the same entity into this one
    ///
    /// Surface forms and spans are unioned. A classified type always beats
    /// Unknown; a tie between classified types resolves by category priority.
    pub fn merge_from(&mut self, other: Entity) {
        debug_assert_eq!(self.canonical_id, other.canonical_id);
        if other.entity_type.priority() < self.entity_type.priority() {
            self.entity_type = other.entity_type;
        }
        self.surface_forms.extend(other.surface_forms);
        self.source_spans.extend(other.source_spans);
    }
}

// ============================================================================
// Relation Triples
// ============================================================================

/// Direction of an asserted effect: negated verbs flip it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "+"),
            Self::Negative => write!(f, "-"),
        }
    }
}

/// Sentence-level evidence backing a triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSpan {
    /// Sentence index within the normalized document text
    pub sentence_index: usize,

    /// The sentence text
    pub text: String,
}

/// Merge key for relation triples
pub type TripleKey = (String, String, String);

/// A (subject, predicate, object) relation with confidence and evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationTriple {
    /// Canonical id of the subject entity
    pub subject_id: String,

    /// Normalized predicate label
    pub predicate: String,

    /// Canonical id of the object entity
    pub object_id: String,

    /// Confidence score in [0, 1]
    pub confidence: f32,

    /// Effect direction
    pub polarity: Polarity,

    /// Accumulated evidence sentences
    pub evidence: Vec<EvidenceSpan>,
}

impl RelationTriple {
    /// Create a new triple. Confidence is clamped into [0, 1].
    pub fn new(
        subject_id: impl Into<String>,
        predicate: impl Into<String>,
        object_id: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            predicate: predicate.into(),
            object_id: object_id.into(),
            confidence: confidence.clamp(0.0, 1.0),
            polarity: Polarity::Positive,
            evidence: Vec::new(),
        }
    }

    /// Set polarity
    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Attach an evidence sentence
    pub fn with_evidence(mut self, evidence: EvidenceSpan) -> Self {
        self.evidence.push(evidence);
        self
    }

    /// Merge key: `(subject_id, predicate, object_id)`
    pub fn key(&self) -> TripleKey {
        (
            self.subject_id.clone(),
            self.predicate.clone(),
            self.object_id.clone(),
        )
    }

    /// A triple whose subject and object collapsed to the same entity
    pub fn is_self_loop(&self) -> bool {
        self.subject_id == self.object_id
    }

    /// Merge a corroborating instance with the same key into this triple
    ///
    /// Confidence is the maximum across merges (monotonically non-decreasing),
    /// evidence accumulates (deduplicated on the full span, so sentences from
    /// different documents sharing an index are both kept), and the polarity
    /// of the higher-confidence instance wins.
    pub fn merge_from(&mut self, other: RelationTriple) {
        debug_assert_eq!(self.key(), other.key());
        if other.confidence > self.confidence {
            self.confidence = other.confidence;
            self.polarity = other.polarity;
        }
        for span in other.evidence {
            if !self.evidence.contains(&span) {
                self.evidence.push(span);
            }
        }
    }
}

// ============================================================================
// Document Context
// ============================================================================

/// Explicit per-document session state passed through the pipeline
///
/// Carried by value through every component instead of living in shared
/// mutable state, so independent documents can be processed concurrently.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    /// Unique identifier for this processing run
    pub document_id: Uuid,

    /// Document title or source path, for reporting
    pub title: String,

    /// Raw text, as handed over by the external format readers
    pub text: String,

    /// Active configuration
    pub config: PipelineConfig,
}

impl DocumentContext {
    /// Create a context for a new document pass
    pub fn new(title: impl Into<String>, text: impl Into<String>, config: PipelineConfig) -> Self {
        Self {
            document_id: Uuid::new_v4(),
            title: title.into(),
            text: text.into(),
            config,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
