//! NeuroGraph Extractor - Knowledge extraction pipeline
//!
//! Turns annotated sentences into classified entities and candidate
//! relation triples:
//! - Entity recognition and classification against curated lexicons
//! - Syntactic relation extraction with confidence scoring
//! - The per-document pipeline tying both together

use neurograph_core::{EntityType, SourceSpan};

/// A classified entity mention within one sentence
#[derive(Debug, Clone)]
pub struct RecognizedMention {
    /// Normalized, alias-resolved identity
    pub canonical_id: String,

    /// Assigned domain category
    pub entity_type: EntityType,

    /// Surface form as seen in the text
    pub surface: String,

    /// Where the mention occurred
    pub span: SourceSpan,

    /// Index of the span's head token in the annotated sentence
    pub head_token: usize,
}

pub mod ner;
pub mod pipeline;
pub mod relation;

pub use ner::EntityRecognizer;
pub use pipeline::{DocumentExtraction, Pipeline};
pub use relation::RelationExtractor;
