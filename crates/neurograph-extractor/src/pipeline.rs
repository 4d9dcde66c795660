//! Per-document extraction pipeline
//!
//! Runs annotate -> recognize -> extract over one document context and
//! collects the entities and candidate triples for the graph builder.
//! Each pipeline instance owns its components; concurrent documents use
//! separate instances.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};
use uuid::Uuid;

use neurograph_core::{DocumentContext, Entity, RelationTriple, Result};
use neurograph_text::Annotator;

use crate::{EntityRecognizer, RelationExtractor};

/// Everything extracted from one document pass
#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    /// Document this extraction came from
    pub document_id: Uuid,

    /// Number of sentences processed
    pub sentence_count: usize,

    /// Number of sentences where self-referential candidate triples were
    /// dropped
    pub skipped_sentences: usize,

    /// De-duplicated entities, keyed by canonical id
    pub entities: Vec<Entity>,

    /// Candidate triples, in sentence order, not yet merged
    pub triples: Vec<RelationTriple>,
}

/// The text-to-graph extraction pipeline for a single document
pub struct Pipeline<A: Annotator> {
    annotator: A,
    recognizer: EntityRecognizer,
}

impl<A: Annotator> Pipeline<A> {
    pub fn new(annotator: A) -> Self {
        Self {
            annotator,
            recognizer: EntityRecognizer::new(),
        }
    }

    /// Process one document into entities and candidate triples
    ///
    /// Sentence-level failures are logged and skipped; an unparsable
    /// document surfaces as an error.
    pub fn run(&self, ctx: &DocumentContext) -> Result<DocumentExtraction> {
        let extractor =
            RelationExtractor::new().with_unknown_entities(ctx.config.include_unknown_entities);

        let sentences = self.annotator.annotate(&ctx.text)?;
        debug!(
            document = %ctx.title,
            annotator = self.annotator.name(),
            sentences = sentences.len(),
            "annotation complete"
        );

        let mut entities: BTreeMap<String, Entity> = BTreeMap::new();
        let mut triples = Vec::new();
        let mut skipped = 0usize;

        for sentence in &sentences {
            let mentions = self.recognizer.recognize(ctx.document_id, sentence);

            for mention in &mentions {
                let entity = entities
                    .entry(mention.canonical_id.clone())
                    .or_insert_with(|| {
                        Entity::new(mention.canonical_id.clone(), mention.entity_type)
                    });
                // A later mention may classify better than the first one did
                if mention.entity_type.priority() < entity.entity_type.priority() {
                    entity.entity_type = mention.entity_type;
                }
                entity.record_mention(mention.surface.clone(), mention.span.clone());
            }

            let candidates = extractor.extract(sentence, &mentions);
            let (kept, dropped): (Vec<_>, Vec<_>) =
                candidates.into_iter().partition(|t| !t.is_self_loop());
            if !dropped.is_empty() {
                warn!(
                    sentence = sentence.sentence_index,
                    dropped = dropped.len(),
                    "skipped self-referential triples"
                );
                skipped += 1;
            }
            triples.extend(kept);
        }

        info!(
            document = %ctx.title,
            entities = entities.len(),
            triples = triples.len(),
            "extraction complete"
        );

        Ok(DocumentExtraction {
            document_id: ctx.document_id,
            sentence_count: sentences.len(),
            skipped_sentences: skipped,
            entities: entities.into_values().collect(),
            triples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurograph_core::{EntityType, PipelineConfig};
    use neurograph_text::RuleAnnotator;

    fn run_pipeline(text: &str) -> DocumentExtraction {
        let pipeline = Pipeline::new(RuleAnnotator::new());
        let ctx = DocumentContext::new("test.txt", text, PipelineConfig::default());
        pipeline.run(&ctx).unwrap()
    }

    #[test]
    fn test_pipeline_stress_sentence() {
        let extraction = run_pipeline("Chronic stress increases amygdala activation.");

        assert_eq!(extraction.sentence_count, 1);
        assert_eq!(extraction.triples.len(), 1);

        let stress = extraction
            .entities
            .iter()
            .find(|e| e.canonical_id == "stress")
            .expect("stress entity");
        assert_eq!(stress.entity_type, EntityType::Environment);

        let activation = extraction
            .entities
            .iter()
            .find(|e| e.canonical_id == "amygdala activation")
            .expect("activation entity");
        assert_eq!(activation.entity_type, EntityType::NeuralPattern);
    }

    #[test]
    fn test_pipeline_deduplicates_entities_across_sentences() {
        let extraction = run_pipeline(
            "Chronic stress increases amygdala activation. \
             Stress also impairs memory.",
        );

        let stress_entities: Vec<_> = extraction
            .entities
            .iter()
            .filter(|e| e.canonical_id == "stress")
            .collect();
        assert_eq!(stress_entities.len(), 1);
        // Two surface forms: "Chronic stress" and "Stress"
        assert_eq!(stress_entities[0].surface_forms.len(), 2);
        assert_eq!(stress_entities[0].source_spans.len(), 2);
    }

    #[test]
    fn test_pipeline_entities_always_valid() {
        let extraction = run_pipeline(
            "The hippocampus supports spatial memory. Exercise reduces anxiety. \
             Theta oscillations in the hippocampus increased.",
        );

        for entity in &extraction.entities {
            assert!(!entity.canonical_id.is_empty());
        }
        for triple in &extraction.triples {
            assert!((0.0..=1.0).contains(&triple.confidence));
            assert_ne!(triple.subject_id, triple.object_id);
        }
    }

    #[test]
    fn test_pipeline_counts_no_skips_for_clean_input() {
        let extraction = run_pipeline(
            "Chronic stress increases amygdala activation. Exercise reduces anxiety.",
        );
        assert_eq!(extraction.skipped_sentences, 0);
        assert_eq!(extraction.sentence_count, 2);
    }

    #[test]
    fn test_pipeline_sentence_without_entities_is_fine() {
        let extraction = run_pipeline("It went well yesterday.");
        assert_eq!(extraction.triples.len(), 0);
        assert_eq!(extraction.sentence_count, 1);
    }

    #[test]
    fn test_pipeline_unparsable_document_errors() {
        let pipeline = Pipeline::new(RuleAnnotator::new());
        let ctx = DocumentContext::new("junk.txt", "17\n42\n7", PipelineConfig::default());
        assert!(pipeline.run(&ctx).is_err());
    }
}
