//! Entity recognition and classification
//!
//! Maps annotator entity spans plus a curated domain lexicon onto the four
//! domain categories, assigning each mention a canonical identity:
//! 1. Canonicalization: lowercase, strip determiners and modifiers, resolve
//!    through the alias table.
//! 2. Classification: exact lexicon match, then suffix/keyword heuristics,
//!    then the annotator's generic label, else Unknown. Ties break by fixed
//!    category priority.

use tracing::warn;

use neurograph_core::{EntityType, SourceSpan};
use neurograph_text::AnnotatedSentence;
use uuid::Uuid;

use crate::RecognizedMention;

// ============================================================================
// Lexicons (data tables, not branching logic)
// ============================================================================

/// Abbreviation and alias resolution ("PFC" -> "prefrontal cortex")
const ALIASES: &[(&str, &str)] = &[
    ("pfc", "prefrontal cortex"),
    ("mpfc", "medial prefrontal cortex"),
    ("hpc", "hippocampus"),
    ("acc", "anterior cingulate cortex"),
    ("nac", "nucleus accumbens"),
    ("ltp", "long-term potentiation"),
    ("ltd", "long-term depression"),
    ("hpa axis", "hypothalamic-pituitary-adrenal axis"),
    ("rem sleep", "rapid eye movement sleep"),
];

/// Leading determiners stripped during canonicalization
const STRIP_DETERMINERS: &[&str] = &["the", "a", "an", "this", "that", "these", "those"];

/// Leading modifiers stripped during canonicalization
const STRIP_MODIFIERS: &[&str] = &[
    "chronic",
    "acute",
    "severe",
    "mild",
    "elevated",
    "increased",
    "decreased",
    "prolonged",
    "repeated",
    "sustained",
    "early",
    "late",
];

const NEURAL_REGION_TERMS: &[&str] = &[
    "hippocampus",
    "amygdala",
    "prefrontal cortex",
    "medial prefrontal cortex",
    "anterior cingulate cortex",
    "nucleus accumbens",
    "striatum",
    "thalamus",
    "hypothalamus",
    "cerebellum",
    "insula",
    "ventral tegmental area",
    "dentate gyrus",
    "cortex",
];

const NEURAL_PATTERN_TERMS: &[&str] = &[
    "theta oscillation",
    "gamma oscillation",
    "theta power",
    "amygdala activation",
    "activation",
    "firing rate",
    "spike",
    "long-term potentiation",
    "long-term depression",
    "synaptic plasticity",
    "plasticity",
    "connectivity",
    "oscillation",
];

const ENVIRONMENT_TERMS: &[&str] = &[
    "stress",
    "enrichment",
    "environmental enrichment",
    "novelty",
    "reward",
    "isolation",
    "social isolation",
    "exercise",
    "sleep deprivation",
    "social defeat",
    "environment",
    "exposure",
];

const TRAIT_TERMS: &[&str] = &[
    "anxiety",
    "memory",
    "working memory",
    "spatial memory",
    "learning",
    "resilience",
    "impulsivity",
    "attention",
    "depression",
    "fear",
    "motivation",
    "curiosity",
    "sociability",
    "aggression",
];

/// Keyword/suffix heuristics, tried after exact lexicon matches.
/// `(needle, match_kind, category)` — checked in table order, ties broken by
/// category priority.
const HEURISTICS: &[(&str, MatchKind, EntityType)] = &[
    ("cortex", MatchKind::Contains, EntityType::NeuralRegion),
    ("gyrus", MatchKind::Contains, EntityType::NeuralRegion),
    ("nucleus", MatchKind::Contains, EntityType::NeuralRegion),
    ("hippocamp", MatchKind::Contains, EntityType::NeuralRegion),
    ("amygdala", MatchKind::Contains, EntityType::NeuralRegion),
    ("oscillation", MatchKind::Suffix, EntityType::NeuralPattern),
    ("activation", MatchKind::Suffix, EntityType::NeuralPattern),
    ("potentiation", MatchKind::Suffix, EntityType::NeuralPattern),
    ("-genic", MatchKind::Suffix, EntityType::NeuralPattern),
    ("ergic", MatchKind::Suffix, EntityType::NeuralPattern),
    ("theta", MatchKind::Contains, EntityType::NeuralPattern),
    ("gamma", MatchKind::Contains, EntityType::NeuralPattern),
    ("firing", MatchKind::Contains, EntityType::NeuralPattern),
    ("stress", MatchKind::Contains, EntityType::Environment),
    ("deprivation", MatchKind::Suffix, EntityType::Environment),
    ("exposure", MatchKind::Contains, EntityType::Environment),
    ("ness", MatchKind::Suffix, EntityType::Trait),
    ("behavior", MatchKind::Contains, EntityType::Trait),
    ("anxiety", MatchKind::Contains, EntityType::Trait),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Contains,
    Suffix,
}

/// Mapping from generic annotator labels to domain categories (fallback)
const LABEL_FALLBACK: &[(&str, EntityType)] = &[
    ("anatomy", EntityType::NeuralRegion),
    ("brain_region", EntityType::NeuralRegion),
    ("physiology", EntityType::NeuralPattern),
    ("exposure", EntityType::Environment),
    ("behavior", EntityType::Trait),
];

// ============================================================================
// Recognizer
// ============================================================================

/// Entity recognizer and classifier
pub struct EntityRecognizer;

impl EntityRecognizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a surface form into its canonical identity
    ///
    /// Lowercases, trims punctuation, strips leading determiners and known
    /// modifiers, collapses whitespace, and resolves aliases.
    pub fn canonicalize(&self, surface: &str) -> String {
        let lowered = surface.to_lowercase();
        let trimmed = lowered.trim_matches(|c: char| !c.is_alphanumeric());

        let words: Vec<&str> = trimmed.split_whitespace().collect();
        let mut start = 0;
        while start < words.len().saturating_sub(1)
            && (STRIP_DETERMINERS.contains(&words[start]) || STRIP_MODIFIERS.contains(&words[start]))
        {
            start += 1;
        }
        let mut kept: Vec<String> = words[start..].iter().map(|w| w.to_string()).collect();
        if let Some(last) = kept.last_mut() {
            *last = Self::singularize(last);
        }
        let stripped = kept.join(" ");

        match ALIASES.iter().find(|(alias, _)| *alias == stripped) {
            Some((_, canonical)) => (*canonical).to_string(),
            None => stripped,
        }
    }

    /// Fold plural head nouns onto their singular form
    fn singularize(word: &str) -> String {
        if let Some(stem) = word.strip_suffix("ies") {
            if stem.len() > 1 {
                return format!("{stem}y");
            }
        }
        if let Some(stem) = word.strip_suffix("es") {
            if stem.ends_with("ss")
                || stem.ends_with('x')
                || stem.ends_with('z')
                || stem.ends_with("ch")
                || stem.ends_with("sh")
            {
                return stem.to_string();
            }
        }
        if let Some(stem) = word.strip_suffix('s') {
            if !stem.is_empty() && !stem.ends_with('s') && !stem.ends_with('u') && !stem.ends_with('i')
            {
                return stem.to_string();
            }
        }
        word.to_string()
    }

    /// Assign a domain category to a canonical identity
    ///
    /// Priority: exact lexicon match, then heuristics, then the annotator's
    /// generic label, else Unknown.
    pub fn classify(&self, canonical_id: &str, label: Option<&str>) -> EntityType {
        let lexicons: &[(&[&str], EntityType)] = &[
            (NEURAL_REGION_TERMS, EntityType::NeuralRegion),
            (NEURAL_PATTERN_TERMS, EntityType::NeuralPattern),
            (ENVIRONMENT_TERMS, EntityType::Environment),
            (TRAIT_TERMS, EntityType::Trait),
        ];

        // Exact lexicon match; lexicons are listed in priority order, so the
        // first hit is the deterministic tie-break winner
        for (terms, entity_type) in lexicons {
            if terms.contains(&canonical_id) {
                return *entity_type;
            }
        }

        // Suffix/keyword heuristics, collecting every plausible category
        let mut candidates: Vec<EntityType> = HEURISTICS
            .iter()
            .filter(|(needle, kind, _)| match kind {
                MatchKind::Contains => canonical_id.contains(needle),
                MatchKind::Suffix => canonical_id.ends_with(needle),
            })
            .map(|(_, _, entity_type)| *entity_type)
            .collect();
        candidates.dedup();

        if candidates.len() > 1 {
            warn!(
                entity = canonical_id,
                candidates = candidates.len(),
                "ambiguous classification, breaking tie by category priority"
            );
        }
        if let Some(best) = candidates.iter().min_by_key(|t| t.priority()) {
            return *best;
        }

        // Annotator's generic label as a last resort
        if let Some(label) = label {
            let lowered = label.to_lowercase();
            if let Some((_, entity_type)) =
                LABEL_FALLBACK.iter().find(|(name, _)| *name == lowered)
            {
                return *entity_type;
            }
        }

        warn!(entity = canonical_id, "entity left unclassified");
        EntityType::Unknown
    }

    /// Recognize and classify all entity mentions in a sentence
    pub fn recognize(
        &self,
        document_id: Uuid,
        sentence: &AnnotatedSentence,
    ) -> Vec<RecognizedMention> {
        sentence
            .entity_hints
            .iter()
            .filter_map(|hint| {
                let canonical_id = self.canonicalize(&hint.text);
                if canonical_id.is_empty() {
                    return None;
                }
                let entity_type = self.classify(&canonical_id, hint.label.as_deref());

                Some(RecognizedMention {
                    canonical_id,
                    entity_type,
                    surface: hint.text.clone(),
                    span: SourceSpan {
                        document_id,
                        sentence_index: sentence.sentence_index,
                        start: hint.start,
                        end: hint.end,
                    },
                    head_token: hint.head_token,
                })
            })
            .collect()
    }
}

impl Default for EntityRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use neurograph_text::{Annotator, RuleAnnotator};

    #[test]
    fn test_canonicalize_strips_modifiers() {
        let ner = EntityRecognizer::new();
        assert_eq!(ner.canonicalize("Chronic stress"), "stress");
        assert_eq!(ner.canonicalize("the amygdala"), "amygdala");
        assert_eq!(ner.canonicalize("Severe sleep deprivation"), "sleep deprivation");
    }

    #[test]
    fn test_canonicalize_keeps_modifier_only_terms() {
        let ner = EntityRecognizer::new();
        // A bare modifier must not canonicalize to the empty string
        assert_eq!(ner.canonicalize("chronic"), "chronic");
    }

    #[test]
    fn test_canonicalize_resolves_aliases() {
        let ner = EntityRecognizer::new();
        assert_eq!(ner.canonicalize("PFC"), "prefrontal cortex");
        assert_eq!(ner.canonicalize("LTP"), "long-term potentiation");
    }

    #[test]
    fn test_classify_lexicon_matches() {
        let ner = EntityRecognizer::new();
        assert_eq!(ner.classify("stress", None), EntityType::Environment);
        assert_eq!(ner.classify("amygdala", None), EntityType::NeuralRegion);
        assert_eq!(
            ner.classify("amygdala activation", None),
            EntityType::NeuralPattern
        );
        assert_eq!(ner.classify("anxiety", None), EntityType::Trait);
    }

    #[test]
    fn test_classify_heuristics() {
        let ner = EntityRecognizer::new();
        assert_eq!(
            ner.classify("retrosplenial cortex", None),
            EntityType::NeuralRegion
        );
        assert_eq!(
            ner.classify("slow-wave oscillation", None),
            EntityType::NeuralPattern
        );
        assert_eq!(
            ner.classify("maternal deprivation", None),
            EntityType::Environment
        );
    }

    #[test]
    fn test_classify_tie_breaks_by_priority() {
        let ner = EntityRecognizer::new();
        // Matches both a region keyword ("cortex") and a pattern suffix
        // ("activation"); region wins by category priority
        assert_eq!(
            ner.classify("cortex activation", None),
            EntityType::NeuralRegion
        );
    }

    #[test]
    fn test_classify_label_fallback_and_unknown() {
        let ner = EntityRecognizer::new();
        assert_eq!(
            ner.classify("locus coeruleus", Some("anatomy")),
            EntityType::NeuralRegion
        );
        assert_eq!(ner.classify("widget", None), EntityType::Unknown);
    }

    #[test]
    fn test_recognize_stress_sentence() {
        let annotator = RuleAnnotator::new();
        let ner = EntityRecognizer::new();
        let sentences = annotator
            .annotate("Chronic stress increases amygdala activation.")
            .unwrap();

        let mentions = ner.recognize(Uuid::new_v4(), &sentences[0]);

        let stress = mentions
            .iter()
            .find(|m| m.canonical_id == "stress")
            .expect("stress mention");
        assert_eq!(stress.entity_type, EntityType::Environment);
        assert_eq!(stress.surface, "Chronic stress");

        let activation = mentions
            .iter()
            .find(|m| m.canonical_id == "amygdala activation")
            .expect("activation mention");
        assert_eq!(activation.entity_type, EntityType::NeuralPattern);
    }
}
