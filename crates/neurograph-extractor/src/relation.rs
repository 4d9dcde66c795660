//! Relation extraction
//!
//! Applies an ordered set of syntactic patterns over a sentence's dependency
//! structure to produce candidate (subject, predicate, object) triples:
//! - Verb-mediated: nsubj -verb-> dobj
//! - Preposition-mediated: entity -prep-> entity
//! - Copular/appositive: "X is a Y" / "X, a Y,"
//!
//! Each pattern carries a base confidence weight. The realized confidence is
//! attenuated by dependency-path length between subject and object (floor
//! 0.1) and boosted by causal/modulatory cue lemmas, capped at 1.0.

use std::collections::HashMap;

use tracing::warn;

use neurograph_core::{EntityType, EvidenceSpan, Polarity, RelationTriple};
use neurograph_text::{AnnotatedSentence, DepRel, PosTag};

use crate::RecognizedMention;

// ============================================================================
// Scoring model (tunable constants, not bit-exact contracts)
// ============================================================================

/// Base confidence weight per syntactic pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternKind {
    VerbMediated,
    PrepMediated,
    Copular,
    Appositive,
}

impl PatternKind {
    fn base_confidence(&self) -> f32 {
        match self {
            Self::VerbMediated => 0.8,
            Self::PrepMediated => 0.6,
            Self::Copular => 0.5,
            Self::Appositive => 0.5,
        }
    }

    /// Minimal dependency-path length the pattern implies; longer paths
    /// attenuate confidence
    fn minimal_path_len(&self) -> usize {
        match self {
            Self::VerbMediated => 2,
            Self::PrepMediated => 3,
            Self::Copular => 2,
            Self::Appositive => 1,
        }
    }
}

/// Confidence lost per dependency hop beyond the pattern's minimal path
const PATH_ATTENUATION_PER_HOP: f32 = 0.05;

/// Lowest confidence path attenuation can reach
const CONFIDENCE_FLOOR: f32 = 0.1;

/// Bonus for causal/modulatory cue verbs
const CUE_BONUS: f32 = 0.1;

/// Lemmas of causal and modulatory verbs that raise confidence
const CUE_LEMMAS: &[&str] = &[
    "modulate",
    "increase",
    "decrease",
    "suppress",
    "enhance",
    "reduce",
    "impair",
    "regulate",
    "induce",
    "promote",
    "inhibit",
    "attenuate",
    "elevate",
    "disrupt",
    "trigger",
    "activate",
];

/// Predicate labels use the third-person form, the way the relation reads in
/// the source text ("increase" -> "increases")
fn predicate_label(lemma: &str) -> String {
    if lemma.ends_with('s')
        || lemma.ends_with('x')
        || lemma.ends_with('z')
        || lemma.ends_with("sh")
        || lemma.ends_with("ch")
    {
        format!("{lemma}es")
    } else if let Some(stem) = lemma.strip_suffix('y') {
        match stem.chars().next_back() {
            Some(c) if !"aeiou".contains(c) => format!("{stem}ies"),
            _ => format!("{lemma}s"),
        }
    } else {
        format!("{lemma}s")
    }
}

// ============================================================================
// Extractor
// ============================================================================

/// Syntactic-pattern relation extractor
pub struct RelationExtractor {
    /// Let UNKNOWN entities participate in relations
    include_unknown: bool,
}

impl RelationExtractor {
    pub fn new() -> Self {
        Self {
            include_unknown: false,
        }
    }

    /// Include entities classified UNKNOWN in relation extraction
    pub fn with_unknown_entities(mut self, include: bool) -> Self {
        self.include_unknown = include;
        self
    }

    /// Extract candidate triples from one sentence
    ///
    /// A sentence with fewer than two distinct eligible entities yields no
    /// triples; that is expected, not an error. Several triples may be
    /// asserted by the same sentence.
    pub fn extract(
        &self,
        sentence: &AnnotatedSentence,
        mentions: &[RecognizedMention],
    ) -> Vec<RelationTriple> {
        let eligible: HashMap<usize, &RecognizedMention> = mentions
            .iter()
            .filter(|m| self.include_unknown || m.entity_type != EntityType::Unknown)
            .map(|m| (m.head_token, m))
            .collect();

        let distinct_ids: std::collections::HashSet<&str> =
            eligible.values().map(|m| m.canonical_id.as_str()).collect();
        if distinct_ids.len() < 2 {
            return Vec::new();
        }

        let mut triples = Vec::new();
        triples.extend(self.verb_mediated(sentence, &eligible));
        triples.extend(self.prep_mediated(sentence, &eligible));
        triples.extend(self.copular(sentence, &eligible));
        triples.extend(self.appositive(sentence, &eligible));
        triples
    }

    /// nsubj -verb-> dobj (and pobj attached under the verb)
    fn verb_mediated(
        &self,
        sentence: &AnnotatedSentence,
        eligible: &HashMap<usize, &RecognizedMention>,
    ) -> Vec<RelationTriple> {
        let Some(root) = sentence.root() else {
            return Vec::new();
        };
        let root_token = &sentence.tokens[root];
        if root_token.pos != PosTag::Verb || root_token.lemma == "be" {
            return Vec::new();
        }

        let subjects = self.dependents_of(sentence, root, DepRel::Nsubj);
        let mut objects = self.dependents_of(sentence, root, DepRel::Dobj);
        // Prepositional objects governed by the verb act as objects too
        for (i, token) in sentence.tokens.iter().enumerate() {
            if token.dep == DepRel::Pobj {
                let prep = token.head;
                if sentence.tokens[prep].head == root {
                    objects.push(i);
                }
            }
        }

        let negated = self.is_negated(sentence, root);
        let lemma = root_token.lemma.clone();
        let predicate = predicate_label(&lemma);

        let mut triples = Vec::new();
        for &subj in &subjects {
            for &obj in &objects {
                if let Some(triple) = self.build_triple(
                    sentence,
                    eligible,
                    subj,
                    obj,
                    &predicate,
                    &lemma,
                    PatternKind::VerbMediated,
                    negated,
                ) {
                    triples.push(triple);
                }
            }
        }
        triples
    }

    /// entity -prep-> entity, for prepositions governed by a noun
    fn prep_mediated(
        &self,
        sentence: &AnnotatedSentence,
        eligible: &HashMap<usize, &RecognizedMention>,
    ) -> Vec<RelationTriple> {
        let mut triples = Vec::new();

        for (i, token) in sentence.tokens.iter().enumerate() {
            if token.dep != DepRel::Pobj {
                continue;
            }
            let prep = token.head;
            let governor = sentence.tokens[prep].head;
            // Verb-governed prepositions are handled by the verb pattern
            if sentence.tokens[governor].pos != PosTag::Noun {
                continue;
            }

            let predicate = sentence.tokens[prep].lemma.clone();
            if let Some(triple) = self.build_triple(
                sentence,
                eligible,
                governor,
                i,
                &predicate,
                &predicate,
                PatternKind::PrepMediated,
                false,
            ) {
                triples.push(triple);
            }
        }
        triples
    }

    /// "X is a Y": copular root linking subject and attribute
    fn copular(
        &self,
        sentence: &AnnotatedSentence,
        eligible: &HashMap<usize, &RecognizedMention>,
    ) -> Vec<RelationTriple> {
        let Some(root) = sentence.root() else {
            return Vec::new();
        };
        if sentence.tokens[root].lemma != "be" {
            return Vec::new();
        }

        let subjects = self.dependents_of(sentence, root, DepRel::Nsubj);
        let attributes = self.dependents_of(sentence, root, DepRel::Dobj);
        let negated = self.is_negated(sentence, root);

        let mut triples = Vec::new();
        for &subj in &subjects {
            for &attr in &attributes {
                if let Some(triple) = self.build_triple(
                    sentence,
                    eligible,
                    subj,
                    attr,
                    "is_a",
                    "be",
                    PatternKind::Copular,
                    negated,
                ) {
                    triples.push(triple);
                }
            }
        }
        triples
    }

    /// "X, a Y,": apposition links two nominals
    fn appositive(
        &self,
        sentence: &AnnotatedSentence,
        eligible: &HashMap<usize, &RecognizedMention>,
    ) -> Vec<RelationTriple> {
        let mut triples = Vec::new();
        for (i, token) in sentence.tokens.iter().enumerate() {
            if token.dep != DepRel::Appos {
                continue;
            }
            if let Some(triple) = self.build_triple(
                sentence,
                eligible,
                token.head,
                i,
                "is_a",
                "be",
                PatternKind::Appositive,
                false,
            ) {
                triples.push(triple);
            }
        }
        triples
    }

    fn dependents_of(
        &self,
        sentence: &AnnotatedSentence,
        head: usize,
        dep: DepRel,
    ) -> Vec<usize> {
        sentence
            .tokens
            .iter()
            .enumerate()
            .filter(|(i, t)| t.head == head && t.dep == dep && *i != head)
            .map(|(i, _)| i)
            .collect()
    }

    fn is_negated(&self, sentence: &AnnotatedSentence, verb: usize) -> bool {
        sentence
            .tokens
            .iter()
            .any(|t| t.dep == DepRel::Neg && t.head == verb)
    }

    /// Assemble a triple if both token positions carry eligible mentions
    #[allow(clippy::too_many_arguments)]
    fn build_triple(
        &self,
        sentence: &AnnotatedSentence,
        eligible: &HashMap<usize, &RecognizedMention>,
        subj_token: usize,
        obj_token: usize,
        predicate: &str,
        lemma: &str,
        pattern: PatternKind,
        negated: bool,
    ) -> Option<RelationTriple> {
        let subject = eligible.get(&subj_token)?;
        let object = eligible.get(&obj_token)?;
        if subject.canonical_id == object.canonical_id {
            return None;
        }

        let confidence = self.score(sentence, subj_token, obj_token, lemma, pattern);
        let polarity = if negated {
            Polarity::Negative
        } else {
            Polarity::Positive
        };

        Some(
            RelationTriple::new(
                subject.canonical_id.clone(),
                predicate,
                object.canonical_id.clone(),
                confidence,
            )
            .with_polarity(polarity)
            .with_evidence(EvidenceSpan {
                sentence_index: sentence.sentence_index,
                text: sentence.text.clone(),
            }),
        )
    }

    /// Realized confidence: base weight, path-length attenuation (floor 0.1),
    /// cue-word bonus, capped at 1.0
    fn score(
        &self,
        sentence: &AnnotatedSentence,
        subj_token: usize,
        obj_token: usize,
        lemma: &str,
        pattern: PatternKind,
    ) -> f32 {
        let mut confidence = pattern.base_confidence();

        match sentence.dependency_path_len(subj_token, obj_token) {
            Some(path_len) => {
                let extra = path_len.saturating_sub(pattern.minimal_path_len());
                confidence -= PATH_ATTENUATION_PER_HOP * extra as f32;
            }
            None => {
                warn!(subj_token, obj_token, "no dependency path between tokens");
            }
        }
        confidence = confidence.max(CONFIDENCE_FLOOR);

        if CUE_LEMMAS.contains(&lemma) {
            confidence += CUE_BONUS;
        }

        confidence.min(1.0)
    }
}

impl Default for RelationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
