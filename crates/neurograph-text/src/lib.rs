//! NeuroGraph Text - Normalization and annotation capability
//!
//! The pipeline consumes a scientific NLP model strictly as a pluggable
//! capability: anything implementing [`Annotator`] can supply sentence
//! segmentation, lemmas, part-of-speech tags, and a dependency structure.
//! A built-in rule-based annotator ([`rule::RuleAnnotator`]) covers the
//! syntactic patterns the relation extractor relies on without an external
//! model dependency.

use serde::{Deserialize, Serialize};

use neurograph_core::Result;

pub mod normalize;
pub mod rule;

pub use normalize::TextNormalizer;
pub use rule::RuleAnnotator;

// ============================================================================
// Annotation Model
// ============================================================================

/// Coarse part-of-speech tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PosTag {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Determiner,
    Preposition,
    Conjunction,
    Number,
    Punct,
    Other,
}

/// Dependency relation of a token to its head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepRel {
    /// Nominal subject
    Nsubj,
    /// Direct object
    Dobj,
    /// Object of a preposition
    Pobj,
    /// Preposition attached to a verb or noun
    Prep,
    /// Copula ("is", "are")
    Cop,
    /// Apposition
    Appos,
    /// Negation marker
    Neg,
    /// Determiner
    Det,
    /// Adjectival modifier
    Amod,
    /// Compound noun part
    Compound,
    /// Sentence root
    Root,
    /// Unclassified dependency
    Dep,
}

/// A token with its annotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Surface text
    pub text: String,

    /// Lemma (lowercased base form)
    pub lemma: String,

    /// Part of speech
    pub pos: PosTag,

    /// Index of the head token within the sentence; the root points to itself
    pub head: usize,

    /// Dependency relation to the head
    pub dep: DepRel,

    /// Byte offset of the token start within the sentence
    pub start: usize,

    /// Byte offset of the token end within the sentence
    pub end: usize,
}

/// An entity span surfaced by the annotator (noun chunk or model entity)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityHint {
    /// Surface text of the span
    pub text: String,

    /// Byte offset of the span start within the sentence
    pub start: usize,

    /// Byte offset of the span end within the sentence
    pub end: usize,

    /// Index of the head token of the span
    pub head_token: usize,

    /// Generic type label from the model, if it provides one
    pub label: Option<String>,
}

/// A sentence with full annotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedSentence {
    /// Position of the sentence within the normalized document text
    pub sentence_index: usize,

    /// Sentence text
    pub text: String,

    /// Annotated tokens
    pub tokens: Vec<Token>,

    /// Entity spans surfaced by the annotator
    pub entity_hints: Vec<EntityHint>,
}

impl AnnotatedSentence {
    /// Index of the root token, if the sentence parsed at all
    pub fn root(&self) -> Option<usize> {
        self.tokens.iter().position(|t| t.dep == DepRel::Root)
    }

    /// Number of hops between two tokens along the dependency tree
    ///
    /// Computed over the undirected tree via the lowest common ancestor.
    /// Returns `None` for out-of-range indices.
    pub fn dependency_path_len(&self, a: usize, b: usize) -> Option<usize> {
        if a >= self.tokens.len() || b >= self.tokens.len() {
            return None;
        }
        let path_a = self.path_to_root(a);
        let path_b = self.path_to_root(b);

        for (depth_a, node) in path_a.iter().enumerate() {
            if let Some(depth_b) = path_b.iter().position(|n| n == node) {
                return Some(depth_a + depth_b);
            }
        }
        // Disconnected fragments: treat as the sum of both depths
        Some(path_a.len() + path_b.len())
    }

    fn path_to_root(&self, start: usize) -> Vec<usize> {
        let mut path = vec![start];
        let mut current = start;
        // Head chains are short; the bound guards against accidental cycles
        for _ in 0..self.tokens.len() {
            let head = self.tokens[current].head;
            if head == current {
                break;
            }
            path.push(head);
            current = head;
        }
        path
    }
}

// ============================================================================
// Annotation Capability
// ============================================================================

/// Capability interface for the external scientific NLP model
///
/// Implementations must return an empty vector only for effectively empty
/// input; the pipeline surfaces `UnparsableText` when a non-empty document
/// yields no usable annotation.
pub trait Annotator: Send + Sync {
    /// Annotate normalized text into sentences with tokens and dependencies
    fn annotate(&self, text: &str) -> Result<Vec<AnnotatedSentence>>;

    /// Annotator name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(head: usize, dep: DepRel) -> Token {
        Token {
            text: "x".to_string(),
            lemma: "x".to_string(),
            pos: PosTag::Noun,
            head,
            dep,
            start: 0,
            end: 1,
        }
    }

    #[test]
    fn test_dependency_path_len() {
        // 0 <- 1(root) -> 2 -> 3
        let sentence = AnnotatedSentence {
            sentence_index: 0,
            text: String::new(),
            tokens: vec![
                token(1, DepRel::Nsubj),
                token(1, DepRel::Root),
                token(1, DepRel::Prep),
                token(2, DepRel::Pobj),
            ],
            entity_hints: Vec::new(),
        };

        assert_eq!(sentence.dependency_path_len(0, 1), Some(1));
        assert_eq!(sentence.dependency_path_len(0, 3), Some(3));
        assert_eq!(sentence.dependency_path_len(2, 2), Some(0));
        assert_eq!(sentence.dependency_path_len(0, 9), None);
    }

    #[test]
    fn test_root_lookup() {
        let sentence = AnnotatedSentence {
            sentence_index: 0,
            text: String::new(),
            tokens: vec![token(1, DepRel::Nsubj), token(1, DepRel::Root)],
            entity_hints: Vec::new(),
        };
        assert_eq!(sentence.root(), Some(1));
    }
}
