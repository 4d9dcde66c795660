//! Rule-based annotator
//!
//! A lightweight implementation of the [`Annotator`] capability: lexicon
//! driven part-of-speech tagging, suffix lemmatization, and a shallow
//! head-attachment pass that produces the dependency relations the relation
//! extractor patterns consume (nsubj, dobj, prep/pobj, copula, appositive,
//! negation). It stands in for an external scientific NLP model and can be
//! swapped for one behind the same trait.

use tracing::trace;

use crate::{AnnotatedSentence, Annotator, DepRel, EntityHint, PosTag, TextNormalizer, Token};
use neurograph_core::{NeuroGraphError, Result};

// ============================================================================
// Lexicons (data tables, not branching logic)
// ============================================================================

const DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "its", "their", "our", "such", "each",
    "both", "some",
];

const PREPOSITIONS: &[&str] = &[
    "in", "of", "on", "with", "by", "to", "from", "during", "under", "within", "via", "through",
    "between", "across", "at", "after", "before", "upon", "toward", "towards", "into", "among",
];

const CONJUNCTIONS: &[&str] = &["and", "or", "but", "whereas", "while"];

const COPULAS: &[&str] = &["is", "are", "was", "were", "be", "been", "being", "remains", "remain"];

const NEGATIONS: &[&str] = &["not", "never", "no"];

const AUXILIARIES: &[&str] = &[
    "do", "does", "did", "can", "may", "might", "could", "would", "should", "will", "have", "has",
    "had",
];

const ADVERBS: &[&str] = &[
    "also", "often", "thus", "however", "moreover", "further", "then", "well", "yesterday",
    "today", "here", "there",
];

const PRONOUNS: &[&str] = &["it", "they", "we", "he", "she", "i", "you", "who", "which"];

const ADJECTIVES: &[&str] = &[
    "chronic", "acute", "severe", "mild", "early", "late", "elevated", "enriched", "novel",
    "social", "environmental", "prolonged", "repeated", "sustained",
];

/// Verb lemmas the tagger recognizes; dominated by the causal and reporting
/// verbs of the neuroscience literature
const VERB_LEMMAS: &[&str] = &[
    "modulate",
    "increase",
    "decrease",
    "suppress",
    "enhance",
    "reduce",
    "impair",
    "regulate",
    "affect",
    "influence",
    "alter",
    "exhibit",
    "show",
    "display",
    "cause",
    "induce",
    "promote",
    "trigger",
    "elevate",
    "disrupt",
    "drive",
    "activate",
    "inhibit",
    "attenuate",
    "correlate",
    "associate",
    "mediate",
    "produce",
    "lead",
    "result",
    "predict",
    "facilitate",
    "involve",
    "require",
    "underlie",
    "support",
    "strengthen",
    "weaken",
];

/// Irregular lemma lookups applied before suffix rules
const IRREGULAR_LEMMAS: &[(&str, &str)] = &[
    ("is", "be"),
    ("are", "be"),
    ("was", "be"),
    ("were", "be"),
    ("been", "be"),
    ("being", "be"),
    ("does", "do"),
    ("did", "do"),
    ("has", "have"),
    ("had", "have"),
    ("shown", "show"),
    ("led", "lead"),
    ("found", "find"),
    ("rose", "rise"),
    ("fell", "fall"),
    ("mice", "mouse"),
    ("children", "child"),
];

// ============================================================================
// Annotator
// ============================================================================

/// Lexicon-and-heuristics annotator implementing the NLP capability
pub struct RuleAnnotator {
    normalizer: TextNormalizer,
}

impl RuleAnnotator {
    pub fn new() -> Self {
        Self {
            normalizer: TextNormalizer::new(),
        }
    }

    fn lemmatize(word: &str) -> String {
        let lower = word.to_lowercase();

        if let Some((_, lemma)) = IRREGULAR_LEMMAS.iter().find(|(w, _)| *w == lower) {
            return (*lemma).to_string();
        }

        // Plural / third person singular
        if let Some(stem) = lower.strip_suffix("ies") {
            if stem.len() > 1 {
                return format!("{stem}y");
            }
        }
        if let Some(stem) = lower.strip_suffix("es") {
            if stem.ends_with("ss")
                || stem.ends_with('x')
                || stem.ends_with('z')
                || stem.ends_with("ch")
                || stem.ends_with("sh")
            {
                return stem.to_string();
            }
        }
        if let Some(stem) = lower.strip_suffix('s') {
            if !stem.is_empty() && !stem.ends_with('s') && !stem.ends_with('u') && !stem.ends_with('i')
            {
                return stem.to_string();
            }
        }

        // Past tense: try the e-stem first ("caused" -> "cause"),
        // then the bare stem ("showed" -> "show")
        if lower.ends_with("ed") && lower.len() > 3 {
            let e_stem = &lower[..lower.len() - 1];
            if VERB_LEMMAS.contains(&e_stem) {
                return e_stem.to_string();
            }
            let stem = &lower[..lower.len() - 2];
            if VERB_LEMMAS.contains(&stem) {
                return stem.to_string();
            }
        }

        // Progressive: "modulating" -> "modulate"
        if let Some(stem) = lower.strip_suffix("ing") {
            let e_form = format!("{stem}e");
            if VERB_LEMMAS.contains(&e_form.as_str()) {
                return e_form;
            }
            if VERB_LEMMAS.contains(&stem) {
                return stem.to_string();
            }
        }

        lower
    }

    fn tag(word: &str, lemma: &str) -> PosTag {
        let lower = word.to_lowercase();

        if word.chars().all(|c| c.is_ascii_punctuation()) {
            PosTag::Punct
        } else if word.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
            PosTag::Number
        } else if DETERMINERS.contains(&lower.as_str()) {
            PosTag::Determiner
        } else if PREPOSITIONS.contains(&lower.as_str()) {
            PosTag::Preposition
        } else if CONJUNCTIONS.contains(&lower.as_str()) {
            PosTag::Conjunction
        } else if AUXILIARIES.contains(&lower.as_str()) {
            PosTag::Other
        } else if COPULAS.contains(&lower.as_str()) || VERB_LEMMAS.contains(&lemma) {
            PosTag::Verb
        } else if NEGATIONS.contains(&lower.as_str()) || ADVERBS.contains(&lower.as_str()) {
            PosTag::Adverb
        } else if lower.ends_with("ly") {
            PosTag::Adverb
        } else if PRONOUNS.contains(&lower.as_str()) {
            PosTag::Other
        } else if ADJECTIVES.contains(&lower.as_str()) {
            PosTag::Adjective
        } else {
            PosTag::Noun
        }
    }

    fn tokenize(sentence: &str) -> Vec<(String, usize, usize)> {
        let mut tokens = Vec::new();
        let mut word_start: Option<usize> = None;

        for (i, ch) in sentence.char_indices() {
            let is_word = ch.is_alphanumeric() || ch == '-' || ch == '\'' || ch == '_';
            match (is_word, word_start) {
                (true, None) => word_start = Some(i),
                (false, Some(start)) => {
                    tokens.push((sentence[start..i].to_string(), start, i));
                    word_start = None;
                    if !ch.is_whitespace() {
                        tokens.push((ch.to_string(), i, i + ch.len_utf8()));
                    }
                }
                (false, None) => {
                    if !ch.is_whitespace() {
                        tokens.push((ch.to_string(), i, i + ch.len_utf8()));
                    }
                }
                (true, Some(_)) => {}
            }
        }
        if let Some(start) = word_start {
            tokens.push((sentence[start..].to_string(), start, sentence.len()));
        }

        tokens
    }

    fn annotate_sentence(&self, sentence_index: usize, text: &str) -> Option<AnnotatedSentence> {
        let raw_tokens = Self::tokenize(text);
        if raw_tokens.is_empty() {
            return None;
        }

        let mut tokens: Vec<Token> = raw_tokens
            .into_iter()
            .map(|(word, start, end)| {
                let lemma = Self::lemmatize(&word);
                let pos = Self::tag(&word, &lemma);
                Token {
                    text: word,
                    lemma,
                    pos,
                    head: 0,
                    dep: DepRel::Dep,
                    start,
                    end,
                }
            })
            .collect();

        let root = Self::pick_root(&tokens);
        for token in tokens.iter_mut() {
            token.head = root;
            token.dep = DepRel::Dep;
        }
        tokens[root].dep = DepRel::Root;

        let chunks = Self::find_chunks(&tokens);
        Self::attach(&mut tokens, &chunks, root);

        let entity_hints = Self::hints_from_chunks(text, &tokens, &chunks);

        Some(AnnotatedSentence {
            sentence_index,
            text: text.to_string(),
            tokens,
            entity_hints,
        })
    }

    /// Root selection: first content verb, else first copula, else first noun
    fn pick_root(tokens: &[Token]) -> usize {
        tokens
            .iter()
            .position(|t| t.pos == PosTag::Verb && t.lemma != "be")
            .or_else(|| tokens.iter().position(|t| t.pos == PosTag::Verb))
            .or_else(|| tokens.iter().position(|t| t.pos == PosTag::Noun))
            .unwrap_or(0)
    }

    /// A chunk is a maximal run of determiner/adjective/noun/number tokens
    /// containing at least one noun; the head is the last noun of the run.
    fn find_chunks(tokens: &[Token]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut run_start: Option<usize> = None;

        for (i, token) in tokens.iter().enumerate() {
            let chunkable = matches!(
                token.pos,
                PosTag::Determiner | PosTag::Adjective | PosTag::Noun | PosTag::Number
            );
            match (chunkable, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    if let Some(chunk) = Chunk::from_run(tokens, start, i) {
                        chunks.push(chunk);
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            if let Some(chunk) = Chunk::from_run(tokens, start, tokens.len()) {
                chunks.push(chunk);
            }
        }

        chunks
    }

    fn attach(tokens: &mut [Token], chunks: &[Chunk], root: usize) {
        let root_is_copula = tokens[root].lemma == "be";
        let mut subject_assigned = false;
        let mut object_assigned = false;

        for (chunk_idx, chunk) in chunks.iter().enumerate() {
            // Within-chunk attachment
            for i in chunk.start..chunk.end {
                if i == chunk.head {
                    continue;
                }
                tokens[i].head = chunk.head;
                tokens[i].dep = match tokens[i].pos {
                    PosTag::Determiner => DepRel::Det,
                    PosTag::Adjective => DepRel::Amod,
                    _ => DepRel::Compound,
                };
            }

            if chunk.head == root {
                continue;
            }

            // Preposition-governed chunk
            if let Some(prep_idx) = Self::preceding_preposition(tokens, chunk.start) {
                tokens[chunk.head].head = prep_idx;
                tokens[chunk.head].dep = DepRel::Pobj;
                continue;
            }

            // Appositive: ", CHUNK" directly following another chunk
            if chunk_idx > 0 && Self::follows_comma(tokens, chunks[chunk_idx - 1].end, chunk.start)
            {
                tokens[chunk.head].head = chunks[chunk_idx - 1].head;
                tokens[chunk.head].dep = DepRel::Appos;
                continue;
            }

            if chunk.end <= root && !subject_assigned {
                tokens[chunk.head].head = root;
                tokens[chunk.head].dep = DepRel::Nsubj;
                subject_assigned = true;
            } else if chunk.start > root && !object_assigned {
                tokens[chunk.head].head = root;
                // Post-copula nominals act as attributes; the extractor's
                // copular pattern keys on the root lemma
                tokens[chunk.head].dep = DepRel::Dobj;
                object_assigned = true;
            } else {
                tokens[chunk.head].head = root;
                tokens[chunk.head].dep = DepRel::Dep;
            }
        }

        // Non-chunk tokens
        for i in 0..tokens.len() {
            if i == root || tokens[i].dep != DepRel::Dep || chunks.iter().any(|c| c.contains(i)) {
                continue;
            }
            match tokens[i].pos {
                PosTag::Preposition => {
                    tokens[i].head = Self::nearest_governor(tokens, i, root);
                    tokens[i].dep = DepRel::Prep;
                }
                PosTag::Adverb if NEGATIONS.contains(&tokens[i].lemma.as_str()) => {
                    tokens[i].head = root;
                    tokens[i].dep = DepRel::Neg;
                }
                PosTag::Verb if i != root && tokens[i].lemma == "be" && !root_is_copula => {
                    tokens[i].head = root;
                    tokens[i].dep = DepRel::Cop;
                }
                _ => {
                    tokens[i].head = root;
                    tokens[i].dep = DepRel::Dep;
                }
            }
        }
    }

    /// Preposition directly before a chunk, skipping nothing
    fn preceding_preposition(tokens: &[Token], chunk_start: usize) -> Option<usize> {
        if chunk_start == 0 {
            return None;
        }
        let prev = chunk_start - 1;
        (tokens[prev].pos == PosTag::Preposition).then_some(prev)
    }

    fn follows_comma(tokens: &[Token], prev_chunk_end: usize, chunk_start: usize) -> bool {
        chunk_start == prev_chunk_end + 1 && tokens[prev_chunk_end].text == ","
    }

    /// Nearest preceding verb, else nearest preceding noun, else root
    fn nearest_governor(tokens: &[Token], from: usize, root: usize) -> usize {
        tokens[..from]
            .iter()
            .rposition(|t| t.pos == PosTag::Verb)
            .or_else(|| tokens[..from].iter().rposition(|t| t.pos == PosTag::Noun))
            .unwrap_or(root)
    }

    /// Surface chunks as entity hints, with leading determiners stripped
    fn hints_from_chunks(text: &str, tokens: &[Token], chunks: &[Chunk]) -> Vec<EntityHint> {
        chunks
            .iter()
            .filter_map(|chunk| {
                let first_content = (chunk.start..chunk.end)
                    .find(|&i| tokens[i].pos != PosTag::Determiner)?;
                let start = tokens[first_content].start;
                let end = tokens[chunk.end - 1].end;
                if start >= end {
                    return None;
                }
                Some(EntityHint {
                    text: text[start..end].to_string(),
                    start,
                    end,
                    head_token: chunk.head,
                    label: None,
                })
            })
            .collect()
    }
}

impl Default for RuleAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotator for RuleAnnotator {
    fn annotate(&self, text: &str) -> Result<Vec<AnnotatedSentence>> {
        let sentences = self.normalizer.sentences(text);

        let annotated: Vec<AnnotatedSentence> = sentences
            .iter()
            .enumerate()
            .filter_map(|(i, sentence)| self.annotate_sentence(i, sentence))
            .collect();

        trace!(
            sentences = sentences.len(),
            annotated = annotated.len(),
            "rule annotation pass"
        );
        if annotated.is_empty() && !text.trim().is_empty() {
            return Err(NeuroGraphError::UnparsableText(format!(
                "no usable sentences in {} bytes of input",
                text.len()
            )));
        }

        Ok(annotated)
    }

    fn name(&self) -> &str {
        "rule-annotator"
    }
}

/// A noun chunk within a sentence
#[derive(Debug, Clone)]
struct Chunk {
    start: usize,
    end: usize,
    head: usize,
}

impl Chunk {
    fn from_run(tokens: &[Token], start: usize, end: usize) -> Option<Self> {
        let head = (start..end).rev().find(|&i| tokens[i].pos == PosTag::Noun)?;
        Some(Self { start, end, head })
    }

    fn contains(&self, i: usize) -> bool {
        i >= self.start && i < self.end
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn annotate_one(text: &str) -> AnnotatedSentence {
        let annotator = RuleAnnotator::new();
        let mut sentences = annotator.annotate(text).unwrap();
        assert_eq!(sentences.len(), 1);
        sentences.remove(0)
    }

    fn find_token<'a>(sentence: &'a AnnotatedSentence, text: &str) -> &'a Token {
        sentence
            .tokens
            .iter()
            .find(|t| t.text == text)
            .unwrap_or_else(|| panic!("token {text:?} not found"))
    }

    #[test]
    fn test_lemmatize_verbs() {
        assert_eq!(RuleAnnotator::lemmatize("increases"), "increase");
        assert_eq!(RuleAnnotator::lemmatize("modulated"), "modulate");
        assert_eq!(RuleAnnotator::lemmatize("suppresses"), "suppress");
        assert_eq!(RuleAnnotator::lemmatize("showing"), "show");
        assert_eq!(RuleAnnotator::lemmatize("is"), "be");
    }

    #[test]
    fn test_lemmatize_nouns() {
        assert_eq!(RuleAnnotator::lemmatize("oscillations"), "oscillation");
        assert_eq!(RuleAnnotator::lemmatize("studies"), "study");
        assert_eq!(RuleAnnotator::lemmatize("stress"), "stress");
    }

    #[test]
    fn test_subject_verb_object_attachment() {
        let sentence = annotate_one("Chronic stress increases amygdala activation.");

        let verb_idx = sentence.root().unwrap();
        assert_eq!(sentence.tokens[verb_idx].lemma, "increase");

        let subj = find_token(&sentence, "stress");
        assert_eq!(subj.dep, DepRel::Nsubj);
        assert_eq!(subj.head, verb_idx);

        let obj = find_token(&sentence, "activation");
        assert_eq!(obj.dep, DepRel::Dobj);
        assert_eq!(obj.head, verb_idx);

        let modifier = find_token(&sentence, "Chronic");
        assert_eq!(modifier.dep, DepRel::Amod);
    }

    #[test]
    fn test_prepositional_attachment() {
        let sentence = annotate_one("Theta oscillations in the hippocampus increase.");

        let pobj = find_token(&sentence, "hippocampus");
        assert_eq!(pobj.dep, DepRel::Pobj);
        assert_eq!(sentence.tokens[pobj.head].text, "in");
    }

    #[test]
    fn test_negation_attachment() {
        let sentence = annotate_one("Novelty does not increase theta power.");
        let neg = find_token(&sentence, "not");
        assert_eq!(neg.dep, DepRel::Neg);
    }

    #[test]
    fn test_copular_sentence_root() {
        let sentence = annotate_one("The amygdala is a limbic structure.");
        let root_idx = sentence.root().unwrap();
        assert_eq!(sentence.tokens[root_idx].lemma, "be");

        let subj = find_token(&sentence, "amygdala");
        assert_eq!(subj.dep, DepRel::Nsubj);
    }

    #[test]
    fn test_entity_hints_strip_determiners() {
        let sentence = annotate_one("The prefrontal cortex regulates fear responses.");
        let hints: Vec<&str> = sentence.entity_hints.iter().map(|h| h.text.as_str()).collect();
        assert!(hints.contains(&"prefrontal cortex"));
        assert!(hints.contains(&"fear responses"));
    }

    #[test]
    fn test_unparsable_text_error() {
        let annotator = RuleAnnotator::new();
        // Page artifacts only: cleaning leaves nothing to annotate
        let result = annotator.annotate("42\nPage 1 of 2\n17");
        assert!(matches!(
            result,
            Err(NeuroGraphError::UnparsableText(_))
        ));
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let annotator = RuleAnnotator::new();
        assert!(annotator.annotate("   ").unwrap().is_empty());
    }
}
