//! Text normalization
//!
//! Cleans whitespace and non-textual artifacts left over from format
//! extraction (page numbers, running headers) and segments text into
//! sentences with boundary correction for scientific abbreviations.

use regex::Regex;

/// Abbreviations that must not terminate a sentence
const ABBREVIATIONS: &[&str] = &[
    "fig", "figs", "et al", "e.g", "i.e", "vs", "cf", "dr", "no", "eq", "ref", "refs", "approx",
    "ca",
];

/// Whitespace and artifact cleaner plus sentence splitter
pub struct TextNormalizer {
    page_number: Regex,
    page_header: Regex,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            // A line that is nothing but a page number
            page_number: Regex::new(r"^\s*\d{1,4}\s*$").unwrap(),
            // "Page 3", "Page 3 of 12", "- 3 -"
            page_header: Regex::new(r"(?i)^\s*(page\s+\d+(\s+of\s+\d+)?|-\s*\d+\s*-)\s*$").unwrap(),
        }
    }

    /// Remove non-textual artifacts and collapse whitespace
    pub fn clean(&self, raw: &str) -> String {
        let kept: Vec<&str> = raw
            .lines()
            .filter(|line| !self.page_number.is_match(line) && !self.page_header.is_match(line))
            .collect();

        kept.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Split cleaned text into sentences
    ///
    /// A period ends a sentence unless it follows a known abbreviation,
    /// a single capital letter (initials), or sits inside a number.
    pub fn split_sentences(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut start = 0;
        let bytes = text.as_bytes();

        for (i, ch) in text.char_indices() {
            if ch != '.' && ch != '!' && ch != '?' {
                continue;
            }

            let after = i + ch.len_utf8();
            if after >= text.len() {
                break;
            }

            // Must be followed by whitespace to be a candidate boundary
            if !bytes[after].is_ascii_whitespace() {
                continue;
            }

            if ch == '.' && self.is_protected_period(&text[start..i]) {
                continue;
            }

            let sentence = text[start..after].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = after;
        }

        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }

        sentences
    }

    /// Clean and split in one pass
    pub fn sentences(&self, raw: &str) -> Vec<String> {
        self.split_sentences(&self.clean(raw))
    }

    fn is_protected_period(&self, before: &str) -> bool {
        let last_word = before
            .rsplit(|c: char| c.is_whitespace())
            .next()
            .unwrap_or("");
        let last_word = last_word.trim_start_matches(['(', '[', '"']);

        // Decimal numbers ("0.5") and single initials ("J.")
        if last_word.chars().all(|c| c.is_ascii_digit()) && !last_word.is_empty() {
            return true;
        }
        if last_word.len() == 1 && last_word.chars().all(|c| c.is_uppercase()) {
            return true;
        }

        // "et al." spans two words, so match against the tail of the text
        let tail = before.to_lowercase();
        ABBREVIATIONS.iter().any(|abbr| {
            tail.ends_with(abbr)
                && tail[..tail.len() - abbr.len()]
                    .chars()
                    .next_back()
                    .map_or(true, |c| c.is_whitespace() || c == '(')
        })
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_collapses_whitespace() {
        let normalizer = TextNormalizer::new();
        let cleaned = normalizer.clean("Chronic   stress\n\nincreases\tactivation.");
        assert_eq!(cleaned, "Chronic stress increases activation.");
    }

    #[test]
    fn test_clean_drops_page_artifacts() {
        let normalizer = TextNormalizer::new();
        let raw = "The amygdala responds to threat.\n42\nPage 3 of 12\nTheta power rose.";
        let cleaned = normalizer.clean(raw);
        assert!(!cleaned.contains("42"));
        assert!(!cleaned.contains("Page 3"));
        assert!(cleaned.contains("Theta power rose."));
    }

    #[test]
    fn test_split_basic_sentences() {
        let normalizer = TextNormalizer::new();
        let sentences =
            normalizer.split_sentences("Stress increases activation. Theta power decreased.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0], "Stress increases activation.");
    }

    #[test]
    fn test_split_protects_abbreviations() {
        let normalizer = TextNormalizer::new();
        let sentences = normalizer
            .split_sentences("As shown in Fig. 2, stress increases activation. See et al. 2019.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].starts_with("As shown in Fig. 2"));
    }

    #[test]
    fn test_split_protects_decimals() {
        let normalizer = TextNormalizer::new();
        let sentences = normalizer.split_sentences("Power rose by 0. 5 units is wrong to split.");
        // "0." followed by whitespace is treated as a decimal artifact, not a boundary
        assert_eq!(sentences.len(), 1);
    }

    #[test]
    fn test_empty_input_yields_no_sentences() {
        let normalizer = TextNormalizer::new();
        assert!(normalizer.sentences("   \n \t ").is_empty());
    }
}
