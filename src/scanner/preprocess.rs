//! Text preprocessing for the NLP extraction mode.
//!
//! Preprocessing changes fingerprint values materially: it folds case,
//! strips punctuation, drops stopwords and stems every remaining word, so two
//! documents that differ only in wording noise hash alike. The context is an
//! explicitly constructed, immutable value; share it behind an `Arc`.

use std::collections::HashSet;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// English stopwords removed in preprocessed mode.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me",
    "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once", "only",
    "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she", "should",
    "so", "some", "such", "than", "that", "the", "their", "theirs", "them", "themselves", "then",
    "there", "these", "they", "this", "those", "through", "to", "too", "under", "until", "up",
    "very", "was", "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why",
    "will", "with", "you", "your", "yours", "yourself", "yourselves",
];

/// Suffixes stripped by the stemmer, longest first.
const SUFFIXES: &[&str] = &[
    "ization", "ational", "iveness", "fulness", "ousness", "ation", "ement", "ment", "able",
    "ible", "ness", "ical", "ings", "ing", "ies", "ive", "ful", "ous", "ity", "ed", "ly", "es",
    "s",
];

/// Immutable preprocessing context: stopword set and stemmer configuration.
#[derive(Debug, Clone)]
pub struct PreprocessContext {
    stopwords: HashSet<String>,
    stem: bool,
    non_word: Regex,
}

impl Default for PreprocessContext {
    fn default() -> Self {
        Self::new(DEFAULT_STOPWORDS.iter().copied(), true)
    }
}

impl PreprocessContext {
    /// Build a context from a stopword list.
    ///
    /// # Arguments
    ///
    /// * `stopwords` - Words dropped from the output (matched lowercase)
    /// * `stem` - Whether to strip common English suffixes
    #[must_use]
    pub fn new<I, S>(stopwords: I, stem: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stopwords: stopwords
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
            stem,
            // Static pattern, compiled once per context
            non_word: Regex::new(r"[^A-Za-z0-9\s]").expect("static regex is valid"),
        }
    }

    /// Whether `word` is a stopword.
    #[must_use]
    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// Run the full pipeline over `text`.
    ///
    /// # Example
    ///
    /// ```
    /// use neardupe::scanner::PreprocessContext;
    ///
    /// let ctx = PreprocessContext::default();
    /// assert_eq!(ctx.process("The Cats were running!"), "cat runn");
    /// ```
    #[must_use]
    pub fn process(&self, text: &str) -> String {
        let normalized: String = text.nfkc().collect();
        let stripped = self.non_word.replace_all(&normalized, "");

        stripped
            .split_whitespace()
            .map(str::to_lowercase)
            .filter(|w| !self.is_stopword(w))
            .map(|w| if self.stem { stem_word(&w) } else { w })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Strip the first matching suffix, keeping at least a three-letter stem.
fn stem_word(word: &str) -> String {
    for suffix in SUFFIXES {
        if word.len() > suffix.len() + 2 && word.ends_with(suffix) {
            return word[..word.len() - suffix.len()].to_string();
        }
    }
    word.to_string()
}
