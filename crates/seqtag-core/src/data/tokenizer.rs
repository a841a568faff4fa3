//! # Raw Text Tokenizer
//!
//! Splits untokenized sentences into words and punctuation so they can be
//! fed to a tagger. Corpus files are already tokenized and never go through
//! here.

use regex::Regex;

use crate::error::Result;

/// A token extracted from raw text with positional information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token text content
    pub text: String,
    /// Start byte offset in the original string
    pub start: usize,
    /// End byte offset in the original string
    pub end: usize,
    /// Token index in the sequence
    pub index: usize,
}

/// Word runs (letters, digits, inner apostrophes/hyphens/periods) or single
/// punctuation characters.
const TOKEN_PATTERN: &str = r"\w+(?:['’\-.]\w+)*|[^\w\s]";

/// Regex tokenizer for raw sentences.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    pattern: Regex,
}

impl Tokenizer {
    /// Create a new tokenizer instance.
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(TOKEN_PATTERN)?,
        })
    }

    /// Tokenize a sentence into a sequence of tokens.
    ///
    /// # Examples
    /// ```
    /// use seqtag_core::data::Tokenizer;
    ///
    /// let tokenizer = Tokenizer::new().unwrap();
    /// let words = tokenizer.words("Mr. Smith went to Washington.");
    /// assert_eq!(words, ["Mr", ".", "Smith", "went", "to", "Washington", "."]);
    /// ```
    pub fn tokenize(&self, input: &str) -> Vec<Token> {
        self.pattern
            .find_iter(input)
            .enumerate()
            .map(|(index, m)| Token {
                text: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
                index,
            })
            .collect()
    }

    /// Tokenize and keep only the token texts.
    pub fn words(&self, input: &str) -> Vec<String> {
        self.tokenize(input).into_iter().map(|t| t.text).collect()
    }

    /// Get the original text span covering tokens `[start_idx, end_idx)`.
    pub fn get_spans(
        &self,
        tokens: &[Token],
        start_idx: usize,
        end_idx: usize,
    ) -> Option<(usize, usize)> {
        if start_idx >= tokens.len() || end_idx > tokens.len() || start_idx >= end_idx {
            return None;
        }

        let start = tokens[start_idx].start;
        let end = tokens[end_idx - 1].end;
        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokenizer = Tokenizer::new().unwrap();
        let tokens = tokenizer.tokenize("Angela Merkel visited Paris.");

        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].text, "Angela");
        assert_eq!(tokens[0].start, 0);
        assert_eq!(tokens[0].end, 6);
        assert_eq!(tokens[4].text, ".");
        assert_eq!(tokens[4].index, 4);
    }

    #[test]
    fn test_keeps_inner_punctuation() {
        let tokenizer = Tokenizer::new().unwrap();
        let words = tokenizer.words("Coca-Cola's U.S. office, (re)opened");
        assert_eq!(
            words,
            ["Coca-Cola's", "U.S", ".", "office", ",", "(", "re", ")", "opened"]
        );
    }

    #[test]
    fn test_tokenize_empty() {
        let tokenizer = Tokenizer::new().unwrap();
        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.tokenize("   \t ").is_empty());
    }

    #[test]
    fn test_get_spans() {
        let tokenizer = Tokenizer::new().unwrap();
        let input = "New York City is big";
        let tokens = tokenizer.tokenize(input);

        let (start, end) = tokenizer.get_spans(&tokens, 0, 3).unwrap();
        assert_eq!(&input[start..end], "New York City");
        assert!(tokenizer.get_spans(&tokens, 3, 3).is_none());
    }
}
