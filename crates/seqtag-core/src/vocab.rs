//! # Vocabulary
//!
//! Dense, contiguous token ids for words, characters and labels.
//!
//! Id 0 is always the padding id. When unknown handling is enabled, id 1 is
//! the unknown id. Neither reserved id is reachable through string lookup, so
//! a literal `<PAD>` in the text is just another (possibly unknown) token.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeqTagError};

/// Display name of the padding slot.
pub const PAD_TOKEN: &str = "<PAD>";
/// Display name of the unknown slot.
pub const UNKNOWN_TOKEN: &str = "<UNK>";

const PAD_ID: u32 = 0;
const UNKNOWN_ID: u32 = 1;

/// Bidirectional token <-> id mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VocabularyRepr", into = "VocabularyRepr")]
pub struct Vocabulary {
    itos: Vec<String>,
    stoi: HashMap<String, u32>,
    include_unknown: bool,
    lowercase: bool,
}

/// On-disk form; the reverse index is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct VocabularyRepr {
    tokens: Vec<String>,
    include_unknown: bool,
    lowercase: bool,
}

impl From<VocabularyRepr> for Vocabulary {
    fn from(repr: VocabularyRepr) -> Self {
        let mut vocab = Vocabulary::new(repr.include_unknown).with_lowercase(repr.lowercase);
        vocab.extend(repr.tokens);
        vocab
    }
}

impl From<Vocabulary> for VocabularyRepr {
    fn from(vocab: Vocabulary) -> Self {
        let reserved = vocab.num_reserved();
        VocabularyRepr {
            tokens: vocab.itos.into_iter().skip(reserved).collect(),
            include_unknown: vocab.include_unknown,
            lowercase: vocab.lowercase,
        }
    }
}

impl Vocabulary {
    /// Create an empty vocabulary holding only the reserved ids.
    pub fn new(include_unknown: bool) -> Self {
        let mut itos = vec![PAD_TOKEN.to_string()];
        if include_unknown {
            itos.push(UNKNOWN_TOKEN.to_string());
        }
        Self {
            itos,
            stoi: HashMap::new(),
            include_unknown,
            lowercase: false,
        }
    }

    /// Lowercase tokens before building and lookup.
    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    /// Adopt an existing token list (e.g. the rows of a pretrained table) in order.
    ///
    /// Ids are assigned after the reserved slots, so token `i` gets id
    /// `i + num_reserved()` unless it repeats an earlier token (after
    /// lowercasing), in which case it keeps the first id.
    pub fn from_tokens<I, S>(tokens: I, lowercase: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self::new(true).with_lowercase(lowercase);
        vocab.extend(tokens.into_iter().map(Into::into));
        vocab
    }

    fn extend(&mut self, tokens: impl IntoIterator<Item = String>) {
        for token in tokens {
            let token = self.normalize(&token);
            if self.stoi.contains_key(&token) {
                continue;
            }
            let id = self.itos.len() as u32;
            self.stoi.insert(token.clone(), id);
            self.itos.push(token);
        }
    }

    /// Replace the contents with the tokens observed in `sequences`, most
    /// frequent first. Ties are broken by token order so the result does not
    /// depend on the order of the input.
    pub fn build<T, S>(&mut self, sequences: &[T])
    where
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for sequence in sequences {
            for token in sequence.as_ref() {
                *counts.entry(self.normalize(token.as_ref())).or_default() += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|(a, ca), (b, cb)| cb.cmp(ca).then_with(|| a.cmp(b)));

        self.itos.truncate(self.num_reserved());
        self.stoi.clear();
        self.extend(ranked.into_iter().map(|(token, _)| token));
    }

    /// Build a character vocabulary from the characters of `words`.
    pub fn build_chars<T, S>(sequences: &[T]) -> Self
    where
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        let chars: Vec<Vec<String>> = sequences
            .iter()
            .map(|sequence| {
                sequence
                    .as_ref()
                    .iter()
                    .flat_map(|word| word.as_ref().chars().map(String::from))
                    .collect()
            })
            .collect();
        let mut vocab = Self::new(true);
        vocab.build(&chars);
        vocab
    }

    fn normalize(&self, token: &str) -> String {
        if self.lowercase {
            token.to_lowercase()
        } else {
            token.to_string()
        }
    }

    /// Look up a single token.
    pub fn encode_token(&self, token: &str) -> Result<u32> {
        let key = self.normalize(token);
        match self.stoi.get(&key) {
            Some(&id) => Ok(id),
            None => self.unknown_id().ok_or(SeqTagError::UnknownToken { token: key }),
        }
    }

    /// Encode one sequence of tokens.
    pub fn encode<S: AsRef<str>>(&self, sequence: &[S]) -> Result<Vec<u32>> {
        sequence
            .iter()
            .map(|token| self.encode_token(token.as_ref()))
            .collect()
    }

    /// Encode many sequences.
    pub fn encode_all<T, S>(&self, sequences: &[T]) -> Result<Vec<Vec<u32>>>
    where
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        sequences.iter().map(|s| self.encode(s.as_ref())).collect()
    }

    /// Encode the characters of one word. Unseen characters map to the unknown id.
    pub fn encode_chars(&self, word: &str) -> Vec<u32> {
        let unknown = self.unknown_id().unwrap_or(PAD_ID);
        word.chars()
            .map(|c| {
                let mut buf = [0u8; 4];
                self.stoi
                    .get(c.encode_utf8(&mut buf) as &str)
                    .copied()
                    .unwrap_or(unknown)
            })
            .collect()
    }

    /// Map an id back to its token.
    pub fn decode(&self, id: u32) -> Result<&str> {
        self.itos
            .get(id as usize)
            .map(String::as_str)
            .ok_or(SeqTagError::UnknownId {
                id,
                size: self.itos.len(),
            })
    }

    pub fn unknown_id(&self) -> Option<u32> {
        self.include_unknown.then_some(UNKNOWN_ID)
    }

    pub fn pad_id(&self) -> u32 {
        PAD_ID
    }

    /// Number of reserved ids at the front of the table.
    pub fn num_reserved(&self) -> usize {
        if self.include_unknown { 2 } else { 1 }
    }

    /// Total number of ids, reserved ones included.
    pub fn len(&self) -> usize {
        self.itos.len()
    }

    /// True when no real tokens have been added.
    pub fn is_empty(&self) -> bool {
        self.itos.len() == self.num_reserved()
    }

    pub fn lowercase(&self) -> bool {
        self.lowercase
    }

    /// Real tokens in id order.
    pub fn tokens(&self) -> &[String] {
        &self.itos[self.num_reserved()..]
    }
}
