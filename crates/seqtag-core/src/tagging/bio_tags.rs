//! # BIO Tags and Chunks
//!
//! Parses `B-TYPE` / `I-TYPE` / `O` label strings and groups them into
//! entity chunks following the CoNLL `conlleval` convention: an `I-TYPE`
//! that does not continue a chunk of the same type opens a new chunk.

use std::fmt;

/// A parsed BIO label, borrowing its entity type from the label string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BioTag<'a> {
    /// `B-TYPE`: first token of a chunk.
    Begin(&'a str),
    /// `I-TYPE`: continuation of a chunk.
    Inside(&'a str),
    /// `O`, or any label without a B/I prefix.
    Outside,
}

impl<'a> BioTag<'a> {
    /// Parse a label string. Anything that is not `B-X` or `I-X` with a
    /// non-empty type counts as outside.
    pub fn parse(label: &'a str) -> Self {
        match label.split_once('-') {
            Some(("B", ty)) if !ty.is_empty() => BioTag::Begin(ty),
            Some(("I", ty)) if !ty.is_empty() => BioTag::Inside(ty),
            _ => BioTag::Outside,
        }
    }

    /// Check if this is a "Begin" tag.
    pub fn is_begin(&self) -> bool {
        matches!(self, BioTag::Begin(_))
    }

    /// Check if this is an "Inside" tag.
    pub fn is_inside(&self) -> bool {
        matches!(self, BioTag::Inside(_))
    }

    /// Get the entity type for this tag.
    pub fn entity_type(&self) -> Option<&'a str> {
        match *self {
            BioTag::Begin(ty) | BioTag::Inside(ty) => Some(ty),
            BioTag::Outside => None,
        }
    }

    /// Check if transitioning from `from` tag to `to` tag is valid in strict IOB2.
    ///
    /// Only `I-X` is constrained: it must follow `B-X` or `I-X`.
    pub fn is_valid_transition(from: BioTag<'_>, to: BioTag<'_>) -> bool {
        match to {
            BioTag::Inside(ty) => from.entity_type() == Some(ty),
            _ => true,
        }
    }
}

impl fmt::Display for BioTag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BioTag::Begin(ty) => write!(f, "B-{ty}"),
            BioTag::Inside(ty) => write!(f, "I-{ty}"),
            BioTag::Outside => write!(f, "O"),
        }
    }
}

/// A maximal span of tokens sharing one entity type, `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Chunk {
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn new(entity_type: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            entity_type: entity_type.into(),
            start,
            end,
        }
    }

    /// Number of tokens covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Extract the chunks of a label sequence, in order of their start position.
pub fn extract_chunks<S: AsRef<str>>(labels: &[S]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut open: Option<(usize, &str)> = None;

    for (pos, label) in labels.iter().enumerate() {
        let tag = BioTag::parse(label.as_ref());

        let continues = match (tag, open) {
            (BioTag::Inside(ty), Some((_, current))) => ty == current,
            _ => false,
        };
        if continues {
            continue;
        }

        if let Some((start, ty)) = open.take() {
            chunks.push(Chunk::new(ty, start, pos));
        }
        if let Some(ty) = tag.entity_type() {
            open = Some((pos, ty));
        }
    }

    if let Some((start, ty)) = open {
        chunks.push(Chunk::new(ty, start, labels.len()));
    }

    chunks
}

/// Serialize chunks back into per-token IOB2 labels for a sequence of `len` tokens.
///
/// Chunks extending past `len` are truncated.
pub fn chunks_to_labels(chunks: &[Chunk], len: usize) -> Vec<String> {
    let mut labels = vec![BioTag::Outside.to_string(); len];
    for chunk in chunks {
        let end = chunk.end.min(len);
        if chunk.start >= end {
            continue;
        }
        for (offset, slot) in labels[chunk.start..end].iter_mut().enumerate() {
            *slot = if offset == 0 {
                BioTag::Begin(&chunk.entity_type).to_string()
            } else {
                BioTag::Inside(&chunk.entity_type).to_string()
            };
        }
    }
    labels
}

/// True when every `I-X` continues a `B-X`/`I-X`, i.e. the sequence is strict IOB2.
pub fn is_well_formed<S: AsRef<str>>(labels: &[S]) -> bool {
    let mut prev = BioTag::Outside;
    for label in labels {
        let tag = BioTag::parse(label.as_ref());
        if !BioTag::is_valid_transition(prev, tag) {
            return false;
        }
        prev = tag;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!(BioTag::parse("B-PER"), BioTag::Begin("PER"));
        assert_eq!(BioTag::parse("I-LOC"), BioTag::Inside("LOC"));
        assert_eq!(BioTag::parse("O"), BioTag::Outside);
        assert_eq!(BioTag::parse("B-"), BioTag::Outside);
        assert_eq!(BioTag::parse("PER"), BioTag::Outside);
        // The type keeps any further hyphens.
        assert_eq!(BioTag::parse("B-MISC-X"), BioTag::Begin("MISC-X"));
    }

    #[test]
    fn test_display_roundtrip() {
        for label in ["B-PER", "I-ORG", "O"] {
            assert_eq!(BioTag::parse(label).to_string(), label);
        }
    }

    #[test]
    fn test_valid_transitions() {
        assert!(BioTag::is_valid_transition(
            BioTag::Begin("PER"),
            BioTag::Inside("PER")
        ));
        assert!(BioTag::is_valid_transition(
            BioTag::Outside,
            BioTag::Begin("PER")
        ));
        assert!(!BioTag::is_valid_transition(
            BioTag::Outside,
            BioTag::Inside("PER")
        ));
        assert!(!BioTag::is_valid_transition(
            BioTag::Inside("PER"),
            BioTag::Inside("LOC")
        ));
    }

    #[test]
    fn test_extract_simple() {
        let labels = ["B-PER", "I-PER", "O", "B-LOC"];
        assert_eq!(
            extract_chunks(&labels),
            vec![Chunk::new("PER", 0, 2), Chunk::new("LOC", 3, 4)]
        );
    }

    #[test]
    fn test_adjacent_begins_split() {
        let labels = ["B-PER", "B-PER", "I-PER"];
        assert_eq!(
            extract_chunks(&labels),
            vec![Chunk::new("PER", 0, 1), Chunk::new("PER", 1, 3)]
        );
    }

    #[test]
    fn test_inside_after_outside_opens_chunk() {
        let labels = ["O", "I-ORG", "I-ORG", "I-LOC", "O"];
        assert_eq!(
            extract_chunks(&labels),
            vec![Chunk::new("ORG", 1, 3), Chunk::new("LOC", 3, 4)]
        );
    }

    #[test]
    fn test_chunk_at_end_is_closed() {
        let labels = ["O", "B-MISC", "I-MISC"];
        let chunks = extract_chunks(&labels);
        assert_eq!(chunks, vec![Chunk::new("MISC", 1, 3)]);
        assert_eq!(chunks[0].len(), 2);
    }

    #[test]
    fn test_roundtrip_well_formed() {
        let sequences: Vec<Vec<&str>> = vec![
            vec![],
            vec!["O", "O"],
            vec!["B-PER", "I-PER", "O", "B-LOC"],
            vec!["B-PER", "B-PER", "I-PER", "B-ORG"],
            vec!["O", "B-MISC", "I-MISC", "I-MISC"],
        ];
        for labels in sequences {
            assert!(is_well_formed(&labels));
            let chunks = extract_chunks(&labels);
            assert_eq!(chunks_to_labels(&chunks, labels.len()), labels);
        }
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let labels = ["I-PER", "O", "I-LOC", "I-ORG", "B-ORG"];
        assert!(!is_well_formed(&labels));
        let once = chunks_to_labels(&extract_chunks(&labels), labels.len());
        assert_eq!(once, ["B-PER", "O", "B-LOC", "B-ORG", "B-ORG"]);
        let twice = chunks_to_labels(&extract_chunks(&once), once.len());
        assert_eq!(once, twice);
    }
}
