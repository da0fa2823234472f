//! Provider-neutral model of one streamed completion unit.

/// One unit of a streamed completion.
///
/// A unit may carry no candidates at all (e.g. a safety-filter notice).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionChunk {
    pub candidates: Vec<Candidate>,
}

/// One candidate completion within a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub parts: Vec<Part>,
}

/// One content part of a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    /// Generated text, absent for non-text parts.
    pub text: Option<String>,
}

impl CompletionChunk {
    /// Build a unit with a single candidate holding the given text fragments.
    #[must_use]
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: vec![Candidate {
                parts: fragments
                    .into_iter()
                    .map(|s| Part {
                        text: Some(s.into()),
                    })
                    .collect(),
            }],
        }
    }

    /// Whether the unit carries any candidate.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.candidates.is_empty()
    }

    /// Text fragments of the first candidate, in order.
    ///
    /// Only the first candidate is relayed; parts without text are skipped.
    pub fn into_fragments(self) -> impl Iterator<Item = String> {
        self.candidates
            .into_iter()
            .next()
            .into_iter()
            .flat_map(|candidate| candidate.parts)
            .filter_map(|part| part.text)
    }
}
