//! Candidate / segment value model shared with the conversion engine.
//!
//! A `Segments` holds history segments (already committed context) followed
//! by conversion segments.  The engine fills candidates; the session layer
//! reads them, attaches transliteration meta candidates and marks segments
//! fixed as the user commits.

use crate::transliterate::TransliterationType;

/// Bit flags describing a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CandidateAttributes(u32);

impl CandidateAttributes {
    pub const NONE: CandidateAttributes = CandidateAttributes(0);
    /// Never feed this candidate back into the user history.
    pub const NO_LEARNING: CandidateAttributes = CandidateAttributes(1 << 0);
    /// The value corrects a misspelled reading.
    pub const SPELLING_CORRECTION: CandidateAttributes = CandidateAttributes(1 << 1);
    /// Selecting this candidate runs a command instead of committing text.
    pub const COMMAND_CANDIDATE: CandidateAttributes = CandidateAttributes(1 << 2);
    /// The candidate consumes only a prefix of the key.
    pub const PARTIALLY_KEY_CONSUMED: CandidateAttributes = CandidateAttributes(1 << 3);

    // Script/width/case tags driving transliteration rotation.
    pub const HALF_WIDTH: CandidateAttributes = CandidateAttributes(1 << 8);
    pub const FULL_WIDTH: CandidateAttributes = CandidateAttributes(1 << 9);
    pub const ASCII: CandidateAttributes = CandidateAttributes(1 << 10);
    pub const HIRAGANA: CandidateAttributes = CandidateAttributes(1 << 11);
    pub const KATAKANA: CandidateAttributes = CandidateAttributes(1 << 12);
    pub const UPPER: CandidateAttributes = CandidateAttributes(1 << 13);
    pub const LOWER: CandidateAttributes = CandidateAttributes(1 << 14);
    pub const CAPITALIZED: CandidateAttributes = CandidateAttributes(1 << 15);

    pub fn contains(self, other: CandidateAttributes) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn intersects(self, other: CandidateAttributes) -> bool {
        (self.0 & other.0) != 0
    }

    pub fn remove(&mut self, other: CandidateAttributes) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The attribute tags a transliteration naturally carries.
    pub fn for_transliteration(t13n_type: TransliterationType) -> CandidateAttributes {
        match t13n_type {
            TransliterationType::Hiragana => Self::HIRAGANA | Self::FULL_WIDTH,
            TransliterationType::FullKatakana => Self::KATAKANA | Self::FULL_WIDTH,
            TransliterationType::HalfKatakana => Self::KATAKANA | Self::HALF_WIDTH,
            TransliterationType::HalfAscii => Self::ASCII | Self::HALF_WIDTH,
            TransliterationType::HalfAsciiUpper => Self::ASCII | Self::HALF_WIDTH | Self::UPPER,
            TransliterationType::HalfAsciiLower => Self::ASCII | Self::HALF_WIDTH | Self::LOWER,
            TransliterationType::HalfAsciiCapitalized => {
                Self::ASCII | Self::HALF_WIDTH | Self::CAPITALIZED
            }
            TransliterationType::FullAscii => Self::ASCII | Self::FULL_WIDTH,
            TransliterationType::FullAsciiUpper => Self::ASCII | Self::FULL_WIDTH | Self::UPPER,
            TransliterationType::FullAsciiLower => Self::ASCII | Self::FULL_WIDTH | Self::LOWER,
            TransliterationType::FullAsciiCapitalized => {
                Self::ASCII | Self::FULL_WIDTH | Self::CAPITALIZED
            }
        }
    }
}

impl std::ops::BitOr for CandidateAttributes {
    type Output = CandidateAttributes;
    fn bitor(self, rhs: CandidateAttributes) -> CandidateAttributes {
        CandidateAttributes(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for CandidateAttributes {
    fn bitor_assign(&mut self, rhs: CandidateAttributes) {
        self.0 |= rhs.0;
    }
}

/// Session command a candidate triggers instead of committing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateCommand {
    EnableIncognitoMode,
    DisableIncognitoMode,
    EnablePresentationMode,
    DisablePresentationMode,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    /// Text committed when the candidate is selected.
    pub value: String,
    /// Reading the value was found under.
    pub key: String,
    /// Value without attached functional words.
    pub content_value: String,
    /// Key without attached functional words.
    pub content_key: String,
    /// Short annotation shown next to the value.
    pub description: String,
    pub cost: i32,
    pub attributes: CandidateAttributes,
    /// For a partial candidate, how much of the key it consumes.
    pub consumed_key_size: Option<usize>,
    pub command: Option<CandidateCommand>,
}

impl Candidate {
    pub fn new(value: impl Into<String>, key: impl Into<String>) -> Self {
        let value = value.into();
        let key = key.into();
        Self {
            content_value: value.clone(),
            content_key: key.clone(),
            value,
            key,
            ..Self::default()
        }
    }

    pub fn is_command(&self) -> bool {
        self.attributes.contains(CandidateAttributes::COMMAND_CANDIDATE)
    }

    pub fn is_partial(&self) -> bool {
        self.attributes
            .contains(CandidateAttributes::PARTIALLY_KEY_CONSUMED)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentType {
    /// Boundary and value can both still change.
    #[default]
    Free,
    /// Boundary fixed by the user, value still open.
    FixedBoundary,
    /// Value picked by the user.
    FixedValue,
    /// Committed to the client.
    Submitted,
    /// Context from previous conversions.
    History,
}

/// Candidate indices may be negative: `-1 - i` addresses meta candidate `i`.
pub type CandidateIndex = isize;

#[derive(Debug, Clone, Default)]
pub struct Segment {
    key: String,
    segment_type: SegmentType,
    candidates: Vec<Candidate>,
    meta_candidates: Vec<Candidate>,
}

impl Segment {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    pub fn key_len(&self) -> usize {
        self.key.chars().count()
    }

    pub fn segment_type(&self) -> SegmentType {
        self.segment_type
    }

    pub fn set_segment_type(&mut self, segment_type: SegmentType) {
        self.segment_type = segment_type;
    }

    pub fn candidates_len(&self) -> usize {
        self.candidates.len()
    }

    pub fn meta_candidates_len(&self) -> usize {
        self.meta_candidates.len()
    }

    /// Indexing with the meta-candidate convention: negative indices address
    /// the transliteration meta candidates.
    pub fn candidate(&self, index: CandidateIndex) -> Option<&Candidate> {
        if index >= 0 {
            self.candidates.get(index as usize)
        } else {
            self.meta_candidates.get((-index - 1) as usize)
        }
    }

    pub fn candidate_mut(&mut self, index: CandidateIndex) -> Option<&mut Candidate> {
        if index >= 0 {
            self.candidates.get_mut(index as usize)
        } else {
            self.meta_candidates.get_mut((-index - 1) as usize)
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn add_candidate(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }

    pub fn clear_candidates(&mut self) {
        self.candidates.clear();
        self.meta_candidates.clear();
    }

    pub fn meta_candidates(&self) -> &[Candidate] {
        &self.meta_candidates
    }

    pub fn set_meta_candidates(&mut self, meta_candidates: Vec<Candidate>) {
        self.meta_candidates = meta_candidates;
    }

    /// Position of `candidate` using the meta-candidate convention.
    pub fn candidate_index_of(&self, candidate: &Candidate) -> Option<CandidateIndex> {
        if let Some(i) = self.candidates.iter().position(|c| c == candidate) {
            return Some(i as CandidateIndex);
        }
        self.meta_candidates
            .iter()
            .position(|c| c == candidate)
            .map(|i| -(i as CandidateIndex) - 1)
    }
}

/// The conversion request kind the engine should serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentsRequestType {
    #[default]
    Conversion,
    Prediction,
    Suggestion,
    PartialPrediction,
    PartialSuggestion,
}

#[derive(Debug, Clone, Default)]
pub struct Segments {
    segments: Vec<Segment>,
    history_len: usize,
    request_type: SegmentsRequestType,
}

impl Segments {
    pub fn request_type(&self) -> SegmentsRequestType {
        self.request_type
    }

    pub fn set_request_type(&mut self, request_type: SegmentsRequestType) {
        self.request_type = request_type;
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn segment_mut(&mut self, index: usize) -> Option<&mut Segment> {
        self.segments.get_mut(index)
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    pub fn conversion_segments_len(&self) -> usize {
        self.segments.len() - self.history_len
    }

    pub fn conversion_segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(self.history_len + index)
    }

    pub fn conversion_segment_mut(&mut self, index: usize) -> Option<&mut Segment> {
        let history_len = self.history_len;
        self.segments.get_mut(history_len + index)
    }

    pub fn conversion_segments(&self) -> &[Segment] {
        &self.segments[self.history_len..]
    }

    pub fn add_segment(&mut self) -> &mut Segment {
        self.segments.push(Segment::default());
        let last = self.segments.len() - 1;
        &mut self.segments[last]
    }

    /// Move the first conversion segment into history (after submission).
    pub fn push_front_to_history(&mut self) {
        if self.history_len < self.segments.len() {
            self.segments[self.history_len].set_segment_type(SegmentType::History);
            self.history_len += 1;
        }
    }

    /// Drop the oldest history segments until at most `max` remain.
    pub fn trim_history(&mut self, max: usize) {
        while self.history_len > max {
            self.segments.remove(0);
            self.history_len -= 1;
        }
    }

    /// Drop the most recent history segment.
    pub fn pop_history_back(&mut self) -> Option<Segment> {
        if self.history_len == 0 {
            return None;
        }
        self.history_len -= 1;
        Some(self.segments.remove(self.history_len))
    }

    /// Insert an empty segment at a conversion-segment position.
    pub fn insert_conversion_segment(&mut self, index: usize) -> &mut Segment {
        let at = self.history_len + index;
        self.segments.insert(at, Segment::default());
        &mut self.segments[at]
    }

    pub fn clear_history(&mut self) {
        self.segments.drain(..self.history_len);
        self.history_len = 0;
    }

    pub fn clear_conversion_segments(&mut self) {
        self.segments.truncate(self.history_len);
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.history_len = 0;
        self.request_type = SegmentsRequestType::Conversion;
    }
}
