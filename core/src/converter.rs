//! The conversion-engine boundary.
//!
//! The session layer drives an engine through this trait without knowing
//! anything about its lattice or dictionaries: every call mutates a
//! caller-owned `Segments` and reports success as a bool.  `MockConverter`
//! is the in-tree scripted implementation used by the session tests; real
//! engines live out of tree.

use std::collections::BTreeSet;
use std::sync::Mutex;

use ahash::AHashMap;

use crate::composer::Composer;
use crate::segments::{
    Candidate, CandidateIndex, Segment, SegmentType, Segments, SegmentsRequestType,
};
use crate::utils;

/// Default number of history segments an engine keeps as context.
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 3;

/// One engine query, snapshotted from the composer.
#[derive(Debug, Clone, Default)]
pub struct ConversionRequest {
    /// The reading to convert or complete.
    pub key: String,
    /// Alternate readings of the ambiguous tail, for prediction.
    pub expanded: BTreeSet<String>,
    pub use_history: bool,
    pub max_history_size: usize,
    /// Allow candidates that consume only a prefix of the key.
    pub create_partial_candidates: bool,
}

impl ConversionRequest {
    pub fn for_conversion(composer: &Composer) -> Self {
        Self {
            key: composer.query_for_conversion(),
            use_history: true,
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            ..Self::default()
        }
    }

    pub fn for_prediction(composer: &Composer) -> Self {
        let (key, expanded) = composer.queries_for_prediction();
        Self {
            key,
            expanded,
            use_history: true,
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            ..Self::default()
        }
    }

    /// Request over the prefix of the composition left of the cursor.
    pub fn for_partial(composer: &Composer) -> Self {
        let key = utils::char_substring(&composer.query_for_conversion(), 0, composer.position());
        Self {
            key,
            use_history: true,
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            ..Self::default()
        }
    }
}

/// Engine capability surface.  All methods take `&self`; engines that keep
/// state use interior mutability.
pub trait Converter: Send + Sync {
    fn start_conversion(&self, request: &ConversionRequest, segments: &mut Segments) -> bool;
    fn start_prediction(&self, request: &ConversionRequest, segments: &mut Segments) -> bool;
    fn start_suggestion(&self, request: &ConversionRequest, segments: &mut Segments) -> bool;
    fn start_partial_suggestion(
        &self,
        request: &ConversionRequest,
        segments: &mut Segments,
    ) -> bool;
    fn start_partial_prediction(
        &self,
        request: &ConversionRequest,
        segments: &mut Segments,
    ) -> bool;

    /// Learn from the committed result and move it into history.
    fn finish_conversion(&self, request: &ConversionRequest, segments: &mut Segments);

    /// Drop the conversion segments but keep history context.
    fn cancel_conversion(&self, segments: &mut Segments);

    /// Drop everything including history context.
    fn reset_conversion(&self, segments: &mut Segments);

    /// Undo the learning of the most recent commit.
    fn revert_conversion(&self, segments: &mut Segments);

    /// Fix the value of one segment.
    fn commit_segment_value(
        &self,
        segments: &mut Segments,
        segment_index: usize,
        candidate_index: CandidateIndex,
    ) -> bool;

    /// Commit a partial suggestion: the consumed prefix becomes history and
    /// the rest of the key reopens as a fresh conversion segment.
    fn commit_partial_suggestion_segment_value(
        &self,
        segments: &mut Segments,
        segment_index: usize,
        candidate_index: CandidateIndex,
        current_key: &str,
        remaining_key: &str,
    ) -> bool;

    /// Submit the first `candidate_indices.len()` conversion segments into
    /// history, keeping the remainder under conversion.
    fn commit_segments(&self, segments: &mut Segments, candidate_indices: &[CandidateIndex])
        -> bool;

    /// Tell the engine which candidate is focused so it can re-rank
    /// trailing segments.
    fn focus_segment_value(
        &self,
        segments: &mut Segments,
        segment_index: usize,
        candidate_index: CandidateIndex,
    ) -> bool;

    /// Grow or shrink the segment at `segment_index` by `size_delta`
    /// characters, recomputing the segments to its right.
    fn resize_segment(
        &self,
        segments: &mut Segments,
        request: &ConversionRequest,
        segment_index: usize,
        size_delta: isize,
    ) -> bool;

    /// Rebuild history context from text preceding the cursor.
    fn reconstruct_history(&self, segments: &mut Segments, preceding_text: &str) -> bool;
}

/// Move the chosen candidate to the front of the segment, so the committed
/// value stays addressable as candidate 0.
fn promote_candidate(segment: &mut Segment, candidate_index: CandidateIndex) -> bool {
    if candidate_index >= 0 {
        let index = candidate_index as usize;
        if index >= segment.candidates_len() {
            return false;
        }
        if index > 0 {
            let candidate = segment.candidates()[index].clone();
            let mut rebuilt: Vec<Candidate> = vec![candidate];
            for (i, c) in segment.candidates().iter().enumerate() {
                if i != index {
                    rebuilt.push(c.clone());
                }
            }
            let meta = segment.meta_candidates().to_vec();
            segment.clear_candidates();
            for c in rebuilt {
                segment.add_candidate(c);
            }
            segment.set_meta_candidates(meta);
        }
        true
    } else {
        // Meta candidate: materialize it at the front.
        let candidate = match segment.candidate(candidate_index) {
            Some(c) => c.clone(),
            None => return false,
        };
        let mut rebuilt = vec![candidate];
        rebuilt.extend(segment.candidates().iter().cloned());
        let meta = segment.meta_candidates().to_vec();
        segment.clear_candidates();
        for c in rebuilt {
            segment.add_candidate(c);
        }
        segment.set_meta_candidates(meta);
        true
    }
}

#[derive(Debug, Default)]
struct MockResponses {
    conversion: AHashMap<String, Vec<Segment>>,
    prediction: AHashMap<String, Vec<Segment>>,
    suggestion: AHashMap<String, Vec<Segment>>,
    partial_suggestion: AHashMap<String, Vec<Segment>>,
    partial_prediction: AHashMap<String, Vec<Segment>>,
    finish_count: usize,
    revert_count: usize,
    reset_count: usize,
}

/// Scripted engine for tests: responses are registered per request kind and
/// key; the structural operations (commit, resize, history) behave like a
/// real engine over the `Segments` value model.
#[derive(Debug, Default)]
pub struct MockConverter {
    state: Mutex<MockResponses>,
}

/// Build a one-segment response: `key` with plain value candidates.
pub fn mock_segment(key: &str, values: &[&str]) -> Segment {
    let mut segment = Segment::default();
    segment.set_key(key);
    for value in values {
        segment.add_candidate(Candidate::new(*value, key));
    }
    segment
}

impl MockConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_conversion(&self, key: &str, response: Vec<Segment>) {
        if let Ok(mut state) = self.state.lock() {
            state.conversion.insert(key.to_string(), response);
        }
    }

    pub fn set_prediction(&self, key: &str, response: Vec<Segment>) {
        if let Ok(mut state) = self.state.lock() {
            state.prediction.insert(key.to_string(), response);
        }
    }

    pub fn set_suggestion(&self, key: &str, response: Vec<Segment>) {
        if let Ok(mut state) = self.state.lock() {
            state.suggestion.insert(key.to_string(), response);
        }
    }

    pub fn set_partial_suggestion(&self, key: &str, response: Vec<Segment>) {
        if let Ok(mut state) = self.state.lock() {
            state.partial_suggestion.insert(key.to_string(), response);
        }
    }

    pub fn set_partial_prediction(&self, key: &str, response: Vec<Segment>) {
        if let Ok(mut state) = self.state.lock() {
            state.partial_prediction.insert(key.to_string(), response);
        }
    }

    pub fn finish_count(&self) -> usize {
        self.state.lock().map(|s| s.finish_count).unwrap_or(0)
    }

    pub fn revert_count(&self) -> usize {
        self.state.lock().map(|s| s.revert_count).unwrap_or(0)
    }

    pub fn reset_count(&self) -> usize {
        self.state.lock().map(|s| s.reset_count).unwrap_or(0)
    }

    fn respond(
        &self,
        pick: impl Fn(&MockResponses) -> Option<Vec<Segment>>,
        segments: &mut Segments,
        request_type: SegmentsRequestType,
    ) -> bool {
        let response = match self.state.lock().ok().and_then(|state| pick(&state)) {
            Some(response) => response,
            None => return false,
        };
        segments.clear_conversion_segments();
        segments.set_request_type(request_type);
        for scripted in response {
            let segment = segments.add_segment();
            *segment = scripted;
        }
        true
    }
}

impl Converter for MockConverter {
    fn start_conversion(&self, request: &ConversionRequest, segments: &mut Segments) -> bool {
        self.respond(
            |state| state.conversion.get(&request.key).cloned(),
            segments,
            SegmentsRequestType::Conversion,
        )
    }

    fn start_prediction(&self, request: &ConversionRequest, segments: &mut Segments) -> bool {
        self.respond(
            |state| state.prediction.get(&request.key).cloned(),
            segments,
            SegmentsRequestType::Prediction,
        )
    }

    fn start_suggestion(&self, request: &ConversionRequest, segments: &mut Segments) -> bool {
        self.respond(
            |state| state.suggestion.get(&request.key).cloned(),
            segments,
            SegmentsRequestType::Suggestion,
        )
    }

    fn start_partial_suggestion(
        &self,
        request: &ConversionRequest,
        segments: &mut Segments,
    ) -> bool {
        self.respond(
            |state| state.partial_suggestion.get(&request.key).cloned(),
            segments,
            SegmentsRequestType::PartialSuggestion,
        )
    }

    fn start_partial_prediction(
        &self,
        request: &ConversionRequest,
        segments: &mut Segments,
    ) -> bool {
        self.respond(
            |state| state.partial_prediction.get(&request.key).cloned(),
            segments,
            SegmentsRequestType::PartialPrediction,
        )
    }

    fn finish_conversion(&self, request: &ConversionRequest, segments: &mut Segments) {
        if let Ok(mut state) = self.state.lock() {
            state.finish_count += 1;
        }
        while segments.conversion_segments_len() > 0 {
            segments.push_front_to_history();
        }
        segments.trim_history(request.max_history_size);
    }

    fn cancel_conversion(&self, segments: &mut Segments) {
        segments.clear_conversion_segments();
    }

    fn reset_conversion(&self, segments: &mut Segments) {
        if let Ok(mut state) = self.state.lock() {
            state.reset_count += 1;
        }
        segments.clear();
    }

    fn revert_conversion(&self, segments: &mut Segments) {
        if let Ok(mut state) = self.state.lock() {
            state.revert_count += 1;
        }
        segments.pop_history_back();
    }

    fn commit_segment_value(
        &self,
        segments: &mut Segments,
        segment_index: usize,
        candidate_index: CandidateIndex,
    ) -> bool {
        let segment = match segments.conversion_segment_mut(segment_index) {
            Some(segment) => segment,
            None => return false,
        };
        if !promote_candidate(segment, candidate_index) {
            return false;
        }
        segment.set_segment_type(SegmentType::FixedValue);
        true
    }

    fn commit_partial_suggestion_segment_value(
        &self,
        segments: &mut Segments,
        segment_index: usize,
        candidate_index: CandidateIndex,
        current_key: &str,
        remaining_key: &str,
    ) -> bool {
        if segment_index != 0 {
            return false;
        }
        let segment = match segments.conversion_segment_mut(0) {
            Some(segment) => segment,
            None => return false,
        };
        if !promote_candidate(segment, candidate_index) {
            return false;
        }
        segment.set_key(current_key);
        segment.set_segment_type(SegmentType::Submitted);
        segments.push_front_to_history();
        let reopened = segments.insert_conversion_segment(0);
        reopened.set_key(remaining_key);
        true
    }

    fn commit_segments(
        &self,
        segments: &mut Segments,
        candidate_indices: &[CandidateIndex],
    ) -> bool {
        for &candidate_index in candidate_indices {
            let segment = match segments.conversion_segment_mut(0) {
                Some(segment) => segment,
                None => return false,
            };
            if !promote_candidate(segment, candidate_index) {
                return false;
            }
            segment.set_segment_type(SegmentType::Submitted);
            segments.push_front_to_history();
        }
        true
    }

    fn focus_segment_value(
        &self,
        segments: &mut Segments,
        segment_index: usize,
        _candidate_index: CandidateIndex,
    ) -> bool {
        segments.conversion_segment(segment_index).is_some()
    }

    fn resize_segment(
        &self,
        segments: &mut Segments,
        _request: &ConversionRequest,
        segment_index: usize,
        size_delta: isize,
    ) -> bool {
        if segment_index >= segments.conversion_segments_len() || size_delta == 0 {
            return false;
        }

        // Keys of the resized segment and everything right of it.
        let tail_key: String = segments.conversion_segments()[segment_index..]
            .iter()
            .map(|s| s.key())
            .collect();
        let tail_len = utils::char_len(&tail_key);
        let current_len = segments
            .conversion_segment(segment_index)
            .map(Segment::key_len)
            .unwrap_or(0);
        let new_len = current_len
            .saturating_add_signed(size_delta)
            .clamp(1, tail_len);

        let first_key = utils::char_substring(&tail_key, 0, new_len);
        let rest_key = utils::char_suffix(&tail_key, new_len);

        let scripted = self
            .state
            .lock()
            .ok()
            .and_then(|state| state.conversion.get(&first_key).cloned());

        let head: Vec<Segment> = segments.conversion_segments()[..segment_index].to_vec();
        segments.clear_conversion_segments();
        for kept in head {
            *segments.add_segment() = kept;
        }
        match scripted {
            Some(response) if response.len() == 1 => {
                let segment = segments.add_segment();
                *segment = response.into_iter().next().unwrap_or_default();
                segment.set_segment_type(SegmentType::FixedBoundary);
            }
            _ => {
                let segment = segments.add_segment();
                segment.set_key(&first_key);
                segment.add_candidate(Candidate::new(&first_key, &first_key));
                segment.set_segment_type(SegmentType::FixedBoundary);
            }
        }
        if !rest_key.is_empty() {
            let scripted_rest = self
                .state
                .lock()
                .ok()
                .and_then(|state| state.conversion.get(&rest_key).cloned());
            match scripted_rest {
                Some(response) => {
                    for scripted in response {
                        let segment = segments.add_segment();
                        *segment = scripted;
                    }
                }
                None => {
                    let segment = segments.add_segment();
                    segment.set_key(&rest_key);
                    segment.add_candidate(Candidate::new(&rest_key, &rest_key));
                }
            }
        }
        true
    }

    fn reconstruct_history(&self, segments: &mut Segments, preceding_text: &str) -> bool {
        segments.clear();
        let segment = segments.add_segment();
        segment.set_key(preceding_text);
        segment.add_candidate(Candidate::new(preceding_text, preceding_text));
        segments.push_front_to_history();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_conversion() {
        let converter = MockConverter::new();
        converter.set_conversion(
            "かまぼこのいんぼう",
            vec![
                mock_segment("かまぼこの", &["かまぼこの", "蒲鉾の"]),
                mock_segment("いんぼう", &["陰謀", "いんぼう"]),
            ],
        );
        let mut segments = Segments::default();
        let request = ConversionRequest {
            key: "かまぼこのいんぼう".to_string(),
            ..ConversionRequest::default()
        };
        assert!(converter.start_conversion(&request, &mut segments));
        assert_eq!(segments.conversion_segments_len(), 2);
        assert_eq!(segments.conversion_segment(0).map(|s| s.key()), Some("かまぼこの"));
        assert!(!converter.start_conversion(
            &ConversionRequest::default(),
            &mut segments
        ));
    }

    #[test]
    fn test_commit_segments_moves_head_to_history() {
        let converter = MockConverter::new();
        converter.set_conversion(
            "かまぼこのいんぼう",
            vec![
                mock_segment("かまぼこの", &["かまぼこの"]),
                mock_segment("いんぼう", &["陰謀"]),
            ],
        );
        let mut segments = Segments::default();
        let request = ConversionRequest {
            key: "かまぼこのいんぼう".to_string(),
            ..ConversionRequest::default()
        };
        converter.start_conversion(&request, &mut segments);
        assert!(converter.commit_segments(&mut segments, &[0]));
        assert_eq!(segments.history_len(), 1);
        assert_eq!(segments.conversion_segments_len(), 1);
        assert_eq!(segments.conversion_segment(0).map(|s| s.key()), Some("いんぼう"));
    }

    #[test]
    fn test_partial_suggestion_commit_reopens_remainder() {
        let converter = MockConverter::new();
        let mut segments = Segments::default();
        let segment = segments.add_segment();
        segment.set_key("もずくす");
        segment.add_candidate(Candidate::new("もずく", "もずく"));

        assert!(converter.commit_partial_suggestion_segment_value(
            &mut segments,
            0,
            0,
            "もずく",
            "す"
        ));
        assert_eq!(segments.history_len(), 1);
        assert_eq!(segments.conversion_segments_len(), 1);
        assert_eq!(segments.conversion_segment(0).map(|s| s.key()), Some("す"));
    }

    #[test]
    fn test_meta_candidate_commit_materializes_value() {
        let converter = MockConverter::new();
        let mut segments = Segments::default();
        let segment = segments.add_segment();
        segment.set_key("かな");
        segment.add_candidate(Candidate::new("仮名", "かな"));
        segment.set_meta_candidates(vec![
            Candidate::new("かな", "かな"),
            Candidate::new("カナ", "かな"),
        ]);

        assert!(converter.commit_segment_value(&mut segments, 0, -2));
        let committed = segments.conversion_segment(0).unwrap();
        assert_eq!(committed.candidates()[0].value, "カナ");
        assert_eq!(committed.segment_type(), SegmentType::FixedValue);
    }

    #[test]
    fn test_resize_collapses_to_single_segment() {
        let converter = MockConverter::new();
        converter.set_conversion(
            "かまぼこのいんぼう",
            vec![
                mock_segment("かまぼこの", &["かまぼこの"]),
                mock_segment("いんぼう", &["陰謀"]),
            ],
        );
        let mut segments = Segments::default();
        let request = ConversionRequest {
            key: "かまぼこのいんぼう".to_string(),
            ..ConversionRequest::default()
        };
        converter.start_conversion(&request, &mut segments);
        assert!(converter.resize_segment(&mut segments, &request, 0, 9));
        assert_eq!(segments.conversion_segments_len(), 1);
        assert_eq!(
            segments.conversion_segment(0).map(|s| s.key()),
            Some("かまぼこのいんぼう")
        );
    }

    #[test]
    fn test_finish_trims_history() {
        let converter = MockConverter::new();
        let mut segments = Segments::default();
        for i in 0..5 {
            let segment = segments.add_segment();
            segment.set_key(format!("k{i}"));
            segment.add_candidate(Candidate::new(format!("v{i}"), format!("k{i}")));
        }
        let request = ConversionRequest {
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            ..ConversionRequest::default()
        };
        converter.finish_conversion(&request, &mut segments);
        assert_eq!(segments.conversion_segments_len(), 0);
        assert_eq!(segments.history_len(), 3);
        assert_eq!(converter.finish_count(), 1);
    }
}
