//! Rendered output for one client request.
//!
//! Every request renders exactly one of a commit result, a candidate window
//! or a preedit.  The session layer keeps the pending result internally and
//! `pop_output` drains it with that precedence.

use crate::candidate_list::{CandidateEntry, CandidateList};
use crate::composer::Composer;
use crate::segments::SegmentsRequestType;

/// Text committed to the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitResult {
    /// Committed text.
    pub value: String,
    /// Reading the text was produced from.
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreeditSegmentStyle {
    Underline,
    Highlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreeditSegment {
    pub value: String,
    pub style: PreeditSegmentStyle,
}

/// The composing text as the client should draw it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Preedit {
    pub segments: Vec<PreeditSegment>,
    /// Cursor offset in characters.
    pub cursor: usize,
    /// Character offset of the highlighted segment, if any.
    pub highlighted_position: Option<usize>,
}

impl Preedit {
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.value.as_str()).collect()
    }
}

/// Why the candidate window is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateCategory {
    Conversion,
    Prediction,
    Suggestion,
    Transliteration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateWord {
    pub id: i32,
    /// Index within the whole list, not the page.
    pub index: usize,
    pub value: String,
    pub shortcut: Option<char>,
}

/// One page of candidates plus window placement.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateWindow {
    /// Character offset of the target segment in the preedit.
    pub position: usize,
    pub category: CandidateCategory,
    /// Focused index within the whole list, absent under suggestion.
    pub focused_index: Option<usize>,
    /// Total number of entries in the list.
    pub total: usize,
    pub candidates: Vec<CandidateWord>,
    /// Nested window for a focused sub-list.
    pub sub_window: Option<Box<CandidateWindow>>,
}

/// Exactly one of these is rendered per request.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Result(CommitResult),
    Candidates(CandidateWindow),
    Preedit(Preedit),
}

/// Preedit for the composition states, split around the cursor.
pub fn fill_preedit(composer: &Composer) -> Preedit {
    let text = composer.string_for_preedit();
    if text.is_empty() {
        return Preedit::default();
    }
    Preedit {
        segments: vec![PreeditSegment {
            value: text,
            style: PreeditSegmentStyle::Underline,
        }],
        cursor: composer.position(),
        highlighted_position: None,
    }
}

/// Preedit for the conversion states: one segment per conversion segment
/// with the focused one highlighted.
pub fn fill_conversion(segment_index: usize, selected_values: &[String]) -> Preedit {
    let mut preedit = Preedit::default();
    let mut position = 0;
    for (i, value) in selected_values.iter().enumerate() {
        let length = value.chars().count();
        if i == segment_index {
            preedit.highlighted_position = Some(position);
            preedit.cursor = position + length;
            preedit.segments.push(PreeditSegment {
                value: value.clone(),
                style: PreeditSegmentStyle::Highlight,
            });
        } else {
            preedit.segments.push(PreeditSegment {
                value: value.clone(),
                style: PreeditSegmentStyle::Underline,
            });
        }
        position += length;
    }
    preedit
}

pub fn category_for_request(request_type: SegmentsRequestType) -> CandidateCategory {
    match request_type {
        SegmentsRequestType::Conversion => CandidateCategory::Conversion,
        SegmentsRequestType::Prediction => CandidateCategory::Prediction,
        // Partial results never get a focused candidate, so they render as
        // suggestions.
        SegmentsRequestType::Suggestion
        | SegmentsRequestType::PartialPrediction
        | SegmentsRequestType::PartialSuggestion => CandidateCategory::Suggestion,
    }
}

/// The focused page of `candidate_list` as a window.
pub fn fill_candidates(
    candidate_list: &CandidateList,
    position: usize,
    category: CandidateCategory,
    shortcuts: &str,
) -> CandidateWindow {
    let (page_start, page) = candidate_list.focused_page();
    let mut shortcut_chars = shortcuts.chars();
    let mut candidates = Vec::with_capacity(page.len());
    let mut sub_window = None;

    for (offset, entry) in page.iter().enumerate() {
        let index = page_start + offset;
        let shortcut = shortcut_chars.next();
        match entry {
            CandidateEntry::Item(item) => {
                candidates.push(CandidateWord {
                    id: item.id(),
                    index,
                    value: item.value().to_string(),
                    shortcut,
                });
            }
            CandidateEntry::SubList(list) => {
                candidates.push(CandidateWord {
                    id: list.focused_id(),
                    index,
                    value: list.name().to_string(),
                    shortcut,
                });
                if candidate_list.focused() && index == candidate_list.focused_index() {
                    sub_window = Some(Box::new(fill_candidates(
                        list,
                        position,
                        CandidateCategory::Transliteration,
                        "",
                    )));
                }
            }
        }
    }

    CandidateWindow {
        position,
        category,
        focused_index: candidate_list.focused().then_some(candidate_list.focused_index()),
        total: candidate_list.len(),
        candidates,
        sub_window,
    }
}

/// Result for a converted commit.
pub fn fill_conversion_result(key: &str, value: &str) -> CommitResult {
    CommitResult {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Result for committing the preedit as is.
pub fn fill_preedit_result(value: &str) -> CommitResult {
    CommitResult {
        key: value.to_string(),
        value: value.to_string(),
    }
}
