//! Conversion state machine of one editing session.
//!
//! `SessionConverter` sits between the composer and the conversion engine.
//! It owns the engine's `Segments`, tracks which segment and candidate are
//! focused, renders preedits and candidate windows, and turns user commits
//! into engine calls plus a pending `CommitResult` drained by `pop_output`.

use std::sync::Arc;

use crate::candidate_list::CandidateList;
use crate::composer::{Composer, InputFieldType};
use crate::converter::{ConversionRequest, Converter};
use crate::output::{self, CandidateCategory, CommitResult, Output};
use crate::segments::{
    Candidate, CandidateAttributes, CandidateIndex, Segment, Segments, SegmentsRequestType,
};
use crate::settings::Settings;
use crate::stats::UsageStats;
use crate::transliterate::{TransliterationType, T13N_TYPES};
use crate::utils;
use crate::Config;

/// Consumed-size value meaning the whole composition was consumed.
pub const CONSUMED_ALL_CHARACTERS: usize = usize::MAX;

/// Name of the nested transliteration list in the cascading window.
const T13N_SUB_LIST_NAME: &str = "そのほかの文字種";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Composition,
    Suggestion,
    Prediction,
    Conversion,
}

impl SessionState {
    /// Whether the converter currently owns the rendering of the preedit.
    pub fn is_active(self) -> bool {
        !matches!(self, SessionState::Composition)
    }
}

/// Client-side context sent when a composition starts.
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    /// Monotonic revision of the client text field, if the client tracks it.
    pub revision: Option<i64>,
    /// Text immediately left of the cursor, if the client can provide it.
    pub preceding_text: Option<String>,
}

pub struct SessionConverter {
    state: SessionState,
    converter: Arc<dyn Converter>,
    segments: Segments,
    segment_index: usize,
    result: Option<CommitResult>,
    candidate_list: CandidateList,
    candidate_list_visible: bool,
    /// First suggestion segment, kept so a later prediction can prepend it.
    previous_suggestions: Segment,
    /// Focused list index per conversion segment, for usage stats.
    selected_candidate_indices: Vec<CandidateIndex>,
    client_revision: i64,
    config: Arc<Config>,
    stats: Arc<UsageStats>,
    settings: Arc<Settings>,
}

impl SessionConverter {
    pub fn new(
        converter: Arc<dyn Converter>,
        config: Arc<Config>,
        stats: Arc<UsageStats>,
        settings: Arc<Settings>,
    ) -> Self {
        let mut candidate_list = CandidateList::new(true);
        candidate_list.set_page_size(config.candidate_page_size);
        Self {
            state: SessionState::Composition,
            converter,
            segments: Segments::default(),
            segment_index: 0,
            result: None,
            candidate_list,
            candidate_list_visible: false,
            previous_suggestions: Segment::default(),
            selected_candidate_indices: Vec::new(),
            client_revision: 0,
            config,
            stats,
            settings,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_candidate_list_visible(&self) -> bool {
        self.candidate_list_visible
    }

    pub fn set_candidate_list_visible(&mut self, visible: bool) {
        self.candidate_list_visible = visible;
    }

    pub fn segments(&self) -> &Segments {
        &self.segments
    }

    pub fn segment_index(&self) -> usize {
        self.segment_index
    }

    /// Start conversion of the whole composition.
    pub fn convert(&mut self, composer: &Composer) -> bool {
        let request = ConversionRequest::for_conversion(composer);
        if !self.converter.start_conversion(&request, &mut self.segments) {
            tracing::warn!("conversion failed");
            self.reset_state();
            return false;
        }
        self.segment_index = 0;
        self.state = SessionState::Conversion;
        self.candidate_list_visible = false;
        self.attach_meta_candidates(composer);
        self.update_candidate_list();
        self.initialize_selected_candidate_indices();
        true
    }

    /// Convert and focus the transliteration of the given type, collapsing
    /// the composition to a single segment first.
    pub fn convert_to_transliteration(
        &mut self,
        composer: &Composer,
        t13n_type: TransliterationType,
    ) -> bool {
        if self.state == SessionState::Prediction {
            self.cancel();
        }

        let mut query_attr = CandidateAttributes::for_transliteration(t13n_type);
        query_attr.remove(
            CandidateAttributes::UPPER
                | CandidateAttributes::LOWER
                | CandidateAttributes::CAPITALIZED,
        );

        if matches!(
            self.state,
            SessionState::Composition | SessionState::Suggestion
        ) {
            if !self.convert(composer) {
                return false;
            }
            self.collapse_to_single_segment(composer);
            self.candidate_list.move_to_attributes(query_attr);
        } else {
            let current_attr = self
                .candidate_list
                .focused_candidate()
                .map(|c| c.attributes())
                .unwrap_or_default();
            // Flipping the width of an ASCII candidate keeps its case.
            if query_attr.intersects(CandidateAttributes::ASCII)
                && current_attr.intersects(CandidateAttributes::ASCII)
                && ((query_attr.contains(CandidateAttributes::HALF_WIDTH)
                    && current_attr.contains(CandidateAttributes::FULL_WIDTH))
                    || (query_attr.contains(CandidateAttributes::FULL_WIDTH)
                        && current_attr.contains(CandidateAttributes::HALF_WIDTH)))
            {
                for case in [
                    CandidateAttributes::UPPER,
                    CandidateAttributes::LOWER,
                    CandidateAttributes::CAPITALIZED,
                ] {
                    if current_attr.contains(case) {
                        query_attr |= case;
                    }
                }
            }
            self.candidate_list.move_next_attributes(query_attr);
        }
        self.candidate_list_visible = false;
        // Counted as the top conversion candidate on usage stats.
        if let Some(slot) = self.selected_candidate_indices.get_mut(self.segment_index) {
            *slot = 0;
        }
        self.focus_segment_value();
        true
    }

    /// Convert to half-width katakana, or half-width ASCII when the
    /// composition has no kana or kanji.
    pub fn convert_to_half_width(&mut self, composer: &Composer) -> bool {
        if self.state == SessionState::Prediction {
            self.cancel();
        }
        let composition = if self.state == SessionState::Conversion {
            self.candidate_list
                .focused_candidate()
                .map(|c| c.value().to_string())
                .unwrap_or_default()
        } else {
            composer.string_for_preedit()
        };
        let has_kana_or_kanji = composition.chars().any(|c| {
            matches!(
                utils::script_type_of_char(c),
                utils::ScriptType::Hiragana | utils::ScriptType::Katakana
            ) || ('\u{4e00}'..='\u{9fff}').contains(&c)
        });
        let target = if has_kana_or_kanji {
            TransliterationType::HalfKatakana
        } else {
            TransliterationType::HalfAscii
        };
        self.convert_to_transliteration(composer, target)
    }

    /// Rotate hiragana, full-width katakana and half-width katakana.
    pub fn switch_kana_type(&mut self, composer: &Composer) -> bool {
        if self.state == SessionState::Prediction {
            self.cancel();
        }

        let attributes = if matches!(
            self.state,
            SessionState::Composition | SessionState::Suggestion
        ) {
            if !self.convert(composer) {
                return false;
            }
            self.collapse_to_single_segment(composer);
            CandidateAttributes::FULL_WIDTH | CandidateAttributes::KATAKANA
        } else {
            let current_attr = self
                .candidate_list
                .focused_candidate()
                .map(|c| c.attributes())
                .unwrap_or_default();
            if current_attr.contains(CandidateAttributes::HIRAGANA) {
                CandidateAttributes::FULL_WIDTH | CandidateAttributes::KATAKANA
            } else if current_attr.contains(CandidateAttributes::KATAKANA)
                && current_attr.contains(CandidateAttributes::FULL_WIDTH)
            {
                CandidateAttributes::HALF_WIDTH | CandidateAttributes::KATAKANA
            } else {
                CandidateAttributes::HIRAGANA
            }
        };
        self.candidate_list.move_next_attributes(attributes);
        self.candidate_list_visible = false;
        if let Some(slot) = self.selected_candidate_indices.get_mut(self.segment_index) {
            *slot = 0;
        }
        self.focus_segment_value();
        true
    }

    /// Query suggestions for the composition while it is being typed.
    pub fn suggest(&mut self, composer: &Composer) -> bool {
        self.candidate_list_visible = false;
        self.reset_state();

        if !self.config.use_dictionary_suggest
            || composer.input_field_type() == InputFieldType::Password
        {
            return false;
        }

        let at_edge = composer.position() == composer.len() || composer.position() == 0;
        let success = if at_edge {
            let mut request = ConversionRequest::for_prediction(composer);
            request.create_partial_candidates = self.config.allow_auto_partial_suggestion;
            self.converter.start_suggestion(&request, &mut self.segments)
        } else {
            let request = ConversionRequest::for_partial(composer);
            self.converter
                .start_partial_suggestion(&request, &mut self.segments)
        };
        if !success
            || self
                .segments
                .conversion_segment(0)
                .map_or(true, |s| s.candidates_len() == 0)
        {
            self.converter.cancel_conversion(&mut self.segments);
            return false;
        }

        self.previous_suggestions = self
            .segments
            .conversion_segment(0)
            .cloned()
            .unwrap_or_default();
        self.segment_index = 0;
        self.state = SessionState::Suggestion;
        self.update_candidate_list();
        self.candidate_list_visible = true;
        self.initialize_selected_candidate_indices();
        true
    }

    /// Start or expand prediction.  Earlier suggestions stay at the front of
    /// the candidate order.
    pub fn predict(&mut self, composer: &Composer) -> bool {
        let predict_first = self.state != SessionState::Prediction
            && self.previous_suggestions.candidates_len() == 0;
        let predict_expand = self.state == SessionState::Prediction
            && self.previous_suggestions.candidates_len() > 0
            && !self.candidate_list.is_empty()
            && self.candidate_list.focused()
            && self.candidate_list.focused_index() == self.candidate_list.last_index();

        self.segments.clear_conversion_segments();
        if predict_first || predict_expand {
            let request = ConversionRequest::for_prediction(composer);
            if !self.converter.start_prediction(&request, &mut self.segments) {
                tracing::warn!("prediction failed");
                if self.state != SessionState::Prediction {
                    self.reset_state();
                    return false;
                }
            }
        }
        self.prepend_previous_suggestions(&composer.query_for_prediction());
        self.segments
            .set_request_type(SegmentsRequestType::Prediction);

        self.segment_index = 0;
        self.state = SessionState::Prediction;
        self.attach_meta_candidates(composer);
        self.update_candidate_list();
        self.candidate_list_visible = true;
        self.initialize_selected_candidate_indices();
        true
    }

    /// Fetch the full prediction behind the current suggestions and append
    /// it to the list without disturbing the focus.
    pub fn expand_suggestion(&mut self, composer: &Composer) -> bool {
        if self.state == SessionState::Composition {
            return false;
        }

        let at_edge = composer.position() == composer.len() || composer.position() == 0;
        let (success, key) = if at_edge {
            let request = ConversionRequest::for_prediction(composer);
            let key = request.key.clone();
            (
                self.converter.start_prediction(&request, &mut self.segments),
                key,
            )
        } else {
            let request = ConversionRequest::for_partial(composer);
            let key = request.key.clone();
            (
                self.converter
                    .start_partial_prediction(&request, &mut self.segments),
                key,
            )
        };
        if !success {
            self.converter.cancel_conversion(&mut self.segments);
            return false;
        }
        self.segments
            .set_request_type(SegmentsRequestType::Suggestion);
        self.prepend_previous_suggestions(&key);
        self.append_candidate_list();
        self.candidate_list_visible = true;
        true
    }

    /// Drop the conversion and return to plain composition.
    pub fn cancel(&mut self) {
        self.result = None;
        self.converter.cancel_conversion(&mut self.segments);
        self.reset_state();
    }

    /// Reset everything including the engine's history context.
    pub fn reset(&mut self) {
        self.converter.reset_conversion(&mut self.segments);
        if self.state == SessionState::Composition {
            return;
        }
        self.result = None;
        self.reset_state();
    }

    /// Commit every conversion segment with its selected candidate.
    pub fn commit(&mut self, composer: &Composer) {
        let size = self.segments.conversion_segments_len();
        if !self.update_result(0, size, None) {
            // A command candidate consumed the commit.
            self.cancel();
            self.reset_state();
            return;
        }
        for i in 0..size {
            let index = self.candidate_index_for_converter(i);
            if !self.converter.commit_segment_value(&mut self.segments, i, index) {
                tracing::warn!(segment = i, "commit of segment failed");
            }
        }
        self.commit_usage_stats(self.state);
        let request = ConversionRequest::for_conversion(composer);
        self.converter.finish_conversion(&request, &mut self.segments);
        self.reset_state();
    }

    /// Commit the suggestion at `index` of the current page.  Returns how
    /// many composition characters the commit consumed.
    pub fn commit_suggestion_by_index(
        &mut self,
        index: usize,
        composer: &Composer,
    ) -> Option<usize> {
        if !self.candidate_list.move_to_page_index(index) {
            return None;
        }
        self.update_selected_candidate_index();
        self.commit_suggestion_internal(composer)
    }

    /// Commit the suggestion with candidate id `id`.
    pub fn commit_suggestion_by_id(&mut self, id: i32, composer: &Composer) -> Option<usize> {
        if !self.candidate_list.move_to_id(id) {
            tracing::warn!(id, "unknown candidate id");
            return None;
        }
        self.update_selected_candidate_index();
        self.commit_suggestion_internal(composer)
    }

    fn commit_suggestion_internal(&mut self, composer: &Composer) -> Option<usize> {
        let size = self.segments.conversion_segments_len();
        let mut consumed = CONSUMED_ALL_CHARACTERS;
        if !self.update_result(0, size, Some(&mut consumed)) {
            self.reset_state();
            return None;
        }
        let preedit = composer.query_for_conversion();
        let preedit_len = utils::char_len(&preedit);
        if consumed != CONSUMED_ALL_CHARACTERS && consumed < preedit_len {
            let index = self.candidate_index_for_converter(0);
            let committed_key = utils::char_substring(&preedit, 0, consumed);
            let remaining_key = utils::char_suffix(&preedit, consumed);
            if !self.converter.commit_partial_suggestion_segment_value(
                &mut self.segments,
                0,
                index,
                &committed_key,
                &remaining_key,
            ) {
                tracing::warn!("partial suggestion commit failed");
            }
            self.commit_usage_stats(SessionState::Suggestion);
            self.initialize_selected_candidate_indices();
        } else {
            let index = self.candidate_index_for_converter(0);
            if !self.converter.commit_segment_value(&mut self.segments, 0, index) {
                tracing::warn!("suggestion commit failed");
            }
            self.commit_usage_stats(self.state);
            let request = ConversionRequest::for_conversion(composer);
            self.converter.finish_conversion(&request, &mut self.segments);
            self.reset_state();
        }
        Some(consumed)
    }

    /// Commit only the first conversion segment.  Returns the consumed
    /// composition length, or `None` when nothing was committed.
    pub fn commit_first_segment(&mut self, composer: &Composer) -> Option<usize> {
        self.commit_segments_internal(composer, 1)
    }

    /// Commit every segment up to and including the focused one.
    pub fn commit_head_to_focused_segments(&mut self, composer: &Composer) -> Option<usize> {
        self.commit_segments_internal(composer, self.segment_index + 1)
    }

    fn commit_segments_internal(
        &mut self,
        composer: &Composer,
        segments_to_commit: usize,
    ) -> Option<usize> {
        if self.segments.conversion_segments_len() <= segments_to_commit {
            self.commit(composer);
            return Some(composer.len());
        }
        if !self.update_result(0, segments_to_commit, None) {
            self.cancel();
            self.reset_state();
            return None;
        }
        let consumed: usize = (0..segments_to_commit)
            .filter_map(|i| self.segments.conversion_segment(i))
            .map(Segment::key_len)
            .sum();
        let indices: Vec<CandidateIndex> = (0..segments_to_commit)
            .map(|i| self.candidate_index_for_converter(i))
            .collect();
        if !self.converter.commit_segments(&mut self.segments, &indices) {
            tracing::warn!("segment commit failed");
        }
        self.commit_usage_stats_with_size(SessionState::Conversion, segments_to_commit);
        self.segment_index = self.segment_index.saturating_sub(segments_to_commit);
        self.update_candidate_list();
        Some(consumed)
    }

    /// Commit the composition as is, bypassing conversion.
    pub fn commit_preedit(&mut self, composer: &Composer) {
        let key = composer.query_for_conversion();
        let preedit = composer.string_for_submission();
        self.result = Some(output::fill_preedit_result(&preedit));

        // Let the engine learn the as-is commit as a single segment.
        self.segments.clear_conversion_segments();
        let segment = self.segments.add_segment();
        segment.set_key(&key);
        segment.add_candidate(Candidate::new(&preedit, &key));

        self.commit_usage_stats(SessionState::Composition);
        let request = ConversionRequest::for_conversion(composer);
        self.converter.finish_conversion(&request, &mut self.segments);
        self.reset_state();
    }

    /// Commit the first `count` characters of the composition as is.
    /// Returns how many characters were actually committed.
    pub fn commit_head(&mut self, count: usize, composer: &Composer) -> usize {
        let preedit = composer.string_for_submission();
        let consumed = count.min(utils::char_len(&preedit));
        let prefix = utils::char_substring(&preedit, 0, consumed);
        self.result = Some(output::fill_preedit_result(&prefix));
        consumed
    }

    /// Undo the engine learning of the most recent commit.
    pub fn revert(&mut self) {
        self.converter.revert_conversion(&mut self.segments);
    }

    pub fn segment_focus_right(&mut self) {
        if self.segment_index + 1 >= self.segments.conversion_segments_len() {
            self.segment_focus_internal(0);
        } else {
            self.segment_focus_internal(self.segment_index + 1);
        }
    }

    pub fn segment_focus_left(&mut self) {
        if self.segment_index == 0 {
            self.segment_focus_internal(
                self.segments.conversion_segments_len().saturating_sub(1),
            );
        } else {
            self.segment_focus_internal(self.segment_index - 1);
        }
    }

    pub fn segment_focus_left_edge(&mut self) {
        self.segment_focus_internal(0);
    }

    pub fn segment_focus_last(&mut self) {
        self.segment_focus_internal(self.segments.conversion_segments_len().saturating_sub(1));
    }

    fn segment_focus_internal(&mut self, index: usize) {
        self.candidate_list_visible = false;
        if self.state == SessionState::Prediction {
            return;
        }
        if index >= self.segments.conversion_segments_len() || index == self.segment_index {
            return;
        }
        self.result = None;
        // Fix the value of the segment we leave.
        let candidate_index = self.candidate_index_for_converter(self.segment_index);
        self.converter
            .commit_segment_value(&mut self.segments, self.segment_index, candidate_index);
        self.segment_index = index;
        self.update_candidate_list();
    }

    pub fn segment_width_expand(&mut self, composer: &Composer) {
        self.resize_segment_width(composer, 1);
    }

    pub fn segment_width_shrink(&mut self, composer: &Composer) {
        self.resize_segment_width(composer, -1);
    }

    fn resize_segment_width(&mut self, composer: &Composer, delta: isize) {
        self.candidate_list_visible = false;
        if self.state == SessionState::Prediction {
            return;
        }
        self.result = None;
        let request = ConversionRequest::for_conversion(composer);
        if !self.converter.resize_segment(
            &mut self.segments,
            &request,
            self.segment_index,
            delta,
        ) {
            return;
        }
        self.attach_meta_candidates(composer);
        self.update_candidate_list();
        self.selected_candidate_indices
            .resize(self.segments.conversion_segments_len(), 0);
        self.update_selected_candidate_index();
    }

    pub fn candidate_next(&mut self, composer: &Composer) {
        self.maybe_expand_prediction(composer);
        self.candidate_list.move_next();
        self.candidate_list_visible = true;
        self.update_selected_candidate_index();
        self.focus_segment_value();
    }

    pub fn candidate_next_page(&mut self) {
        self.candidate_list.move_next_page();
        self.candidate_list_visible = true;
        self.update_selected_candidate_index();
        self.focus_segment_value();
    }

    pub fn candidate_prev(&mut self) {
        self.candidate_list.move_prev();
        self.candidate_list_visible = true;
        self.update_selected_candidate_index();
        self.focus_segment_value();
    }

    pub fn candidate_prev_page(&mut self) {
        self.candidate_list.move_prev_page();
        self.candidate_list_visible = true;
        self.update_selected_candidate_index();
        self.focus_segment_value();
    }

    pub fn candidate_move_to_id(&mut self, id: i32, composer: &Composer) {
        if self.state == SessionState::Suggestion {
            // Move the state to prediction so the id is committable.
            self.predict(composer);
        }
        self.candidate_list.move_to_id(id);
        self.candidate_list_visible = false;
        self.update_selected_candidate_index();
        self.focus_segment_value();
    }

    pub fn candidate_move_to_page_index(&mut self, index: usize) -> bool {
        if !self.candidate_list.move_to_page_index(index) {
            return false;
        }
        self.candidate_list_visible = false;
        self.update_selected_candidate_index();
        self.focus_segment_value();
        true
    }

    /// Focus the candidate a selection key addresses on the current page.
    pub fn candidate_move_to_shortcut(&mut self, shortcut: char) -> bool {
        if !self.candidate_list_visible {
            return false;
        }
        let index = match self.config.selection_key_index(shortcut) {
            Some(index) => index,
            None => return false,
        };
        if !self.candidate_list.move_to_page_index(index) {
            return false;
        }
        self.update_selected_candidate_index();
        self.result = None;
        self.focus_segment_value();
        true
    }

    /// Render exactly one output: a pending commit result wins over a
    /// visible candidate window, which wins over the preedit.
    pub fn pop_output(&mut self, composer: &Composer) -> Option<Output> {
        if let Some(result) = self.result.take() {
            return Some(Output::Result(result));
        }
        if self.state.is_active() {
            if self.candidate_list_visible {
                let category = output::category_for_request(self.segments.request_type());
                let position = (0..self.segment_index)
                    .map(|i| utils::char_len(&self.selected_candidate_value(i)))
                    .sum();
                let shortcuts = if category == CandidateCategory::Suggestion {
                    ""
                } else {
                    self.config.select_keys.as_str()
                };
                return Some(Output::Candidates(output::fill_candidates(
                    &self.candidate_list,
                    position,
                    category,
                    shortcuts,
                )));
            }
            let values: Vec<String> = (0..self.segments.conversion_segments_len())
                .map(|i| self.selected_candidate_value(i))
                .collect();
            return Some(Output::Preedit(output::fill_conversion(
                self.segment_index,
                &values,
            )));
        }
        if !composer.is_empty() {
            return Some(Output::Preedit(output::fill_preedit(composer)));
        }
        None
    }

    /// How much of the composition the current result consumed.
    pub fn consumed_preedit_size(&self) -> usize {
        self.consumed_preedit_size_internal(0, self.segments.conversion_segments_len())
    }

    /// Sync with the client when a composition starts: reset the engine
    /// context if the client text no longer matches our history.
    pub fn on_start_composition(&mut self, context: &InputContext) {
        let mut revision_changed = false;
        if let Some(revision) = context.revision {
            revision_changed = revision != self.client_revision;
            self.client_revision = revision;
        }
        let preceding_text = match &context.preceding_text {
            Some(text) => text,
            None => {
                if revision_changed {
                    self.converter.reset_conversion(&mut self.segments);
                }
                return;
            }
        };
        if preceding_text.is_empty() {
            self.converter.reset_conversion(&mut self.segments);
            return;
        }

        let mut history_text = String::new();
        for i in 0..self.segments.history_len() {
            if let Some(candidate) = self.segments.segment(i).and_then(|s| s.candidate(0)) {
                history_text.push_str(&candidate.value);
            }
        }
        if !history_text.is_empty()
            && (preceding_text.ends_with(&history_text)
                || history_text.ends_with(preceding_text.as_str()))
        {
            return;
        }
        self.converter
            .reconstruct_history(&mut self.segments, preceding_text);
    }

    // Internal helpers.

    fn reset_state(&mut self) {
        self.state = SessionState::Composition;
        self.segment_index = 0;
        self.previous_suggestions = Segment::default();
        self.candidate_list_visible = false;
        self.candidate_list.clear();
        self.selected_candidate_indices.clear();
    }

    fn initialize_selected_candidate_indices(&mut self) {
        self.selected_candidate_indices =
            vec![0; self.segments.conversion_segments_len()];
    }

    /// Resize the first segment so the whole composition converts as one.
    fn collapse_to_single_segment(&mut self, composer: &Composer) {
        if self.segments.conversion_segments_len() <= 1 {
            return;
        }
        let whole = self.preedit_string(0, self.segments.conversion_segments_len());
        self.resize_segment_width(composer, utils::char_len(&whole) as isize);
    }

    /// Candidate index the engine should use for segment `index`: the
    /// focused candidate for the focused segment, the top one elsewhere.
    fn candidate_index_for_converter(&self, index: usize) -> CandidateIndex {
        if index == self.segment_index {
            self.candidate_list.focused_id() as CandidateIndex
        } else {
            0
        }
    }

    fn selected_candidate(&self, index: usize) -> Option<&Candidate> {
        let candidate_index = self.candidate_index_for_converter(index);
        self.segments.conversion_segment(index)?.candidate(candidate_index)
    }

    fn selected_candidate_value(&self, index: usize) -> String {
        match self.selected_candidate(index) {
            // A command candidate commits no text.
            Some(candidate) if candidate.is_command() => String::new(),
            Some(candidate) => candidate.value.clone(),
            None => String::new(),
        }
    }

    fn preedit_string(&self, start: usize, size: usize) -> String {
        let mut preedit = String::new();
        for i in start..start + size {
            if self.state == SessionState::Conversion {
                if let Some(segment) = self.segments.conversion_segment(i) {
                    preedit.push_str(segment.key());
                }
            } else if let Some(candidate) = self.selected_candidate(i) {
                preedit.push_str(&candidate.content_key);
            }
        }
        preedit
    }

    fn conversion_string(&self, start: usize, size: usize) -> String {
        (start..start + size)
            .map(|i| self.selected_candidate_value(i))
            .collect()
    }

    fn consumed_preedit_size_internal(&self, start: usize, size: usize) -> usize {
        if matches!(
            self.state,
            SessionState::Suggestion | SessionState::Prediction
        ) && size == 1
        {
            return match self.selected_candidate(start) {
                Some(candidate) if candidate.is_partial() => candidate
                    .consumed_key_size
                    .unwrap_or(CONSUMED_ALL_CHARACTERS),
                _ => CONSUMED_ALL_CHARACTERS,
            };
        }
        (start..start + size)
            .filter_map(|i| self.segments.conversion_segment(i))
            .map(Segment::key_len)
            .sum()
    }

    /// Run the command of a selected command candidate, if any.  Returns
    /// true when the commit was consumed by a command.
    fn maybe_perform_command_candidate(&mut self, start: usize, size: usize) -> bool {
        for i in start..start + size {
            let command = match self.selected_candidate(i) {
                Some(candidate) if candidate.is_command() => candidate.command,
                _ => continue,
            };
            if let Some(command) = command {
                self.settings.apply(command);
            }
            return true;
        }
        false
    }

    fn update_result(
        &mut self,
        start: usize,
        size: usize,
        consumed_key_size: Option<&mut usize>,
    ) -> bool {
        if self.maybe_perform_command_candidate(start, size) {
            return false;
        }
        let preedit = self.preedit_string(start, size);
        let conversion = self.conversion_string(start, size);
        if let Some(consumed) = consumed_key_size {
            *consumed = self.consumed_preedit_size_internal(start, size);
        }
        self.result = Some(output::fill_conversion_result(&preedit, &conversion));
        true
    }

    /// Build one transliteration meta candidate per type for each segment,
    /// rendered from the composition characters behind the segment key.
    fn attach_meta_candidates(&mut self, composer: &Composer) {
        let mut offset = 0;
        for i in 0..self.segments.conversion_segments_len() {
            let (key, key_len) = match self.segments.conversion_segment(i) {
                Some(segment) => (segment.key().to_string(), segment.key_len()),
                None => break,
            };
            if offset + key_len > composer.len() {
                break;
            }
            let values = composer.sub_transliterations(offset, key_len);
            let meta: Vec<Candidate> = T13N_TYPES
                .iter()
                .zip(values)
                .map(|(t13n_type, value)| {
                    let mut candidate = Candidate::new(value, &key);
                    candidate.attributes = CandidateAttributes::for_transliteration(*t13n_type);
                    candidate
                })
                .collect();
            if let Some(segment) = self.segments.conversion_segment_mut(i) {
                segment.set_meta_candidates(meta);
            }
            offset += key_len;
        }
    }

    fn update_candidate_list(&mut self) {
        self.candidate_list.clear();
        self.append_candidate_list();
    }

    /// Add the not-yet-listed candidates of the focused segment, plus the
    /// transliteration meta candidates on the first fill.
    fn append_candidate_list(&mut self) {
        let focused = !matches!(
            self.segments.request_type(),
            SegmentsRequestType::Suggestion
                | SegmentsRequestType::PartialSuggestion
                | SegmentsRequestType::PartialPrediction
        );
        let add_meta = self.candidate_list.is_empty();

        let segment = match self.segments.conversion_segment(self.segment_index) {
            Some(segment) => segment,
            None => return,
        };
        let start = self.candidate_list.next_available_id().max(0) as usize;
        let mut show_for_correction = false;
        let new_candidates: Vec<(String, CandidateAttributes, bool)> = segment.candidates()
            [start.min(segment.candidates_len())..]
            .iter()
            .map(|c| {
                (
                    c.value.clone(),
                    c.attributes,
                    c.attributes
                        .contains(CandidateAttributes::SPELLING_CORRECTION),
                )
            })
            .collect();
        let meta_candidates: Vec<(String, CandidateAttributes)> = segment
            .meta_candidates()
            .iter()
            .map(|c| (c.value.clone(), c.attributes))
            .collect();

        for (i, (value, attributes, spelling_correction)) in new_candidates.into_iter().enumerate()
        {
            let id = (start + i) as i32;
            self.candidate_list
                .add_candidate_with_attributes(id, value, attributes);
            // Surface a spelling correction even before the user pages.
            if spelling_correction && (start + i) < 10 {
                show_for_correction = true;
            }
        }
        if show_for_correction {
            self.candidate_list_visible = true;
        }
        self.candidate_list.set_focused(focused);

        if meta_candidates.is_empty() || !add_meta {
            return;
        }
        if self.config.use_cascading_window {
            let sub_list = self.candidate_list.add_sub_list(false);
            sub_list.set_name(T13N_SUB_LIST_NAME);
            for (i, (value, attributes)) in meta_candidates.into_iter().enumerate() {
                sub_list.add_candidate_with_attributes(-(i as i32) - 1, value, attributes);
            }
        } else {
            for (i, (value, attributes)) in meta_candidates.into_iter().enumerate() {
                self.candidate_list
                    .add_candidate_with_attributes(-(i as i32) - 1, value, attributes);
            }
        }
    }

    fn update_selected_candidate_index(&mut self) {
        let index = match self.candidate_list.focused_entry() {
            Some(crate::candidate_list::CandidateEntry::SubList(list)) => {
                -1 - (list.focused_index() as CandidateIndex)
            }
            _ => self.candidate_list.focused_index() as CandidateIndex,
        };
        if let Some(slot) = self.selected_candidate_indices.get_mut(self.segment_index) {
            *slot = index;
        }
    }

    /// Tell the engine which candidate is focused so it can re-rank the
    /// trailing segments.
    fn focus_segment_value(&mut self) {
        let candidate_index = self.candidate_index_for_converter(self.segment_index);
        self.converter
            .focus_segment_value(&mut self.segments, self.segment_index, candidate_index);
    }

    /// When the focus runs past the last suggestion, replace the list with
    /// the full prediction and restore the focus position.
    fn maybe_expand_prediction(&mut self, composer: &Composer) {
        if self.state != SessionState::Prediction
            || self.previous_suggestions.candidates_len() == 0
        {
            return;
        }
        if !self.candidate_list.focused()
            || self.candidate_list.focused_index() != self.candidate_list.last_index()
        {
            return;
        }
        let previous_index = self.candidate_list.focused_index();
        if !self.predict(composer) {
            return;
        }
        if previous_index < self.candidate_list.len() {
            if let Some(id) = self
                .candidate_list
                .entry(previous_index)
                .and_then(|e| e.as_item())
                .map(|item| item.id())
            {
                self.candidate_list.move_to_id(id);
            }
        }
        self.update_selected_candidate_index();
    }

    /// Put the remembered suggestion candidates at the front of the first
    /// conversion segment.
    fn prepend_previous_suggestions(&mut self, key: &str) {
        if self.segments.conversion_segments_len() == 0 {
            self.segments.add_segment();
        }
        let previous = self.previous_suggestions.clone();
        let segment = match self.segments.conversion_segment_mut(0) {
            Some(segment) => segment,
            None => return,
        };
        segment.set_key(key);
        if previous.candidates_len() == 0 {
            return;
        }
        let mut merged: Vec<Candidate> = previous.candidates().to_vec();
        for candidate in segment.candidates() {
            if !merged.contains(candidate) {
                merged.push(candidate.clone());
            }
        }
        let meta = if segment.meta_candidates_len() == 0 {
            previous.meta_candidates().to_vec()
        } else {
            segment.meta_candidates().to_vec()
        };
        segment.clear_candidates();
        for candidate in merged {
            segment.add_candidate(candidate);
        }
        segment.set_meta_candidates(meta);
    }

    fn commit_usage_stats(&mut self, commit_state: SessionState) {
        let size = match commit_state {
            SessionState::Composition => 0,
            SessionState::Suggestion | SessionState::Prediction => 1,
            SessionState::Conversion => self.segments.conversion_segments_len(),
        };
        self.commit_usage_stats_with_size(commit_state, size);
    }

    fn commit_usage_stats_with_size(&mut self, commit_state: SessionState, size: usize) {
        let from = match commit_state {
            SessionState::Composition => "Composition",
            SessionState::Suggestion | SessionState::Prediction => {
                if let Some(&index) = self.selected_candidate_indices.first() {
                    self.update_candidate_stats("Prediction", index);
                }
                "Prediction"
            }
            SessionState::Conversion => {
                let committed = size.min(self.selected_candidate_indices.len());
                for i in 0..committed {
                    let index = self.selected_candidate_indices[i];
                    self.update_candidate_stats("Conversion", index);
                }
                "Conversion"
            }
        };
        self.stats.increment("Commit");
        self.stats.increment(&format!("CommitFrom{from}"));
        let drained = size.min(self.selected_candidate_indices.len());
        self.selected_candidate_indices.drain(..drained);
    }

    fn update_candidate_stats(&self, base: &str, index: CandidateIndex) {
        let (name, index) = if index < 0 {
            ("TransliterationCandidates".to_string(), (-index - 1) as usize)
        } else {
            (format!("{base}Candidates"), index as usize)
        };
        let name = if index <= 9 {
            format!("{name}{index}")
        } else {
            format!("{name}GE10")
        };
        self.stats.increment(&name);
    }
}

impl Clone for SessionConverter {
    fn clone(&self) -> Self {
        let mut other = Self {
            state: self.state,
            converter: Arc::clone(&self.converter),
            segments: self.segments.clone(),
            segment_index: self.segment_index,
            result: self.result.clone(),
            candidate_list: CandidateList::new(true),
            candidate_list_visible: false,
            previous_suggestions: self.previous_suggestions.clone(),
            selected_candidate_indices: self.selected_candidate_indices.clone(),
            client_revision: self.client_revision,
            config: Arc::clone(&self.config),
            stats: Arc::clone(&self.stats),
            settings: Arc::clone(&self.settings),
        };
        other.candidate_list.set_page_size(self.config.candidate_page_size);
        if other.state.is_active() {
            other.update_candidate_list();
            if self.candidate_list.focused() {
                other.candidate_list.move_to_id(self.candidate_list.focused_id());
            }
            other.candidate_list_visible = self.candidate_list_visible;
        }
        other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{mock_segment, MockConverter};
    use crate::key_event::KeyEvent;
    use crate::table::Table;

    fn romaji_table() -> Arc<Table> {
        let mut table = Table::new();
        table.add_rule("a", "あ", "");
        table.add_rule("i", "い", "");
        table.add_rule("ka", "か", "");
        table.add_rule("ma", "ま", "");
        table.add_rule("bo", "ぼ", "");
        table.add_rule("ko", "こ", "");
        table.add_rule("no", "の", "");
        table.add_rule("n", "ん", "");
        table.add_rule("nn", "ん", "");
        table.add_rule("na", "な", "");
        table.add_rule("bo", "ぼ", "");
        table.add_rule("u", "う", "");
        table.add_rule("mo", "も", "");
        Arc::new(table)
    }

    fn composer_with(text: &str) -> Composer {
        let mut composer = Composer::new(romaji_table(), Arc::new(Config::default()));
        for c in text.chars() {
            composer.insert_character_key_event(&KeyEvent::from_char(c));
        }
        composer
    }

    struct Harness {
        converter: Arc<MockConverter>,
        stats: Arc<UsageStats>,
        settings: Arc<Settings>,
        session: SessionConverter,
    }

    fn harness() -> Harness {
        let converter = Arc::new(MockConverter::new());
        let stats = Arc::new(UsageStats::new());
        let settings = Arc::new(Settings::new());
        let session = SessionConverter::new(
            Arc::clone(&converter) as Arc<dyn Converter>,
            Arc::new(Config::default()),
            Arc::clone(&stats),
            Arc::clone(&settings),
        );
        Harness {
            converter,
            stats,
            settings,
            session,
        }
    }

    #[test]
    fn test_convert_and_commit() {
        let mut h = harness();
        h.converter.set_conversion(
            "かまぼこ",
            vec![mock_segment("かまぼこ", &["蒲鉾", "かまぼこ"])],
        );
        let composer = composer_with("kamaboko");
        assert!(h.session.convert(&composer));
        assert_eq!(h.session.state(), SessionState::Conversion);
        assert!(!h.session.is_candidate_list_visible());

        h.session.commit(&composer);
        assert_eq!(h.session.state(), SessionState::Composition);
        match h.session.pop_output(&Composer::new(romaji_table(), Arc::new(Config::default()))) {
            Some(Output::Result(result)) => {
                assert_eq!(result.value, "蒲鉾");
                assert_eq!(result.key, "かまぼこ");
            }
            other => panic!("expected result output, got {other:?}"),
        }
        assert_eq!(h.stats.count("Commit"), 1);
        assert_eq!(h.stats.count("CommitFromConversion"), 1);
        assert_eq!(h.converter.finish_count(), 1);
    }

    #[test]
    fn test_candidate_next_shows_window() {
        let mut h = harness();
        h.converter.set_conversion(
            "かまぼこ",
            vec![mock_segment("かまぼこ", &["蒲鉾", "かまぼこ", "カマボコ"])],
        );
        let composer = composer_with("kamaboko");
        h.session.convert(&composer);
        h.session.candidate_next(&composer);
        assert!(h.session.is_candidate_list_visible());
        h.session.candidate_next(&composer);
        match h.session.pop_output(&composer) {
            Some(Output::Candidates(window)) => {
                assert_eq!(window.focused_index, Some(2));
                assert_eq!(window.candidates[0].value, "蒲鉾");
                assert_eq!(window.candidates[0].shortcut, Some('1'));
            }
            other => panic!("expected candidate window, got {other:?}"),
        }
    }

    #[test]
    fn test_commit_suggestion_consumes_everything() {
        let mut h = harness();
        h.converter.set_suggestion(
            "も",
            vec![mock_segment("も", &["もずくす", "ももんが"])],
        );
        let composer = composer_with("mo");
        assert!(h.session.suggest(&composer));
        assert_eq!(h.session.state(), SessionState::Suggestion);
        assert!(h.session.is_candidate_list_visible());

        let consumed = h.session.commit_suggestion_by_index(0, &composer);
        assert_eq!(consumed, Some(CONSUMED_ALL_CHARACTERS));
        assert_eq!(h.session.state(), SessionState::Composition);
        match h.session.pop_output(&Composer::new(romaji_table(), Arc::new(Config::default()))) {
            Some(Output::Result(result)) => assert_eq!(result.value, "もずくす"),
            other => panic!("expected result output, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_suggestion_commit_keeps_remainder() {
        let mut h = harness();
        let mut segment = Segment::default();
        segment.set_key("かまぼこの");
        let mut candidate = Candidate::new("かまぼこの", "かまぼこの");
        candidate.attributes = CandidateAttributes::PARTIALLY_KEY_CONSUMED;
        candidate.consumed_key_size = Some(5);
        segment.add_candidate(candidate);
        h.converter.set_suggestion("かまぼこのいんぼ", vec![segment]);

        let composer = composer_with("kamabokonoinbo");
        assert!(h.session.suggest(&composer));
        let consumed = h.session.commit_suggestion_by_index(0, &composer);
        assert_eq!(consumed, Some(5));
        // The remainder stays under conversion for the next query.
        assert_eq!(h.session.segments().conversion_segments_len(), 1);
        assert_eq!(
            h.session.segments().conversion_segment(0).map(|s| s.key()),
            Some("いんぼ")
        );
        assert_eq!(h.session.segments().history_len(), 1);
    }

    #[test]
    fn test_segment_focus_wraps() {
        let mut h = harness();
        h.converter.set_conversion(
            "かまぼこのいんぼう",
            vec![
                mock_segment("かまぼこの", &["蒲鉾の"]),
                mock_segment("いんぼう", &["陰謀"]),
            ],
        );
        let composer = composer_with("kamabokonoinbou");
        h.session.convert(&composer);
        assert_eq!(h.session.segment_index(), 0);
        h.session.segment_focus_right();
        assert_eq!(h.session.segment_index(), 1);
        h.session.segment_focus_right();
        assert_eq!(h.session.segment_index(), 0);
        h.session.segment_focus_left();
        assert_eq!(h.session.segment_index(), 1);
        h.session.segment_focus_left_edge();
        assert_eq!(h.session.segment_index(), 0);
    }

    #[test]
    fn test_command_candidate_flips_settings_without_result() {
        let mut h = harness();
        let mut segment = Segment::default();
        segment.set_key("しー");
        let mut candidate = Candidate::new("", "しー");
        candidate.attributes = CandidateAttributes::COMMAND_CANDIDATE;
        candidate.command = Some(crate::segments::CandidateCommand::EnableIncognitoMode);
        segment.add_candidate(candidate);
        h.converter.set_conversion("しー", vec![segment]);

        let mut composer = Composer::new(romaji_table(), Arc::new(Config::default()));
        composer.insert_character_key_and_preedit("si-", "しー");
        h.session.convert(&composer);
        h.session.commit(&composer);

        assert!(h.settings.incognito_mode());
        let empty = Composer::new(romaji_table(), Arc::new(Config::default()));
        assert!(h.session.pop_output(&empty).is_none());
    }

    #[test]
    fn test_suggested_command_candidate_applies_without_commit() {
        let mut h = harness();
        let mut segment = Segment::default();
        segment.set_key("も");
        segment.add_candidate(Candidate::new("もずくす", "も"));
        let mut candidate = Candidate::new("", "も");
        candidate.attributes = CandidateAttributes::COMMAND_CANDIDATE;
        candidate.command = Some(crate::segments::CandidateCommand::EnablePresentationMode);
        segment.add_candidate(candidate);
        h.converter.set_suggestion("も", vec![segment]);

        let composer = composer_with("mo");
        assert!(h.session.suggest(&composer));

        // Selecting the command entry toggles the setting and consumes
        // nothing; the session falls back to composing.
        assert_eq!(h.session.commit_suggestion_by_index(1, &composer), None);
        assert!(h.settings.presentation_mode());
        assert_eq!(h.session.state(), SessionState::Composition);
        assert!(!h.session.is_candidate_list_visible());
        assert_eq!(h.converter.finish_count(), 0);

        let empty = Composer::new(romaji_table(), Arc::new(Config::default()));
        assert!(h.session.pop_output(&empty).is_none());
    }

    #[test]
    fn test_transliteration_meta_candidates() {
        let mut h = harness();
        h.converter
            .set_conversion("かな", vec![mock_segment("かな", &["仮名"])]);
        let composer = composer_with("kana");
        h.session.convert(&composer);
        let segment = h.session.segments().conversion_segment(0).unwrap();
        assert_eq!(segment.meta_candidates_len(), T13N_TYPES.len());
        assert_eq!(segment.candidate(-1).map(|c| c.value.as_str()), Some("かな"));
        assert_eq!(segment.candidate(-2).map(|c| c.value.as_str()), Some("カナ"));
    }

    #[test]
    fn test_convert_to_transliteration_rotates_ascii_width() {
        let mut h = harness();
        h.converter
            .set_conversion("かな", vec![mock_segment("かな", &["仮名"])]);
        let composer = composer_with("kana");
        assert!(h
            .session
            .convert_to_transliteration(&composer, TransliterationType::HalfAscii));
        assert_eq!(h.session.state(), SessionState::Conversion);
        let empty = composer_with("kana");
        match h.session.pop_output(&empty) {
            Some(Output::Preedit(preedit)) => assert_eq!(preedit.text(), "kana"),
            other => panic!("expected preedit, got {other:?}"),
        }
    }

    #[test]
    fn test_switch_kana_type_rotation() {
        let mut h = harness();
        h.converter
            .set_conversion("かな", vec![mock_segment("かな", &["仮名"])]);
        let composer = composer_with("kana");
        assert!(h.session.switch_kana_type(&composer));
        match h.session.pop_output(&composer) {
            Some(Output::Preedit(preedit)) => assert_eq!(preedit.text(), "カナ"),
            other => panic!("expected preedit, got {other:?}"),
        }
        assert!(h.session.switch_kana_type(&composer));
        match h.session.pop_output(&composer) {
            Some(Output::Preedit(preedit)) => assert_eq!(preedit.text(), "ｶﾅ"),
            other => panic!("expected preedit, got {other:?}"),
        }
        assert!(h.session.switch_kana_type(&composer));
        match h.session.pop_output(&composer) {
            Some(Output::Preedit(preedit)) => assert_eq!(preedit.text(), "かな"),
            other => panic!("expected preedit, got {other:?}"),
        }
    }

    #[test]
    fn test_predict_prepends_previous_suggestions() {
        let mut h = harness();
        h.converter
            .set_suggestion("も", vec![mock_segment("も", &["もずくす"])]);
        h.converter.set_prediction(
            "も",
            vec![mock_segment("も", &["もずく", "森", "もしもし"])],
        );
        let composer = composer_with("mo");
        assert!(h.session.suggest(&composer));
        assert!(h.session.predict(&composer));
        assert_eq!(h.session.state(), SessionState::Prediction);
        // Prediction first re-serves the remembered suggestions only.
        assert_eq!(
            h.session
                .segments()
                .conversion_segment(0)
                .map(|s| s.candidates_len()),
            Some(1)
        );

        // Running the focus past the last entry pulls in the full prediction.
        h.session.candidate_prev(); // wraps to the last entry
        h.session.candidate_next(&composer);
        let segment = h.session.segments().conversion_segment(0).unwrap();
        assert_eq!(segment.candidates()[0].value, "もずくす");
        assert_eq!(segment.candidates()[1].value, "もずく");
        assert_eq!(segment.candidates_len(), 4);
    }

    #[test]
    fn test_cancel_returns_to_composition() {
        let mut h = harness();
        h.converter
            .set_conversion("かな", vec![mock_segment("かな", &["仮名"])]);
        let composer = composer_with("kana");
        h.session.convert(&composer);
        h.session.cancel();
        assert_eq!(h.session.state(), SessionState::Composition);
        match h.session.pop_output(&composer) {
            Some(Output::Preedit(preedit)) => assert_eq!(preedit.text(), "かな"),
            other => panic!("expected composition preedit, got {other:?}"),
        }
    }

    #[test]
    fn test_commit_first_segment_keeps_rest() {
        let mut h = harness();
        h.converter.set_conversion(
            "かまぼこのいんぼう",
            vec![
                mock_segment("かまぼこの", &["蒲鉾の"]),
                mock_segment("いんぼう", &["陰謀"]),
            ],
        );
        let composer = composer_with("kamabokonoinbou");
        h.session.convert(&composer);
        let consumed = h.session.commit_first_segment(&composer);
        assert_eq!(consumed, Some(5));
        assert_eq!(h.session.state(), SessionState::Conversion);
        assert_eq!(h.session.segments().conversion_segments_len(), 1);
        match h.session.pop_output(&composer) {
            Some(Output::Result(result)) => assert_eq!(result.value, "蒲鉾の"),
            other => panic!("expected result, got {other:?}"),
        }
    }

    #[test]
    fn test_candidate_shortcut_selection() {
        let mut h = harness();
        h.converter.set_conversion(
            "かな",
            vec![mock_segment("かな", &["仮名", "かな", "カナ"])],
        );
        let composer = composer_with("kana");
        h.session.convert(&composer);
        h.session.candidate_next(&composer);
        assert!(h.session.candidate_move_to_shortcut('3'));
        match h.session.pop_output(&composer) {
            Some(Output::Candidates(window)) => assert_eq!(window.focused_index, Some(2)),
            other => panic!("expected window, got {other:?}"),
        }
        assert!(!h.session.candidate_move_to_shortcut('x'));
    }

    #[test]
    fn test_on_start_composition_resets_stale_history() {
        let mut h = harness();
        h.converter
            .set_conversion("かな", vec![mock_segment("かな", &["仮名"])]);
        let composer = composer_with("kana");
        h.session.convert(&composer);
        h.session.commit(&composer);
        assert_eq!(h.session.segments().history_len(), 1);

        // Matching preceding text keeps the history.
        h.session.on_start_composition(&InputContext {
            revision: Some(1),
            preceding_text: Some("それは仮名".to_string()),
        });
        assert_eq!(h.session.segments().history_len(), 1);

        // Unrelated preceding text rebuilds it.
        h.session.on_start_composition(&InputContext {
            revision: Some(2),
            preceding_text: Some("全く別の文".to_string()),
        });
        assert_eq!(h.session.segments().history_len(), 1);
        assert_eq!(
            h.session.segments().segment(0).and_then(|s| s.candidate(0)).map(|c| c.value.as_str()),
            Some("全く別の文")
        );
    }

    #[test]
    fn test_commit_preedit_bypasses_engine_candidates() {
        let mut h = harness();
        let composer = composer_with("kana");
        h.session.commit_preedit(&composer);
        match h.session.pop_output(&Composer::new(romaji_table(), Arc::new(Config::default()))) {
            Some(Output::Result(result)) => assert_eq!(result.value, "かな"),
            other => panic!("expected result, got {other:?}"),
        }
        assert_eq!(h.stats.count("CommitFromComposition"), 1);
        assert_eq!(h.converter.finish_count(), 1);
    }

    #[test]
    fn test_revert_undoes_last_learning() {
        let mut h = harness();
        h.converter
            .set_conversion("かな", vec![mock_segment("かな", &["仮名"])]);
        let composer = composer_with("kana");
        h.session.convert(&composer);
        h.session.commit(&composer);
        assert_eq!(h.session.segments().history_len(), 1);
        h.session.revert();
        assert_eq!(h.session.segments().history_len(), 0);
        assert_eq!(h.converter.revert_count(), 1);
    }
}
