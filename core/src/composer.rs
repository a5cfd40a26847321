//! The composer: cursor, input/output modes and views over a composition.
//!
//! The composer owns a chunked composition and a character cursor, tracks the
//! current and comeback input modes (shifted alphabetic keys enter a
//! temporary mode that later snaps back), and renders the composition as the
//! preedit, the conversion query, the prediction query and the eleven
//! transliterations.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::composition::{Composition, CompositionInput, TrimMode};
use crate::correction::{TypeCorrectedQuery, TypingCorrector};
use crate::key_event::{InputStyle, KeyEvent};
use crate::table::Table;
use crate::transliterate::{ChunkStyle, TransliterationType, T13N_TYPES};
use crate::utils::{self, ScriptType};
use crate::{Config, ShiftKeyModeSwitch};

/// Kind of text field the composition is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFieldType {
    #[default]
    Normal,
    Password,
    Tel,
    Number,
}

/// Compositions longer than this reject further input.
const MAX_COMPOSITION_LENGTH: usize = 256;

#[derive(Debug, Clone)]
pub struct Composer {
    composition: Composition,
    position: usize,
    input_mode: TransliterationType,
    output_mode: TransliterationType,
    comeback_input_mode: TransliterationType,
    input_field_type: InputFieldType,
    shifted_sequence_count: usize,
    source_text: String,
    max_length: usize,
    is_new_input: bool,
    typing_corrector: TypingCorrector,
    config: Arc<Config>,
}

impl Composer {
    pub fn new(table: Arc<Table>, config: Arc<Config>) -> Self {
        let mut composition = Composition::new(Arc::clone(&table));
        composition.set_input_style(TransliterationType::Hiragana.chunk_style());
        Self {
            composition,
            position: 0,
            input_mode: TransliterationType::Hiragana,
            output_mode: TransliterationType::Hiragana,
            comeback_input_mode: TransliterationType::Hiragana,
            input_field_type: InputFieldType::Normal,
            shifted_sequence_count: 0,
            source_text: String::new(),
            max_length: MAX_COMPOSITION_LENGTH,
            is_new_input: true,
            typing_corrector: TypingCorrector::new(table),
            config,
        }
    }

    pub fn set_table(&mut self, table: Arc<Table>) {
        self.composition.set_table(Arc::clone(&table));
        self.typing_corrector.set_table(table);
    }

    pub fn reset(&mut self) {
        self.edit_erase();
        self.set_output_mode(TransliterationType::Hiragana);
        self.source_text.clear();
    }

    /// Discard the composition but keep the input mode.
    pub fn edit_erase(&mut self) {
        self.composition.erase();
        self.position = 0;
        self.set_input_mode(self.comeback_input_mode);
        self.typing_corrector.reset();
    }

    pub fn is_empty(&self) -> bool {
        self.composition.is_empty()
    }

    pub fn len(&self) -> usize {
        self.composition.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn input_mode(&self) -> TransliterationType {
        self.input_mode
    }

    pub fn output_mode(&self) -> TransliterationType {
        self.output_mode
    }

    pub fn comeback_input_mode(&self) -> TransliterationType {
        self.comeback_input_mode
    }

    pub fn set_input_mode(&mut self, mode: TransliterationType) {
        self.comeback_input_mode = mode;
        self.input_mode = mode;
        self.shifted_sequence_count = 0;
        self.is_new_input = true;
        self.composition.set_input_style(mode.chunk_style());
    }

    /// Enter a mode that a later unshifted key reverts.
    pub fn set_temporary_input_mode(&mut self, mode: TransliterationType) {
        self.comeback_input_mode = self.input_mode;
        self.input_mode = mode;
        self.shifted_sequence_count = 0;
        self.is_new_input = true;
        self.composition.set_input_style(mode.chunk_style());
    }

    /// Rendering mode for the whole composition; moves the cursor to the end.
    pub fn set_output_mode(&mut self, mode: TransliterationType) {
        self.output_mode = mode;
        let length = self.composition.len();
        if length > 0 {
            self.composition.set_style_range(0, length, mode.chunk_style());
        }
        self.position = self.composition.len();
    }

    pub fn set_input_field_type(&mut self, input_field_type: InputFieldType) {
        self.input_field_type = input_field_type;
    }

    pub fn input_field_type(&self) -> InputFieldType {
        self.input_field_type
    }

    pub fn set_source_text(&mut self, source_text: impl Into<String>) {
        self.source_text = source_text.into();
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// Adopt the mode of the character left of the cursor after a move.
    fn update_input_mode(&mut self) {
        if !self.config.update_input_mode_from_surrounding_text {
            return;
        }
        if self.position != 0 {
            let left_style = self.composition.style_at(self.position.saturating_sub(1));
            let at_tail = self.position == self.composition.len();
            let same_as_right = left_style.is_some()
                && left_style == self.composition.style_at(self.position);
            if at_tail || same_as_right {
                if let Some(mode) =
                    left_style.and_then(TransliterationType::from_chunk_style)
                {
                    self.input_mode = mode;
                    self.composition.set_input_style(mode.chunk_style());
                    return;
                }
            }
        }
        self.set_input_mode(self.comeback_input_mode);
    }

    /// Shift-driven temporary mode handling, applied before each insertion.
    fn apply_temporary_input_mode(&mut self, key: &KeyEvent) {
        let switch = self.config.shift_key_mode_switch;
        if switch == ShiftKeyModeSwitch::Off {
            return;
        }
        if key.is_upper_alphabet() {
            match switch {
                ShiftKeyModeSwitch::AsciiInputMode => {
                    if self.input_mode != TransliterationType::HalfAscii
                        && self.input_mode != TransliterationType::FullAscii
                    {
                        self.set_temporary_input_mode(TransliterationType::HalfAscii);
                    }
                }
                ShiftKeyModeSwitch::KatakanaInputMode => {
                    if self.input_mode == TransliterationType::Hiragana {
                        self.set_temporary_input_mode(TransliterationType::FullKatakana);
                    }
                }
                ShiftKeyModeSwitch::Off => {}
            }
            self.shifted_sequence_count += 1;
        } else if key.is_lower_alphabet() {
            match switch {
                ShiftKeyModeSwitch::AsciiInputMode => {
                    // A single shifted letter starts a word like "Tokyo";
                    // keep composing it in ASCII.  After a run of shifted
                    // letters the lowercase key ends the temporary mode.
                    if self.shifted_sequence_count > 1 {
                        self.set_input_mode(self.comeback_input_mode);
                    }
                }
                ShiftKeyModeSwitch::KatakanaInputMode => {
                    self.set_input_mode(self.comeback_input_mode);
                }
                ShiftKeyModeSwitch::Off => {}
            }
            self.shifted_sequence_count = 0;
        } else {
            self.shifted_sequence_count = 0;
        }
    }

    fn enable_insert(&self) -> bool {
        self.composition.len() < self.max_length
    }

    /// Insert raw keystroke text at the cursor.
    pub fn insert_character(&mut self, input: &str) {
        if !self.enable_insert() {
            tracing::debug!(input, "composition is full, dropping input");
            return;
        }
        let composition_input = CompositionInput::from_raw(input, self.is_new_input);
        self.position = self.composition.insert_input(self.position, composition_input);
        self.is_new_input = false;
    }

    /// Insert pre-converted text, keyed by its raw form.
    pub fn insert_character_key_and_preedit(&mut self, key: &str, preedit: &str) {
        if !self.enable_insert() {
            return;
        }
        let composition_input =
            CompositionInput::from_key_and_preedit(key, preedit, self.is_new_input);
        self.position = self.composition.insert_input(self.position, composition_input);
        self.is_new_input = false;
    }

    /// Insert display text as both key and preedit.
    pub fn insert_character_preedit(&mut self, input: &str) {
        self.insert_character_key_and_preedit(input, input);
    }

    /// Full key-event insertion path; returns whether the event was consumed.
    pub fn insert_character_key_event(&mut self, key: &KeyEvent) -> bool {
        if key.is_modifier_only() {
            if key.shift() {
                // A bare shift tap cancels any temporary mode.
                self.set_input_mode(self.comeback_input_mode);
            }
            return true;
        }

        if let Some(key_string) = key.key_string() {
            let key_string = key_string.to_string();
            let raw = match key.composition_char() {
                Some(c) => c.to_string(),
                None => key_string.clone(),
            };
            match key.input_style() {
                InputStyle::AsIs | InputStyle::DirectInput => {
                    // Rendered verbatim; the mode snaps back afterwards.
                    self.composition.set_input_style(ChunkStyle::ConversionString);
                    self.insert_character_key_and_preedit(&raw, &key_string);
                    self.set_input_mode(self.comeback_input_mode);
                }
                InputStyle::FollowMode => {
                    self.insert_character_key_and_preedit(&raw, &key_string);
                }
            }
            return true;
        }

        let input = match key.composition_char() {
            Some(c) => c,
            None => {
                tracing::debug!("key event carries no composable character");
                return false;
            }
        };
        self.apply_temporary_input_mode(key);
        if self.config.use_typing_correction {
            self.typing_corrector
                .insert_character(input, key.probable_key_events());
        }
        self.insert_character(&input.to_string());
        true
    }

    /// Delete the character left of the cursor.
    pub fn backspace(&mut self) {
        if self.position == 0 {
            return;
        }
        self.position -= 1;
        self.update_input_mode();
        self.position = self.composition.delete_at(self.position);
        self.typing_corrector.invalidate();
    }

    /// Delete the character right of the cursor.
    pub fn delete(&mut self) {
        if self.position == self.composition.len() {
            return;
        }
        self.position = self.composition.delete_at(self.position);
        self.typing_corrector.invalidate();
    }

    pub fn move_cursor_left(&mut self) {
        if self.position > 0 {
            self.position -= 1;
        }
        self.update_input_mode();
        self.typing_corrector.invalidate();
    }

    pub fn move_cursor_right(&mut self) {
        if self.position < self.composition.len() {
            self.position += 1;
        }
        self.update_input_mode();
        self.typing_corrector.invalidate();
    }

    pub fn move_cursor_to_beginning(&mut self) {
        self.position = 0;
        self.set_input_mode(self.comeback_input_mode);
        self.typing_corrector.invalidate();
    }

    pub fn move_cursor_to_end(&mut self) {
        self.position = self.composition.len();
        self.set_input_mode(self.comeback_input_mode);
        self.typing_corrector.invalidate();
    }

    pub fn move_cursor_to(&mut self, new_position: usize) {
        self.position = new_position.min(self.composition.len());
        self.update_input_mode();
        self.typing_corrector.invalidate();
    }

    /// The preedit string shown to the user.
    pub fn string_for_preedit(&self) -> String {
        let mut output = self.composition.string();
        if let Some(transformed) = transform_characters_for_numbers(&output) {
            output = transformed;
        }
        match self.input_field_type {
            InputFieldType::Number | InputFieldType::Password | InputFieldType::Tel => {
                utils::to_halfwidth(&output)
            }
            InputFieldType::Normal => output,
        }
    }

    /// Preedit split at the cursor: (left, focused char, right).
    pub fn preedit(&self) -> (String, String, String) {
        let preedit = self.string_for_preedit();
        let left = utils::char_substring(&preedit, 0, self.position);
        let focused = utils::char_substring(&preedit, self.position, 1);
        let right = utils::char_suffix(&preedit, self.position + 1);
        (left, focused, right)
    }

    pub fn string_for_submission(&self) -> String {
        self.string_for_preedit()
    }

    /// The reading sent to the dictionary engine for conversion.
    pub fn query_for_conversion(&self) -> String {
        let mut output = self.composition.string_with_trim_mode(TrimMode::Fix);
        if let Some(transformed) = transform_characters_for_numbers(&output) {
            output = transformed;
        }
        utils::to_halfwidth(&output)
    }

    /// The reading sent to the dictionary engine for prediction, with the
    /// ambiguous tail trimmed off when that helps.
    pub fn query_for_prediction(&self) -> String {
        let asis = self.composition.string_with_trim_mode(TrimMode::Asis);
        match self.input_mode {
            TransliterationType::HalfAscii
            | TransliterationType::HalfAsciiUpper
            | TransliterationType::HalfAsciiLower
            | TransliterationType::HalfAsciiCapitalized
            | TransliterationType::FullAscii
            | TransliterationType::FullAsciiUpper
            | TransliterationType::FullAsciiLower
            | TransliterationType::FullAsciiCapitalized => {
                return utils::to_halfwidth(&asis);
            }
            _ => {}
        }
        let trimmed = self.composition.string_with_trim_mode(TrimMode::Trim);
        let mut output = base_query_for_prediction(asis, trimmed);
        if let Some(transformed) = transform_characters_for_numbers(&output) {
            output = transformed;
        }
        utils::to_halfwidth(&output)
    }

    /// Prediction base plus the expanded readings of the ambiguous tail.
    pub fn queries_for_prediction(&self) -> (String, BTreeSet<String>) {
        match self.input_mode {
            TransliterationType::HalfAscii
            | TransliterationType::HalfAsciiUpper
            | TransliterationType::HalfAsciiLower
            | TransliterationType::HalfAsciiCapitalized
            | TransliterationType::FullAscii
            | TransliterationType::FullAsciiUpper
            | TransliterationType::FullAsciiLower
            | TransliterationType::FullAsciiCapitalized => {
                (self.query_for_prediction(), BTreeSet::new())
            }
            _ => self.composition.expanded_strings(),
        }
    }

    /// Typing-correction queries, best hypothesis first.
    pub fn type_corrected_queries(&self) -> Vec<TypeCorrectedQuery> {
        if !self.config.use_typing_correction {
            return Vec::new();
        }
        self.typing_corrector.queries()
    }

    /// The keystrokes as typed.
    pub fn raw_string(&self) -> String {
        self.composition.string_with_style(ChunkStyle::RawString)
    }

    pub fn raw_sub_string(&self, position: usize, length: usize) -> String {
        let (raw, _) = self.composition.raw_and_converted_in_range(position, length);
        raw
    }

    /// One rendering of the whole composition.
    pub fn transliteration(&self, t13n_type: TransliterationType) -> String {
        self.sub_transliteration(t13n_type, 0, self.composition.len())
    }

    /// All renderings of the whole composition in meta-candidate order.
    pub fn transliterations(&self) -> Vec<String> {
        self.sub_transliterations(0, self.composition.len())
    }

    /// All renderings of a sub-range of the composition.
    pub fn sub_transliterations(&self, position: usize, length: usize) -> Vec<String> {
        let (raw, converted) = self.composition.raw_and_converted_in_range(position, length);
        T13N_TYPES
            .iter()
            .map(|t| t.transform(&t.chunk_style().transliterate(&raw, &converted)))
            .collect()
    }

    pub fn sub_transliteration(
        &self,
        t13n_type: TransliterationType,
        position: usize,
        length: usize,
    ) -> String {
        let (raw, converted) = self.composition.raw_and_converted_in_range(position, length);
        t13n_type.transform(&t13n_type.chunk_style().transliterate(&raw, &converted))
    }

    /// Whether every chunk wants immediate commit (direct-input rules).
    pub fn should_commit(&self) -> bool {
        !self.composition.is_empty() && self.composition.should_commit()
    }

    /// Restricted fields force the head of the composition out: password
    /// fields keep at most one composing character, number and telephone
    /// fields keep none.  Returns the prefix length to commit.
    pub fn should_commit_head(&self) -> Option<usize> {
        let max_remaining = match self.input_field_type {
            InputFieldType::Password => 1,
            InputFieldType::Tel | InputFieldType::Number => 0,
            InputFieldType::Normal => return None,
        };
        let length = self.composition.len();
        if length > max_remaining {
            Some(length - max_remaining)
        } else {
            None
        }
    }

    /// Drop the first `length` characters after they were committed.
    pub fn delete_range_head(&mut self, length: usize) {
        for _ in 0..length {
            if self.composition.is_empty() {
                break;
            }
            self.composition.delete_at(0);
        }
        self.position = self.position.saturating_sub(length);
        self.typing_corrector.invalidate();
    }
}

/// Inside an alphanumeric context the kana long sound mark and punctuation
/// read as the minus sign, comma and period.  Returns None when nothing
/// changes.
fn transform_characters_for_numbers(query: &str) -> Option<String> {
    let chars: Vec<char> = query.chars().collect();
    let has_symbols = chars.iter().any(|c| matches!(c, 'ー' | '、' | '。'));
    let has_alphanumerics = chars
        .iter()
        .any(|c| utils::script_type_of_char(*c) == ScriptType::Number);
    if !has_symbols || !has_alphanumerics {
        return None;
    }

    let is_number =
        |index: usize| -> bool {
            chars
                .get(index)
                .map_or(false, |c| utils::script_type_of_char(*c) == ScriptType::Number)
        };

    let mut transformed = false;
    let mut output = String::with_capacity(query.len());
    for (i, c) in chars.iter().enumerate() {
        let replacement = match c {
            // Long sound mark before or after a digit is a minus sign.
            'ー' if (i == 0 && is_number(1)) || (i > 0 && is_number(i - 1)) => Some('−'),
            '、' if i > 0 && is_number(i - 1) => Some('，'),
            '。' if i > 0 && is_number(i - 1) => Some('．'),
            _ => None,
        };
        match replacement {
            Some(r) => {
                output.push(r);
                transformed = true;
            }
            None => output.push(*c),
        }
    }
    transformed.then_some(output)
}

/// Choose between the as-is and trimmed renderings for the prediction query.
///
/// "かn" should query as "か" (the trailing consonant is still ambiguous)
/// while a fully alphabetic "zk" should query as typed.
fn base_query_for_prediction(asis: String, trimmed: String) -> String {
    if utils::char_len(&asis) == utils::char_len(&trimmed) {
        return asis;
    }
    let asis_tail_is_alphabet = asis
        .chars()
        .last()
        .map_or(false, |c| utils::script_type_of_char(c) == ScriptType::Alphabet);
    if !asis_tail_is_alphabet {
        return asis;
    }
    if trimmed.is_empty() {
        if utils::script_type(&asis) == ScriptType::Alphabet {
            return asis;
        }
        return String::new();
    }
    let trimmed_tail_is_alphabet = trimmed
        .chars()
        .last()
        .map_or(false, |c| utils::script_type_of_char(c) == ScriptType::Alphabet);
    if trimmed_tail_is_alphabet {
        asis
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;

    fn romaji_table() -> Arc<Table> {
        let mut table = Table::new();
        table.add_rule("a", "あ", "");
        table.add_rule("i", "い", "");
        table.add_rule("u", "う", "");
        table.add_rule("ka", "か", "");
        table.add_rule("ki", "き", "");
        table.add_rule("ku", "く", "");
        table.add_rule("n", "ん", "");
        table.add_rule("nn", "ん", "");
        table.add_rule("na", "な", "");
        table.add_rule("ni", "に", "");
        table.add_rule("ss", "っ", "s");
        table.add_rule("sa", "さ", "");
        table.add_rule("to", "と", "");
        table.add_rule("kyo", "きょ", "");
        table.add_rule("-", "ー", "");
        Arc::new(table)
    }

    fn composer() -> Composer {
        Composer::new(romaji_table(), Arc::new(Config::default()))
    }

    fn type_keys(composer: &mut Composer, keys: &str) {
        for c in keys.chars() {
            composer.insert_character_key_event(&KeyEvent::from_char(c));
        }
    }

    #[test]
    fn test_basic_composition() {
        let mut c = composer();
        type_keys(&mut c, "kana");
        assert_eq!(c.string_for_preedit(), "かな");
        assert_eq!(c.position(), 2);
    }

    #[test]
    fn test_trailing_n_queries() {
        let mut c = composer();
        type_keys(&mut c, "kan");
        assert_eq!(c.string_for_preedit(), "かｎ");
        assert_eq!(c.query_for_conversion(), "かん");
        assert_eq!(c.query_for_prediction(), "か");
    }

    #[test]
    fn test_queries_for_prediction_expand_tail() {
        let mut c = composer();
        type_keys(&mut c, "kan");
        let (base, expanded) = c.queries_for_prediction();
        assert_eq!(base, "か");
        assert!(expanded.contains("ん"));
        assert!(expanded.contains("な"));
        assert!(expanded.contains("に"));
    }

    #[test]
    fn test_backspace_and_delete() {
        let mut c = composer();
        type_keys(&mut c, "kana");
        c.backspace();
        assert_eq!(c.string_for_preedit(), "か");
        c.move_cursor_to_beginning();
        c.delete();
        assert!(c.is_empty());
    }

    #[test]
    fn test_shift_enters_temporary_ascii_mode() {
        let mut c = composer();
        c.insert_character_key_event(&KeyEvent::from_char_shifted('G'));
        assert_eq!(c.input_mode(), TransliterationType::HalfAscii);
        c.insert_character_key_event(&KeyEvent::from_char('o'));
        // A single shifted letter keeps composing in ASCII.
        assert_eq!(c.input_mode(), TransliterationType::HalfAscii);
        assert_eq!(c.string_for_preedit(), "Go");
    }

    #[test]
    fn test_lowercase_after_shifted_run_reverts_mode() {
        let mut c = composer();
        c.insert_character_key_event(&KeyEvent::from_char_shifted('H'));
        c.insert_character_key_event(&KeyEvent::from_char_shifted('T'));
        assert_eq!(c.input_mode(), TransliterationType::HalfAscii);
        c.insert_character_key_event(&KeyEvent::from_char('k'));
        assert_eq!(c.input_mode(), TransliterationType::Hiragana);
    }

    #[test]
    fn test_bare_shift_reverts_temporary_mode() {
        let mut c = composer();
        c.insert_character_key_event(&KeyEvent::from_char_shifted('G'));
        assert_eq!(c.input_mode(), TransliterationType::HalfAscii);
        c.insert_character_key_event(&KeyEvent::shift_only());
        assert_eq!(c.input_mode(), TransliterationType::Hiragana);
    }

    #[test]
    fn test_key_string_as_is_keeps_mode() {
        let mut c = composer();
        let key = KeyEvent::from_key_string("ち", InputStyle::AsIs);
        c.insert_character_key_event(&key);
        assert_eq!(c.string_for_preedit(), "ち");
        assert_eq!(c.input_mode(), TransliterationType::Hiragana);
    }

    #[test]
    fn test_transliterations() {
        let mut c = composer();
        type_keys(&mut c, "kana");
        let t13ns = c.transliterations();
        assert_eq!(t13ns[TransliterationType::Hiragana.index()], "かな");
        assert_eq!(t13ns[TransliterationType::FullKatakana.index()], "カナ");
        assert_eq!(t13ns[TransliterationType::HalfAscii.index()], "kana");
        assert_eq!(t13ns[TransliterationType::FullAscii.index()], "ｋａｎａ");
        assert_eq!(
            t13ns[TransliterationType::HalfAsciiCapitalized.index()],
            "Kana"
        );
    }

    #[test]
    fn test_sub_transliterations() {
        let mut c = composer();
        type_keys(&mut c, "kanato");
        let t13ns = c.sub_transliterations(2, 1);
        assert_eq!(t13ns[TransliterationType::Hiragana.index()], "と");
        assert_eq!(t13ns[TransliterationType::HalfAscii.index()], "to");
    }

    #[test]
    fn test_number_context_transform() {
        let mut c = composer();
        c.insert_character_preedit("１２３");
        type_keys(&mut c, "-");
        assert_eq!(c.string_for_preedit(), "１２３−");
    }

    #[test]
    fn test_password_field_commits_head() {
        let mut c = composer();
        c.set_input_field_type(InputFieldType::Password);
        type_keys(&mut c, "kana");
        assert_eq!(c.should_commit_head(), Some(1));
        c.delete_range_head(1);
        assert_eq!(c.string_for_preedit(), "な");
        assert_eq!(c.should_commit_head(), None);
    }

    #[test]
    fn test_cursor_movement_updates_mode() {
        let mut c = composer();
        c.insert_character_key_event(&KeyEvent::from_char_shifted('A'));
        c.insert_character_key_event(&KeyEvent::from_char_shifted('B'));
        assert_eq!(c.input_mode(), TransliterationType::HalfAscii);
        c.move_cursor_to_beginning();
        assert_eq!(c.input_mode(), TransliterationType::Hiragana);
    }

    #[test]
    fn test_edit_erase_keeps_comeback_mode() {
        let mut c = composer();
        c.set_input_mode(TransliterationType::FullKatakana);
        type_keys(&mut c, "ka");
        c.edit_erase();
        assert!(c.is_empty());
        assert_eq!(c.input_mode(), TransliterationType::FullKatakana);
    }

    #[test]
    fn test_max_length_rejects_input() {
        let mut c = composer();
        for _ in 0..MAX_COMPOSITION_LENGTH {
            c.insert_character("a");
        }
        assert_eq!(c.len(), MAX_COMPOSITION_LENGTH);
        c.insert_character("a");
        assert_eq!(c.len(), MAX_COMPOSITION_LENGTH);
    }
}
