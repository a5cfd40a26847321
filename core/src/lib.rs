//! libkana-core
//!
//! Composition and conversion-session logic shared by input scheme crates
//! (libromaji and friends).
//!
//! The crate is split along the data flow: a `Table` maps key sequences to
//! script output, a `Composer` maintains the in-progress composition built
//! from those rules, and a `SessionConverter` drives the conversion state
//! machine against a dictionary engine hidden behind the `Converter` trait.
//!
//! Public API:
//! - `Table` / `Entry` - longest-prefix rule store with per-rule attributes
//! - `Composer` - composition buffer, cursor and input mode tracking
//! - `Segments` / `Segment` / `Candidate` - conversion results
//! - `Converter` - capability trait over the dictionary engine
//! - `CandidateList` - paged, id-stable candidate view
//! - `SessionConverter` - COMPOSITION/SUGGESTION/PREDICTION/CONVERSION states
//! - `Config` - configuration and feature flags
use serde::{Deserialize, Serialize};

pub mod table;
pub use table::{Entry, Table, TableAttributes};

pub mod transliterate;
pub use transliterate::{ChunkStyle, TransliterationType, T13N_TYPES};

pub mod chunk;
pub use chunk::Chunk;

pub mod composition;
pub use composition::{Composition, CompositionInput, TrimMode};

pub mod key_event;
pub use key_event::{InputStyle, KeyEvent, ProbableKeyEvent};

pub mod correction;
pub use correction::{TypeCorrectedQuery, TypingCorrector};

pub mod composer;
pub use composer::{Composer, InputFieldType};

pub mod segments;
pub use segments::{
    Candidate, CandidateAttributes, CandidateCommand, CandidateIndex, Segment, SegmentType,
    Segments, SegmentsRequestType,
};

pub mod converter;
pub use converter::{ConversionRequest, Converter, MockConverter};

pub mod candidate_list;
pub use candidate_list::{CandidateList, StyleAttributes};

pub mod output;
pub use output::{CandidateWindow, CommitResult, Output, Preedit};

pub mod settings;
pub use settings::Settings;

pub mod stats;
pub use stats::UsageStats;

pub mod session_converter;
pub use session_converter::{InputContext, SessionConverter, SessionState, CONSUMED_ALL_CHARACTERS};

/// Behavior of a run of shifted alphabetic keys while composing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ShiftKeyModeSwitch {
    /// Shifted keys never change the input mode.
    Off,
    /// Shifted keys switch to temporary half-width ASCII input.
    AsciiInputMode,
    /// Shifted keys switch to temporary katakana input.
    KatakanaInputMode,
}

/// Generic configuration for the composition and session layers.
///
/// Input-scheme specific options (rule tables, key layouts) belong in the
/// scheme crates; everything here is scheme-agnostic.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// How a run of shifted alphabetic keys affects the input mode.
    pub shift_key_mode_switch: ShiftKeyModeSwitch,

    /// Adopt the input mode of the text left of the cursor after cursor
    /// movement.  When disabled the mode stays at its last explicitly set
    /// value regardless of cursor position.
    pub update_input_mode_from_surrounding_text: bool,

    /// Track probable-key hypotheses and offer corrected prediction queries.
    pub use_typing_correction: bool,

    /// Group remaining transliterations into a nested sub candidate list
    /// instead of flattening every variant into the top level.
    pub use_cascading_window: bool,

    /// Query the dictionary engine while composing (suggestion state).
    pub use_dictionary_suggest: bool,

    /// Allow suggestions that consume only a prefix of the composition.
    pub allow_auto_partial_suggestion: bool,

    /// Number of candidates per page.
    pub candidate_page_size: usize,

    /// Keys for selecting candidates within a page
    /// (default: "123456789", alternative: "asdfghjkl").
    pub select_keys: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shift_key_mode_switch: ShiftKeyModeSwitch::AsciiInputMode,
            update_input_mode_from_surrounding_text: true,
            use_typing_correction: false,
            use_cascading_window: true,
            use_dictionary_suggest: true,
            allow_auto_partial_suggestion: false,
            candidate_page_size: 9,
            select_keys: "123456789".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Set the selection keys string.  Empty strings are ignored.
    pub fn set_select_keys(&mut self, keys: &str) {
        if !keys.is_empty() {
            self.select_keys = keys.to_string();
        }
    }

    /// Check if a character is a selection key and return its index (0-based).
    pub fn selection_key_index(&self, ch: char) -> Option<usize> {
        self.select_keys.chars().position(|c| c == ch)
    }
}

/// Utility helpers for script classification and width conversion.
pub mod utils {
    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }

    /// Convert ASCII characters to full-width equivalents.
    ///
    /// Non-ASCII characters are passed through unchanged.
    pub fn to_fullwidth(s: &str) -> String {
        s.chars()
            .map(|ch| match ch {
                ' ' => '\u{3000}',
                // ASCII printable range (0x21-0x7E) -> full-width (0xFF01-0xFF5E)
                '!'..='~' => {
                    let code = ch as u32;
                    char::from_u32(code - 0x21 + 0xFF01).unwrap_or(ch)
                }
                _ => ch,
            })
            .collect()
    }

    /// Convert full-width characters back to ASCII (half-width).
    pub fn to_halfwidth(s: &str) -> String {
        s.chars()
            .map(|ch| match ch {
                '\u{3000}' => ' ',
                '\u{FF01}'..='\u{FF5E}' => {
                    let code = ch as u32;
                    char::from_u32(code - 0xFF01 + 0x21).unwrap_or(ch)
                }
                _ => ch,
            })
            .collect()
    }

    /// Convert hiragana to full-width katakana.  Other characters are passed
    /// through unchanged.
    pub fn hiragana_to_katakana(s: &str) -> String {
        s.chars()
            .map(|ch| match ch {
                // ぁ (U+3041) ..= ゖ (U+3096) -> ァ (U+30A1) ..= ヶ (U+30F6)
                '\u{3041}'..='\u{3096}' => {
                    let code = ch as u32;
                    char::from_u32(code + 0x60).unwrap_or(ch)
                }
                '\u{309D}' => '\u{30FD}', // ゝ -> ヽ
                '\u{309E}' => '\u{30FE}', // ゞ -> ヾ
                _ => ch,
            })
            .collect()
    }

    /// Convert full-width katakana to hiragana.
    pub fn katakana_to_hiragana(s: &str) -> String {
        s.chars()
            .map(|ch| match ch {
                '\u{30A1}'..='\u{30F6}' => {
                    let code = ch as u32;
                    char::from_u32(code - 0x60).unwrap_or(ch)
                }
                '\u{30FD}' => '\u{309D}',
                '\u{30FE}' => '\u{309E}',
                _ => ch,
            })
            .collect()
    }

    /// Convert full-width katakana (and full-width ASCII) to the half-width
    /// form.  Voiced and semi-voiced kana decompose into a base letter plus a
    /// combining mark, so the result may be longer than the input.
    pub fn katakana_to_halfwidth(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for ch in s.chars() {
            match halfwidth_katakana(ch) {
                Some(half) => out.push_str(half),
                None => out.push_str(&to_halfwidth(&ch.to_string())),
            }
        }
        out
    }

    fn halfwidth_katakana(ch: char) -> Option<&'static str> {
        let half = match ch {
            'ァ' => "ｧ",
            'ア' => "ｱ",
            'ィ' => "ｨ",
            'イ' => "ｲ",
            'ゥ' => "ｩ",
            'ウ' => "ｳ",
            'ェ' => "ｪ",
            'エ' => "ｴ",
            'ォ' => "ｫ",
            'オ' => "ｵ",
            'カ' => "ｶ",
            'ガ' => "ｶﾞ",
            'キ' => "ｷ",
            'ギ' => "ｷﾞ",
            'ク' => "ｸ",
            'グ' => "ｸﾞ",
            'ケ' => "ｹ",
            'ゲ' => "ｹﾞ",
            'コ' => "ｺ",
            'ゴ' => "ｺﾞ",
            'サ' => "ｻ",
            'ザ' => "ｻﾞ",
            'シ' => "ｼ",
            'ジ' => "ｼﾞ",
            'ス' => "ｽ",
            'ズ' => "ｽﾞ",
            'セ' => "ｾ",
            'ゼ' => "ｾﾞ",
            'ソ' => "ｿ",
            'ゾ' => "ｿﾞ",
            'タ' => "ﾀ",
            'ダ' => "ﾀﾞ",
            'チ' => "ﾁ",
            'ヂ' => "ﾁﾞ",
            'ッ' => "ｯ",
            'ツ' => "ﾂ",
            'ヅ' => "ﾂﾞ",
            'テ' => "ﾃ",
            'デ' => "ﾃﾞ",
            'ト' => "ﾄ",
            'ド' => "ﾄﾞ",
            'ナ' => "ﾅ",
            'ニ' => "ﾆ",
            'ヌ' => "ﾇ",
            'ネ' => "ﾈ",
            'ノ' => "ﾉ",
            'ハ' => "ﾊ",
            'バ' => "ﾊﾞ",
            'パ' => "ﾊﾟ",
            'ヒ' => "ﾋ",
            'ビ' => "ﾋﾞ",
            'ピ' => "ﾋﾟ",
            'フ' => "ﾌ",
            'ブ' => "ﾌﾞ",
            'プ' => "ﾌﾟ",
            'ヘ' => "ﾍ",
            'ベ' => "ﾍﾞ",
            'ペ' => "ﾍﾟ",
            'ホ' => "ﾎ",
            'ボ' => "ﾎﾞ",
            'ポ' => "ﾎﾟ",
            'マ' => "ﾏ",
            'ミ' => "ﾐ",
            'ム' => "ﾑ",
            'メ' => "ﾒ",
            'モ' => "ﾓ",
            'ャ' => "ｬ",
            'ヤ' => "ﾔ",
            'ュ' => "ｭ",
            'ユ' => "ﾕ",
            'ョ' => "ｮ",
            'ヨ' => "ﾖ",
            'ラ' => "ﾗ",
            'リ' => "ﾘ",
            'ル' => "ﾙ",
            'レ' => "ﾚ",
            'ロ' => "ﾛ",
            'ワ' => "ﾜ",
            'ヲ' => "ｦ",
            'ン' => "ﾝ",
            'ヴ' => "ｳﾞ",
            'ー' => "ｰ",
            '。' => "｡",
            '、' => "､",
            '「' => "｢",
            '」' => "｣",
            '・' => "･",
            '゛' => "ﾞ",
            '゜' => "ﾟ",
            '　' => " ",
            _ => return None,
        };
        Some(half)
    }

    /// Uppercase the ASCII letters of `s`, full-width letters included.
    pub fn to_uppercase(s: &str) -> String {
        map_ascii_case(s, |c| c.to_ascii_uppercase())
    }

    /// Lowercase the ASCII letters of `s`, full-width letters included.
    pub fn to_lowercase(s: &str) -> String {
        map_ascii_case(s, |c| c.to_ascii_lowercase())
    }

    /// Uppercase the first letter and lowercase the rest.
    pub fn capitalize(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for (i, ch) in to_lowercase(s).chars().enumerate() {
            if i == 0 {
                out.push_str(&to_uppercase(&ch.to_string()));
            } else {
                out.push(ch);
            }
        }
        out
    }

    fn map_ascii_case(s: &str, f: impl Fn(char) -> char) -> String {
        s.chars()
            .map(|ch| match ch {
                'a'..='z' | 'A'..='Z' => f(ch),
                // Full-width letters go through the half-width form.
                '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}' => {
                    let half = char::from_u32(ch as u32 - 0xFF01 + 0x21).unwrap_or(ch);
                    char::from_u32(f(half) as u32 - 0x21 + 0xFF01).unwrap_or(ch)
                }
                _ => ch,
            })
            .collect()
    }

    /// Rough script classification used for prediction-query trimming and
    /// number-context symbol transforms.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ScriptType {
        Alphabet,
        Number,
        Hiragana,
        Katakana,
        Other,
    }

    /// Classify a single character.
    pub fn script_type_of_char(ch: char) -> ScriptType {
        match ch {
            'a'..='z' | 'A'..='Z' | '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}' => {
                ScriptType::Alphabet
            }
            '0'..='9' | '\u{FF10}'..='\u{FF19}' => ScriptType::Number,
            '\u{3041}'..='\u{309F}' => ScriptType::Hiragana,
            '\u{30A0}'..='\u{30FF}' | '\u{FF66}'..='\u{FF9F}' => ScriptType::Katakana,
            _ => ScriptType::Other,
        }
    }

    /// Classify a string.  Returns `Other` for empty or mixed-script input.
    pub fn script_type(s: &str) -> ScriptType {
        let mut chars = s.chars();
        let first = match chars.next() {
            Some(ch) => script_type_of_char(ch),
            None => return ScriptType::Other,
        };
        for ch in chars {
            if script_type_of_char(ch) != first {
                return ScriptType::Other;
            }
        }
        first
    }

    /// Number of characters in `s`.
    pub fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    /// Substring by character offsets, clamped to the string length.
    pub fn char_substring(s: &str, position: usize, length: usize) -> String {
        s.chars().skip(position).take(length).collect()
    }

    /// Suffix starting at a character offset.
    pub fn char_suffix(s: &str, position: usize) -> String {
        s.chars().skip(position).collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.shift_key_mode_switch, ShiftKeyModeSwitch::AsciiInputMode);
        assert!(config.update_input_mode_from_surrounding_text);
        assert_eq!(config.candidate_page_size, 9);
        assert_eq!(config.selection_key_index('1'), Some(0));
        assert_eq!(config.selection_key_index('0'), None);
    }

    #[test]
    fn test_config_toml_round_trip() {
        let mut config = Config::default();
        config.set_select_keys("asdfghjkl");
        config.use_typing_correction = true;
        let text = config.to_toml_string().unwrap();
        let loaded = Config::from_toml_str(&text).unwrap();
        assert_eq!(loaded.select_keys, "asdfghjkl");
        assert!(loaded.use_typing_correction);
    }
}
