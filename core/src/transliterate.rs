//! Transliteration types and per-chunk rendering styles.
//!
//! Every composition chunk carries a `ChunkStyle` describing how its raw and
//! converted text are turned into display text.  `TransliterationType` is the
//! user-visible axis: eleven script/case renderings derived from the same
//! composition, used for the transliteration meta candidates.

use crate::utils;

/// User-visible transliteration of the whole composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransliterationType {
    Hiragana,
    FullKatakana,
    HalfAscii,
    FullAscii,
    HalfKatakana,
    HalfAsciiUpper,
    HalfAsciiLower,
    HalfAsciiCapitalized,
    FullAsciiUpper,
    FullAsciiLower,
    FullAsciiCapitalized,
}

/// All transliteration types in meta-candidate order.
pub const T13N_TYPES: [TransliterationType; 11] = [
    TransliterationType::Hiragana,
    TransliterationType::FullKatakana,
    TransliterationType::HalfAscii,
    TransliterationType::FullAscii,
    TransliterationType::HalfKatakana,
    TransliterationType::HalfAsciiUpper,
    TransliterationType::HalfAsciiLower,
    TransliterationType::HalfAsciiCapitalized,
    TransliterationType::FullAsciiUpper,
    TransliterationType::FullAsciiLower,
    TransliterationType::FullAsciiCapitalized,
];

impl TransliterationType {
    /// Index within [`T13N_TYPES`].
    pub fn index(self) -> usize {
        T13N_TYPES.iter().position(|t| *t == self).unwrap_or(0)
    }

    /// The chunk rendering style this transliteration reads from.
    pub fn chunk_style(self) -> ChunkStyle {
        match self {
            TransliterationType::Hiragana => ChunkStyle::Hiragana,
            TransliterationType::FullKatakana => ChunkStyle::FullKatakana,
            TransliterationType::HalfKatakana => ChunkStyle::HalfKatakana,
            TransliterationType::HalfAscii
            | TransliterationType::HalfAsciiUpper
            | TransliterationType::HalfAsciiLower
            | TransliterationType::HalfAsciiCapitalized => ChunkStyle::HalfAscii,
            TransliterationType::FullAscii
            | TransliterationType::FullAsciiUpper
            | TransliterationType::FullAsciiLower
            | TransliterationType::FullAsciiCapitalized => ChunkStyle::FullAscii,
        }
    }

    /// The plain transliteration reading from a chunk style, if any.
    pub fn from_chunk_style(style: ChunkStyle) -> Option<Self> {
        match style {
            ChunkStyle::Hiragana => Some(TransliterationType::Hiragana),
            ChunkStyle::FullKatakana => Some(TransliterationType::FullKatakana),
            ChunkStyle::HalfKatakana => Some(TransliterationType::HalfKatakana),
            ChunkStyle::HalfAscii => Some(TransliterationType::HalfAscii),
            ChunkStyle::FullAscii => Some(TransliterationType::FullAscii),
            ChunkStyle::ConversionString | ChunkStyle::RawString => None,
        }
    }

    /// Final width/case transform applied to a chunk-style rendering.
    pub fn transform(self, input: &str) -> String {
        match self {
            TransliterationType::Hiragana => input.to_string(),
            TransliterationType::FullKatakana => utils::hiragana_to_katakana(input),
            TransliterationType::HalfKatakana => {
                utils::katakana_to_halfwidth(&utils::hiragana_to_katakana(input))
            }
            TransliterationType::HalfAscii => utils::to_halfwidth(input),
            TransliterationType::HalfAsciiUpper => utils::to_uppercase(&utils::to_halfwidth(input)),
            TransliterationType::HalfAsciiLower => utils::to_lowercase(&utils::to_halfwidth(input)),
            TransliterationType::HalfAsciiCapitalized => {
                utils::capitalize(&utils::to_halfwidth(input))
            }
            TransliterationType::FullAscii => utils::to_fullwidth(input),
            TransliterationType::FullAsciiUpper => utils::to_fullwidth(&utils::to_uppercase(input)),
            TransliterationType::FullAsciiLower => utils::to_fullwidth(&utils::to_lowercase(input)),
            TransliterationType::FullAsciiCapitalized => {
                utils::to_fullwidth(&utils::capitalize(input))
            }
        }
    }
}

/// How one chunk renders its raw keystrokes and converted text.
///
/// Raw-based styles read the original keystrokes; the others read the
/// converted text.  There is no `Local` variant here: call sites that want
/// "whatever the chunk was typed in" pass `None` for the style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStyle {
    /// The converted text verbatim (pre-converted input, kana typing).
    ConversionString,
    /// The raw keystrokes verbatim.
    RawString,
    Hiragana,
    FullKatakana,
    HalfKatakana,
    HalfAscii,
    FullAscii,
}

impl ChunkStyle {
    /// Whether this style renders from the raw keystrokes.
    pub fn reads_raw(self) -> bool {
        matches!(
            self,
            ChunkStyle::RawString | ChunkStyle::HalfAscii | ChunkStyle::FullAscii
        )
    }

    /// Render a chunk's text in this style.
    pub fn transliterate(self, raw: &str, converted: &str) -> String {
        match self {
            ChunkStyle::ConversionString => converted.to_string(),
            ChunkStyle::RawString => raw.to_string(),
            // Display styles render pending ASCII residue in matching width.
            ChunkStyle::Hiragana => utils::to_fullwidth(converted),
            ChunkStyle::FullKatakana => {
                utils::to_fullwidth(&utils::hiragana_to_katakana(converted))
            }
            ChunkStyle::HalfKatakana => {
                utils::katakana_to_halfwidth(&utils::hiragana_to_katakana(
                    &utils::to_halfwidth(converted),
                ))
            }
            ChunkStyle::HalfAscii => utils::to_halfwidth(raw),
            ChunkStyle::FullAscii => utils::to_fullwidth(raw),
        }
    }

    /// Split a chunk's text at a character position of this style's
    /// rendering.  Returns `(raw_lhs, raw_rhs, converted_lhs, converted_rhs)`.
    ///
    /// Raw-based styles split the raw keystrokes and mirror that into the
    /// converted halves; the others split the converted text.  Either way the
    /// halves lose the raw/converted distinction, which is acceptable because
    /// split chunks are only ever rendered, never re-matched.
    pub fn split(
        self,
        position: usize,
        raw: &str,
        converted: &str,
    ) -> (String, String, String, String) {
        let source = if self.reads_raw() { raw } else { converted };
        let lhs = utils::char_substring(source, 0, position);
        let rhs = utils::char_suffix(source, position);
        (lhs.clone(), rhs.clone(), lhs, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_order_is_stable() {
        assert_eq!(T13N_TYPES[0], TransliterationType::Hiragana);
        assert_eq!(TransliterationType::HalfKatakana.index(), 4);
        assert_eq!(T13N_TYPES.len(), 11);
    }

    #[test]
    fn test_transforms() {
        assert_eq!(TransliterationType::FullKatakana.transform("かな"), "カナ");
        assert_eq!(TransliterationType::HalfAsciiUpper.transform("kana"), "KANA");
        assert_eq!(
            TransliterationType::FullAsciiCapitalized.transform("kana"),
            "Ｋａｎａ"
        );
        assert_eq!(TransliterationType::HalfKatakana.transform("だんぼ"), "ﾀﾞﾝﾎﾞ");
    }

    #[test]
    fn test_chunk_style_rendering() {
        assert_eq!(ChunkStyle::Hiragana.transliterate("ssh", "[X]sh"), "［Ｘ］ｓｈ");
        assert_eq!(ChunkStyle::HalfAscii.transliterate("Kana", "かな"), "Kana");
        assert_eq!(ChunkStyle::FullAscii.transliterate("Kana", "かな"), "Ｋａｎａ");
        assert_eq!(
            ChunkStyle::FullKatakana.transliterate("kana", "かな"),
            "カナ"
        );
    }

    #[test]
    fn test_split_converted_style() {
        let (raw_lhs, raw_rhs, conv_lhs, conv_rhs) =
            ChunkStyle::Hiragana.split(1, "kyo", "きょ");
        assert_eq!(conv_lhs, "き");
        assert_eq!(conv_rhs, "ょ");
        assert_eq!(raw_lhs, "き");
        assert_eq!(raw_rhs, "ょ");
    }

    #[test]
    fn test_split_raw_style() {
        let (raw_lhs, raw_rhs, _, _) = ChunkStyle::HalfAscii.split(2, "abc", "あbc");
        assert_eq!(raw_lhs, "ab");
        assert_eq!(raw_rhs, "c");
    }
}
