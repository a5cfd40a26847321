//! libromaji
//!
//! Romaji-to-kana composition rules for libkana-core.  The crate ships the
//! standard Hepburn and kunrei spellings, sokuon doubling, small-kana
//! escapes and the common punctuation mappings as a ready-made `Table`.

use std::sync::Arc;

use once_cell::sync::Lazy;

use libkana_core::composer::Composer;
use libkana_core::table::Table;
use libkana_core::Config;

/// Plain syllable rules: input to kana, no pending text.
const SYLLABLES: &[(&str, &str)] = &[
    ("a", "あ"),
    ("i", "い"),
    ("u", "う"),
    ("e", "え"),
    ("o", "お"),
    ("ka", "か"),
    ("ki", "き"),
    ("ku", "く"),
    ("ke", "け"),
    ("ko", "こ"),
    ("kya", "きゃ"),
    ("kyu", "きゅ"),
    ("kyo", "きょ"),
    ("sa", "さ"),
    ("si", "し"),
    ("shi", "し"),
    ("su", "す"),
    ("se", "せ"),
    ("so", "そ"),
    ("sha", "しゃ"),
    ("shu", "しゅ"),
    ("sho", "しょ"),
    ("sya", "しゃ"),
    ("syu", "しゅ"),
    ("syo", "しょ"),
    ("ta", "た"),
    ("ti", "ち"),
    ("chi", "ち"),
    ("tu", "つ"),
    ("tsu", "つ"),
    ("te", "て"),
    ("to", "と"),
    ("cha", "ちゃ"),
    ("chu", "ちゅ"),
    ("cho", "ちょ"),
    ("tya", "ちゃ"),
    ("tyu", "ちゅ"),
    ("tyo", "ちょ"),
    ("na", "な"),
    ("ni", "に"),
    ("nu", "ぬ"),
    ("ne", "ね"),
    ("no", "の"),
    ("nya", "にゃ"),
    ("nyu", "にゅ"),
    ("nyo", "にょ"),
    ("ha", "は"),
    ("hi", "ひ"),
    ("hu", "ふ"),
    ("fu", "ふ"),
    ("he", "へ"),
    ("ho", "ほ"),
    ("hya", "ひゃ"),
    ("hyu", "ひゅ"),
    ("hyo", "ひょ"),
    ("fa", "ふぁ"),
    ("fi", "ふぃ"),
    ("fe", "ふぇ"),
    ("fo", "ふぉ"),
    ("ma", "ま"),
    ("mi", "み"),
    ("mu", "む"),
    ("me", "め"),
    ("mo", "も"),
    ("mya", "みゃ"),
    ("myu", "みゅ"),
    ("myo", "みょ"),
    ("ya", "や"),
    ("yu", "ゆ"),
    ("yo", "よ"),
    ("ra", "ら"),
    ("ri", "り"),
    ("ru", "る"),
    ("re", "れ"),
    ("ro", "ろ"),
    ("rya", "りゃ"),
    ("ryu", "りゅ"),
    ("ryo", "りょ"),
    ("wa", "わ"),
    ("wo", "を"),
    ("n", "ん"),
    ("nn", "ん"),
    ("n'", "ん"),
    ("ga", "が"),
    ("gi", "ぎ"),
    ("gu", "ぐ"),
    ("ge", "げ"),
    ("go", "ご"),
    ("gya", "ぎゃ"),
    ("gyu", "ぎゅ"),
    ("gyo", "ぎょ"),
    ("za", "ざ"),
    ("zi", "じ"),
    ("ji", "じ"),
    ("zu", "ず"),
    ("ze", "ぜ"),
    ("zo", "ぞ"),
    ("ja", "じゃ"),
    ("ju", "じゅ"),
    ("jo", "じょ"),
    ("jya", "じゃ"),
    ("jyu", "じゅ"),
    ("jyo", "じょ"),
    ("zya", "じゃ"),
    ("zyu", "じゅ"),
    ("zyo", "じょ"),
    ("da", "だ"),
    ("di", "ぢ"),
    ("du", "づ"),
    ("de", "で"),
    ("do", "ど"),
    ("dya", "ぢゃ"),
    ("dyu", "ぢゅ"),
    ("dyo", "ぢょ"),
    ("ba", "ば"),
    ("bi", "び"),
    ("bu", "ぶ"),
    ("be", "べ"),
    ("bo", "ぼ"),
    ("bya", "びゃ"),
    ("byu", "びゅ"),
    ("byo", "びょ"),
    ("pa", "ぱ"),
    ("pi", "ぴ"),
    ("pu", "ぷ"),
    ("pe", "ぺ"),
    ("po", "ぽ"),
    ("pya", "ぴゃ"),
    ("pyu", "ぴゅ"),
    ("pyo", "ぴょ"),
    ("va", "ゔぁ"),
    ("vi", "ゔぃ"),
    ("vu", "ゔ"),
    ("ve", "ゔぇ"),
    ("vo", "ゔぉ"),
    // Small kana escapes.
    ("xa", "ぁ"),
    ("la", "ぁ"),
    ("xi", "ぃ"),
    ("li", "ぃ"),
    ("xu", "ぅ"),
    ("lu", "ぅ"),
    ("xe", "ぇ"),
    ("le", "ぇ"),
    ("xo", "ぉ"),
    ("lo", "ぉ"),
    ("xya", "ゃ"),
    ("lya", "ゃ"),
    ("xyu", "ゅ"),
    ("lyu", "ゅ"),
    ("xyo", "ょ"),
    ("lyo", "ょ"),
    ("xtu", "っ"),
    ("ltu", "っ"),
    // Punctuation.
    ("-", "ー"),
    (",", "、"),
    (".", "。"),
    ("[", "「"),
    ("]", "」"),
    ("/", "・"),
];

/// Consonants whose doubling produces a sokuon, e.g. `tt` to っ + pending t.
const SOKUON_CONSONANTS: &str = "kstcjhfmyrwgzdbpv";

fn build_table() -> Table {
    let mut table = Table::new();
    for (input, output) in SYLLABLES {
        table.add_rule(input, output, "");
    }
    for c in SOKUON_CONSONANTS.chars() {
        table.add_rule(&format!("{c}{c}"), "っ", &c.to_string());
    }
    table
}

static DEFAULT_TABLE: Lazy<Arc<Table>> = Lazy::new(|| Arc::new(build_table()));

/// The shared default romaji table.
pub fn default_table() -> Arc<Table> {
    Arc::clone(&DEFAULT_TABLE)
}

/// A composer wired to the default romaji table.
pub fn new_composer(config: Arc<Config>) -> Composer {
    Composer::new(default_table(), config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_basic_rows() {
        let table = default_table();
        assert_eq!(table.lookup("ka").map(|e| e.result()), Some("か"));
        assert_eq!(table.lookup("kya").map(|e| e.result()), Some("きゃ"));
        assert_eq!(table.lookup("shi").map(|e| e.result()), Some("し"));
        assert_eq!(table.lookup("tt").map(|e| e.pending()), Some("t"));
        assert_eq!(table.lookup("-").map(|e| e.result()), Some("ー"));
    }
}
