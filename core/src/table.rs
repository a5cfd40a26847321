//! Rule table for key-sequence to script conversion.
//!
//! Rules map an input key sequence to a committed output plus a pending
//! residue, with optional attributes controlling chunking and commit
//! behavior.  Lookup during composition always takes the longest matching
//! prefix of the pending buffer; the `fixed` flag reports whether longer
//! rules sharing that prefix still exist, which is what keeps ambiguous
//! sequences (a lone "n") in the pending state.

use crate::utils;
use ahash::AHashMap;
use anyhow::{bail, Result};

/// Per-rule attribute bitset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableAttributes(u8);

impl TableAttributes {
    pub const NONE: TableAttributes = TableAttributes(0);
    /// The matched text starts a fresh chunk instead of extending one.
    pub const NEW_CHUNK: TableAttributes = TableAttributes(1);
    /// Suppress parallel transliteration generation for the chunk.
    pub const NO_TRANSLITERATION: TableAttributes = TableAttributes(1 << 1);
    /// The chunk should be committed immediately, bypassing conversion.
    pub const DIRECT_INPUT: TableAttributes = TableAttributes(1 << 2);
    /// No further input may extend the chunk once this rule applied.
    pub const END_CHUNK: TableAttributes = TableAttributes(1 << 3);

    pub fn contains(self, other: TableAttributes) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for TableAttributes {
    type Output = TableAttributes;
    fn bitor(self, rhs: TableAttributes) -> TableAttributes {
        TableAttributes(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for TableAttributes {
    fn bitor_assign(&mut self, rhs: TableAttributes) {
        self.0 |= rhs.0;
    }
}

/// One conversion rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    input: String,
    result: String,
    pending: String,
    attributes: TableAttributes,
}

impl Entry {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn attributes(&self) -> TableAttributes {
        self.attributes
    }
}

#[derive(Debug, Default)]
struct TrieNode {
    children: AHashMap<char, TrieNode>,
    entry: Option<usize>,
}

impl TrieNode {
    fn insert(&mut self, key: &str, entry_index: usize) {
        let mut node = self;
        for ch in key.chars() {
            node = node.children.entry(ch).or_default();
        }
        node.entry = Some(entry_index);
    }
}

/// Longest-prefix rule store.
///
/// Lookups are case-insensitive until a rule containing an upper-case ASCII
/// letter is added, at which point the whole table turns case-sensitive.
#[derive(Debug, Default)]
pub struct Table {
    entries: Vec<Entry>,
    root: TrieNode,
    // Inputs of NEW_CHUNK rules, kept apart so chunk-boundary checks can
    // consult them without affecting in-chunk lookup order.
    new_chunk_root: TrieNode,
    case_sensitive: bool,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a rule without attributes.
    pub fn add_rule(&mut self, input: &str, result: &str, pending: &str) {
        self.add_rule_with_attributes(input, result, pending, TableAttributes::NONE);
    }

    /// Insert a rule.  Rules whose pending text loops back into themselves
    /// are dropped, since they would never terminate the match loop.
    pub fn add_rule_with_attributes(
        &mut self,
        input: &str,
        result: &str,
        pending: &str,
        attributes: TableAttributes,
    ) {
        if input.is_empty() {
            return;
        }
        if self.is_looping_entry(input, pending) {
            tracing::warn!(input, pending, "dropping looping rule");
            return;
        }

        if attributes.contains(TableAttributes::NEW_CHUNK) {
            self.new_chunk_root.insert(&input.to_lowercase(), 0);
        }

        if !self.case_sensitive && input.chars().any(|c| c.is_ascii_uppercase()) {
            self.case_sensitive = true;
        }

        let stored_key = self.normalize_key(input);
        let index = self.entries.len();
        self.entries.push(Entry {
            input: input.to_string(),
            result: result.to_string(),
            pending: pending.to_string(),
            attributes,
        });
        self.root.insert(&stored_key, index);
    }

    fn normalize_key(&self, input: &str) -> String {
        if self.case_sensitive {
            input.to_string()
        } else {
            input.to_lowercase()
        }
    }

    fn is_looping_entry(&self, input: &str, pending: &str) -> bool {
        if input.is_empty() || pending.is_empty() {
            return false;
        }
        let mut key = pending.to_string();
        let mut guard = 0;
        while !key.is_empty() {
            if key.starts_with(input) {
                return true;
            }
            let (entry, key_length, _) = self.lookup_prefix(&key);
            let entry = match entry {
                Some(e) => e,
                None => return false,
            };
            key = format!("{}{}", entry.pending(), utils::char_suffix(&key, key_length));
            guard += 1;
            if guard > 64 {
                return true;
            }
        }
        false
    }

    /// Exact-match lookup.
    pub fn lookup(&self, input: &str) -> Option<&Entry> {
        let key = self.normalize_key(input);
        let mut node = &self.root;
        for ch in key.chars() {
            node = node.children.get(&ch)?;
        }
        node.entry.map(|i| &self.entries[i])
    }

    /// Longest-prefix lookup.
    ///
    /// Returns the entry for the longest rule that is a prefix of `input`
    /// (if any), the matched length in characters (or, with no entry, how
    /// far the input followed an existing rule path), and whether the match
    /// can no longer be extended by further input.
    pub fn lookup_prefix(&self, input: &str) -> (Option<&Entry>, usize, bool) {
        let key = self.normalize_key(input);
        let mut node = &self.root;
        let mut consumed = 0;
        let mut last_entry: Option<usize> = None;
        let mut last_entry_len = 0;
        let mut ended_early = false;
        for ch in key.chars() {
            match node.children.get(&ch) {
                Some(next) => {
                    node = next;
                    consumed += 1;
                    if let Some(index) = next.entry {
                        last_entry = Some(index);
                        last_entry_len = consumed;
                    }
                }
                None => {
                    ended_early = true;
                    break;
                }
            }
        }
        let fixed = if ended_early {
            true
        } else {
            node.children.is_empty()
        };
        let key_length = if last_entry.is_some() {
            last_entry_len
        } else {
            consumed
        };
        (last_entry.map(|i| &self.entries[i]), key_length, fixed)
    }

    /// All entries whose input starts with `input`.
    pub fn lookup_predictive_all(&self, input: &str) -> Vec<&Entry> {
        let key = self.normalize_key(input);
        let mut node = &self.root;
        for ch in key.chars() {
            match node.children.get(&ch) {
                Some(next) => node = next,
                None => return Vec::new(),
            }
        }
        let mut results = Vec::new();
        collect_entries(node, &self.entries, &mut results);
        results
    }

    /// Whether some NEW_CHUNK rule's input is a prefix of `input`.
    pub fn has_new_chunk_entry(&self, input: &str) -> bool {
        if input.is_empty() {
            return false;
        }
        let mut node = &self.new_chunk_root;
        for ch in input.to_lowercase().chars() {
            match node.children.get(&ch) {
                Some(next) => {
                    node = next;
                    if node.entry.is_some() {
                        return true;
                    }
                }
                None => return false,
            }
        }
        false
    }

    /// Whether any rule starts with `input`.
    pub fn has_sub_rules(&self, input: &str) -> bool {
        let key = self.normalize_key(input);
        let mut node = &self.root;
        for ch in key.chars() {
            match node.children.get(&ch) {
                Some(next) => node = next,
                None => return false,
            }
        }
        node.entry.is_some() || !node.children.is_empty()
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
    }

    /// Load rules from tab-separated text:
    /// `input<TAB>result[<TAB>pending[<TAB>attributes]]`.
    ///
    /// Attributes are space-separated names: `NewChunk`, `NoTransliteration`,
    /// `DirectInput`, `EndChunk`.  Lines starting with `#` are comments.
    /// Malformed lines are rejected here so keystroke-time lookup stays
    /// total.
    pub fn load_from_str(&mut self, text: &str) -> Result<()> {
        for (number, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            match fields.as_slice() {
                [input, result] => self.add_rule(&utils::normalize(input), result, ""),
                [input, result, pending] => {
                    self.add_rule(&utils::normalize(input), result, pending)
                }
                [input, result, pending, attributes] => {
                    let attributes = parse_attributes(attributes)
                        .map_err(|e| e.context(format!("line {}", number + 1)))?;
                    self.add_rule_with_attributes(
                        &utils::normalize(input),
                        result,
                        pending,
                        attributes,
                    );
                }
                _ => bail!("line {}: expected 2-4 tab-separated fields", number + 1),
            }
        }
        Ok(())
    }
}

fn collect_entries<'a>(node: &TrieNode, entries: &'a [Entry], out: &mut Vec<&'a Entry>) {
    if let Some(index) = node.entry {
        out.push(&entries[index]);
    }
    for child in node.children.values() {
        collect_entries(child, entries, out);
    }
}

fn parse_attributes(text: &str) -> Result<TableAttributes> {
    let mut attributes = TableAttributes::NONE;
    for name in text.split(' ').filter(|s| !s.is_empty()) {
        attributes |= match name {
            "NewChunk" => TableAttributes::NEW_CHUNK,
            "NoTransliteration" => TableAttributes::NO_TRANSLITERATION,
            "DirectInput" => TableAttributes::DIRECT_INPUT,
            "EndChunk" => TableAttributes::END_CHUNK,
            other => bail!("unknown rule attribute {:?}", other),
        };
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_table() -> Table {
        let mut table = Table::new();
        table.add_rule("a", "あ", "");
        table.add_rule("n", "ん", "");
        table.add_rule("nn", "ん", "");
        table.add_rule("na", "な", "");
        table.add_rule("ka", "か", "");
        table.add_rule("ss", "っ", "s");
        table.add_rule("sha", "しゃ", "");
        table
    }

    #[test]
    fn test_exact_lookup() {
        let table = test_table();
        assert_eq!(table.lookup("ka").unwrap().result(), "か");
        assert!(table.lookup("k").is_none());
        assert!(table.lookup("xyz").is_none());
    }

    #[test]
    fn test_prefix_lookup_fixed() {
        let table = test_table();
        let (entry, len, fixed) = table.lookup_prefix("ka");
        assert_eq!(entry.unwrap().result(), "か");
        assert_eq!(len, 2);
        assert!(fixed);
    }

    #[test]
    fn test_prefix_lookup_ambiguous() {
        let table = test_table();
        // "n" matches but "na"/"nn" could still follow.
        let (entry, len, fixed) = table.lookup_prefix("n");
        assert_eq!(entry.unwrap().result(), "ん");
        assert_eq!(len, 1);
        assert!(!fixed);
    }

    #[test]
    fn test_prefix_lookup_no_entry() {
        let table = test_table();
        // "s" follows a rule path but no rule ends there.
        let (entry, len, fixed) = table.lookup_prefix("s");
        assert!(entry.is_none());
        assert_eq!(len, 1);
        assert!(!fixed);

        let (entry, len, _) = table.lookup_prefix("q");
        assert!(entry.is_none());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_prefix_lookup_longest_wins() {
        let table = test_table();
        let (entry, len, _) = table.lookup_prefix("nna");
        assert_eq!(entry.unwrap().input(), "nn");
        assert_eq!(len, 2);
    }

    #[test]
    fn test_pending_rule() {
        let table = test_table();
        let (entry, len, fixed) = table.lookup_prefix("ss");
        let entry = entry.unwrap();
        assert_eq!(entry.result(), "っ");
        assert_eq!(entry.pending(), "s");
        assert_eq!(len, 2);
        assert!(fixed);
    }

    #[test]
    fn test_case_insensitive_until_uppercase_rule() {
        let mut table = test_table();
        assert!(!table.case_sensitive());
        assert_eq!(table.lookup("KA").unwrap().result(), "か");
        table.add_rule("Z", "ゼット", "");
        assert!(table.case_sensitive());
        assert!(table.lookup("KA").is_none());
    }

    #[test]
    fn test_new_chunk_entry() {
        let mut table = test_table();
        table.add_rule_with_attributes("@", "@", "", TableAttributes::NEW_CHUNK);
        assert!(table.has_new_chunk_entry("@"));
        assert!(table.has_new_chunk_entry("@x"));
        assert!(!table.has_new_chunk_entry("a"));
        // The rule itself still resolves through normal lookup.
        assert_eq!(table.lookup("@").unwrap().result(), "@");
    }

    #[test]
    fn test_has_sub_rules() {
        let table = test_table();
        assert!(table.has_sub_rules("s"));
        assert!(table.has_sub_rules("sh"));
        assert!(table.has_sub_rules("ka"));
        assert!(!table.has_sub_rules("q"));
    }

    #[test]
    fn test_looping_rule_rejected() {
        let mut table = Table::new();
        table.add_rule("a", "", "a");
        assert!(table.lookup("a").is_none());

        table.add_rule("b", "", "c");
        table.add_rule("c", "", "b");
        // "c" -> "b" -> "c" loops through the earlier rule.
        assert!(table.lookup("c").is_none());
    }

    #[test]
    fn test_load_from_str() {
        let mut table = Table::new();
        table
            .load_from_str("a\tあ\n# comment\nss\tっ\ts\nq\tq\t\tDirectInput NoTransliteration\n")
            .unwrap();
        assert_eq!(table.lookup("a").unwrap().result(), "あ");
        assert_eq!(table.lookup("ss").unwrap().pending(), "s");
        let entry = table.lookup("q").unwrap();
        assert!(entry.attributes().contains(TableAttributes::DIRECT_INPUT));
        assert!(entry
            .attributes()
            .contains(TableAttributes::NO_TRANSLITERATION));
    }

    #[test]
    fn test_load_rejects_bad_attribute() {
        let mut table = Table::new();
        assert!(table.load_from_str("a\tあ\t\tBogus\n").is_err());
    }

    #[test]
    fn test_lookup_predictive_all() {
        let table = test_table();
        let results = table.lookup_predictive_all("n");
        assert_eq!(results.len(), 3);
        assert!(table.lookup_predictive_all("zz").is_empty());
    }
}
