//! A chunk is a maximal span of composition produced by one run of
//! longest-prefix rule matches.
//!
//! Each chunk keeps four strings: the raw keystrokes, the converted
//! (committed) text, the pending residue still subject to further matches,
//! and the ambiguous preview of that residue (the "ん" a lone "n" would
//! become).  Any output view can be regenerated from these without
//! re-parsing.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::composition::CompositionInput;
use crate::table::{Table, TableAttributes};
use crate::transliterate::ChunkStyle;
use crate::utils;

// Max recursion count for looking up pending loops.
const MAX_RECURSION: usize = 4;

#[derive(Debug, Clone)]
pub struct Chunk {
    style: ChunkStyle,
    table: Arc<Table>,
    raw: String,
    conversion: String,
    pending: String,
    ambiguous: String,
    attributes: TableAttributes,
}

impl Chunk {
    pub fn new(style: ChunkStyle, table: Arc<Table>) -> Self {
        Self {
            style,
            table,
            raw: String::new(),
            conversion: String::new(),
            pending: String::new(),
            ambiguous: String::new(),
            attributes: TableAttributes::NONE,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn set_raw(&mut self, raw: String) {
        self.raw = raw;
    }

    pub fn conversion(&self) -> &str {
        &self.conversion
    }

    pub fn set_conversion(&mut self, conversion: String) {
        self.conversion = conversion;
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn set_pending(&mut self, pending: String) {
        self.pending = pending;
    }

    pub fn ambiguous(&self) -> &str {
        &self.ambiguous
    }

    pub fn set_ambiguous(&mut self, ambiguous: String) {
        self.ambiguous = ambiguous;
    }

    pub fn attributes(&self) -> TableAttributes {
        self.attributes
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.conversion.clear();
        self.pending.clear();
        self.ambiguous.clear();
    }

    /// The style used when rendering with `requested` (`None` for the
    /// chunk's own style).  NO_TRANSLITERATION chunks refuse raw-based ASCII
    /// rendering and show their converted text instead.
    pub fn effective_style(&self, requested: Option<ChunkStyle>) -> ChunkStyle {
        if self.attributes.contains(TableAttributes::NO_TRANSLITERATION) {
            match requested {
                None | Some(ChunkStyle::HalfAscii) | Some(ChunkStyle::FullAscii) => {
                    return ChunkStyle::ConversionString
                }
                Some(style) => return style,
            }
        }
        requested.unwrap_or(self.style)
    }

    fn render(&self, requested: Option<ChunkStyle>, converted: &str) -> String {
        self.effective_style(requested)
            .transliterate(&self.raw, converted)
    }

    pub fn len(&self, requested: Option<ChunkStyle>) -> usize {
        utils::char_len(&self.render(requested, &format!("{}{}", self.conversion, self.pending)))
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.conversion.is_empty() && self.pending.is_empty()
    }

    /// Append converted + pending text, rendered with `requested`.
    pub fn append_result(&self, requested: Option<ChunkStyle>, result: &mut String) {
        let converted = format!("{}{}", self.conversion, self.pending);
        result.push_str(&self.render(requested, &converted));
    }

    /// Append only the determined part.  A pending residue contributes only
    /// if it maps to itself in the table (a literal).
    pub fn append_trimmed_result(&self, requested: Option<ChunkStyle>, result: &mut String) {
        let mut converted = self.conversion.clone();
        if !self.pending.is_empty() {
            let (entry, _, _) = self.table.lookup_prefix(&self.pending);
            if let Some(entry) = entry {
                if entry.input() == entry.result() {
                    converted.push_str(entry.result());
                }
            }
        }
        result.push_str(&self.render(requested, &converted));
    }

    /// Append the text as it would be submitted: the ambiguous preview
    /// stands in for the pending residue when present.
    pub fn append_fixed_result(&self, requested: Option<ChunkStyle>, result: &mut String) {
        let mut converted = self.conversion.clone();
        if !self.ambiguous.is_empty() {
            converted.push_str(&self.ambiguous);
        } else {
            converted.push_str(&self.pending);
        }
        result.push_str(&self.render(requested, &converted));
    }

    /// Collect the alternate readings the pending residue could still
    /// become, for expanded prediction queries.  Rules with a result are
    /// included directly; pure-pending rules are followed only while they
    /// loop back within a few steps.
    pub fn expanded_results(&self, results: &mut BTreeSet<String>) {
        if self.pending.is_empty() {
            return;
        }
        if self.conversion.is_empty() {
            results.insert(self.pending.clone());
        }
        for entry in self.table.lookup_predictive_all(&self.pending) {
            if !entry.result().is_empty() {
                results.insert(entry.result().to_string());
            }
            if entry.pending().is_empty() {
                continue;
            }
            let mut loop_result = BTreeSet::new();
            if collect_from_pending(&self.table, entry.pending(), MAX_RECURSION, &mut loop_result) {
                results.extend(loop_result);
            }
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether more input typed with `style` against `table` may extend this
    /// chunk.
    pub fn is_appendable(&self, style: Option<ChunkStyle>, table: &Arc<Table>) -> bool {
        !self.pending.is_empty()
            && (style.is_none() || style == Some(self.style))
            && Arc::ptr_eq(table, &self.table)
    }

    /// Whether `input` appended to the pending residue completes a rule with
    /// no remaining ambiguity.
    pub fn is_convertible(&self, style: Option<ChunkStyle>, table: &Arc<Table>, input: &str) -> bool {
        if !self.is_appendable(style, table) {
            return false;
        }
        let key = format!("{}{}", self.pending, input);
        let (entry, key_length, fixed) = table.lookup_prefix(&key);
        entry.is_some() && utils::char_len(&key) == key_length && fixed
    }

    /// Absorb `left` so that `self` covers both spans.
    pub fn combine(&mut self, left: &Chunk) {
        self.conversion = format!("{}{}", left.conversion, self.conversion);
        self.raw = format!("{}{}", left.raw, self.raw);
        if left.ambiguous.is_empty() {
            self.ambiguous.clear();
        } else if self.ambiguous.is_empty() {
            self.ambiguous = format!("{}{}", left.ambiguous, self.pending);
        } else {
            self.ambiguous = format!("{}{}", left.ambiguous, self.ambiguous);
        }
        self.pending = format!("{}{}", left.pending, self.pending);
    }

    /// One longest-prefix match step.  Consumes what it can from `input`;
    /// returns true when the caller should loop for a further match.
    fn add_input_internal(&mut self, input: &mut String) -> bool {
        let key = format!("{}{}", self.pending, input);
        let (entry, key_length, fixed) = self.table.lookup_prefix(&key);
        let pending_len = utils::char_len(&self.pending);

        let entry = match entry {
            Some(entry) => entry.clone(),
            None => {
                if key_length == 0 {
                    // Nothing in the table starts with this input.
                    if self.pending.is_empty() {
                        self.add_converted_char(input);
                    }
                    return false;
                }
                if key_length < pending_len {
                    // All key characters belong to the next chunk.
                    return false;
                }
                // Part of the input extends a rule path without reaching a
                // rule yet (like "t" against "ta").
                let take = key_length - pending_len;
                let new_pending = utils::char_substring(input, 0, take);
                self.raw.push_str(&new_pending);
                self.pending.push_str(&new_pending);
                if !self.ambiguous.is_empty() {
                    // "ny" keeps the preview as "んy"; sequences without a
                    // preview stay without one.
                    self.ambiguous.push_str(&new_pending);
                }
                *input = utils::char_suffix(input, take);
                return false;
            }
        };

        if utils::char_len(&key) == key_length {
            let is_following_entry = !self.conversion.is_empty()
                || (!self.raw.is_empty() && !self.pending.is_empty() && self.raw != self.pending);

            self.raw.push_str(input);
            input.clear();
            if fixed {
                // The whole key reached a single rule ("ka" -> "か").
                self.conversion.push_str(entry.result());
                self.pending = entry.pending().to_string();
                self.ambiguous.clear();
                // Attributes only apply to the first rule of the chunk.
                if !is_following_entry {
                    self.attributes = entry.attributes();
                }
            } else {
                // A rule matched but longer rules remain possible ("n"
                // against "n" and "na").
                self.pending = key;
                self.ambiguous = entry.result().to_string();
            }
            return false;
        }

        // An unambiguous rule consumed a prefix of the key.
        delete_end(&self.pending, &mut self.raw);
        *input = utils::char_suffix(&key, key_length);
        self.raw.push_str(&utils::char_substring(&key, 0, key_length));
        self.conversion.push_str(entry.result());
        self.pending = entry.pending().to_string();
        self.ambiguous.clear();

        !input.is_empty() && !self.pending.is_empty()
    }

    pub fn add_input(&mut self, input: &mut String) {
        while self.add_input_internal(input) {}
    }

    fn add_converted_char(&mut self, input: &mut String) {
        if let Some(first) = input.chars().next() {
            self.conversion.push(first);
            self.raw.push(first);
            *input = utils::char_suffix(input, 1);
        }
    }

    /// Insert raw key plus its pre-converted text (kana typing).
    pub fn add_input_and_converted_char(&mut self, key: &mut String, converted_char: &mut String) {
        if self.is_empty() {
            self.raw = std::mem::take(key);
            self.pending = converted_char.clone();
            self.ambiguous = std::mem::take(converted_char);
            if let Some(entry) = self.table.lookup(&self.pending) {
                self.attributes = entry.attributes();
            }
            return;
        }

        let input = format!("{}{}", self.pending, converted_char);
        let (entry, key_length, fixed) = self.table.lookup_prefix(&input);
        let entry = match entry {
            Some(entry) => entry.clone(),
            // The next chunk takes over the whole input.
            None => return,
        };

        if key_length == utils::char_len(&input) {
            self.raw.push_str(key);
            if fixed {
                self.conversion.push_str(entry.result());
                self.pending = entry.pending().to_string();
                self.ambiguous.clear();
            } else {
                self.pending = entry.result().to_string();
                self.ambiguous = entry.result().to_string();
            }
            key.clear();
            converted_char.clear();
            return;
        }

        if key_length == utils::char_len(&self.pending) {
            // The new input did not interact with the pending residue at
            // all; a fresh chunk will take it.
            return;
        }

        // Partially used: the key stays here while the converted text is
        // split between this chunk and the next.
        self.raw.push_str(key);
        self.conversion.push_str(entry.result());
        self.pending = entry.pending().to_string();
        key.clear();
        *converted_char = utils::char_suffix(&input, key_length);
    }

    pub fn should_commit(&self) -> bool {
        self.attributes.contains(TableAttributes::DIRECT_INPUT) && self.pending.is_empty()
    }

    /// Whether `input` must go to a fresh chunk instead of this one.
    pub fn should_insert_new_chunk(&self, input: &CompositionInput) -> bool {
        if self.is_empty() {
            return false;
        }
        let is_new_input = input.is_new_input()
            || (self.attributes.contains(TableAttributes::END_CHUNK) && self.pending.is_empty());
        is_new_input
            && (self.table.has_new_chunk_entry(input.raw())
                || !self.table.has_sub_rules(input.raw()))
    }

    pub fn add_composition_input(&mut self, input: &mut CompositionInput) {
        if input.has_conversion() {
            let (key, converted) = input.raw_and_conversion_mut();
            self.add_input_and_converted_char(key, converted);
            return;
        }
        if self.should_insert_new_chunk(input) {
            return;
        }
        self.add_input(input.raw_mut());
    }

    pub fn style(&self) -> ChunkStyle {
        self.style
    }

    pub fn set_style(&mut self, style: ChunkStyle) {
        self.style = style;
    }

    /// Split this chunk at `position` (in the rendering of `requested`),
    /// returning the new left-hand chunk.  Position must be strictly inside
    /// the chunk.
    pub fn split(&mut self, requested: Option<ChunkStyle>, position: usize) -> Option<Chunk> {
        if position == 0 || position >= self.len(requested) {
            tracing::warn!(position, "invalid split position");
            return None;
        }

        let converted = format!("{}{}", self.conversion, self.pending);
        let (raw_lhs, raw_rhs, converted_lhs, converted_rhs) = self
            .effective_style(requested)
            .split(position, &self.raw, &converted);

        let mut left = Chunk::new(self.style, Arc::clone(&self.table));
        left.set_raw(raw_lhs);
        self.raw = raw_rhs;

        if utils::char_len(&converted_lhs) > utils::char_len(&self.conversion) {
            // [ conversion | pending ] => [ conv | pend#1 ] [ pend#2 ]
            let pending_lhs = utils::char_suffix(&converted_lhs, utils::char_len(&self.conversion));
            left.set_conversion(self.conversion.clone());
            left.set_pending(pending_lhs);
            self.conversion.clear();
            self.pending = converted_rhs;
            self.ambiguous.clear();
        } else {
            // [ conversion | pending ] => [ conv#1 ] [ conv#2 | pending ]
            left.set_conversion(converted_lhs);
            let pending_pos = utils::char_len(&converted_rhs) - utils::char_len(&self.pending);
            self.conversion = utils::char_substring(&converted_rhs, 0, pending_pos);
        }
        Some(left)
    }
}

// Delete `end` from the tail of `target` if it ends with it.
fn delete_end(end: &str, target: &mut String) {
    if !end.is_empty() {
        if let Some(index) = target.rfind(end) {
            target.truncate(index);
        }
    }
}

// Follow pure-pending rules looking for a loop within `recursion_count`
// steps.  Returns false (and the caller discards the set) when a rule with a
// result shows up, because expanding those explodes combinatorially.
fn collect_from_pending(
    table: &Table,
    key: &str,
    recursion_count: usize,
    result: &mut BTreeSet<String>,
) -> bool {
    if recursion_count == 0 {
        return false;
    }
    if result.contains(key) {
        return true;
    }
    result.insert(key.to_string());
    for entry in table.lookup_predictive_all(key) {
        if !entry.result().is_empty() {
            return false;
        }
        if !collect_from_pending(table, entry.pending(), recursion_count - 1, result) {
            return false;
        }
    }
    true
}
