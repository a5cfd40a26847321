//! The ordered chunk list behind a composition, addressed by character
//! position.
//!
//! Insertion splits the chunk under the cursor when needed, re-combines
//! pending chunks to the left so longest-prefix matching can cross what used
//! to be a chunk boundary, and spills leftover input into fresh chunks.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::chunk::Chunk;
use crate::table::{Table, TableAttributes};
use crate::transliterate::ChunkStyle;
use crate::utils;

/// How the trailing chunk's pending residue is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    /// Render the residue through its ambiguous preview (submission).
    Fix,
    /// Render the residue as typed (preedit).
    Asis,
    /// Drop the residue unless it is a literal (prediction queries).
    Trim,
}

/// One insertion: raw key, optionally with pre-converted text.
#[derive(Debug, Clone, Default)]
pub struct CompositionInput {
    raw: String,
    conversion: Option<String>,
    is_new_input: bool,
}

impl CompositionInput {
    pub fn from_raw(raw: impl Into<String>, is_new_input: bool) -> Self {
        Self {
            raw: raw.into(),
            conversion: None,
            is_new_input,
        }
    }

    pub fn from_key_and_preedit(
        raw: impl Into<String>,
        conversion: impl Into<String>,
        is_new_input: bool,
    ) -> Self {
        Self {
            raw: raw.into(),
            conversion: Some(conversion.into()),
            is_new_input,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn raw_mut(&mut self) -> &mut String {
        &mut self.raw
    }

    pub fn conversion(&self) -> &str {
        self.conversion.as_deref().unwrap_or("")
    }

    pub fn has_conversion(&self) -> bool {
        self.conversion.is_some()
    }

    pub fn raw_and_conversion_mut(&mut self) -> (&mut String, &mut String) {
        let conversion = self.conversion.get_or_insert_with(String::new);
        (&mut self.raw, conversion)
    }

    pub fn is_new_input(&self) -> bool {
        self.is_new_input
    }

    pub fn set_is_new_input(&mut self, is_new_input: bool) {
        self.is_new_input = is_new_input;
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.conversion.as_deref().unwrap_or("").is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Composition {
    table: Arc<Table>,
    chunks: Vec<Chunk>,
    input_style: ChunkStyle,
}

impl Composition {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            chunks: Vec::new(),
            input_style: ChunkStyle::ConversionString,
        }
    }

    pub fn erase(&mut self) {
        self.chunks.clear();
    }

    pub fn set_input_style(&mut self, style: ChunkStyle) {
        self.input_style = style;
    }

    pub fn input_style(&self) -> ChunkStyle {
        self.input_style
    }

    pub fn set_table(&mut self, table: Arc<Table>) {
        self.table = table;
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn insert_at(&mut self, position: usize, input: &str) -> usize {
        self.insert_input(position, CompositionInput::from_raw(input, false))
    }

    pub fn insert_key_and_preedit_at(
        &mut self,
        position: usize,
        key: &str,
        preedit: &str,
    ) -> usize {
        self.insert_input(
            position,
            CompositionInput::from_key_and_preedit(key, preedit, false),
        )
    }

    /// Insert at a character position; returns the new cursor position.
    pub fn insert_input(&mut self, position: usize, input: CompositionInput) -> usize {
        if input.is_empty() {
            return position;
        }

        let mut right_index = self.maybe_split_chunk_at(position);
        let mut left_index = self.insertion_chunk(&mut right_index);
        self.combine_pending_chunks(&mut left_index, &mut right_index, &input);

        let mut input = input;
        loop {
            self.chunks[left_index].add_composition_input(&mut input);
            if input.is_empty() {
                break;
            }
            left_index = right_index;
            self.chunks
                .insert(right_index, Chunk::new(self.input_style, Arc::clone(&self.table)));
            right_index += 1;
            input.set_is_new_input(false);
        }

        self.position_of(None, right_index)
    }

    /// Delete the character right of `position`; returns the new position.
    pub fn delete_at(&mut self, position: usize) -> usize {
        let original_len = self.len();
        let mut new_position = position;
        // Zero-length chunks may pile up at the position, so repeat until a
        // visible character went away.
        while !self.chunks.is_empty() && self.len() == original_len {
            let chunk_index = self.maybe_split_chunk_at(position);
            new_position = self.position_of(None, chunk_index);
            if chunk_index >= self.chunks.len() {
                break;
            }
            if self.chunks[chunk_index].len(None) <= 1 {
                self.chunks.remove(chunk_index);
                continue;
            }
            // Split off the leading character and drop it.
            self.chunks[chunk_index].split(None, 1);
        }
        new_position
    }

    /// Map a position between two style renderings.
    pub fn convert_position(
        &self,
        position_from: usize,
        style_from: Option<ChunkStyle>,
        style_to: Option<ChunkStyle>,
    ) -> usize {
        if style_from == style_to {
            return position_from;
        }

        let (chunk_index, inner_from) = match self.chunk_at(position_from, style_from) {
            Some(found) => found,
            None => return 0,
        };

        let chunk = &self.chunks[chunk_index];
        let chunk_length_from = chunk.len(style_from);
        let position_to = self.position_of(style_to, chunk_index);
        if inner_from == 0 {
            return position_to;
        }

        let chunk_length_to = chunk.len(style_to);
        if inner_from >= chunk_length_from || inner_from > chunk_length_to {
            // Beyond the corresponding span ("ts|u" vs "つ"): snap to the
            // end of the chunk.
            return position_to + chunk_length_to;
        }
        position_to + inner_from
    }

    /// Set the display style of every chunk covering
    /// `[position_from, position_to]`.
    pub fn set_style_range(&mut self, position_from: usize, position_to: usize, style: ChunkStyle) {
        if position_from > position_to || self.chunks.is_empty() {
            return;
        }
        let (begin, _) = match self.chunk_at(position_from, None) {
            Some(found) => found,
            None => return,
        };
        let (end, _) = match self.chunk_at(position_to, None) {
            Some(found) => found,
            None => return,
        };
        for chunk in &mut self.chunks[begin..=end] {
            chunk.set_style(style);
        }
    }

    /// The rendering style of the chunk covering `position`.
    pub fn style_at(&self, position: usize) -> Option<ChunkStyle> {
        self.chunk_at(position, None)
            .map(|(index, _)| self.chunks[index].effective_style(None))
    }

    pub fn len(&self) -> usize {
        self.position_of(None, self.chunks.len())
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn string_with_modes(&self, style: Option<ChunkStyle>, trim_mode: TrimMode) -> String {
        let mut composition = String::new();
        if self.chunks.is_empty() {
            return composition;
        }
        let last = self.chunks.len() - 1;
        for chunk in &self.chunks[..last] {
            chunk.append_result(style, &mut composition);
        }
        match trim_mode {
            TrimMode::Trim => self.chunks[last].append_trimmed_result(style, &mut composition),
            TrimMode::Asis => self.chunks[last].append_result(style, &mut composition),
            TrimMode::Fix => self.chunks[last].append_fixed_result(style, &mut composition),
        }
        composition
    }

    /// Determined text plus the alternate readings of the trailing residue.
    pub fn expanded_strings(&self) -> (String, BTreeSet<String>) {
        let mut base = String::new();
        let mut expanded = BTreeSet::new();
        if self.chunks.is_empty() {
            return (base, expanded);
        }
        let last = self.chunks.len() - 1;
        for chunk in &self.chunks[..last] {
            chunk.append_fixed_result(None, &mut base);
        }
        self.chunks[last].append_trimmed_result(None, &mut base);
        self.chunks[last].expanded_results(&mut expanded);
        (base, expanded)
    }

    /// Each chunk rendered with its own style (the preedit string).
    pub fn string(&self) -> String {
        let mut composition = String::new();
        for chunk in &self.chunks {
            chunk.append_result(None, &mut composition);
        }
        composition
    }

    pub fn string_with_style(&self, style: ChunkStyle) -> String {
        self.string_with_modes(Some(style), TrimMode::Fix)
    }

    pub fn string_with_trim_mode(&self, trim_mode: TrimMode) -> String {
        self.string_with_modes(None, trim_mode)
    }

    /// Split the preedit around the character at `position`.
    pub fn preedit(&self, position: usize) -> (String, String, String) {
        let composition = self.string();
        let left = utils::char_substring(&composition, 0, position);
        let focused = utils::char_substring(&composition, position, 1);
        let right = utils::char_suffix(&composition, position + 1);
        (left, focused, right)
    }

    /// Chunk index and offset inside it for a character position.  The
    /// position binds to the leftmost chunk that can still absorb it.
    fn chunk_at(&self, position: usize, style: Option<ChunkStyle>) -> Option<(usize, usize)> {
        if self.chunks.is_empty() {
            return None;
        }
        let mut rest = position;
        for (index, chunk) in self.chunks.iter().enumerate() {
            let chunk_length = chunk.len(style);
            if rest <= chunk_length {
                return Some((index, rest));
            }
            rest -= chunk_length;
        }
        let last = self.chunks.len() - 1;
        Some((last, self.chunks[last].len(style)))
    }

    /// Character position of the start of `chunk_index`.
    fn position_of(&self, style: Option<ChunkStyle>, chunk_index: usize) -> usize {
        self.chunks[..chunk_index.min(self.chunks.len())]
            .iter()
            .map(|chunk| chunk.len(style))
            .sum()
    }

    /// Ensure a chunk boundary at `position`; returns the index of the chunk
    /// starting there (possibly `chunks.len()`).
    fn maybe_split_chunk_at(&mut self, position: usize) -> usize {
        if position == 0 {
            return 0;
        }
        let (index, inner_position) = match self.chunk_at(position, None) {
            Some(found) => found,
            None => return 0,
        };
        if inner_position == self.chunks[index].len(None) {
            return index + 1;
        }
        if let Some(left) = self.chunks[index].split(None, inner_position) {
            self.chunks.insert(index, left);
        }
        index + 1
    }

    /// The chunk new input goes into, given the boundary at `right_index`.
    fn insertion_chunk(&mut self, right_index: &mut usize) -> usize {
        if *right_index > 0 {
            let left_index = *right_index - 1;
            if self.chunks[left_index].is_appendable(Some(self.input_style), &self.table) {
                return left_index;
            }
        }
        self.chunks
            .insert(*right_index, Chunk::new(self.input_style, Arc::clone(&self.table)));
        *right_index += 1;
        *right_index - 1
    }

    /// Merge pending chunks left of the insertion chunk while the combined
    /// text stays convertible.
    fn combine_pending_chunks(
        &mut self,
        left_index: &mut usize,
        right_index: &mut usize,
        input: &CompositionInput,
    ) {
        let next_input = if input.has_conversion() {
            input.conversion().to_string()
        } else {
            input.raw().to_string()
        };

        while *left_index > 0 {
            let probe = format!("{}{}", self.chunks[*left_index].pending(), next_input);
            if !self.chunks[*left_index - 1].is_convertible(
                Some(self.input_style),
                &self.table,
                &probe,
            ) {
                return;
            }
            let left = self.chunks.remove(*left_index - 1);
            *left_index -= 1;
            *right_index -= 1;
            self.chunks[*left_index].combine(&left);
        }
    }

    /// Raw keystrokes and converted text covering `length` characters of the
    /// default rendering, starting at `position`.  Partially covered chunks
    /// are split with their own style.
    pub fn raw_and_converted_in_range(&self, position: usize, length: usize) -> (String, String) {
        let mut raw = String::new();
        let mut converted = String::new();
        let mut offset = position;
        let mut remaining = length;
        for chunk in &self.chunks {
            if remaining == 0 {
                break;
            }
            let chunk_length = chunk.len(None);
            if offset >= chunk_length {
                offset -= chunk_length;
                continue;
            }
            let style = chunk.effective_style(None);
            let chunk_converted = format!("{}{}", chunk.conversion(), chunk.pending());
            let chunk_raw = if chunk.attributes().contains(TableAttributes::NO_TRANSLITERATION) {
                chunk_converted.clone()
            } else {
                chunk.raw().to_string()
            };
            let (mut part_raw, mut part_converted) = if offset > 0 {
                let (_, raw_rhs, _, converted_rhs) = style.split(offset, &chunk_raw, &chunk_converted);
                (raw_rhs, converted_rhs)
            } else {
                (chunk_raw, chunk_converted)
            };
            let covered = chunk_length - offset;
            if covered > remaining {
                let (raw_lhs, _, converted_lhs, _) =
                    style.split(remaining, &part_raw, &part_converted);
                part_raw = raw_lhs;
                part_converted = converted_lhs;
                remaining = 0;
            } else {
                remaining -= covered;
            }
            offset = 0;
            raw.push_str(&part_raw);
            converted.push_str(&part_converted);
        }
        (raw, converted)
    }

    pub fn should_commit(&self) -> bool {
        self.chunks.iter().all(|chunk| chunk.should_commit())
    }
}
