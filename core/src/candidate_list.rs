//! Paged candidate list with stable ids and one nested sub-list level.
//!
//! The list flattens a segment's candidates into entries addressed by a
//! focused index.  Ids are stable against later appends, duplicate values
//! alias to the id of their first occurrence, and one entry may itself be a
//! sub-list (the transliteration cascade).  The top-level list rotates at
//! the edges; a sub-list does not, so running off its edge moves the outer
//! focus instead.

use ahash::AHashMap;

use crate::segments::CandidateAttributes;

pub const DEFAULT_PAGE_SIZE: usize = 9;

/// The per-transliteration attribute tags of a flattened candidate.
pub type StyleAttributes = CandidateAttributes;

#[derive(Debug, Clone)]
pub struct ListCandidate {
    id: i32,
    value: String,
    attributes: StyleAttributes,
}

impl ListCandidate {
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn attributes(&self) -> StyleAttributes {
        self.attributes
    }
}

#[derive(Debug, Clone)]
pub enum CandidateEntry {
    Item(ListCandidate),
    SubList(CandidateList),
}

impl CandidateEntry {
    pub fn as_item(&self) -> Option<&ListCandidate> {
        match self {
            CandidateEntry::Item(item) => Some(item),
            CandidateEntry::SubList(_) => None,
        }
    }

    pub fn as_sub_list(&self) -> Option<&CandidateList> {
        match self {
            CandidateEntry::SubList(list) => Some(list),
            CandidateEntry::Item(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CandidateList {
    entries: Vec<CandidateEntry>,
    rotate: bool,
    focused: bool,
    focused_index: usize,
    page_size: usize,
    name: String,
    // value -> id of the first occurrence
    added_values: AHashMap<String, i32>,
    // late duplicate id -> id of the first occurrence
    alternative_ids: AHashMap<i32, i32>,
    next_available_id: i32,
}

impl CandidateList {
    pub fn new(rotate: bool) -> Self {
        Self {
            entries: Vec::new(),
            rotate,
            focused: false,
            focused_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
            name: String::new(),
            added_values: AHashMap::new(),
            alternative_ids: AHashMap::new(),
            next_available_id: 0,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.focused = false;
        self.focused_index = 0;
        self.added_values.clear();
        self.alternative_ids.clear();
        self.next_available_id = 0;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size > 0 {
            self.page_size = page_size;
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    pub fn focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn focused_index(&self) -> usize {
        self.focused_index
    }

    pub fn entries(&self) -> &[CandidateEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&CandidateEntry> {
        self.entries.get(index)
    }

    /// The id the next `add_candidate` call may use without clashing.
    pub fn next_available_id(&self) -> i32 {
        self.next_available_id
    }

    pub fn add_candidate(&mut self, id: i32, value: impl Into<String>) {
        self.add_candidate_with_attributes(id, value, StyleAttributes::NONE)
    }

    /// Duplicate values alias to the first occurrence: the entry is not
    /// added again, but its id keeps resolving there and the attributes are
    /// merged so attribute rotation can still find it.
    pub fn add_candidate_with_attributes(
        &mut self,
        id: i32,
        value: impl Into<String>,
        attributes: StyleAttributes,
    ) {
        let value = value.into();
        if id >= self.next_available_id {
            self.next_available_id = id + 1;
        }
        if let Some(&first_id) = self.added_values.get(&value) {
            self.alternative_ids.insert(id, first_id);
            for entry in &mut self.entries {
                if let CandidateEntry::Item(item) = entry {
                    if item.id == first_id {
                        item.attributes |= attributes;
                        break;
                    }
                }
            }
            return;
        }
        self.added_values.insert(value.clone(), id);
        self.entries.push(CandidateEntry::Item(ListCandidate {
            id,
            value,
            attributes,
        }));
    }

    /// Append a nested sub-list entry and return a handle to fill it.
    pub fn add_sub_list(&mut self, rotate: bool) -> &mut CandidateList {
        self.entries.push(CandidateEntry::SubList(CandidateList::new(rotate)));
        match self.entries.last_mut() {
            Some(CandidateEntry::SubList(list)) => list,
            _ => unreachable!("sub list was just pushed"),
        }
    }

    /// The focused item, descending into a focused sub-list.
    pub fn focused_candidate(&self) -> Option<&ListCandidate> {
        match self.entries.get(self.focused_index)? {
            CandidateEntry::Item(item) => Some(item),
            CandidateEntry::SubList(list) => list.focused_candidate(),
        }
    }

    pub fn focused_entry(&self) -> Option<&CandidateEntry> {
        self.entries.get(self.focused_index)
    }

    /// Id of the focused item, resolving a focused sub-list to its inner
    /// focus.
    pub fn focused_id(&self) -> i32 {
        self.focused_candidate().map_or(0, |c| c.id)
    }

    fn sub_list_mut(&mut self, index: usize) -> Option<&mut CandidateList> {
        match self.entries.get_mut(index) {
            Some(CandidateEntry::SubList(list)) => Some(list),
            _ => None,
        }
    }

    /// Move focus forward.  Returns false when the edge was hit and this
    /// list does not rotate.
    pub fn move_next(&mut self) -> bool {
        if !self.focused {
            self.focused = true;
            return true;
        }
        let focused_index = self.focused_index;
        if let Some(sub) = self.sub_list_mut(focused_index) {
            if sub.move_next() {
                return true;
            }
            sub.set_focused(false);
        }
        if self.focused_index + 1 < self.entries.len() {
            self.focused_index += 1;
        } else if self.rotate {
            self.focused_index = 0;
        } else {
            return false;
        }
        self.enter_from_front();
        true
    }

    /// Move focus backward.  Returns false when the edge was hit and this
    /// list does not rotate.
    pub fn move_prev(&mut self) -> bool {
        if !self.focused {
            self.focused = true;
            self.focused_index = self.last_index();
            self.enter_from_back();
            return true;
        }
        let focused_index = self.focused_index;
        if let Some(sub) = self.sub_list_mut(focused_index) {
            if sub.move_prev() {
                return true;
            }
            sub.set_focused(false);
        }
        if self.focused_index > 0 {
            self.focused_index -= 1;
        } else if self.rotate {
            self.focused_index = self.last_index();
        } else {
            return false;
        }
        self.enter_from_back();
        true
    }

    fn enter_from_front(&mut self) {
        let focused_index = self.focused_index;
        if let Some(sub) = self.sub_list_mut(focused_index) {
            sub.set_focused(true);
            sub.focused_index = 0;
        }
    }

    fn enter_from_back(&mut self) {
        let focused_index = self.focused_index;
        if let Some(sub) = self.sub_list_mut(focused_index) {
            sub.set_focused(true);
            sub.focused_index = sub.last_index();
        }
    }

    pub fn move_next_page(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.focused = true;
        let next_page_start = (self.focused_index / self.page_size + 1) * self.page_size;
        self.focused_index = if next_page_start < self.entries.len() {
            next_page_start
        } else {
            0
        };
        self.enter_from_front();
        true
    }

    pub fn move_prev_page(&mut self) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.focused = true;
        let page = self.focused_index / self.page_size;
        self.focused_index = if page > 0 {
            (page - 1) * self.page_size
        } else {
            self.last_index() / self.page_size * self.page_size
        };
        self.enter_from_front();
        true
    }

    /// Focus the candidate with `id`, resolving duplicate-value aliases and
    /// descending into sub-lists.
    pub fn move_to_id(&mut self, id: i32) -> bool {
        let id = *self.alternative_ids.get(&id).unwrap_or(&id);
        for index in 0..self.entries.len() {
            match &mut self.entries[index] {
                CandidateEntry::Item(item) => {
                    if item.id == id {
                        self.focused_index = index;
                        self.focused = true;
                        return true;
                    }
                }
                CandidateEntry::SubList(list) => {
                    if list.move_to_id(id) {
                        self.focused_index = index;
                        self.focused = true;
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Focus the `index`-th entry of the current page.
    pub fn move_to_page_index(&mut self, index: usize) -> bool {
        let page_start = self.focused_index / self.page_size * self.page_size;
        let new_index = page_start + index;
        if index >= self.page_size || new_index >= self.entries.len() {
            return false;
        }
        self.focused_index = new_index;
        self.focused = true;
        self.enter_from_front();
        true
    }

    /// Focus the first candidate carrying all of `attributes`.
    pub fn move_to_attributes(&mut self, attributes: StyleAttributes) -> bool {
        for index in 0..self.entries.len() {
            match &mut self.entries[index] {
                CandidateEntry::Item(item) => {
                    if item.attributes.contains(attributes) {
                        self.focused_index = index;
                        self.focused = true;
                        return true;
                    }
                }
                CandidateEntry::SubList(list) => {
                    if list.move_to_attributes(attributes) {
                        self.focused_index = index;
                        self.focused = true;
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Focus the next candidate carrying all of `attributes`, scanning past
    /// the current focus and wrapping once.
    pub fn move_next_attributes(&mut self, attributes: StyleAttributes) -> bool {
        let total = self.entries.len();
        if total == 0 {
            return false;
        }
        for step in 1..=total {
            let index = (self.focused_index + step) % total;
            match &mut self.entries[index] {
                CandidateEntry::Item(item) => {
                    if item.attributes.contains(attributes) {
                        self.focused_index = index;
                        self.focused = true;
                        return true;
                    }
                }
                CandidateEntry::SubList(list) => {
                    if list.move_to_attributes(attributes) {
                        self.focused_index = index;
                        self.focused = true;
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Entries of the page containing the focus, with the page start index.
    pub fn focused_page(&self) -> (usize, &[CandidateEntry]) {
        if self.entries.is_empty() {
            return (0, &[]);
        }
        let page_start = self.focused_index / self.page_size * self.page_size;
        let page_end = (page_start + self.page_size).min(self.entries.len());
        (page_start, &self.entries[page_start..page_end])
    }
}
