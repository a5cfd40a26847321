//! Typing correction over probable-key hypotheses.
//!
//! Touch keyboards report, for every keystroke, the neighbouring keys the
//! user may have meant together with a probability. The corrector keeps
//! those hypotheses per position, beam-searches the most probable alternate
//! raw streams, and recomposes each stream through the table to produce
//! correction queries for the prediction engine.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::composition::{Composition, TrimMode};
use crate::key_event::ProbableKeyEvent;
use crate::table::Table;
use crate::transliterate::ChunkStyle;

/// At most this many alternate streams survive the beam.
const MAX_HYPOTHESES: usize = 8;

/// Probabilities below this are treated as noise.
const MIN_PROBABILITY: f64 = 0.0005;

/// One corrected query: its composed base and the alternate readings of the
/// trailing residue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCorrectedQuery {
    pub base: String,
    pub expanded: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct TypingCorrector {
    table: Arc<Table>,
    keys: Vec<(char, Vec<ProbableKeyEvent>)>,
    available: bool,
}

impl TypingCorrector {
    pub fn new(table: Arc<Table>) -> Self {
        Self {
            table,
            keys: Vec::new(),
            available: true,
        }
    }

    pub fn set_table(&mut self, table: Arc<Table>) {
        self.table = table;
    }

    /// Record a keystroke and its hypotheses.
    pub fn insert_character(&mut self, typed: char, probable_key_events: &[ProbableKeyEvent]) {
        if !self.available {
            return;
        }
        // Without hypotheses the corrector cannot recover the stream across
        // this position.
        if probable_key_events.is_empty() {
            self.invalidate();
            return;
        }
        self.keys.push((typed, probable_key_events.to_vec()));
    }

    /// Cursor moves and deletions break the position mapping.
    pub fn invalidate(&mut self) {
        self.available = false;
        self.keys.clear();
    }

    pub fn reset(&mut self) {
        self.keys.clear();
        self.available = true;
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// The most probable corrected queries, best first, excluding the stream
    /// the user actually typed.
    pub fn queries(&self) -> Vec<TypeCorrectedQuery> {
        if !self.available || self.keys.is_empty() {
            return Vec::new();
        }

        // Beam over key positions; each state is (stream, cost, differs).
        let mut beam: Vec<(String, f64, bool)> = vec![(String::new(), 0.0, false)];
        for (typed, events) in &self.keys {
            let mut next: Vec<(String, f64, bool)> = Vec::new();
            for (stream, cost, differs) in &beam {
                for event in &**events {
                    if event.probability < MIN_PROBABILITY {
                        continue;
                    }
                    let mut extended = stream.clone();
                    extended.push(event.key_code);
                    next.push((
                        extended,
                        cost - event.probability.ln(),
                        *differs || event.key_code != *typed,
                    ));
                }
            }
            next.sort_by(|a, b| a.1.total_cmp(&b.1));
            next.truncate(MAX_HYPOTHESES);
            if next.is_empty() {
                return Vec::new();
            }
            beam = next;
        }

        let mut queries = Vec::new();
        for (stream, _, differs) in beam {
            if !differs {
                continue;
            }
            let mut composition = Composition::new(Arc::clone(&self.table));
            composition.set_input_style(ChunkStyle::Hiragana);
            let mut position = 0;
            for c in stream.chars() {
                position = composition.insert_at(position, &c.to_string());
            }
            let base = composition.string_with_trim_mode(TrimMode::Trim);
            let (_, expanded) = composition.expanded_strings();
            if base.is_empty() && expanded.is_empty() {
                continue;
            }
            queries.push(TypeCorrectedQuery { base, expanded });
        }
        queries
    }
}
