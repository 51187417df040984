//! Sliding context window framing for engine batches.
//!
//! Every sentence is sent to the engine as `<sentence>\t<context>`, where the
//! context is the three preceding sentences of the same call, most recent
//! first, padded with empty strings at the start of the sequence.

use std::collections::VecDeque;

/// Number of preceding sentences supplied as context
pub const CONTEXT_SIZE: usize = 3;

/// Fixed-capacity window of previous sentences, newest at the front.
///
/// Pushing a sentence evicts the oldest entry from the back, so the window
/// always holds exactly `CONTEXT_SIZE` slots.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    slots: VecDeque<String>,
}

impl ContextWindow {
    pub fn new() -> Self {
        let mut slots = VecDeque::with_capacity(CONTEXT_SIZE + 1);
        slots.extend(std::iter::repeat_n(String::new(), CONTEXT_SIZE));
        Self { slots }
    }

    pub fn push(&mut self, sentence: &str) {
        self.slots.pop_back();
        self.slots.push_front(tsv_field(sentence));
    }

    /// Context slots joined by single spaces, empty slots included
    pub fn render(&self) -> String {
        self.slots.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }

    pub fn frame(&self, sentence: &str) -> String {
        format!("{}\t{}", tsv_field(sentence), self.render())
    }
}

// The engine reads exactly two tab-separated columns per line
fn tsv_field(text: &str) -> String {
    text.replace('\t', " ")
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame an ordered sentence sequence into engine batch lines
pub fn build_batch<S: AsRef<str>>(sentences: &[S]) -> Vec<String> {
    let mut window = ContextWindow::new();
    sentences
        .iter()
        .map(|sentence| {
            let sentence = sentence.as_ref();
            let line = window.frame(sentence);
            window.push(sentence);
            line
        })
        .collect()
}
