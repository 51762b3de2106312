//! Typewriter reveal of enhanced text.
//!
//! The field is cleared and then refilled one character per step over roughly one
//! second. The plan is pure; the session drives it on a timer and stops as soon as
//! the reveal is no longer current.

use std::time::Duration;

const TOTAL_REVEAL: Duration = Duration::from_millis(1000);
const MIN_STEP: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealPlan {
    text: String,
    /// Byte offsets of each char end, so every prefix is valid UTF-8.
    boundaries: Vec<usize>,
    pub step: Duration,
}

impl RevealPlan {
    pub fn new(text: &str) -> Self {
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .collect();
        let step = match u32::try_from(boundaries.len()) {
            Ok(0) => MIN_STEP,
            Ok(n) => (TOTAL_REVEAL / n).max(MIN_STEP),
            Err(_) => MIN_STEP,
        };
        Self {
            text: text.to_string(),
            boundaries,
            step,
        }
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Text shown after `step` characters; the final step is the exact full text.
    pub fn frame(&self, step: usize) -> &str {
        match step {
            0 => "",
            n if n >= self.boundaries.len() => &self.text,
            n => &self.text[..self.boundaries[n - 1]],
        }
    }

    pub fn full_text(&self) -> &str {
        &self.text
    }
}
