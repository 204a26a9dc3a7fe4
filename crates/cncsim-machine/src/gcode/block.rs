//! A parsed program line.
//!
//! Simplified descendant of `gcodekit5-visualizer::gcode::command::GcodeCommand`:
//! that type carries a `Uuid` id, lifecycle state, and three `SystemTime`
//! timestamps because it tracks a command's round trip to live firmware.
//! A `Block` here is pure data produced once by the lexer — no identity, no
//! lifecycle, no clock — so none of that survives the transform.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub letter: char,
    pub value: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Block {
    /// 1-based source line number, recorded whether or not an `N` word was
    /// present, for diagnostics.
    pub source_line: usize,
    pub words: Vec<Word>,
}

impl Block {
    pub fn new(source_line: usize) -> Self {
        Self { source_line, words: Vec::new() }
    }

    pub fn push(&mut self, letter: char, value: f64) {
        self.words.push(Word { letter, value });
    }

    /// First word with the given letter, if any (later duplicates within a
    /// line are ignored, matching typical G-code sender behavior).
    pub fn get(&self, letter: char) -> Option<f64> {
        self.words.iter().find(|w| w.letter == letter).map(|w| w.value)
    }

    pub fn has(&self, letter: char) -> bool {
        self.words.iter().any(|w| w.letter == letter)
    }

    /// Every value for a letter, in source order — a line may carry more
    /// than one G or M word (e.g. `G90 G01 X1`, `M03 M08`).
    pub fn all(&self, letter: char) -> Vec<f64> {
        self.words.iter().filter(|w| w.letter == letter).map(|w| w.value).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Re-render in canonical word order, for the round-trip property test
    /// (spec.md §8 invariant 6).
    pub fn reprint(&self) -> String {
        self.words
            .iter()
            .map(|w| format!("{}{}", w.letter, format_number(w.value)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}
