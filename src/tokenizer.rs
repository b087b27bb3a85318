use std::str::Split;

use crate::constants::{NUM_PLACEHOLDER, UNK_TOKEN};

/// Characters that survive normalization besides ASCII letters and digits.
const KEPT_PUNCTUATION: [char; 5] = ['"', '\'', '?', '.', ','];

/// Normalizes a single raw word: lowercases it, strips every character outside
/// `[a-z0-9"'?.,]`, then collapses each run of digits into a single `#`.
pub fn fix_word(word: &str) -> String {
    let mut fixed = String::with_capacity(word.len());
    let mut in_number = false;
    for c in word.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_digit() {
            if !in_number {
                fixed.push(NUM_PLACEHOLDER);
                in_number = true;
            }
        } else if c.is_ascii_lowercase() || KEPT_PUNCTUATION.contains(&c) {
            fixed.push(c);
            in_number = false;
        }
        // Stripped characters are dropped before digit collapsing, so digits
        // on either side of them still form one run.
    }
    fixed
}

/// Word separators: Unicode whitespace plus the ASCII file, group, record
/// and unit separators (`\x1c`..=`\x1f`), which plain-text corpora use as
/// field breaks.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

/// Lazily yields the normalized words of `line`, skipping words that
/// normalize to nothing. The unknown-token literal passes through untouched.
pub fn read_words(line: &str) -> ReadWords<'_> {
    ReadWords {
        words: line.split(is_separator as fn(char) -> bool),
    }
}

/// Single-pass iterator returned by [`read_words`].
#[derive(Debug, Clone)]
pub struct ReadWords<'a> {
    words: Split<'a, fn(char) -> bool>,
}

impl Iterator for ReadWords<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        // Adjacent separators yield empty pieces; they normalize to "" below.
        for word in self.words.by_ref() {
            let word = if word == UNK_TOKEN {
                word.to_string()
            } else {
                fix_word(word)
            };
            if !word.is_empty() {
                return Some(word);
            }
        }
        None
    }
}
