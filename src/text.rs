//! Greedy word wrapping against base-14 font metrics.

use std::iter::Peekable;
use std::str::{Lines, SplitWhitespace};

use crate::font::{StandardFont, line_height, units_to_width};
use crate::types::Pt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedLine {
    pub text: String,
    pub width: Pt,
}

impl WrappedLine {
    fn blank() -> Self {
        Self {
            text: String::new(),
            width: Pt::ZERO,
        }
    }
}

/// Lazily yields the lines of `text` wrapped to `max_width`.
///
/// Each source line (`\n` or `\r\n`) is a hard break and a blank source line
/// yields an empty wrapped line. Tokens are whitespace-delimited and are never
/// hyphenated: a token wider than `max_width` gets a line of its own. A clone
/// continues from the same position; call [`wrap`] again to start over.
#[derive(Debug, Clone)]
pub struct WrapLines<'a> {
    segments: Lines<'a>,
    tokens: Option<Peekable<SplitWhitespace<'a>>>,
    segment_started: bool,
    font: StandardFont,
    font_size: Pt,
    max_width: Pt,
    space_units: u64,
}

pub fn wrap(text: &str, max_width: Pt, font_size: Pt, font: StandardFont) -> WrapLines<'_> {
    WrapLines {
        segments: text.lines(),
        tokens: None,
        segment_started: false,
        font,
        font_size,
        max_width,
        space_units: font.advance_units(' ') as u64,
    }
}

impl WrapLines<'_> {
    pub fn line_height(&self) -> Pt {
        line_height(self.font_size)
    }
}

impl Iterator for WrapLines<'_> {
    type Item = WrappedLine;

    fn next(&mut self) -> Option<WrappedLine> {
        loop {
            if self.tokens.is_none() {
                let segment = self.segments.next()?;
                self.tokens = Some(segment.split_whitespace().peekable());
                self.segment_started = false;
            }
            let Some(tokens) = self.tokens.as_mut() else {
                continue;
            };
            if tokens.peek().is_none() {
                self.tokens = None;
                if !self.segment_started {
                    return Some(WrappedLine::blank());
                }
                continue;
            }
            self.segment_started = true;

            let mut text = String::new();
            let mut units: u64 = 0;
            while let Some(&word) = tokens.peek() {
                let word_units = self.font.text_units(word);
                if text.is_empty() {
                    text.push_str(word);
                    units = word_units;
                    tokens.next();
                    if units_to_width(self.font_size, units) > self.max_width {
                        break;
                    }
                    continue;
                }
                let next_units = units + self.space_units + word_units;
                if units_to_width(self.font_size, next_units) > self.max_width {
                    break;
                }
                text.push(' ');
                text.push_str(word);
                units = next_units;
                tokens.next();
            }
            return Some(WrappedLine {
                text,
                width: units_to_width(self.font_size, units),
            });
        }
    }
}

/// Wraps and collects; the height of the result is `len() * line_height`.
pub fn wrap_all(text: &str, max_width: Pt, font_size: Pt, font: StandardFont) -> Vec<WrappedLine> {
    wrap(text, max_width, font_size, font).collect()
}
