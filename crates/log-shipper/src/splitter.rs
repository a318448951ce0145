// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Splits raw output into text segments the sink will accept.
//!
//! The sink only takes text and caps the size of every message, so a raw chunk
//! has to be decoded and then cut. Decoding is incremental through
//! `<[u8]>::utf8_chunks`: invalid sequences become U+FFFD exactly as
//! [`String::from_utf8_lossy`] would replace them, and cuts only ever land on
//! character boundaries.

use std::str::Utf8Chunks;

/// Splits `bytes` into segments of at most `max_bytes` UTF-8 bytes each.
///
/// Concatenating the segments yields `String::from_utf8_lossy(bytes)`. When
/// `max_bytes` is smaller than a character's encoding that character is
/// emitted on its own, which can only happen for budgets below
/// [`crate::constants::MAX_CHAR_BYTES`].
#[must_use]
pub fn split_chunk(bytes: &[u8], max_bytes: usize) -> Segments<'_> {
    Segments {
        chunks: bytes.utf8_chunks(),
        valid: "",
        replace_pending: false,
        max_bytes,
    }
}

/// Lazy iterator returned by [`split_chunk`].
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    chunks: Utf8Chunks<'a>,
    /// Decoded text of the current chunk not yet emitted.
    valid: &'a str,
    /// The current chunk ended in an invalid sequence that still needs its
    /// replacement character.
    replace_pending: bool,
    max_bytes: usize,
}

impl Iterator for Segments<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut segment = String::new();

        loop {
            if !self.valid.is_empty() {
                let room = self.max_bytes.saturating_sub(segment.len());
                let mut cut = floor_char_boundary(self.valid, room);
                if cut == 0 {
                    if !segment.is_empty() {
                        return Some(segment);
                    }
                    cut = self.valid.chars().next().map_or(0, char::len_utf8);
                }
                segment.push_str(&self.valid[..cut]);
                self.valid = &self.valid[cut..];
                if !self.valid.is_empty() {
                    return Some(segment);
                }
                continue;
            }

            if self.replace_pending {
                if !segment.is_empty()
                    && segment.len() + char::REPLACEMENT_CHARACTER.len_utf8() > self.max_bytes
                {
                    return Some(segment);
                }
                segment.push(char::REPLACEMENT_CHARACTER);
                self.replace_pending = false;
                continue;
            }

            match self.chunks.next() {
                Some(chunk) => {
                    self.valid = chunk.valid();
                    self.replace_pending = !chunk.invalid().is_empty();
                }
                None if segment.is_empty() => return None,
                None => return Some(segment),
            }
        }
    }
}

/// Largest index `<= max` that falls on a character boundary of `s`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
