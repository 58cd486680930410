//! Character sequence with formatting spans.
//!
//! Every `char` is its own row. Reading the text back is a matter of
//! concatenating rows in position order, which is what a store would do with
//! `ORDER BY position`.

use crate::error::{Error, Result};
use crate::{FormatSpan, LogicalClock, OrderedList, Position, PositionSource, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Collaborative plain text plus its formatting spans.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    chars: OrderedList<char>,
    spans: Vec<FormatSpan>,
}

impl Text {
    /// Create an empty text.
    pub fn new() -> Self {
        Self::default()
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Rows in position order.
    pub fn rows(&self) -> &[Row<char>] {
        self.chars.rows()
    }

    /// Position of the char at `index`.
    pub fn position_at(&self, index: usize) -> Option<&Position> {
        self.chars.position(index)
    }

    /// Index of the char at `position`, if present.
    pub fn index_of(&self, position: &Position) -> Option<usize> {
        self.chars.index_of(position)
    }

    /// Insert `s` so that its first char ends up at `index`.
    ///
    /// Issues one chained `create_between` per char and returns the new
    /// positions in order.
    pub fn insert_str(
        &mut self,
        source: &mut PositionSource,
        index: usize,
        s: &str,
    ) -> Result<Vec<Position>> {
        let chars: Vec<char> = s.chars().collect();
        let positions = self.chars.insert_run(source, index, chars)?;

        tracing::debug!(index, chars = positions.len(), "inserted run");
        Ok(positions)
    }

    /// Delete the chars in `range` and return their rows.
    ///
    /// Deletion never creates positions.
    pub fn delete(&mut self, range: Range<usize>) -> Result<Vec<Row<char>>> {
        self.chars.drain(range)
    }

    /// Merge a char row written by any replica. See [`OrderedList::apply_row`].
    pub fn apply_row(&mut self, row: Row<char>) -> Result<bool> {
        self.chars.apply_row(row)
    }

    /// Remove the char at `position`, as when another replica deleted it.
    pub fn remove_position(&mut self, position: &Position) -> Option<Row<char>> {
        self.chars.remove_position(position)
    }

    /// Assert `attribute = value` over the chars in `range`.
    ///
    /// The span starts at the first char of the range and ends at the char
    /// just after it, or at [`Position::End`] when the range reaches the end
    /// of the text, so text appended later is covered too.
    ///
    /// The span is stamped with the next tick of `clock`. The clock only
    /// advances when the span is recorded.
    pub fn format(
        &mut self,
        range: Range<usize>,
        attribute: impl Into<String>,
        value: serde_json::Value,
        clock: &mut LogicalClock,
    ) -> Result<&FormatSpan> {
        let len = self.len();
        if range.end > len {
            return Err(Error::IndexOutOfBounds {
                index: range.end,
                len,
            });
        }
        let Some(start) = self.position_at(range.start) else {
            return Err(Error::IndexOutOfBounds {
                index: range.start,
                len,
            });
        };
        let end = self
            .position_at(range.end)
            .cloned()
            .unwrap_or(Position::End);

        let mut next = clock.clone();
        let span = FormatSpan::new(attribute, value, start.clone(), end, next.tick())?;
        *clock = next;

        tracing::debug!(attribute = %span.attribute, counter = span.clock.counter, "formatted");
        self.spans.push(span);
        Ok(&self.spans[self.spans.len() - 1])
    }

    /// Record a span created by any replica.
    ///
    /// `clock` is moved past the span's stamp, so spans formatted locally
    /// afterwards order after it. Returns false for a span already recorded.
    pub fn add_span(&mut self, span: FormatSpan, clock: &mut LogicalClock) -> bool {
        clock.merge(&span.clock);
        if self.spans.contains(&span) {
            return false;
        }
        self.spans.push(span);
        true
    }

    /// All spans, in the order they were recorded.
    pub fn spans(&self) -> &[FormatSpan] {
        &self.spans
    }

    /// Spans covering the char at `index`, oldest clock first.
    ///
    /// When several spans set the same attribute, the last one in this list
    /// is the most recent write.
    pub fn spans_at(&self, index: usize) -> Vec<&FormatSpan> {
        let Some(position) = self.position_at(index) else {
            return Vec::new();
        };
        let mut spans: Vec<_> = self.spans.iter().filter(|s| s.covers(position)).collect();
        spans.sort_by(|a, b| a.clock.cmp(&b.clock));
        spans
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chars.values().try_for_each(|c| write!(f, "{}", c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReplicaId;
    use serde_json::json;

    fn source(id: &str) -> PositionSource {
        PositionSource::new(ReplicaId::new(id).unwrap())
    }

    fn clock(id: &str) -> LogicalClock {
        LogicalClock::new(ReplicaId::new(id).unwrap())
    }

    #[test]
    fn insert_and_read_back() {
        let mut src = source("alice00000");
        let mut text = Text::new();
        text.insert_str(&mut src, 0, "helo").unwrap();
        text.insert_str(&mut src, 3, "l").unwrap();
        text.insert_str(&mut src, 5, ", world").unwrap();
        text.insert_str(&mut src, 0, ">> ").unwrap();

        assert_eq!(text.to_string(), ">> hello, world");
        assert_eq!(text.len(), 15);
        assert!(text.rows().windows(2).all(|w| w[0].position < w[1].position));
    }

    #[test]
    fn insert_returns_one_position_per_char() {
        let mut src = source("alice00000");
        let mut text = Text::new();
        let positions = text.insert_str(&mut src, 0, "héllo").unwrap();
        assert_eq!(positions.len(), 5);
        assert_eq!(src.counter(), 5);
        assert_eq!(text.index_of(&positions[1]), Some(1));
    }

    #[test]
    fn delete_range() {
        let mut src = source("alice00000");
        let mut text = Text::new();
        text.insert_str(&mut src, 0, "hello world").unwrap();
        let counter = src.counter();

        let removed = text.delete(5..11).unwrap();
        assert_eq!(removed.len(), 6);
        assert_eq!(text.to_string(), "hello");
        assert_eq!(src.counter(), counter);

        assert!(text.delete(3..9).is_err());
        assert!(text.delete(4..2).is_err());
        assert_eq!(text.to_string(), "hello");
    }

    #[test]
    fn insert_out_of_bounds() {
        let mut src = source("alice00000");
        let mut text = Text::new();
        assert!(matches!(
            text.insert_str(&mut src, 1, "x"),
            Err(Error::IndexOutOfBounds { index: 1, len: 0 })
        ));
        assert_eq!(src.counter(), 0);
    }

    #[test]
    fn format_span_to_end_covers_appended_text() {
        let mut src = source("alice00000");
        let mut stamps = clock("alice00000");
        let mut text = Text::new();
        text.insert_str(&mut src, 0, "plain bold").unwrap();

        let span = text.format(6..10, "bold", json!(true), &mut stamps).unwrap();
        assert!(span.end.is_end());

        text.insert_str(&mut src, 10, "er").unwrap();
        assert_eq!(text.to_string(), "plain bolder");
        assert!(text.spans_at(5).is_empty());
        assert_eq!(text.spans_at(6).len(), 1);
        assert_eq!(text.spans_at(11).len(), 1);
    }

    #[test]
    fn format_span_inside_text() {
        let mut src = source("alice00000");
        let mut stamps = clock("alice00000");
        let mut text = Text::new();
        text.insert_str(&mut src, 0, "abcdef").unwrap();
        text.format(1..3, "italic", json!(true), &mut stamps).unwrap();

        assert!(text.spans_at(0).is_empty());
        assert_eq!(text.spans_at(1).len(), 1);
        assert_eq!(text.spans_at(2).len(), 1);
        assert!(text.spans_at(3).is_empty());

        // Text typed inside the span is covered by it.
        text.insert_str(&mut src, 2, "X").unwrap();
        assert_eq!(text.spans_at(2).len(), 1);
    }

    #[test]
    fn format_stamps_with_the_next_tick() {
        let mut src = source("alice00000");
        let mut stamps = clock("alice00000");
        let mut text = Text::new();
        text.insert_str(&mut src, 0, "abc").unwrap();

        let first = text.format(0..1, "bold", json!(true), &mut stamps).unwrap().clock.clone();
        let second = text.format(0..2, "bold", json!(null), &mut stamps).unwrap().clock.clone();
        assert_eq!(first.counter, 1);
        assert_eq!(second.counter, 2);
        assert_eq!(stamps, second);

        // The later write is last at every char both spans cover.
        assert_eq!(text.spans_at(0)[1].value, json!(null));
    }

    #[test]
    fn format_rejects_empty_or_out_of_range() {
        let mut src = source("alice00000");
        let mut stamps = clock("alice00000");
        let mut text = Text::new();
        text.insert_str(&mut src, 0, "abc").unwrap();

        assert!(matches!(
            text.format(1..1, "bold", json!(true), &mut stamps),
            Err(Error::OrderViolation { .. })
        ));
        assert!(text.format(3..3, "bold", json!(true), &mut stamps).is_err());
        assert!(text.format(1..4, "bold", json!(true), &mut stamps).is_err());
        assert!(text.spans().is_empty());
        assert_eq!(stamps.counter, 0);
    }

    #[test]
    fn overlapping_spans_ordered_by_clock() {
        let mut src = source("alice00000");
        let mut alice = clock("alice00000");
        let mut bob = clock("bob0000000");
        let mut text = Text::new();
        text.insert_str(&mut src, 0, "abcdef").unwrap();
        text.format(0..4, "color", json!("red"), &mut bob).unwrap();
        text.format(2..6, "color", json!("blue"), &mut alice).unwrap();

        let spans = text.spans_at(3);
        assert_eq!(spans.len(), 2);
        // Equal counters: the higher replica id is the later write.
        assert_eq!(spans[1].value, json!("red"));
    }

    #[test]
    fn remote_span_advances_local_clock() {
        let mut src = source("alice00000");
        let mut text = Text::new();
        let positions = text.insert_str(&mut src, 0, "abc").unwrap();

        let remote = LogicalClock::with_counter(ReplicaId::new("bob0000000").unwrap(), 7);
        let start = positions[0].clone();
        let span = FormatSpan::new("color", json!("red"), start, Position::End, remote).unwrap();
        let mut stamps = clock("alice00000");
        assert!(text.add_span(span.clone(), &mut stamps));
        assert!(!text.add_span(span, &mut stamps));
        assert_eq!(text.spans().len(), 1);
        assert_eq!(stamps.counter, 7);

        // A local write made after seeing bob's span wins over it.
        text.format(0..3, "color", json!("blue"), &mut stamps).unwrap();
        assert_eq!(text.spans_at(1)[1].value, json!("blue"));
    }

    #[test]
    fn concurrent_inserts_converge() {
        let mut seed = source("seed000000");
        let mut alice = source("alice00000");
        let mut bob = source("bob0000000");

        let mut base = Text::new();
        base.insert_str(&mut seed, 0, "[]").unwrap();

        let mut alice_text = base.clone();
        let mut bob_text = base;
        alice_text.insert_str(&mut alice, 1, "abc").unwrap();
        bob_text.insert_str(&mut bob, 1, "xyz").unwrap();

        for row in alice_text.rows().to_vec() {
            bob_text.apply_row(row).unwrap();
        }
        for row in bob_text.rows().to_vec() {
            alice_text.apply_row(row).unwrap();
        }

        assert_eq!(alice_text.to_string(), bob_text.to_string());
        let merged = alice_text.to_string();
        assert!(merged == "[abcxyz]" || merged == "[xyzabc]", "{}", merged);
    }

    #[test]
    fn remote_delete() {
        let mut src = source("alice00000");
        let mut text = Text::new();
        let positions = text.insert_str(&mut src, 0, "abc").unwrap();

        assert_eq!(text.remove_position(&positions[1]).map(|r| r.value), Some('b'));
        assert_eq!(text.remove_position(&positions[1]), None);
        assert_eq!(text.to_string(), "ac");
    }

    #[test]
    fn serialization_roundtrip() {
        let mut src = source("alice00000");
        let mut stamps = clock("alice00000");
        let mut text = Text::new();
        text.insert_str(&mut src, 0, "hi there").unwrap();
        text.format(0..2, "bold", json!(true), &mut stamps).unwrap();

        let json = serde_json::to_string(&text).unwrap();
        let parsed: Text = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, text);
    }

    #[test]
    fn deserialization_rejects_reversed_span() {
        let json = r#"{
            "chars": {"rows": [
                {"position": "b", "value": "x"},
                {"position": "d", "value": "y"}
            ]},
            "spans": [{
                "attribute": "bold", "value": true, "start": "d", "end": "b",
                "clock": {"replica": "bob0000000", "counter": 1}
            }]
        }"#;
        assert!(serde_json::from_str::<Text>(json).is_err());

        let unsorted = r#"{
            "chars": {"rows": [
                {"position": "d", "value": "y"},
                {"position": "b", "value": "x"}
            ]},
            "spans": []
        }"#;
        assert!(serde_json::from_str::<Text>(unsorted).is_err());
    }
}
