//! Row types kept by sequence containers.

use crate::error::{Error, Result};
use crate::{LogicalClock, Position};
use serde::{Deserialize, Serialize};

/// One element of a sequence: a value at a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row<T> {
    /// Where the element sits in the sequence
    pub position: Position,
    /// The element itself
    pub value: T,
}

impl<T> Row<T> {
    pub fn new(position: Position, value: T) -> Self {
        Self { position, value }
    }
}

/// An attribute asserted over `[start, end)`.
///
/// `end` may be [`Position::End`], meaning the span runs to whatever the end
/// of the text is at read time. Overlapping spans on the same attribute are
/// not resolved here; `clock` is what the caller uses to pick a winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredSpan")]
pub struct FormatSpan {
    /// Attribute name, e.g. "bold"
    pub attribute: String,
    /// Attribute value, `null` to clear
    pub value: serde_json::Value,
    /// First covered position (inclusive)
    pub start: Position,
    /// First uncovered position (exclusive)
    pub end: Position,
    /// Caller-maintained clock for conflict resolution
    pub clock: LogicalClock,
}

impl FormatSpan {
    /// Create a span, checking that `start < end` and `start` is finite.
    pub fn new(
        attribute: impl Into<String>,
        value: serde_json::Value,
        start: Position,
        end: Position,
        clock: LogicalClock,
    ) -> Result<Self> {
        start.validate()?;
        end.validate()?;
        if start.is_end() || start >= end {
            return Err(Error::OrderViolation {
                before: start.to_string(),
                after: end.to_string(),
            });
        }
        Ok(Self {
            attribute: attribute.into(),
            value,
            start,
            end,
            clock,
        })
    }

    /// Whether `position` falls inside `[start, end)`.
    pub fn covers(&self, position: &Position) -> bool {
        &self.start <= position && position < &self.end
    }
}

/// Wire form of a [`FormatSpan`], checked by [`FormatSpan::new`] on load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSpan {
    attribute: String,
    value: serde_json::Value,
    start: Position,
    end: Position,
    clock: LogicalClock,
}

impl TryFrom<StoredSpan> for FormatSpan {
    type Error = Error;

    fn try_from(span: StoredSpan) -> Result<Self> {
        FormatSpan::new(span.attribute, span.value, span.start, span.end, span.clock)
    }
}
