//! Ordered list keyed by positions.
//!
//! The list keeps rows sorted by position, the same order any store that
//! sorts on the position column would return. Local edits go through a
//! [`PositionSource`]; rows from other replicas are merged in with
//! [`OrderedList::apply_row`].

use crate::error::{Error, Result};
use crate::{Position, PositionSource, Row};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::ops::Range;

/// A list whose element order is determined by positions alone.
///
/// Deserializing goes through [`OrderedList::from_rows`], so a stored list
/// with unsorted, duplicate or `End` rows is rejected rather than loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedList<T> {
    rows: Vec<Row<T>>,
}

impl<T> Default for OrderedList<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T> OrderedList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from stored rows.
    ///
    /// Rows must be in strictly increasing position order and none may sit
    /// at [`Position::End`].
    pub fn from_rows(rows: Vec<Row<T>>) -> Result<Self> {
        for row in &rows {
            check_row(row)?;
        }
        if let Some(pair) = rows.windows(2).find(|w| w[0].position >= w[1].position) {
            return Err(Error::OrderViolation {
                before: pair[0].position.to_string(),
                after: pair[1].position.to_string(),
            });
        }
        Ok(Self { rows })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.rows.get(index).map(|r| &r.value)
    }

    /// Position of the element at `index`.
    pub fn position(&self, index: usize) -> Option<&Position> {
        self.rows.get(index).map(|r| &r.position)
    }

    /// Index of the element at `position`, if present.
    pub fn index_of(&self, position: &Position) -> Option<usize> {
        self.rows
            .binary_search_by(|r| r.position.cmp(position))
            .ok()
    }

    /// Rows in sequence order.
    pub fn rows(&self) -> &[Row<T>] {
        &self.rows
    }

    /// Values in sequence order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.rows.iter().map(|r| &r.value)
    }

    /// Insert `value` so that it ends up at `index`.
    ///
    /// One position is created between the current neighbours at `index`.
    pub fn insert(
        &mut self,
        source: &mut PositionSource,
        index: usize,
        value: T,
    ) -> Result<Position> {
        self.check_index(index)?;

        let before = index.checked_sub(1).and_then(|i| self.position(i));
        let after = self.position(index);
        let position = source.create_between(before, after)?;

        self.rows.insert(index, Row::new(position.clone(), value));
        Ok(position)
    }

    /// Insert `values` as a contiguous run starting at `index`.
    ///
    /// Positions are chained, each created right after the previous one, so
    /// the run stays together when another replica inserts in the same gap.
    pub fn insert_run<I>(
        &mut self,
        source: &mut PositionSource,
        index: usize,
        values: I,
    ) -> Result<Vec<Position>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        self.check_index(index)?;

        let values = values.into_iter();
        let before = index.checked_sub(1).and_then(|i| self.position(i));
        let after = self.position(index);
        let positions = source.create_run(before, after, values.len())?;

        let rows = positions
            .iter()
            .cloned()
            .zip(values)
            .map(|(position, value)| Row::new(position, value));
        self.rows.splice(index..index, rows);
        Ok(positions)
    }

    /// Append `value` at the end.
    pub fn push(&mut self, source: &mut PositionSource, value: T) -> Result<Position> {
        self.insert(source, self.rows.len(), value)
    }

    /// Remove and return the row at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Row<T>> {
        if index >= self.rows.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.rows.len(),
            });
        }
        Ok(self.rows.remove(index))
    }

    /// Remove and return the rows in `range`.
    pub fn drain(&mut self, range: Range<usize>) -> Result<Vec<Row<T>>> {
        let len = self.rows.len();
        if range.end > len || range.start > range.end {
            return Err(Error::IndexOutOfBounds {
                index: range.start.max(range.end),
                len,
            });
        }
        Ok(self.rows.drain(range).collect())
    }

    /// Move the element at `from` so it ends up at `to`.
    ///
    /// A move is a delete plus an insert at a fresh position; positions are
    /// never rewritten in place.
    pub fn move_item(
        &mut self,
        source: &mut PositionSource,
        from: usize,
        to: usize,
    ) -> Result<Position> {
        let len = self.rows.len();
        if from >= len || to >= len {
            return Err(Error::IndexOutOfBounds {
                index: from.max(to),
                len,
            });
        }

        let row = self.rows.remove(from);
        let before = to.checked_sub(1).and_then(|i| self.position(i));
        let after = self.position(to);
        match source.create_between(before, after) {
            Ok(position) => {
                self.rows.insert(to, Row::new(position.clone(), row.value));
                Ok(position)
            }
            Err(e) => {
                self.rows.insert(from, row);
                Err(e)
            }
        }
    }

    /// Merge a row written by any replica.
    ///
    /// Returns false if a row already sat at that position, in which case
    /// its value is replaced.
    pub fn apply_row(&mut self, row: Row<T>) -> Result<bool> {
        check_row(&row)?;

        match self.rows.binary_search_by(|r| r.position.cmp(&row.position)) {
            Ok(i) => {
                self.rows[i] = row;
                Ok(false)
            }
            Err(i) => {
                self.rows.insert(i, row);
                Ok(true)
            }
        }
    }

    /// Remove the row at `position`, as when another replica deleted it.
    pub fn remove_position(&mut self, position: &Position) -> Option<Row<T>> {
        let index = self.index_of(position)?;
        Some(self.rows.remove(index))
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index > self.rows.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.rows.len(),
            });
        }
        Ok(())
    }
}

fn check_row<T>(row: &Row<T>) -> Result<()> {
    row.position.validate()?;
    if row.position.is_end() {
        return Err(Error::InvalidPosition("End cannot hold an element".into()));
    }
    Ok(())
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedList<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct StoredRows<T> {
            rows: Vec<Row<T>>,
        }

        let StoredRows { rows } = StoredRows::deserialize(deserializer)?;
        Self::from_rows(rows).map_err(de::Error::custom)
    }
}
