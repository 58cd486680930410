//! Position source: per-replica generator of dense positions.
//!
//! # Key layout
//!
//! Every generated key is `body ++ replica ++ counter`:
//!
//! - `body` is a short digit string that fits strictly between the two
//!   bounds (see `subdivide`);
//! - `replica` is the owning replica id, verbatim;
//! - `counter` is the source's call counter in an order-preserving,
//!   self-delimiting encoding (see `encode_counter`).
//!
//! Two replicas given the same bounds compute the same body and differ in
//! the suffix. A replica that keeps appending after its own last position
//! reuses that position's body and only bumps the counter, so a run of
//! sequential inserts does not grow the key.

use crate::error::{Error, Result};
use crate::position::{digits_to_key, key_digits, validate_key, Position, BASE};
use crate::replica::ReplicaId;

/// Longest counter encoding: one length digit plus 11 value digits fit `u64::MAX`.
const MAX_COUNTER_DIGITS: usize = 11;

/// Final counter digit radix. The final digit is shifted by one so a key
/// never ends in the minimum symbol.
const LAST_DIGIT_RADIX: u64 = 63;

/// Generator of positions for one replica.
///
/// A source is deliberately not `Clone`: two copies would hand out the same
/// replica/counter pairs.
#[derive(Debug)]
pub struct PositionSource {
    replica: ReplicaId,
    replica_digits: Vec<u8>,
    counter: u64,
}

impl PositionSource {
    /// Create a source owning `replica`. The counter starts at 0.
    pub fn new(replica: ReplicaId) -> Self {
        let replica_digits = replica.digits();
        Self {
            replica,
            replica_digits,
            counter: 0,
        }
    }

    /// The replica this source generates for.
    pub fn replica(&self) -> &ReplicaId {
        &self.replica
    }

    /// Number of positions created so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Create a position strictly between `before` and `after`.
    ///
    /// `None` for `before` means the start of the sequence, `None` for
    /// `after` means [`Position::End`]. Fails with [`Error::InvalidPosition`]
    /// for malformed bounds and [`Error::OrderViolation`] unless
    /// `before < after`. The counter only advances on success.
    pub fn create_between(
        &mut self,
        before: Option<&Position>,
        after: Option<&Position>,
    ) -> Result<Position> {
        let lower = match before {
            None => None,
            Some(Position::Finite(key)) => {
                validate_key(key)?;
                Some(key.as_str())
            }
            Some(Position::End) => {
                return Err(order_violation(&Position::End, after));
            }
        };
        let upper = match after {
            None | Some(Position::End) => None,
            Some(Position::Finite(key)) => {
                validate_key(key)?;
                Some(key.as_str())
            }
        };
        if let (Some(lo), Some(hi)) = (lower, upper) {
            if lo >= hi {
                return Err(order_violation(&Position::Finite(lo.to_string()), after));
            }
        }

        let lower = lower.map(key_digits).unwrap_or_default();
        let upper = upper.map(key_digits);
        let counter = self.counter + 1;

        let digits = match self.extend_own_run(&lower, upper.as_deref(), counter) {
            Some(digits) => digits,
            None => {
                let mut digits = subdivide(&lower, upper.as_deref())?;
                digits.extend_from_slice(&self.replica_digits);
                encode_counter(counter, &mut digits);
                digits
            }
        };

        self.counter = counter;
        let position = Position::Finite(digits_to_key(&digits));
        tracing::trace!(
            replica = %self.replica,
            counter,
            position = %position,
            "created position"
        );
        Ok(position)
    }

    /// Position usable as the only element of an empty sequence.
    pub fn create_first(&mut self) -> Result<Position> {
        self.create_between(None, None)
    }

    /// Some position before `after`.
    pub fn create_before(&mut self, after: &Position) -> Result<Position> {
        self.create_between(None, Some(after))
    }

    /// Some position after `before`.
    pub fn create_after(&mut self, before: &Position) -> Result<Position> {
        self.create_between(Some(before), None)
    }

    /// Create `count` increasing positions between `before` and `after`.
    ///
    /// Each position is created with the previous one as its lower bound,
    /// which is how a pasted run of elements is inserted.
    pub fn create_run(
        &mut self,
        before: Option<&Position>,
        after: Option<&Position>,
        count: usize,
    ) -> Result<Vec<Position>> {
        let mut run = Vec::with_capacity(count);
        for _ in 0..count {
            let next = self.create_between(run.last().or(before), after)?;
            run.push(next);
        }
        Ok(run)
    }

    /// Reuse the body of our own previous position with a fresh counter.
    ///
    /// Only applies when `lower` ends in this replica's suffix, and the
    /// candidate is still checked against both bounds.
    fn extend_own_run(&self, lower: &[u8], upper: Option<&[u8]>, counter: u64) -> Option<Vec<u8>> {
        let body = own_body_len(lower, &self.replica_digits)?;

        let mut digits = lower[..body].to_vec();
        digits.extend_from_slice(&self.replica_digits);
        encode_counter(counter, &mut digits);

        let above = digits.as_slice() > lower;
        let below = upper.map_or(true, |upper| digits.as_slice() < upper);
        (above && below).then_some(digits)
    }
}

fn order_violation(before: &Position, after: Option<&Position>) -> Error {
    let before = before.to_string();
    let after = after.map_or_else(|| Position::End.to_string(), Position::to_string);
    tracing::warn!(%before, %after, "rejected out-of-order bounds");
    Error::OrderViolation { before, after }
}

/// Short digit string `m` such that `lower < m ++ s < upper` for every
/// non-empty suffix `s`.
///
/// Gaps are split in the middle, except below a bound when nothing is
/// left of `lower`: there the digit just under `upper` is taken.
///
/// An empty `lower` sits below every key; `None` for `upper` sits above
/// every key. Both bounds must be well formed and `lower < upper`.
fn subdivide(lower: &[u8], upper: Option<&[u8]>) -> Result<Vec<u8>> {
    let mut digits = Vec::with_capacity(lower.len() + 1);
    let mut upper = upper;

    for i in 0.. {
        // -1: past the end of the lower bound. BASE: no upper bound left.
        let lo = lower.get(i).map_or(-1, |d| i16::from(*d));
        let hi = match upper {
            None => i16::from(BASE),
            Some(upper) => match upper.get(i) {
                Some(d) => i16::from(*d),
                // upper is a prefix of lower
                None => break,
            },
        };

        match hi - lo {
            // Lower bound exhausted under a real upper digit: step just below
            // it so repeated prepends walk down one digit instead of halving.
            // At the floor a high digit is appended to leave room underneath.
            gap if gap > 1 && lo < 0 && upper.is_some() => {
                let digit = (hi - 1) as u8;
                digits.push(digit);
                if digit == 0 {
                    digits.push(BASE - 1);
                }
                return Ok(digits);
            }
            gap if gap > 1 => {
                digits.push(((lo + hi) / 2) as u8);
                return Ok(digits);
            }
            // Shared digit, keep walking.
            0 => digits.push(lo as u8),
            // Adjacent digits with the lower bound exhausted: the upper digit
            // is the minimum, so copy it and look one digit deeper.
            1 if lo < 0 => digits.push(0),
            // Adjacent digits: taking the lower one puts us below `upper`
            // for good, and only `lower` constrains the rest.
            1 => {
                digits.push(lo as u8);
                upper = None;
            }
            _ => break,
        }
    }

    Err(Error::OrderViolation {
        before: digits_to_key(lower),
        after: upper.map_or_else(|| Position::End.to_string(), digits_to_key),
    })
}

/// Append the order-preserving encoding of `counter` to `out`.
///
/// Layout: one length digit `n`, then `n - 1` base-64 digits and a final
/// base-63 digit stored as `1..=63`. Longer encodings carry larger values,
/// so comparing encodings digit by digit compares the counters.
fn encode_counter(counter: u64, out: &mut Vec<u8>) {
    let last = (counter % LAST_DIGIT_RADIX) as u8 + 1;
    let mut high = counter / LAST_DIGIT_RADIX;

    let mut digits = Vec::with_capacity(MAX_COUNTER_DIGITS);
    while high > 0 {
        digits.push((high % u64::from(BASE)) as u8);
        high /= u64::from(BASE);
    }

    out.push(digits.len() as u8 + 1);
    out.extend(digits.iter().rev());
    out.push(last);
}

/// Length of the body if `key` ends with `replica ++ counter`.
fn own_body_len(key: &[u8], replica: &[u8]) -> Option<usize> {
    (1..=MAX_COUNTER_DIGITS).find_map(|n| {
        let counter_start = key.len().checked_sub(n + 1)?;
        let body = counter_start.checked_sub(replica.len())?;
        let matches = usize::from(key[counter_start]) == n
            && &key[body..counter_start] == replica;
        matches.then_some(body)
    })
}
