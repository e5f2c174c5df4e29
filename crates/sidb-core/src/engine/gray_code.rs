//! Reflected mixed-radix Gray code.
//!
//! Consecutive codes differ in exactly one digit, by exactly one. Walking the
//! code over a charge configuration therefore touches a single site per step,
//! which keeps every step an incremental update.

/// A digit that moved during [`GrayCodeCursor::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigitChange {
    pub position: usize,
    pub old: u8,
    pub new: u8,
}

/// Position in the Gray sequence over digits with the given radices. Digit 0
/// is the most significant.
#[derive(Debug, Clone)]
pub struct GrayCodeCursor {
    radices: Vec<u8>,
    digits: Vec<u8>,
    directions: Vec<i8>,
    rank: u64,
}

impl GrayCodeCursor {
    pub fn new(radices: Vec<u8>) -> Self {
        let n = radices.len();
        Self {
            radices,
            digits: vec![0; n],
            directions: vec![1; n],
            rank: 0,
        }
    }

    /// Number of codes in the sequence, or `None` if it does not fit in `u64`.
    pub fn sequence_length(radices: &[u8]) -> Option<u64> {
        radices
            .iter()
            .try_fold(1u64, |acc, &r| acc.checked_mul(r as u64))
    }

    /// Positions the cursor at the `rank`-th code, ready to continue from there.
    pub fn at_rank(radices: Vec<u8>, rank: u64) -> Option<Self> {
        if rank >= Self::sequence_length(&radices)? {
            return None;
        }
        let n = radices.len();

        let mut plain = vec![0u8; n];
        let mut rest = rank;
        for i in (0..n).rev() {
            let radix = radices[i] as u64;
            plain[i] = (rest % radix) as u8;
            rest /= radix;
        }

        let mut digits = vec![0u8; n];
        let mut directions = vec![1i8; n];
        let mut prefix_odd = false;
        for i in 0..n {
            let (radix, b) = (radices[i], plain[i]);
            if prefix_odd {
                digits[i] = radix - 1 - b;
                directions[i] = -1;
            } else {
                digits[i] = b;
                directions[i] = 1;
            }
            prefix_odd = (prefix_odd && radix % 2 == 1) ^ (b % 2 == 1);
        }

        Some(Self {
            radices,
            digits,
            directions,
            rank,
        })
    }

    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    pub fn rank(&self) -> u64 {
        self.rank
    }

    /// Moves to the next code and returns the digit that changed, or `None` at
    /// the end of the sequence.
    pub fn advance(&mut self) -> Option<DigitChange> {
        for position in (0..self.digits.len()).rev() {
            let current = self.digits[position] as i16;
            let target = current + self.directions[position] as i16;
            if target >= 0 && target < self.radices[position] as i16 {
                self.digits[position] = target as u8;
                self.rank += 1;
                return Some(DigitChange {
                    position,
                    old: current as u8,
                    new: target as u8,
                });
            }
            self.directions[position] = -self.directions[position];
        }
        None
    }
}
