//! Capped sequential allocation.
//!
//! Both waterfalls are sequences of capped subtractions from one remaining
//! amount: each step takes at most its capacity, and the residual flows to
//! the next step. Adding a tier means adding a `take` call, not a branch.

use keel_types::Amount;

/// A remaining-amount accumulator for waterfall distribution.
#[derive(Clone, Copy, Debug)]
pub struct Waterfall {
    total: Amount,
    remaining: Amount,
}

impl Waterfall {
    /// Start a waterfall over `total`.
    pub fn new(total: Amount) -> Self {
        Self {
            total,
            remaining: total,
        }
    }

    /// Take up to `capacity` from the remaining amount. Returns the amount
    /// actually taken.
    pub fn take(&mut self, capacity: Amount) -> Amount {
        let step = self.remaining.min(capacity);
        self.remaining -= step;
        step
    }

    /// The amount not yet allocated.
    pub fn remaining(&self) -> Amount {
        self.remaining
    }

    /// The amount the waterfall started with.
    pub fn total(&self) -> Amount {
        self.total
    }

    /// The amount allocated so far.
    pub fn allocated(&self) -> Amount {
        self.total - self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_caps_at_capacity() {
        let mut wf = Waterfall::new(100);
        assert_eq!(wf.take(30), 30);
        assert_eq!(wf.remaining(), 70);
    }

    #[test]
    fn test_take_caps_at_remaining() {
        let mut wf = Waterfall::new(10);
        assert_eq!(wf.take(30), 10);
        assert_eq!(wf.remaining(), 0);
    }

    #[test]
    fn test_exhausted_takes_are_zero() {
        let mut wf = Waterfall::new(5);
        wf.take(5);
        assert_eq!(wf.take(100), 0);
        assert_eq!(wf.take(0), 0);
    }

    #[test]
    fn test_steps_sum_to_total() {
        let mut wf = Waterfall::new(57);
        let a = wf.take(20);
        let b = wf.take(0);
        let c = wf.take(25);
        let d = wf.take(100);
        assert_eq!(a + b + c + d, 57);
        assert_eq!(wf.allocated(), 57);
        assert_eq!(wf.remaining(), 0);
    }

    #[test]
    fn test_partial_step_flows_to_next() {
        // a partially-funded step is immediately followed by another
        // partial step, with no amount lost between them
        let mut wf = Waterfall::new(12);
        assert_eq!(wf.take(7), 7);
        assert_eq!(wf.take(3), 3);
        assert_eq!(wf.take(10), 2);
        assert_eq!(wf.remaining(), 0);
    }
}
