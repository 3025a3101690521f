//! Step budget: the external bound that makes the loop terminate.
//!
//! Two edges of the machine have no internal convergence guarantee: a
//! persistently unsupported generation regenerates forever, and a
//! persistently irrelevant retrieval rewrites forever. The budget caps the
//! total number of node executions; exhausting it is reported as
//! non-convergence, not an infinite loop.

use std::sync::atomic::{AtomicU32, Ordering};

/// Default number of node executions a run may consume.
///
/// Generous enough for several full rewrite cycles (a clean run takes five
/// transitions), small enough that a stuck grader fails fast.
pub const DEFAULT_MAX_TRANSITIONS: u32 = 25;

/// Transition budget for one run.
pub struct StepBudget {
    max_transitions: u32,
    taken: AtomicU32,
}

impl StepBudget {
    /// Create a budget allowing at most `max_transitions` node executions.
    pub fn new(max_transitions: u32) -> Self {
        Self {
            max_transitions,
            taken: AtomicU32::new(0),
        }
    }

    /// Consume one transition. Returns `false` once the budget is spent;
    /// the caller must then abort the run.
    pub fn try_take(&self) -> bool {
        self.taken
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |taken| {
                if taken < self.max_transitions {
                    Some(taken + 1)
                } else {
                    None
                }
            })
            .is_ok()
    }

    /// Transitions consumed so far.
    pub fn taken(&self) -> u32 {
        self.taken.load(Ordering::SeqCst)
    }

    /// Transitions still available.
    pub fn remaining(&self) -> u32 {
        self.max_transitions.saturating_sub(self.taken())
    }

    /// The configured cap.
    pub fn max_transitions(&self) -> u32 {
        self.max_transitions
    }
}

impl Default for StepBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRANSITIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_budget_counts_down() {
        let budget = StepBudget::new(3);

        assert!(budget.try_take());
        assert!(budget.try_take());
        assert_eq!(budget.remaining(), 1);
        assert!(budget.try_take());

        assert!(!budget.try_take());
        assert_eq!(budget.taken(), 3);
    }

    #[test]
    fn test_zero_budget_denies_first_step() {
        let budget = StepBudget::new(0);
        assert!(!budget.try_take());
        assert_eq!(budget.taken(), 0);
    }

    #[test]
    fn test_exhausted_budget_stays_exhausted() {
        let budget = StepBudget::new(1);
        assert!(budget.try_take());
        for _ in 0..10 {
            assert!(!budget.try_take());
        }
        assert_eq!(budget.taken(), 1);
    }

    proptest! {
        /// A budget of B grants exactly B takes no matter how often it is
        /// asked.
        #[test]
        fn prop_budget_grants_exactly_max(max in 0u32..200, extra in 0u32..50) {
            let budget = StepBudget::new(max);
            let mut granted = 0u32;
            for _ in 0..(max + extra) {
                if budget.try_take() {
                    granted += 1;
                }
            }
            prop_assert_eq!(granted, max);
            prop_assert_eq!(budget.taken(), max);
            prop_assert_eq!(budget.remaining(), 0);
        }
    }
}
