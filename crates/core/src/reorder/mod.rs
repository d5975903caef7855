//! Timer-driven list reshuffle.
//!
//! A [`ReorderLoop`] is a Manual group that fires itself every `period`
//! seconds. The host animates the layout change; this module only decides
//! when the order changes and what it becomes.

use rand::Rng;

use crate::{
    EngineConfig, Result, SequenceState, Signal, StaggerError, TriggerEvaluator, TriggerPolicy,
};

/// Chance that two neighbours swap during one shuffle pass.
pub const DEFAULT_SWAP_PROBABILITY: f64 = 0.4;

/// Returns a copy of `items` after one pass of random adjacent swaps.
///
/// The result is biased towards the input order: an element moves at most a
/// few places per pass, and with low probability nothing moves at all.
/// Probabilities outside `[0, 1]` are clamped; NaN never swaps.
pub fn biased_shuffle<T: Clone, R: Rng + ?Sized>(
    items: &[T],
    rng: &mut R,
    swap_probability: f64,
) -> Vec<T> {
    let p = if swap_probability.is_nan() {
        0.0
    } else {
        swap_probability.clamp(0.0, 1.0)
    };
    let mut out = items.to_vec();
    for i in 1..out.len() {
        if rng.gen_bool(p) {
            out.swap(i - 1, i);
        }
    }
    out
}

/// Reshuffles a list on a fixed period.
#[derive(Debug, Clone)]
pub struct ReorderLoop<T> {
    order: Vec<T>,
    period: f64,
    swap_probability: f64,
    trigger: TriggerEvaluator,
    next_due: f64,
    shuffles: u64,
    unchanged: u64,
}

impl<T: Clone + PartialEq> ReorderLoop<T> {
    pub fn new(initial: Vec<T>, period: f64, config: &EngineConfig) -> Result<Self> {
        if !period.is_finite() || period <= 0.0 {
            return Err(StaggerError::invalid("reorder period", period));
        }
        Ok(Self {
            order: initial,
            period,
            swap_probability: DEFAULT_SWAP_PROBABILITY,
            trigger: TriggerEvaluator::with_rearm_interval(
                TriggerPolicy::Manual,
                config.min_rearm_interval,
            ),
            next_due: period,
            shuffles: 0,
            unchanged: 0,
        })
    }

    pub fn with_swap_probability(mut self, p: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(StaggerError::invalid("swap probability", p));
        }
        self.swap_probability = p;
        Ok(self)
    }

    pub fn order(&self) -> &[T] {
        &self.order
    }

    pub fn shuffles(&self) -> u64 {
        self.shuffles
    }

    /// Shuffles that produced exactly the order they started from.
    pub fn unchanged_shuffles(&self) -> u64 {
        self.unchanged
    }

    pub fn state(&self) -> SequenceState {
        self.trigger.state()
    }

    /// Advances the loop to `now`. Returns `true` when the order was reshuffled.
    pub fn tick<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> Result<bool> {
        let mut activated = self.trigger.poll(now).is_some_and(|t| t.activates);

        if !activated && now >= self.next_due && self.trigger.state() != SequenceState::Armed {
            activated = self.trigger.signal(Signal::ManualFire, now)?.activates;
        }
        if !activated {
            return Ok(false);
        }

        let at = self.trigger.activated_at().unwrap_or(now);
        let shuffled = biased_shuffle(&self.order, rng, self.swap_probability);
        if shuffled == self.order {
            self.unchanged += 1;
            tracing::debug!(at, "shuffle reproduced its input");
        }
        self.order = shuffled;
        self.shuffles += 1;
        self.next_due += self.period;
        if self.next_due <= at {
            self.next_due = at + self.period;
        }
        self.trigger.complete();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    const COLORS: [&str; 4] = ["#ff0088", "#dd00ee", "#9911ff", "#0d63f8"];

    #[test]
    fn shuffle_keeps_every_element() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut shuffled = biased_shuffle(&COLORS, &mut rng, DEFAULT_SWAP_PROBABILITY);
        shuffled.sort_unstable();
        let mut expected = COLORS.to_vec();
        expected.sort_unstable();

        assert_eq!(shuffled, expected);
    }

    #[test]
    fn extreme_probabilities_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(biased_shuffle(&COLORS, &mut rng, 0.0), COLORS.to_vec());
        // every neighbour swaps, so the head bubbles to the tail
        assert_eq!(
            biased_shuffle(&[1, 2, 3, 4], &mut rng, 1.0),
            vec![2, 3, 4, 1]
        );
        assert_eq!(biased_shuffle(&[1, 2], &mut rng, 7.5), vec![2, 1]);
    }

    #[test]
    fn nan_probability_leaves_the_order_alone() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(biased_shuffle(&COLORS, &mut rng, f64::NAN), COLORS.to_vec());
    }

    #[test]
    fn rejects_swap_probability_outside_unit_range() {
        let reorder = || ReorderLoop::new(vec![1, 2], 1.0, &EngineConfig::default()).unwrap();

        assert!(matches!(
            reorder().with_swap_probability(f64::NAN),
            Err(StaggerError::InvalidParameter { .. })
        ));
        assert!(reorder().with_swap_probability(1.5).is_err());
        assert!(reorder().with_swap_probability(-0.1).is_err());
        assert!(reorder().with_swap_probability(1.0).is_ok());
    }

    #[test]
    fn fires_once_per_period() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut reorder = ReorderLoop::new(COLORS.to_vec(), 1.0, &EngineConfig::default()).unwrap();

        let mut fired = Vec::new();
        for step in 0..=40 {
            let now = step as f64 * 0.1;
            if reorder.tick(now, &mut rng).unwrap() {
                fired.push(step);
            }
        }

        assert_eq!(reorder.shuffles(), 4);
        assert_eq!(fired.len(), 4);
        assert_eq!(reorder.state(), SequenceState::Complete);
        assert_eq!(reorder.order().len(), COLORS.len());
    }

    #[test]
    fn counts_shuffles_that_change_nothing() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut reorder = ReorderLoop::new(COLORS.to_vec(), 1.0, &EngineConfig::default())
            .unwrap()
            .with_swap_probability(0.0)
            .unwrap();

        reorder.tick(1.0, &mut rng).unwrap();
        reorder.tick(2.0, &mut rng).unwrap();

        assert_eq!(reorder.shuffles(), 2);
        assert_eq!(reorder.unchanged_shuffles(), 2);
    }

    #[test]
    fn rearm_interval_slows_the_loop() {
        let mut rng = StdRng::seed_from_u64(9);
        let config = EngineConfig {
            min_rearm_interval: 2.5,
            ..Default::default()
        };
        let mut reorder = ReorderLoop::new(COLORS.to_vec(), 1.0, &config).unwrap();

        assert!(reorder.tick(1.0, &mut rng).unwrap());
        assert!(!reorder.tick(2.0, &mut rng).unwrap());
        assert_eq!(reorder.state(), SequenceState::Armed);
        assert!(!reorder.tick(3.0, &mut rng).unwrap());
        assert!(reorder.tick(3.5, &mut rng).unwrap());
        assert_eq!(reorder.shuffles(), 2);
    }

    #[test]
    fn rejects_non_positive_period() {
        assert!(ReorderLoop::new(vec![1], 0.0, &EngineConfig::default()).is_err());
    }
}
