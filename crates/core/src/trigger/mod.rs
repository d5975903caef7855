use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Result, StaggerError, TriggerPolicy};

/// Lifecycle of one group's animation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceState {
    #[default]
    Idle,
    /// Trigger satisfied, activation deferred until the re-arm interval passes.
    Armed,
    Running,
    Complete,
    /// Reset before completion. Settles to `Idle` on the next advance.
    Cancelled,
}

/// External event delivered by the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    VisibilityEntered,
    VisibilityExited,
    ManualFire,
    ManualReset,
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Signal::VisibilityEntered => "visibility-entered",
            Signal::VisibilityExited => "visibility-exited",
            Signal::ManualFire => "manual-fire",
            Signal::ManualReset => "manual-reset",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Signal {
    type Err = StaggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visible" | "enter" | "visibility-entered" => Ok(Signal::VisibilityEntered),
            "hidden" | "exit" | "visibility-exited" => Ok(Signal::VisibilityExited),
            "fire" | "show" | "manual-fire" => Ok(Signal::ManualFire),
            "reset" | "hide" | "manual-reset" => Ok(Signal::ManualReset),
            other => Err(StaggerError::msg(format!("unrecognised signal `{other}`"))),
        }
    }
}

/// Outcome of evaluating one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: SequenceState,
    pub to: SequenceState,
    /// A new run starts; its entries must be rebuilt from the new activation time.
    pub activates: bool,
    /// The in-flight run is aborted.
    pub cancels: bool,
}

impl Transition {
    pub fn unchanged(state: SequenceState) -> Self {
        Self {
            from: state,
            to: state,
            activates: false,
            cancels: false,
        }
    }

    fn between(from: SequenceState, to: SequenceState) -> Self {
        Self {
            from,
            to,
            activates: to == SequenceState::Running && from != SequenceState::Running,
            cancels: to == SequenceState::Cancelled,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.from == self.to && !self.activates && !self.cancels
    }
}

/// Transition taken when the group is first mounted.
pub fn evaluate_mount(state: SequenceState, policy: TriggerPolicy) -> Transition {
    match (policy, state) {
        (TriggerPolicy::Immediate, SequenceState::Idle) => {
            Transition::between(state, SequenceState::Running)
        }
        _ => Transition::unchanged(state),
    }
}

/// Pure transition function of the trigger policy table.
///
/// Signals the policy does not understand yield [`StaggerError::UnknownSignal`];
/// callers treat that as a no-op.
pub fn evaluate(
    state: SequenceState,
    policy: TriggerPolicy,
    signal: Signal,
) -> Result<Transition> {
    use SequenceState::*;

    let next = match (policy, signal, state) {
        (TriggerPolicy::OnVisible, Signal::VisibilityEntered, Idle) => Running,
        // fire-once: later visibility changes never re-trigger
        (TriggerPolicy::OnVisible, Signal::VisibilityEntered | Signal::VisibilityExited, s) => s,
        (TriggerPolicy::Manual, Signal::ManualFire, Idle | Complete | Cancelled) => Running,
        (TriggerPolicy::Manual, Signal::ManualFire, s @ (Running | Armed)) => s,
        (TriggerPolicy::Manual, Signal::ManualReset, Running) => Cancelled,
        (TriggerPolicy::Manual, Signal::ManualReset, Armed | Complete | Cancelled | Idle) => Idle,
        (policy, signal, _) => {
            return Err(StaggerError::UnknownSignal {
                policy: policy.name(),
                signal: signal.name(),
            })
        }
    };
    Ok(Transition::between(state, next))
}

/// Owns the [`SequenceState`] of one group and stamps activation times.
#[derive(Debug, Clone)]
pub struct TriggerEvaluator {
    policy: TriggerPolicy,
    state: SequenceState,
    min_rearm_interval: f64,
    activated_at: Option<f64>,
    armed_until: Option<f64>,
    runs: u64,
}

impl TriggerEvaluator {
    pub fn new(policy: TriggerPolicy) -> Self {
        Self::with_rearm_interval(policy, 0.0)
    }

    /// Manual groups will not re-enter `Running` sooner than `interval`
    /// seconds after their previous activation.
    pub fn with_rearm_interval(policy: TriggerPolicy, interval: f64) -> Self {
        Self {
            policy,
            state: SequenceState::Idle,
            min_rearm_interval: interval.max(0.0),
            activated_at: None,
            armed_until: None,
            runs: 0,
        }
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Activation time of the most recent run.
    pub fn activated_at(&self) -> Option<f64> {
        self.activated_at
    }

    /// Number of runs started so far. Also serves as the id of the latest run.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn mount(&mut self, now: f64) -> Transition {
        let transition = evaluate_mount(self.state, self.policy);
        self.commit(transition, now)
    }

    pub fn signal(&mut self, signal: Signal, now: f64) -> Result<Transition> {
        let transition = evaluate(self.state, self.policy, signal)?;

        if transition.activates {
            if let Some(due) = self.rearm_due(now) {
                tracing::debug!(%signal, now, due, "re-arm rate limited, deferring activation");
                self.armed_until = Some(due);
                let armed = Transition::between(self.state, SequenceState::Armed);
                self.state = SequenceState::Armed;
                return Ok(armed);
            }
        }
        if transition.to != SequenceState::Armed {
            self.armed_until = None;
        }
        Ok(self.commit(transition, now))
    }

    /// Fires a deferred activation once its re-arm interval has elapsed.
    pub fn poll(&mut self, now: f64) -> Option<Transition> {
        let due = self.armed_until?;
        if self.state != SequenceState::Armed || now < due {
            return None;
        }
        self.armed_until = None;
        let transition = Transition::between(self.state, SequenceState::Running);
        Some(self.commit(transition, due))
    }

    /// Marks the current run as finished.
    pub fn complete(&mut self) -> Transition {
        if self.state != SequenceState::Running {
            return Transition::unchanged(self.state);
        }
        let transition = Transition::between(self.state, SequenceState::Complete);
        self.state = transition.to;
        transition
    }

    /// Lets a cancelled group fall back to `Idle`.
    pub fn settle(&mut self) -> Transition {
        if self.state != SequenceState::Cancelled {
            return Transition::unchanged(self.state);
        }
        let transition = Transition::between(self.state, SequenceState::Idle);
        self.state = transition.to;
        transition
    }

    fn rearm_due(&self, now: f64) -> Option<f64> {
        if self.policy != TriggerPolicy::Manual || self.min_rearm_interval <= 0.0 {
            return None;
        }
        let due = self.activated_at? + self.min_rearm_interval;
        (now < due).then_some(due)
    }

    fn commit(&mut self, transition: Transition, now: f64) -> Transition {
        if transition.activates {
            self.activated_at = Some(now);
            self.runs += 1;
        }
        self.state = transition.to;
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_groups_run_on_mount() {
        let mut trigger = TriggerEvaluator::new(TriggerPolicy::Immediate);
        let transition = trigger.mount(0.0);

        assert!(transition.activates);
        assert_eq!(trigger.state(), SequenceState::Running);
        assert_eq!(trigger.activated_at(), Some(0.0));
    }

    #[test]
    fn on_visible_waits_for_visibility() {
        let mut trigger = TriggerEvaluator::new(TriggerPolicy::OnVisible);
        assert!(trigger.mount(0.0).is_noop());
        assert_eq!(trigger.state(), SequenceState::Idle);

        trigger.signal(Signal::VisibilityEntered, 1.5).unwrap();
        assert_eq!(trigger.state(), SequenceState::Running);
        assert_eq!(trigger.activated_at(), Some(1.5));
    }

    #[test]
    fn on_visible_fires_only_once() {
        let mut trigger = TriggerEvaluator::new(TriggerPolicy::OnVisible);
        let first = trigger.signal(Signal::VisibilityEntered, 0.0).unwrap();
        let exit = trigger.signal(Signal::VisibilityExited, 0.5).unwrap();
        let again = trigger.signal(Signal::VisibilityEntered, 1.0).unwrap();

        assert!(first.activates);
        assert!(exit.is_noop());
        assert!(again.is_noop());
        assert_eq!(trigger.runs(), 1);

        trigger.complete();
        let after_complete = trigger.signal(Signal::VisibilityEntered, 9.0).unwrap();
        assert!(after_complete.is_noop());
        assert_eq!(trigger.state(), SequenceState::Complete);
    }

    #[test]
    fn manual_groups_cycle() {
        let mut trigger = TriggerEvaluator::new(TriggerPolicy::Manual);
        for round in 1..=3 {
            let fire = trigger.signal(Signal::ManualFire, round as f64).unwrap();
            assert!(fire.activates);
            let reset = trigger.signal(Signal::ManualReset, round as f64 + 0.5).unwrap();
            assert!(reset.cancels);
            assert_eq!(trigger.state(), SequenceState::Cancelled);
            trigger.settle();
            assert_eq!(trigger.state(), SequenceState::Idle);
        }
        assert_eq!(trigger.runs(), 3);
    }

    #[test]
    fn manual_refires_after_completion() {
        let mut trigger = TriggerEvaluator::new(TriggerPolicy::Manual);
        trigger.signal(Signal::ManualFire, 0.0).unwrap();
        trigger.complete();

        let reset = trigger.signal(Signal::ManualReset, 2.0).unwrap();
        assert!(!reset.cancels);
        assert_eq!(trigger.state(), SequenceState::Idle);

        let fire = evaluate(SequenceState::Complete, TriggerPolicy::Manual, Signal::ManualFire)
            .unwrap();
        assert!(fire.activates);
    }

    #[test]
    fn unknown_signals_are_reported_without_changing_state() {
        let mut trigger = TriggerEvaluator::new(TriggerPolicy::OnVisible);
        let err = trigger.signal(Signal::ManualFire, 0.0).unwrap_err();

        assert!(matches!(err, StaggerError::UnknownSignal { .. }));
        assert_eq!(trigger.state(), SequenceState::Idle);

        let err = evaluate(
            SequenceState::Running,
            TriggerPolicy::Immediate,
            Signal::VisibilityExited,
        )
        .unwrap_err();
        assert!(format!("{err}").contains("immediate"));
    }

    #[test]
    fn rearm_interval_defers_activation() {
        let mut trigger = TriggerEvaluator::with_rearm_interval(TriggerPolicy::Manual, 1.0);
        trigger.signal(Signal::ManualFire, 0.0).unwrap();
        trigger.complete();

        let early = trigger.signal(Signal::ManualFire, 0.4).unwrap();
        assert_eq!(early.to, SequenceState::Armed);
        assert!(!early.activates);
        assert!(trigger.poll(0.9).is_none());

        let fired = trigger.poll(1.2).expect("deferred fire should be due");
        assert!(fired.activates);
        assert_eq!(trigger.activated_at(), Some(1.0));
        assert_eq!(trigger.runs(), 2);
    }

    #[test]
    fn early_fire_is_deferred_not_dropped() {
        let mut trigger = TriggerEvaluator::with_rearm_interval(TriggerPolicy::Manual, 1.0);
        trigger.signal(Signal::ManualFire, 0.0).unwrap();
        trigger.complete();

        trigger.signal(Signal::ManualFire, 0.4).unwrap();
        // a second fire while armed does not queue another run
        let repeat = trigger.signal(Signal::ManualFire, 0.6).unwrap();
        assert!(repeat.is_noop());
        assert_eq!(trigger.state(), SequenceState::Armed);
        assert_eq!(trigger.runs(), 1);

        let fired = trigger.poll(1.5).expect("armed fire should start once due");
        assert_eq!(fired.to, SequenceState::Running);
        assert_eq!(trigger.runs(), 2);
        // stamped at the due time, not at the late poll
        assert_eq!(trigger.activated_at(), Some(1.0));
        assert!(trigger.poll(3.0).is_none());
    }

    #[test]
    fn reset_drops_a_deferred_fire() {
        let mut trigger = TriggerEvaluator::with_rearm_interval(TriggerPolicy::Manual, 1.0);
        trigger.signal(Signal::ManualFire, 0.0).unwrap();
        trigger.complete();
        trigger.signal(Signal::ManualFire, 0.2).unwrap();
        trigger.signal(Signal::ManualReset, 0.3).unwrap();

        assert_eq!(trigger.state(), SequenceState::Idle);
        assert!(trigger.poll(5.0).is_none());
    }

    #[test]
    fn parses_signal_names() {
        assert_eq!("visible".parse::<Signal>().unwrap(), Signal::VisibilityEntered);
        assert_eq!("Manual-Reset".parse::<Signal>().unwrap(), Signal::ManualReset);
        assert!("wiggle".parse::<Signal>().is_err());
    }
}
