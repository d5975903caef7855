use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{
    build_timeline, EngineConfig, Group, RepeatMode, Result, SequenceState, Signal, StaggerError,
    Timeline, TimelineEntry, Transition, TriggerEvaluator,
};

/// Where an entry sits relative to its play window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Pending,
    Active,
    Done,
    /// The owning run was aborted before the entry finished.
    Cancelled,
}

/// Phase plus the elapsed fraction of the current play, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub phase: Phase,
    pub progress: f64,
}

impl Sample {
    fn new(phase: Phase, progress: f64) -> Self {
        Self { phase, progress }
    }
}

/// Classifies `entry` at absolute time `now`.
pub fn classify(entry: &TimelineEntry, now: f64) -> Sample {
    classify_elapsed(entry, now - entry.start)
}

/// Classifies `entry` given the time elapsed since its start.
///
/// Looping entries wrap `elapsed` by their cycle length first, so the gap
/// between two plays reports `Pending` instead of `Done`.
pub fn classify_elapsed(entry: &TimelineEntry, elapsed: f64) -> Sample {
    if elapsed < 0.0 {
        return Sample::new(Phase::Pending, 0.0);
    }
    let duration = entry.duration();

    let Some(repeat) = &entry.repeat else {
        return if elapsed < duration {
            Sample::new(Phase::Active, elapsed / duration)
        } else {
            Sample::new(Phase::Done, 1.0)
        };
    };

    let cycle = duration + repeat.repeat_delay;
    if cycle <= 0.0 {
        return match repeat.count {
            Some(_) => Sample::new(Phase::Done, 1.0),
            None => Sample::new(Phase::Active, 0.0),
        };
    }

    let cycle_index = (elapsed / cycle).floor();
    // rounding in the division can leave a tiny negative remainder
    let local = (elapsed - cycle_index * cycle).max(0.0);
    let mirrored = repeat.mode == RepeatMode::Reverse && cycle_index as u64 % 2 == 1;
    let oriented = |fraction: f64| if mirrored { 1.0 - fraction } else { fraction };

    if let Some(count) = repeat.count {
        let last = count as f64;
        if cycle_index > last || (cycle_index == last && local >= duration) {
            let last_mirrored = repeat.mode == RepeatMode::Reverse && count % 2 == 1;
            return Sample::new(Phase::Done, if last_mirrored { 0.0 } else { 1.0 });
        }
    }

    if local < duration {
        Sample::new(Phase::Active, oriented(local / duration))
    } else {
        Sample::new(Phase::Pending, oriented(1.0))
    }
}

/// One activation of a group: its entries on the absolute clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: u64,
    pub activated_at: f64,
    pub entries: Vec<TimelineEntry>,
    pub cancelled_at: Option<f64>,
}

impl Run {
    fn settled_by(&self, now: f64) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.settle_time().is_some_and(|t| now >= t))
    }
}

/// Status of one entry in a [`Frame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryStatus {
    pub run: u64,
    pub path: String,
    pub looping: bool,
    pub phase: Phase,
    pub progress: f64,
}

/// Everything the host needs to paint one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub now: f64,
    pub state: SequenceState,
    /// Id of the current run, if any. Cancelled runs keep their own ids.
    pub run: Option<u64>,
    pub entries: Vec<EntryStatus>,
}

impl Frame {
    /// Phase of `path` within the current run.
    pub fn phase_of(&self, path: &str) -> Option<Phase> {
        self.current().find(|s| s.path == path).map(|s| s.phase)
    }

    pub fn current(&self) -> impl Iterator<Item = &EntryStatus> {
        let run = self.run;
        self.entries.iter().filter(move |s| Some(s.run) == run)
    }

    pub fn count(&self, phase: Phase) -> usize {
        self.entries.iter().filter(|s| s.phase == phase).count()
    }
}

/// Drives one group's timeline from trigger signals and clock ticks.
///
/// The player only borrows the group; every activation rebuilds the entries
/// from it instead of editing previous ones.
#[derive(Debug)]
pub struct SequencePlayer<'a> {
    group: &'a Group,
    timeline: Timeline,
    trigger: TriggerEvaluator,
    current: Option<Run>,
    cancelled: VecDeque<Run>,
    history: usize,
    last_now: Option<f64>,
}

impl<'a> SequencePlayer<'a> {
    /// Validates `group` and mounts it at `now`. Immediate groups start playing.
    pub fn mount(group: &'a Group, now: f64, config: &EngineConfig) -> Result<Self> {
        let timeline = build_timeline(group)?;
        let mut player = Self {
            group,
            timeline,
            trigger: TriggerEvaluator::with_rearm_interval(
                group.trigger,
                config.min_rearm_interval,
            ),
            current: None,
            cancelled: VecDeque::new(),
            history: config.cancelled_history,
            last_now: None,
        };
        let transition = player.trigger.mount(now);
        player.apply(transition, now)?;
        Ok(player)
    }

    pub fn group(&self) -> &Group {
        self.group
    }

    /// Entries relative to the group's activation.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn state(&self) -> SequenceState {
        self.trigger.state()
    }

    pub fn current_run(&self) -> Option<&Run> {
        self.current.as_ref()
    }

    pub fn cancelled_runs(&self) -> impl Iterator<Item = &Run> {
        self.cancelled.iter()
    }

    /// Delivers a host signal. Signals the group's policy does not recognise
    /// leave the state untouched.
    pub fn signal(&mut self, signal: Signal, now: f64) -> Result<Transition> {
        match self.trigger.signal(signal, now) {
            Ok(transition) => {
                self.apply(transition, now)?;
                Ok(transition)
            }
            Err(StaggerError::UnknownSignal { policy, signal }) => {
                tracing::debug!(group = %self.group.id, policy, signal, "ignoring unknown signal");
                Ok(Transition::unchanged(self.trigger.state()))
            }
            Err(err) => Err(err),
        }
    }

    /// Reports the phase of every entry at `now`.
    ///
    /// `now` must not move backwards while a run is in flight.
    pub fn advance(&mut self, now: f64) -> Result<Frame> {
        if let (Some(previous), Some(_)) = (self.last_now, &self.current) {
            if now < previous {
                return Err(StaggerError::ClockRegression { previous, now });
            }
        }

        if !self.trigger.settle().is_noop() {
            tracing::trace!(group = %self.group.id, "cancelled group settled");
        }
        if let Some(transition) = self.trigger.poll(now) {
            let at = self.trigger.activated_at().unwrap_or(now);
            self.apply(transition, at)?;
        }
        self.last_now = Some(now);

        let mut entries = Vec::new();
        if let Some(run) = &self.current {
            entries.extend(run.entries.iter().map(|entry| {
                let sample = classify(entry, now);
                EntryStatus {
                    run: run.id,
                    path: entry.path.clone(),
                    looping: entry.is_looping(),
                    phase: sample.phase,
                    progress: sample.progress,
                }
            }));
        }
        for run in &self.cancelled {
            let cut = run.cancelled_at.unwrap_or(now);
            entries.extend(run.entries.iter().map(|entry| EntryStatus {
                run: run.id,
                path: entry.path.clone(),
                looping: entry.is_looping(),
                phase: Phase::Cancelled,
                progress: classify(entry, cut).progress,
            }));
        }

        let finished = self
            .current
            .as_ref()
            .is_some_and(|run| run.settled_by(now));
        if finished && !self.trigger.complete().is_noop() {
            tracing::info!(group = %self.group.id, now, "run complete");
        }

        tracing::trace!(
            group = %self.group.id,
            now,
            active = entries.iter().filter(|s| s.phase == Phase::Active).count(),
            "advanced"
        );

        Ok(Frame {
            now,
            state: self.trigger.state(),
            run: self.current.as_ref().map(|run| run.id),
            entries,
        })
    }

    fn apply(&mut self, transition: Transition, now: f64) -> Result<()> {
        if transition.cancels {
            self.retire(now);
        }
        if transition.activates {
            if self
                .current
                .as_ref()
                .is_some_and(|run| !run.settled_by(now))
            {
                self.retire(now);
            }
            self.timeline = build_timeline(self.group)?;
            let run = Run {
                id: self.trigger.runs(),
                activated_at: now,
                entries: self.timeline.shifted(now),
                cancelled_at: None,
            };
            tracing::info!(group = %self.group.id, run = run.id, now, "run started");
            self.current = Some(run);
            self.last_now = Some(now);
        }
        Ok(())
    }

    fn retire(&mut self, now: f64) {
        let Some(mut run) = self.current.take() else {
            return;
        };
        tracing::info!(group = %self.group.id, run = run.id, now, "run cancelled");
        run.cancelled_at = Some(now);
        self.last_now = None;
        if self.history == 0 {
            return;
        }
        if self.cancelled.len() == self.history {
            self.cancelled.pop_front();
        }
        self.cancelled.push_back(run);
    }
}
