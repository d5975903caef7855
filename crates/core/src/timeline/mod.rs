use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Group, Node, Repeat, Result, StaggerError};

/// Simulated clock handed to the player by hosts without a frame source.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f64) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }

    pub fn now(&self) -> f64 {
        self.time_seconds
    }
}

/// Resolved play window of one item.
///
/// Times are relative to the owning group's activation until [`shifted`]
/// moves them onto an absolute clock.
///
/// [`shifted`]: TimelineEntry::shifted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Slash-joined ids from the root group down to the item.
    pub path: String,
    pub id: String,
    /// Position in traversal order across the whole tree.
    pub index: usize,
    pub start: f64,
    /// End of the first play.
    pub end: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
}

impl TimelineEntry {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Looping entries need the cycle modulo applied before phase lookup.
    pub fn is_looping(&self) -> bool {
        self.repeat.is_some()
    }

    /// Length of one play plus the gap before the next one.
    pub fn cycle_length(&self) -> Option<f64> {
        self.repeat
            .as_ref()
            .map(|repeat| self.duration() + repeat.repeat_delay)
    }

    /// Time at which the entry stops changing, `None` for endless loops.
    pub fn settle_time(&self) -> Option<f64> {
        match &self.repeat {
            None => Some(self.end),
            Some(repeat) => repeat.count.map(|count| {
                self.start + count as f64 * (self.duration() + repeat.repeat_delay) + self.duration()
            }),
        }
    }

    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
            ..self.clone()
        }
    }
}

/// Flattened, ordered entries of a group tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, path: &str) -> Option<&TimelineEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    /// Latest settle time of all entries, `None` if any entry loops forever.
    pub fn total_duration(&self) -> Option<f64> {
        self.entries
            .iter()
            .try_fold(0.0_f64, |acc, entry| entry.settle_time().map(|t| acc.max(t)))
    }

    /// Copies every entry onto an absolute clock starting at `activation`.
    pub fn shifted(&self, activation: f64) -> Vec<TimelineEntry> {
        self.entries
            .iter()
            .map(|entry| entry.shifted(activation))
            .collect()
    }
}

/// Computes when every leaf item of `group` starts and ends.
///
/// The k-th direct child of a group starts at
/// `delay_children + slot(k) * stagger + child.delay`. Nested groups occupy a
/// single slot of their parent and expand their own children on top of it.
pub fn build_timeline(group: &Group) -> Result<Timeline> {
    validate_group(group)?;

    let mut entries = Vec::with_capacity(group.leaf_count());
    expand(group, 0.0, &group.id, &mut entries);
    Ok(Timeline { entries })
}

fn expand(group: &Group, offset: f64, prefix: &str, out: &mut Vec<TimelineEntry>) {
    let total = group.children.len();
    for (position, child) in group.children.iter().enumerate() {
        let slot = group.direction.slot(position, total);
        let base = offset + group.delay_children + slot as f64 * group.stagger;
        let path = format!("{prefix}/{}", child.id());
        match child {
            Node::Item(item) => {
                let start = base + item.delay;
                out.push(TimelineEntry {
                    path,
                    id: item.id.clone(),
                    index: out.len(),
                    start,
                    end: start + item.duration,
                    repeat: item.repeat,
                });
            }
            Node::Group(nested) => expand(nested, base + nested.delay, &path, out),
        }
    }
}

fn validate_group(group: &Group) -> Result<()> {
    check(format!("stagger of group `{}`", group.id), group.stagger)?;
    check(
        format!("delay_children of group `{}`", group.id),
        group.delay_children,
    )?;
    check(format!("delay of group `{}`", group.id), group.delay)?;

    let mut seen = HashSet::with_capacity(group.children.len());
    for child in &group.children {
        if !seen.insert(child.id()) {
            return Err(StaggerError::DuplicateId {
                group: group.id.clone(),
                id: child.id().to_string(),
            });
        }
        match child {
            Node::Item(item) => {
                check(format!("duration of item `{}`", item.id), item.duration)?;
                check(format!("delay of item `{}`", item.id), item.delay)?;
                if let Some(repeat) = &item.repeat {
                    check(
                        format!("repeat_delay of item `{}`", item.id),
                        repeat.repeat_delay,
                    )?;
                }
            }
            Node::Group(nested) => validate_group(nested)?,
        }
    }
    Ok(())
}

fn check(field: String, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StaggerError::invalid(field, value))
    }
}
