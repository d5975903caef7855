use serde::{Deserialize, Serialize};

/// Leaf animated unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    /// Seconds one play of the animation takes.
    pub duration: f64,
    /// Seconds added on top of the stagger offset assigned by the parent.
    #[serde(default)]
    pub delay: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
}

impl Item {
    pub fn new(id: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            duration,
            delay: 0.0,
            repeat: None,
        }
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn repeating(mut self, repeat: Repeat) -> Self {
        self.repeat = Some(repeat);
        self
    }
}

/// How a repeating item replays after each cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatMode {
    /// Every cycle plays from the start.
    #[default]
    Loop,
    /// Odd cycles play backwards.
    Reverse,
}

/// Repetition settings for continuously rotating or pulsing items.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Repeat {
    /// Pause between the end of one play and the start of the next.
    #[serde(default)]
    pub repeat_delay: f64,
    /// Additional plays after the first one. `None` repeats forever.
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub mode: RepeatMode,
}

impl Repeat {
    pub fn forever(repeat_delay: f64) -> Self {
        Self {
            repeat_delay,
            count: None,
            mode: RepeatMode::Loop,
        }
    }

    pub fn times(count: u32, repeat_delay: f64) -> Self {
        Self {
            repeat_delay,
            count: Some(count),
            mode: RepeatMode::Loop,
        }
    }

    pub fn reversed(mut self) -> Self {
        self.mode = RepeatMode::Reverse;
        self
    }

    pub fn is_infinite(&self) -> bool {
        self.count.is_none()
    }
}

/// Rule deciding when a group's timeline becomes eligible to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// Runs as soon as the group is mounted.
    #[default]
    Immediate,
    /// Runs the first time the group scrolls into view and never again.
    OnVisible,
    /// Runs on explicit fire, can be reset and fired again.
    Manual,
}

impl TriggerPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            TriggerPolicy::Immediate => "immediate",
            TriggerPolicy::OnVisible => "on-visible",
            TriggerPolicy::Manual => "manual",
        }
    }

    /// Whether a completed run is terminal for the group.
    pub fn fire_once(&self) -> bool {
        !matches!(self, TriggerPolicy::Manual)
    }
}

/// Order in which direct children receive their stagger slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaggerDirection {
    #[default]
    Forward,
    Reverse,
    /// Middle child first, spreading outwards.
    FromCenter,
}

impl StaggerDirection {
    /// Stagger slot for the child at `index` out of `total` siblings.
    pub fn slot(&self, index: usize, total: usize) -> usize {
        match self {
            StaggerDirection::Forward => index,
            StaggerDirection::Reverse => total.saturating_sub(1).saturating_sub(index),
            StaggerDirection::FromCenter => {
                let center = total / 2;
                if index <= center {
                    center - index
                } else {
                    index - center
                }
            }
        }
    }
}

/// Child of a [`Group`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Item(Item),
    Group(Group),
}

impl Node {
    pub fn id(&self) -> &str {
        match self {
            Node::Item(item) => &item.id,
            Node::Group(group) => &group.id,
        }
    }
}

impl From<Item> for Node {
    fn from(item: Item) -> Self {
        Node::Item(item)
    }
}

impl From<Group> for Node {
    fn from(group: Group) -> Self {
        Node::Group(group)
    }
}

/// Ordered container of items and nested groups sharing stagger settings.
///
/// Children keep insertion order; that order decides which stagger slot each
/// child receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    /// Seconds between the starts of consecutive direct children.
    #[serde(default)]
    pub stagger: f64,
    /// Seconds before the first child starts.
    #[serde(default)]
    pub delay_children: f64,
    /// Own delay when this group is itself the child of another group.
    #[serde(default)]
    pub delay: f64,
    #[serde(default)]
    pub direction: StaggerDirection,
    #[serde(default)]
    pub trigger: TriggerPolicy,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Group {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stagger: 0.0,
            delay_children: 0.0,
            delay: 0.0,
            direction: StaggerDirection::Forward,
            trigger: TriggerPolicy::Immediate,
            children: Vec::new(),
        }
    }

    pub fn stagger(mut self, interval: f64) -> Self {
        self.stagger = interval;
        self
    }

    pub fn delay_children(mut self, delay: f64) -> Self {
        self.delay_children = delay;
        self
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn direction(mut self, direction: StaggerDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn trigger(mut self, policy: TriggerPolicy) -> Self {
        self.trigger = policy;
        self
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Number of leaf items in the whole subtree.
    pub fn leaf_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                Node::Item(_) => 1,
                Node::Group(group) => group.leaf_count(),
            })
            .sum()
    }
}
