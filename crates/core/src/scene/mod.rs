use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    build_timeline, text, EngineConfig, Group, Item, Repeat, Result, StaggerError, TriggerPolicy,
};

/// Named collection of group trees, loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default)]
    pub config: EngineConfig,
    pub groups: Vec<Group>,
}

impl Scene {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let scene: Self = serde_json::from_str(raw)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Checks group ids are unique and every tree builds a timeline.
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        let mut seen = HashSet::new();
        for group in &self.groups {
            if !seen.insert(group.id.as_str()) {
                return Err(StaggerError::DuplicateId {
                    group: self.name.clone(),
                    id: group.id.clone(),
                });
            }
            build_timeline(group)?;
        }
        Ok(())
    }

    pub fn group(&self, id: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn require_group(&self, id: &str) -> Result<&Group> {
        self.group(id)
            .ok_or_else(|| StaggerError::msg(format!("scene `{}` has no group `{id}`", self.name)))
    }

    /// The animation showcase page: a reveal grid, a scroll heading, a
    /// staggered circle grid, looping shapes, a toggle box and a text cascade.
    pub fn showcase() -> Result<Self> {
        let scene = Self {
            name: "showcase".to_string(),
            config: EngineConfig::default(),
            groups: vec![
                reveal_grid(),
                scroll_heading(),
                circle_grid(),
                spinner(),
                toggle_box(),
                text::cascade(&["Hey", "there", "Stagger"], 0.3, 0.8)?,
            ],
        };
        scene.validate()?;
        Ok(scene)
    }
}

fn reveal_grid() -> Group {
    let entrance = Group::new("entrance")
        .child(Item::new("square", 1.0).with_delay(0.2))
        .child(Item::new("circle", 1.0).with_delay(0.4));
    let bolt = Group::new("bolt")
        .child(
            Item::new("stroke", 2.0)
                .with_delay(1.0)
                .repeating(Repeat::forever(1.0).reversed()),
        )
        .child(
            Item::new("fill", 2.0)
                .with_delay(2.0)
                .repeating(Repeat::forever(1.0).reversed()),
        );

    Group::new("grid")
        .stagger(0.25)
        .child(entrance)
        .child(Item::new("morph", 5.0).repeating(Repeat::forever(1.0)))
        .child(Item::new("subscribe", 0.3))
        .child(Item::new("drag", 0.3))
        .child(Item::new("progress", 0.3))
        .child(bolt)
}

fn scroll_heading() -> Group {
    Group::new("heading")
        .trigger(TriggerPolicy::OnVisible)
        .child(Item::new("title", 0.3).with_delay(0.3))
}

fn circle_grid() -> Group {
    (0..4).fold(
        Group::new("circle").delay_children(0.35).stagger(0.2),
        |group, i| group.child(Item::new(format!("dot-{i}"), 0.5)),
    )
}

fn spinner() -> Group {
    Group::new("spinner")
        .child(Item::new("rotate", 5.0).repeating(Repeat::forever(0.0)))
        .child(Item::new("pulse", 2.0).repeating(Repeat::forever(0.0)))
}

/// The box starts visible: the host fires this group at mount so the first
/// show plays without a toggle, and each later toggle resets or re-fires it.
fn toggle_box() -> Group {
    Group::new("toggle")
        .trigger(TriggerPolicy::Manual)
        .child(Item::new("box", 0.3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn showcase_is_valid_and_addressable() {
        let scene = Scene::showcase().unwrap();

        assert_eq!(scene.groups.len(), 6);
        assert_eq!(
            scene.require_group("heading").unwrap().trigger,
            TriggerPolicy::OnVisible
        );
        assert!(scene.group("missing").is_none());
        let err = scene.require_group("missing").unwrap_err();
        assert!(format!("{err}").contains("missing"));
    }

    #[test]
    fn grid_squares_reveal_every_quarter_second() {
        let scene = Scene::showcase().unwrap();
        let timeline = build_timeline(scene.require_group("grid").unwrap()).unwrap();

        let start = |path: &str| timeline.find(path).unwrap().start;
        assert!((start("grid/entrance/square") - 0.2).abs() < 1e-9);
        assert!((start("grid/morph") - 0.25).abs() < 1e-9);
        assert!((start("grid/bolt/fill") - (1.25 + 2.0)).abs() < 1e-9);
        assert_eq!(timeline.total_duration(), None);
    }

    #[test]
    fn toggle_box_shows_when_fired_at_mount() {
        use crate::{Phase, SequencePlayer, SequenceState, Signal};

        let scene = Scene::showcase().unwrap();
        let toggle = scene.require_group("toggle").unwrap();
        let mut player = SequencePlayer::mount(toggle, 0.0, &scene.config).unwrap();
        assert_eq!(player.state(), SequenceState::Idle);

        player.signal(Signal::ManualFire, 0.0).unwrap();
        let frame = player.advance(0.1).unwrap();
        assert_eq!(frame.phase_of("toggle/box"), Some(Phase::Active));

        player.signal(Signal::ManualReset, 0.5).unwrap();
        assert_eq!(player.advance(0.6).unwrap().state, SequenceState::Idle);
    }

    #[test]
    fn round_trips_through_json() {
        let scene = Scene::showcase().unwrap();
        let json = scene.to_json().unwrap();
        let parsed = Scene::from_json(&json).unwrap();

        assert_eq!(parsed.groups.len(), scene.groups.len());
        for (a, b) in parsed.groups.iter().zip(&scene.groups) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.trigger, b.trigger);
            assert_eq!(a.leaf_count(), b.leaf_count());
        }
    }

    #[test]
    fn rejects_duplicate_group_ids() {
        let raw = r#"{
            "name": "dupes",
            "groups": [ { "id": "a" }, { "id": "a" } ]
        }"#;

        assert!(matches!(
            Scene::from_json(raw),
            Err(StaggerError::DuplicateId { .. })
        ));
    }

    #[test]
    fn rejects_invalid_timings_on_load() {
        let raw = r#"{
            "name": "broken",
            "groups": [ { "id": "a", "stagger": -1.0 } ]
        }"#;

        assert!(matches!(
            Scene::from_json(raw),
            Err(StaggerError::InvalidParameter { .. })
        ));
    }
}
