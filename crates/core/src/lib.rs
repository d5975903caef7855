//! Core library for the motion stagger engine.
//!
//! The crate computes *when* each element of a declarative animation tree
//! starts and ends. Each module owns one concern: the group/item model,
//! timeline construction, trigger evaluation and sequence playback, plus the
//! showcase helpers (text cascades, list reshuffles and scene files) built on
//! top of them. Painting, easing and gesture capture stay with the host.

pub mod config;
pub mod error;
pub mod model;
pub mod player;
pub mod reorder;
pub mod scene;
pub mod text;
pub mod timeline;
pub mod trigger;

pub use config::{AppConfig, EngineConfig, SamplingConfig};
pub use error::{Result, StaggerError};
pub use model::{Group, Item, Node, Repeat, RepeatMode, StaggerDirection, TriggerPolicy};
pub use player::{
    classify, classify_elapsed, EntryStatus, Frame, Phase, Run, Sample, SequencePlayer,
};
pub use reorder::{biased_shuffle, ReorderLoop};
pub use scene::Scene;
pub use timeline::{build_timeline, PlaybackClock, Timeline, TimelineEntry};
pub use trigger::{
    evaluate, evaluate_mount, SequenceState, Signal, Transition, TriggerEvaluator,
};
