//! Character-by-character text reveals.

use crate::{Group, Item, Result, StaggerError};

/// Builds a reveal group for `words`, one item per character.
///
/// Characters are numbered with a single index running across all words, so
/// the n-th character overall starts at `n * step` no matter which word it
/// belongs to. Each word becomes a nested group so entries read
/// `text/word-1/2:r`.
pub fn cascade(words: &[&str], step: f64, duration: f64) -> Result<Group> {
    if !step.is_finite() || step < 0.0 {
        return Err(StaggerError::invalid("character step", step));
    }

    let mut text = Group::new("text");
    let mut index = 0usize;
    for (word_index, word) in words.iter().enumerate() {
        let mut group = Group::new(format!("word-{word_index}"));
        for (char_index, ch) in word.chars().enumerate() {
            group.push(
                Item::new(format!("{char_index}:{ch}"), duration).with_delay(index as f64 * step),
            );
            index += 1;
        }
        text.push(group);
    }
    Ok(text)
}
