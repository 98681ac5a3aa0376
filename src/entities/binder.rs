//! Binder: the association between a stored RecordItem and a live playback
//! consumer, resolved by descriptor + type tag.
//!
//! Missing or mismatched bindings are tolerated: the entity simply stops
//! being driven by playback. A type-tag mismatch on a matching descriptor
//! is rejected (and logged), never applied.

use log::warn;

use super::recording::{Recording, RecordingSet};

/// One descriptor's binding state.
#[derive(Debug, Clone)]
pub struct Binder {
    pub descriptor: String,
    pub type_tag: String,
    /// How many loaded recordings contain a matching item. Should equal the
    /// file count when every file recorded the same entity set; a mismatch
    /// is a warning, not an error.
    pub occurrences: usize,
    /// Index of the matching item in the *active* recording, if any.
    pub item_idx: Option<usize>,
}

impl Binder {
    pub fn new(descriptor: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            type_tag: type_tag.into(),
            occurrences: 0,
            item_idx: None,
        }
    }

    /// Count matching items across the whole loaded set and warn when the
    /// entity is absent from some files.
    pub fn survey(&mut self, set: &RecordingSet) {
        self.occurrences = set
            .iter()
            .filter(|rec| {
                rec.find_item(&self.descriptor)
                    .is_some_and(|(_, item)| item.type_tag == self.type_tag)
            })
            .count();
        if !set.is_empty() && self.occurrences != set.len() {
            warn!(
                "'{}' appears in {}/{} loaded recordings",
                self.descriptor,
                self.occurrences,
                set.len()
            );
        }
    }

    /// Point the binder at the matching item of `recording`, clearing it
    /// when the item is missing or its type tag disagrees.
    pub fn rebind(&mut self, recording: &Recording) {
        self.item_idx = match recording.find_item(&self.descriptor) {
            Some((idx, item)) if item.type_tag == self.type_tag => Some(idx),
            Some((_, item)) => {
                warn!(
                    "'{}': stored type '{}' does not match live type '{}', leaving unbound",
                    self.descriptor, item.type_tag, self.type_tag
                );
                None
            }
            None => None,
        };
    }

    pub fn is_bound(&self) -> bool {
        self.item_idx.is_some()
    }
}
