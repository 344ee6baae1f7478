//! Variable inheritance along `extends` chains.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::preset::{Preset, Variables};
use crate::store::TieredPresetStore;

/// Merges a preset's variables with those of its ancestors.
///
/// Parents are looked up in the merged view of the store, so an override in a
/// higher tier also changes what its children inherit. A child's own value
/// always wins over an inherited one.
#[derive(Debug, Clone, Copy)]
pub struct InheritanceResolver<'a> {
    store: &'a TieredPresetStore,
}

impl<'a> InheritanceResolver<'a> {
    pub fn new(store: &'a TieredPresetStore) -> Self {
        Self { store }
    }

    /// Variables of `preset` merged over every ancestor's.
    ///
    /// An `extends` pointing at an unknown id, or back into the chain already
    /// walked, ends the walk at that point.
    pub fn resolve(&self, preset: &Preset) -> Variables {
        let mut visited = HashSet::new();
        self.resolve_inner(preset, &mut visited)
    }

    fn resolve_inner<'p>(&self, preset: &'p Preset, visited: &mut HashSet<&'p str>) -> Variables
    where
        'a: 'p,
    {
        visited.insert(preset.id.as_str());

        let Some(parent) = self.parent_of(preset, visited) else {
            return preset.variables.clone();
        };

        let mut merged = self.resolve_inner(parent, visited);
        merged.extend(
            preset
                .variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }

    /// Ids walked from `preset` upward, starting with `preset` itself.
    pub fn chain(&self, preset: &Preset) -> Vec<String> {
        let mut ids = vec![preset.id.clone()];
        let mut visited: HashSet<&str> = HashSet::from([preset.id.as_str()]);
        let mut current = self.parent_of(preset, &visited);
        while let Some(parent) = current {
            ids.push(parent.id.clone());
            visited.insert(parent.id.as_str());
            current = self.parent_of(parent, &visited);
        }
        ids
    }

    fn parent_of(&self, preset: &Preset, visited: &HashSet<&str>) -> Option<&'a Preset> {
        let parent_id = preset.extends.as_deref()?;
        if visited.contains(parent_id) {
            warn!(
                preset = %preset.id,
                parent = parent_id,
                "inheritance cycle detected, ignoring parent"
            );
            return None;
        }
        let parent = self.store.find(parent_id);
        if parent.is_none() {
            debug!(preset = %preset.id, parent = parent_id, "parent preset not found");
        }
        parent
    }
}
