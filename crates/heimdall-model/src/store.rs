use crate::component::{ComponentInfo, FileType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the component store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Enrolment was attempted after `freeze`.
    #[error("component store is frozen; no further enrolment is permitted")]
    Frozen,
}

/// Identity of a component: the `(name, file_path)` tuple.
///
/// Two inputs with the same basename but different paths are distinct
/// components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId {
    pub name: String,
    pub file_path: String,
}

impl ComponentId {
    pub fn new(name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_path: file_path.into(),
        }
    }

    pub fn of(component: &ComponentInfo) -> Self {
        Self::new(component.name.clone(), component.file_path.clone())
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.file_path)
    }
}

/// Counts summarising the store contents, logged at finalize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total: usize,
    pub objects: usize,
    pub static_libraries: usize,
    pub shared_libraries: usize,
    pub executables: usize,
    pub source_files: usize,
    pub system_libraries: usize,
    pub with_debug_info: usize,
    pub stripped: usize,
}

/// In-process map from component identity to the accumulated record.
///
/// Enrolment is insert-or-merge: inserting an identity that already exists
/// merges the incoming evidence into the stored record instead of replacing
/// it. Iteration yields components in first-enrolment order.
///
/// The store assumes a single mutator; once [`ComponentStore::freeze`] has
/// been called, further enrolment fails.
#[derive(Debug, Default)]
pub struct ComponentStore {
    components: IndexMap<ComponentId, ComponentInfo>,
    frozen: bool,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `component` or merges it into an existing record with the
    /// same identity, returning the stored record.
    pub fn enrol(&mut self, component: ComponentInfo) -> Result<&mut ComponentInfo, StoreError> {
        if self.frozen {
            return Err(StoreError::Frozen);
        }
        let id = ComponentId::of(&component);
        match self.components.entry(id) {
            indexmap::map::Entry::Occupied(entry) => {
                let existing = entry.into_mut();
                existing.merge_from(&component);
                Ok(existing)
            }
            indexmap::map::Entry::Vacant(entry) => Ok(entry.insert(component)),
        }
    }

    /// Forbids further enrolment. Called when finalization begins.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Components in first-enrolment order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.components.values()
    }

    pub fn get(&self, id: &ComponentId) -> Option<&ComponentInfo> {
        self.components.get(id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.components.values().any(|c| c.name == name)
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total: self.components.len(),
            ..StoreStats::default()
        };
        for component in self.components.values() {
            match component.file_type {
                FileType::Object => stats.objects += 1,
                FileType::StaticLibrary => stats.static_libraries += 1,
                FileType::SharedLibrary => stats.shared_libraries += 1,
                FileType::Executable => stats.executables += 1,
                FileType::SourceFile | FileType::HeaderFile => stats.source_files += 1,
                FileType::Unknown => {}
            }
            if component.is_system_library {
                stats.system_libraries += 1;
            }
            if component.contains_debug_info {
                stats.with_debug_info += 1;
            }
            if component.is_stripped {
                stats.stripped += 1;
            }
        }
        stats
    }
}
