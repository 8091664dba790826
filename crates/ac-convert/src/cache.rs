use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use ac_core::{DataKey, DataValue, ValueType};
use indexmap::{IndexMap, IndexSet};

const PURGE_THRESHOLD: usize = 64;

/// Element (or key and value) types a container is known to hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheTag {
    Elements(ValueType),
    Entries(ValueType, ValueType),
}

enum WeakContainer {
    List(Weak<RefCell<Vec<DataValue>>>),
    Set(Weak<RefCell<IndexSet<DataKey>>>),
    Map(Weak<RefCell<IndexMap<DataKey, DataValue>>>),
}

impl WeakContainer {
    fn of(value: &DataValue) -> Option<Self> {
        match value {
            DataValue::List(list) => Some(Self::List(Rc::downgrade(list))),
            DataValue::Set(set) => Some(Self::Set(Rc::downgrade(set))),
            DataValue::Map(map) => Some(Self::Map(Rc::downgrade(map))),
            _ => None,
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Self::List(weak) => weak.strong_count() > 0,
            Self::Set(weak) => weak.strong_count() > 0,
            Self::Map(weak) => weak.strong_count() > 0,
        }
    }
}

struct CacheEntry {
    container: WeakContainer,
    tag: CacheTag,
}

/// Identity-keyed side table. The weak handle pins the allocation address, so
/// an entry can never be mistaken for a newer container at the same address;
/// dead entries are dropped lazily.
#[derive(Default)]
pub(crate) struct TypeCache {
    entries: RefCell<HashMap<usize, CacheEntry>>,
}

impl TypeCache {
    pub(crate) fn get(&self, value: &DataValue) -> Option<CacheTag> {
        let id = value.container_id()?;
        let entries = self.entries.borrow();
        let entry = entries.get(&id)?;
        if entry.container.is_alive() {
            Some(entry.tag.clone())
        } else {
            None
        }
    }

    pub(crate) fn set(&self, value: &DataValue, tag: CacheTag) {
        let (Some(id), Some(container)) = (value.container_id(), WeakContainer::of(value)) else {
            return;
        };
        let mut entries = self.entries.borrow_mut();
        if entries.len() >= PURGE_THRESHOLD {
            entries.retain(|_, entry| entry.container.is_alive());
        }
        entries.insert(id, CacheEntry { container, tag });
    }

    pub(crate) fn forget(&self, value: &DataValue) {
        if let Some(id) = value.container_id() {
            self.entries.borrow_mut().remove(&id);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}
