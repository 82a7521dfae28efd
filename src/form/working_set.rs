use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::document::{ItemId, SubDocument};

/// Ordered collection of sub-documents.
///
/// Documents live in an arena keyed by id; `order` is the display order and is the only
/// thing reordering touches. An id present in both a prior and a new ordering keeps its
/// arena entry untouched, so per-item state survives drag-and-drop reorders.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    arena: HashMap<ItemId, SubDocument>,
    order: Vec<ItemId>,
}

/// What a reorder changed besides the ordering itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderReport {
    pub inserted: Vec<ItemId>,
    pub removed: Vec<ItemId>,
}

impl WorkingSet {
    /// Builds a working set, assigning a fresh id to every item that lacks one
    /// (or repeats an id already seen).
    pub fn from_items(items: impl IntoIterator<Item = SubDocument>) -> Self {
        let mut set = Self::default();
        for item in items {
            set.push(item);
        }
        set
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.arena.contains_key(id)
    }

    pub fn get(&self, id: &ItemId) -> Option<&SubDocument> {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: &ItemId) -> Option<&mut SubDocument> {
        self.arena.get_mut(id)
    }

    pub fn at(&self, index: usize) -> Option<&SubDocument> {
        self.order.get(index).and_then(|id| self.arena.get(id))
    }

    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.order.iter().position(|candidate| candidate == id)
    }

    pub fn ids(&self) -> &[ItemId] {
        &self.order
    }

    pub fn first_id(&self) -> Option<&ItemId> {
        self.order.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubDocument> + '_ {
        self.order.iter().filter_map(|id| self.arena.get(id))
    }

    pub fn to_vec(&self) -> Vec<SubDocument> {
        self.iter().cloned().collect()
    }

    /// Appends a document and returns its id. A missing or colliding id is replaced by a
    /// fresh one.
    pub fn push(&mut self, mut item: SubDocument) -> ItemId {
        if !item.id().is_empty() && self.arena.contains_key(item.id()) {
            warn!(id = %item.id(), "duplicate sub-document id replaced");
            item.assign_id(ItemId::generate());
        }
        item.ensure_id();
        let id = item.id().clone();
        self.order.push(id.clone());
        self.arena.insert(id.clone(), item);
        id
    }

    /// Overwrites the entry with the same id, keeping its position. Returns false when the
    /// id is not part of the set.
    pub fn replace(&mut self, item: SubDocument) -> bool {
        match self.arena.get_mut(item.id()) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// Rebuilds the ordering from `ordered`. Known ids reuse their existing entry, unseen
    /// ids are built with `factory`, and ids left out are dropped. Empty and repeated ids
    /// are ignored.
    pub fn reorder_or_insert<F>(&mut self, ordered: &[ItemId], mut factory: F) -> ReorderReport
    where
        F: FnMut(&ItemId) -> SubDocument,
    {
        let mut report = ReorderReport::default();
        let mut seen = HashSet::with_capacity(ordered.len());
        let mut next_order = Vec::with_capacity(ordered.len());
        for id in ordered {
            if id.is_empty() {
                warn!("ignoring empty id in reorder");
                continue;
            }
            if !seen.insert(id.clone()) {
                warn!(id = %id, "ignoring repeated id in reorder");
                continue;
            }
            if !self.arena.contains_key(id) {
                let mut item = factory(id);
                item.assign_id(id.clone());
                self.arena.insert(id.clone(), item);
                report.inserted.push(id.clone());
            }
            next_order.push(id.clone());
        }
        for id in &self.order {
            if !seen.contains(id) {
                self.arena.remove(id);
                report.removed.push(id.clone());
            }
        }
        self.order = next_order;
        report
    }
}
