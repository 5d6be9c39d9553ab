//! Ordered, keyed item store
//!
//! Holds at most one item per key. Insertion order is kept, except that an
//! upsert of an existing key replaces the item in its original slot.
//! The store itself is not synchronized; the controller wraps it in a
//! mutex and never holds that mutex across I/O.

use tracing::trace;

use super::item::DeferredItem;
use super::reconcile;

/// Result of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

#[derive(Debug)]
pub struct ItemStore<C> {
    items: Vec<DeferredItem<C>>,
}

impl<C> Default for ItemStore<C> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<C> ItemStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.items.iter().map(|item| item.key.clone()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&DeferredItem<C>> {
        self.items.iter().find(|item| item.key == key)
    }

    /// Replace the item with the same key in place, or append.
    pub fn upsert(&mut self, item: DeferredItem<C>) -> Upsert {
        match self.items.iter_mut().find(|existing| existing.key == item.key) {
            Some(existing) => {
                trace!(key = %item.key, "replacing key");
                *existing = item;
                Upsert::Replaced
            }
            None => {
                trace!(key = %item.key, "adding key");
                self.items.push(item);
                Upsert::Inserted
            }
        }
    }

    /// Remove the item with `key`, keeping the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<DeferredItem<C>> {
        let pos = self.items.iter().position(|item| item.key == key)?;
        trace!(key = %key, "deleting key");
        Some(self.items.remove(pos))
    }

    /// Hand out every item and leave the store empty.
    pub fn take_all(&mut self) -> Vec<DeferredItem<C>> {
        std::mem::take(&mut self.items)
    }

    /// Put a round's leftovers back in front of items added meanwhile.
    pub fn merge_back(&mut self, not_sent: Vec<DeferredItem<C>>) {
        let incoming = std::mem::take(&mut self.items);
        self.items = reconcile::merge(not_sent, incoming);
    }
}
