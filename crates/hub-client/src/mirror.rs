//! Local mirror of a remote collection.
//!
//! A [`Mirror`] is the current known state of one owner's rows. It is only
//! ever changed through [`Mirror::replace_all`] (a fresh load) or
//! [`Mirror::apply`] (one change), and `apply` is idempotent per id so the
//! optimistic result of a command and the later feed delivery of the same
//! mutation can both be applied safely.

use hub_shared::Record;

/// One change to apply to a mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Inserted(T),
    Updated(T),
    Deleted(String),
}

impl<T: Record> Change<T> {
    pub fn id(&self) -> &str {
        match self {
            Self::Inserted(item) | Self::Updated(item) => item.id(),
            Self::Deleted(id) => id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mirror<T> {
    items: Vec<T>,
}

impl<T> Default for Mirror<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Record> Mirror<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole contents at once.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Apply one change. Returns whether the contents changed.
    ///
    /// Duplicate inserts, updates of unknown ids and deletes of unknown ids
    /// are no-ops: the feed may replay what was already applied, and may
    /// deliver out of order.
    pub fn apply(&mut self, change: Change<T>) -> bool {
        match change {
            Change::Inserted(item) => {
                if self.contains(item.id()) {
                    return false;
                }
                self.items.push(item);
                true
            }
            Change::Updated(item) => match self.position(item.id()) {
                Some(idx) => {
                    self.items[idx] = item;
                    true
                }
                None => false,
            },
            Change::Deleted(id) => match self.position(&id) {
                Some(idx) => {
                    self.items.remove(idx);
                    true
                }
                None => false,
            },
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// A sorted copy for display; storage order is left alone.
    pub fn sorted_by<K: Ord>(&self, mut key: impl FnMut(&T) -> K) -> Vec<&T> {
        let mut out: Vec<&T> = self.items.iter().collect();
        out.sort_by_key(|item| key(*item));
        out
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }
}
