use fxhash::FxHashMap;

use crate::model::{EntityKey, Identified};

/// Insertion-ordered entity storage, indexed both by assigned id and by natural key.
///
/// An `Assigned` key resolves only through the id index and a `Natural` key only
/// through the natural-key index, so an entity stays reachable by its natural key
/// after it receives an id.
#[derive(Clone, Debug)]
pub struct LookupTable<E: Identified> {
    entries: Vec<E>,
    by_id: FxHashMap<E::Id, usize>,
    by_natural: FxHashMap<E::Natural, usize>,
}

impl<E: Identified> LookupTable<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_id: FxHashMap::default(),
            by_natural: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[E] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&E> {
        self.entries.get(index)
    }

    pub fn position(&self, key: &EntityKey<E::Id, E::Natural>) -> Option<usize> {
        match key {
            EntityKey::Assigned(id) => self.by_id.get(id).copied(),
            EntityKey::Natural(natural) => self.by_natural.get(natural).copied(),
        }
    }

    pub fn find(&self, key: &EntityKey<E::Id, E::Natural>) -> Option<&E> {
        self.position(key).map(|index| &self.entries[index])
    }

    pub fn contains(&self, key: &EntityKey<E::Id, E::Natural>) -> bool {
        self.position(key).is_some()
    }

    /// Appends `entity`, handing it back if its id or natural key is taken.
    pub fn insert(&mut self, entity: E) -> Result<usize, E> {
        if self.collides(&entity, None) {
            return Err(entity);
        }
        let index = self.entries.len();
        self.index_entry(&entity, index);
        self.entries.push(entity);
        Ok(index)
    }

    /// Applies `edit` to the entry at `index` and re-indexes it. The edit is rolled
    /// back and `None` returned if it makes the entry collide with another one.
    pub fn update<F, R>(&mut self, index: usize, edit: F) -> Option<R>
    where
        E: Clone,
        F: FnOnce(&mut E) -> R,
    {
        let previous = self.entries.get(index)?.clone();
        let result = edit(&mut self.entries[index]);
        if self.collides(&self.entries[index], Some(index)) {
            self.entries[index] = previous;
            return None;
        }
        self.unindex_entry(&previous);
        let entry = &self.entries[index];
        if let Some(id) = entry.id() {
            self.by_id.insert(id, index);
        }
        self.by_natural.insert(entry.natural_key(), index);
        Some(result)
    }

    pub fn remove(&mut self, key: &EntityKey<E::Id, E::Natural>) -> Option<E> {
        let index = self.position(key)?;
        let removed = self.entries.remove(index);
        self.reindex();
        Some(removed)
    }

    /// Mutable access for changes that leave identity untouched.
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut E> {
        self.entries.get_mut(index)
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, E> {
        self.entries.iter_mut()
    }

    fn collides(&self, entity: &E, skip: Option<usize>) -> bool {
        let taken = |found: Option<&usize>| found.is_some_and(|&index| Some(index) != skip);
        entity.id().is_some_and(|id| taken(self.by_id.get(&id)))
            || taken(self.by_natural.get(&entity.natural_key()))
    }

    fn index_entry(&mut self, entity: &E, index: usize) {
        if let Some(id) = entity.id() {
            self.by_id.insert(id, index);
        }
        self.by_natural.insert(entity.natural_key(), index);
    }

    fn unindex_entry(&mut self, entity: &E) {
        if let Some(id) = entity.id() {
            self.by_id.remove(&id);
        }
        self.by_natural.remove(&entity.natural_key());
    }

    fn reindex(&mut self) {
        self.by_id.clear();
        self.by_natural.clear();
        for index in 0..self.entries.len() {
            let entry = &self.entries[index];
            if let Some(id) = entry.id() {
                self.by_id.insert(id, index);
            }
            self.by_natural.insert(entry.natural_key(), index);
        }
    }
}

impl<E: Identified> Default for LookupTable<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Identified + PartialEq> PartialEq for LookupTable<E> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<E: Identified> FromIterator<E> for LookupTable<E> {
    /// Later duplicates are dropped.
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut table = Self::new();
        for entity in iter {
            let _ = table.insert(entity);
        }
        table
    }
}

impl<'a, E: Identified> IntoIterator for &'a LookupTable<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
