//! Entity storage.
//!
//! [`EntityMap`] is an associative container that iterates in insertion order.
//! Mesh algorithms (and conversions into index buffers) depend on a stable
//! order of vertices and faces, so storage must not reorder surviving entities
//! when others are removed.
//!
//! [`Adjacency`] is a small ordered map used for the outgoing half-edges of a
//! vertex. Vertices typically have few neighbors, so a linear scan over a
//! `SmallVec` outperforms hashing.

use ahash::AHashMap;
use derivative::Derivative;
use smallvec::SmallVec;
use std::hash::Hash;
use std::mem;

// Compaction is deferred until this many slots have been vacated and vacant
// slots outnumber occupied slots.
const COMPACTION_THRESHOLD: usize = 32;

/// Insertion-ordered map from keys to entities.
#[derive(Derivative)]
#[derivative(
    Clone(bound = "K: Clone, V: Clone"),
    Debug(bound = "K: std::fmt::Debug, V: std::fmt::Debug"),
    Default(bound = "")
)]
pub struct EntityMap<K, V> {
    index: AHashMap<K, usize>,
    slots: Vec<Option<(K, V)>>,
}

impl<K, V> EntityMap<K, V>
where
    K: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        EntityMap {
            index: AHashMap::new(),
            slots: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index
            .get(key)
            .and_then(|index| self.slots[*index].as_ref())
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = *self.index.get(key)?;
        self.slots[index].as_mut().map(|(_, value)| value)
    }

    /// Inserts an entity. If the key is already present, the entity is
    /// replaced in place and the previous entity is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(index) = self.index.get(&key) {
            if let Some((_, previous)) = self.slots[*index].as_mut() {
                return Some(mem::replace(previous, value));
            }
        }
        self.index.insert(key, self.slots.len());
        self.slots.push(Some((key, value)));
        None
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let index = self.index.remove(key)?;
        let removed = self.slots[index].take().map(|(_, value)| value);
        let vacant = self.slots.len() - self.index.len();
        if vacant >= COMPACTION_THRESHOLD && vacant > self.index.len() {
            self.compact();
        }
        removed
    }

    pub fn iter(&self) -> impl '_ + Clone + Iterator<Item = (K, &V)> {
        self.slots
            .iter()
            .flatten()
            .map(|(key, value)| (*key, value))
    }

    pub fn iter_mut(&mut self) -> impl '_ + Iterator<Item = (K, &mut V)> {
        self.slots
            .iter_mut()
            .flatten()
            .map(|(key, value)| (*key, value))
    }

    pub fn keys(&self) -> impl '_ + Clone + Iterator<Item = K> {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl '_ + Clone + Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        for (index, (key, _)) in self.slots.iter().flatten().enumerate() {
            self.index.insert(*key, index);
        }
    }
}

/// Small insertion-ordered map keyed by neighbors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Adjacency<K, T> {
    entries: SmallVec<[(K, T); 8]>,
}

impl<K, T> Adjacency<K, T>
where
    K: Copy + Eq,
    T: Copy,
{
    pub fn new() -> Self {
        Adjacency {
            entries: SmallVec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.iter().any(|(neighbor, _)| neighbor == key)
    }

    pub fn get(&self, key: &K) -> Option<T> {
        self.entries
            .iter()
            .find(|(neighbor, _)| neighbor == key)
            .map(|(_, target)| *target)
    }

    /// Inserts or replaces the target for a neighbor. Replacing does not change
    /// the position of the neighbor.
    pub fn insert(&mut self, key: K, target: T) -> Option<T> {
        match self.entries.iter_mut().find(|(neighbor, _)| *neighbor == key) {
            Some((_, previous)) => Some(mem::replace(previous, target)),
            None => {
                self.entries.push((key, target));
                None
            }
        }
    }

    /// Inserts a target for a neighbor only if the neighbor is absent.
    pub fn insert_if_absent(&mut self, key: K, target: T) {
        if !self.contains_key(&key) {
            self.entries.push((key, target));
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<T> {
        let index = self
            .entries
            .iter()
            .position(|(neighbor, _)| neighbor == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl '_ + Clone + Iterator<Item = (K, T)> {
        self.entries.iter().copied()
    }

    pub fn keys(&self) -> impl '_ + Clone + Iterator<Item = K> {
        self.entries.iter().map(|(neighbor, _)| *neighbor)
    }

    pub fn values(&self) -> impl '_ + Clone + Iterator<Item = T> {
        self.entries.iter().map(|(_, target)| *target)
    }
}
