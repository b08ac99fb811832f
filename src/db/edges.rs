//! Pair-keyed edge set with lookups from either endpoint.
//!
//! Each edge is stored exactly once; the two secondary indices only hold
//! the opposite endpoint, so both views are derived from the same record
//! and can never disagree.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct EdgeIndex<A, B> {
    edges: BTreeSet<(A, B)>,
    by_first: BTreeMap<A, BTreeSet<B>>,
    by_second: BTreeMap<B, BTreeSet<A>>,
}

impl<A, B> Default for EdgeIndex<A, B> {
    fn default() -> Self {
        Self {
            edges: BTreeSet::new(),
            by_first: BTreeMap::new(),
            by_second: BTreeMap::new(),
        }
    }
}

impl<A: Ord + Copy, B: Ord + Copy> EdgeIndex<A, B> {
    /// Returns `false` if the edge already existed.
    pub fn insert(&mut self, first: A, second: B) -> bool {
        if !self.edges.insert((first, second)) {
            return false;
        }
        self.by_first.entry(first).or_default().insert(second);
        self.by_second.entry(second).or_default().insert(first);
        true
    }

    /// Returns `false` if there was no such edge.
    pub fn remove(&mut self, first: A, second: B) -> bool {
        if !self.edges.remove(&(first, second)) {
            return false;
        }
        detach(&mut self.by_first, first, &second);
        detach(&mut self.by_second, second, &first);
        true
    }

    pub fn seconds_of(&self, first: A) -> impl Iterator<Item = B> + '_ {
        self.by_first.get(&first).into_iter().flatten().copied()
    }

    pub fn firsts_of(&self, second: B) -> impl Iterator<Item = A> + '_ {
        self.by_second.get(&second).into_iter().flatten().copied()
    }

    pub fn count_for_second(&self, second: B) -> usize {
        self.by_second.get(&second).map_or(0, BTreeSet::len)
    }

    /// Drops every edge touching `second`, returning how many were removed.
    pub fn remove_second(&mut self, second: B) -> usize {
        let firsts: Vec<A> = self.firsts_of(second).collect();
        firsts.iter().filter(|first| self.remove(**first, second)).count()
    }
}

#[cfg(test)]
impl<A: Ord + Copy, B: Ord + Copy> EdgeIndex<A, B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, first: A, second: B) -> bool {
        self.edges.contains(&(first, second))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

fn detach<K: Ord, V: Ord>(index: &mut BTreeMap<K, BTreeSet<V>>, key: K, value: &V) {
    if let Some(set) = index.get_mut(&key) {
        set.remove(value);
        if set.is_empty() {
            index.remove(&key);
        }
    }
}
