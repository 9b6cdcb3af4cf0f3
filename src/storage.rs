// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Ordered byte-keyed storage abstraction.
//!
//! All bridge state lives in a single ordered map owned by the host
//! chain; mutations become visible atomically with block finalization
//! or are reverted together on block failure. The module only needs
//! point reads/writes plus forward and reverse prefix iteration, so
//! that is the whole trait surface.

use std::collections::BTreeMap;

/// Iteration direction for [`Store::prefix_iter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterDirection {
    Forward,
    Reverse,
}

/// An ordered byte-keyed map with prefix iteration.
///
/// Keys are ordered lexicographically. Implementations must be
/// deterministic: two stores holding the same entries iterate them in
/// the same order.
pub trait Store {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&mut self, key: &[u8], value: &[u8]);

    fn delete(&mut self, key: &[u8]);

    /// Iterate all entries whose key starts with `prefix`, in the given
    /// direction. The iterator borrows the store, so callers that want
    /// to mutate while walking a range must collect first; holding an
    /// iterator across a delete in its range is not expressible.
    fn prefix_iter<'a>(
        &'a self,
        prefix: &[u8],
        direction: IterDirection,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>;
}

/// In-memory [`Store`] backed by a `BTreeMap`.
///
/// Used by tests and by hosts that snapshot state themselves. The
/// production store is supplied by the surrounding chain.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Smallest key strictly greater than every key starting with `prefix`,
/// or `None` when the prefix is all `0xff` and the range is unbounded.
fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last == u8::MAX {
            end.pop();
        } else {
            *last += 1;
            return Some(end);
        }
    }
    None
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.inner.insert(key.to_vec(), value.to_vec());
    }

    fn delete(&mut self, key: &[u8]) {
        self.inner.remove(key);
    }

    fn prefix_iter<'a>(
        &'a self,
        prefix: &[u8],
        direction: IterDirection,
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let start = prefix.to_vec();
        let pairs = move |(k, v): (&Vec<u8>, &Vec<u8>)| (k.clone(), v.clone());
        match (prefix_end(prefix), direction) {
            (Some(end), IterDirection::Forward) => {
                Box::new(self.inner.range(start..end).map(pairs))
            }
            (Some(end), IterDirection::Reverse) => {
                Box::new(self.inner.range(start..end).rev().map(pairs))
            }
            (None, IterDirection::Forward) => Box::new(self.inner.range(start..).map(pairs)),
            (None, IterDirection::Reverse) => Box::new(self.inner.range(start..).rev().map(pairs)),
        }
    }
}
