// SPDX-License-Identifier: BSD-3-Clause

//! A generic separately-chained keyed map.
//!
//! A fixed-size bucket array with a chain per bucket, the same shape as a classic separate-chaining
//! hash table with a 100-slot bucket array and a singly-linked chain per slot. Kept here as a small
//! dependency-free module rather than reaching for `std::collections::HashMap`, so the chaining
//! contract the surrounding registry depends on stays visible in the tree.

use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

const BUCKET_COUNT: usize = 100;

pub struct KeyedMap<K, V> {
    buckets: Vec<Vec<(K, V)>>,
}

impl<K: Hash + Eq, V> KeyedMap<K, V> {
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(BUCKET_COUNT);
        buckets.resize_with(BUCKET_COUNT, Vec::new);
        Self { buckets }
    }

    fn bucket_index(key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % BUCKET_COUNT as u64) as usize
    }

    /// Inserts `value` under `key`, replacing and returning any value already stored there.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let chain = &mut self.buckets[Self::bucket_index(&key)];

        for (existing_key, existing_value) in chain.iter_mut() {
            if *existing_key == key {
                return Some(std::mem::replace(existing_value, value));
            }
        }

        chain.push((key, value));
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let chain = &self.buckets[Self::bucket_index(key)];
        chain
            .iter()
            .find(|(existing_key, _)| existing_key == key)
            .map(|(_, value)| value)
    }
}

impl<K: Hash + Eq, V> Default for KeyedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
