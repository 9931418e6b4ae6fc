// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::abstract_domains::{AbstractDomain, AbstractValueDomain};
use crate::abstract_location::AbstractLocation;

use log_derive::{logfn, logfn_inputs};
use rpds::HashTrieMapSync;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::hash::{Hash, Hasher};

/// A key of an analysis state map. Keys that are qualified by the heap instance they belong to
/// can be compared with the instance qualification ignored, which is how the same variable is
/// recognized on two paths that disagree about the instance it belongs to.
pub trait EnvironmentKey: Clone + Eq + Hash + Debug {
    /// A hash that is equal for keys that are equal ignoring their instance location.
    fn hash_ignoring_instance_location(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }

    fn equals_ignoring_instance_location(&self, other: &Self) -> bool {
        self == other
    }

    fn has_same_instance_location(&self, _other: &Self) -> bool {
        true
    }

    /// Returns a key like self whose instance location is the merge of the instance locations
    /// of self and other.
    #[must_use]
    fn with_merged_instance_location(&self, _other: &Self) -> Self {
        self.clone()
    }
}

impl EnvironmentKey for AbstractLocation {}

/// Maps keys to abstract values.
///
/// A missing key does not mean that nothing is known about the key, it means that the key was
/// not observed along the paths that reached this state. Merging therefore never drops a key,
/// a key missing on one side is merged with the value the caller deems appropriate for an
/// unobserved key, which is usually Unknown.
#[derive(Clone, PartialEq)]
pub struct Environment<K: EnvironmentKey, V: AbstractValueDomain> {
    pub value_map: HashTrieMapSync<K, V>,
}

impl<K: EnvironmentKey, V: AbstractValueDomain> Default for Environment<K, V> {
    fn default() -> Self {
        Environment {
            value_map: HashTrieMapSync::new_sync(),
        }
    }
}

impl<K: EnvironmentKey, V: AbstractValueDomain> Debug for Environment<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_map()
            .entries(self.value_map.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

/// Methods
impl<K: EnvironmentKey, V: AbstractValueDomain> Environment<K, V> {
    /// Returns a reference to the value associated with the given key, if there is one.
    #[logfn_inputs(TRACE)]
    #[logfn(TRACE)]
    pub fn value_at(&self, key: &K) -> Option<&V> {
        self.value_map.get(key)
    }

    /// Updates the map so that the given key now maps to the given value.
    #[logfn_inputs(TRACE)]
    pub fn update_value_at(&mut self, key: K, value: V) {
        self.value_map.insert_mut(key, value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.value_map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.value_map.size()
    }

    pub fn is_empty(&self) -> bool {
        self.value_map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.value_map.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.value_map.iter()
    }

    /// Sets the value of every key to the given value. Keys are never removed, so the key set
    /// of the environment is the same before and after.
    #[logfn_inputs(TRACE)]
    pub fn widen_all_to(&mut self, value: &V) {
        self.widen_matching(|_, _| true, value);
    }

    /// Sets the value of every key that satisfies the predicate to the given value.
    pub fn widen_matching<P>(&mut self, predicate: P, value: &V)
    where
        P: Fn(&K, &V) -> bool,
    {
        let keys: Vec<K> = self
            .value_map
            .iter()
            .filter(|(k, v)| *v != value && predicate(*k, *v))
            .map(|(k, _)| k.clone())
            .collect();
        for key in keys {
            self.value_map.insert_mut(key, value.clone());
        }
    }

    /// Returns an environment with a key for every key in self and other.
    ///
    /// Keys are matched up ignoring their instance locations. Matching keys that belong to the
    /// same instance are merged in place. Matching keys that belong to different instances
    /// additionally give rise to a key whose instance location is the merge of both, unless
    /// that key would just map to the unknown value. Keys without a match on the other side
    /// are merged with merge_absent(key, value).
    #[logfn(TRACE)]
    pub fn merge_with<F>(&self, other: &Environment<K, V>, merge_absent: F) -> Environment<K, V>
    where
        F: Fn(&K, &V) -> V,
    {
        let value_map1 = &self.value_map;
        let value_map2 = &other.value_map;
        let mut equivalence_classes: HashMap<u64, Vec<(&K, &V)>> = HashMap::new();
        for (key2, value2) in value_map2.iter() {
            equivalence_classes
                .entry(key2.hash_ignoring_instance_location())
                .or_default()
                .push((key2, value2));
        }

        let mut value_map: HashTrieMapSync<K, V> = HashTrieMapSync::new_sync();
        for (key1, value1) in value_map1.iter() {
            let equivalent_keys = equivalence_classes
                .get(&key1.hash_ignoring_instance_location())
                .into_iter()
                .flatten()
                .filter(|(key2, _)| key1.equals_ignoring_instance_location(key2));
            for (key2, value2) in equivalent_keys {
                let mut merged_value = value1.merge(value2);
                if key1.has_same_instance_location(key2) {
                    if let Some(existing) = value_map.get(key1) {
                        merged_value = merged_value.merge(existing);
                    }
                    value_map.insert_mut(key1.clone(), merged_value);
                    continue;
                }
                let merged_key = key1.with_merged_instance_location(key2);
                let mut is_existing_key = false;
                for existing in [
                    value_map.get(&merged_key),
                    value_map1.get(&merged_key),
                    value_map2.get(&merged_key),
                ]
                .into_iter()
                .flatten()
                {
                    merged_value = merged_value.merge(existing);
                    is_existing_key = true;
                }
                if !is_existing_key && merged_value.is_unknown() {
                    trace!("not adding unknown value for merged key {:?}", merged_key);
                    continue;
                }
                value_map.insert_mut(merged_key, merged_value);
            }
            if !value_map.contains_key(key1) {
                value_map.insert_mut(key1.clone(), merge_absent(key1, value1));
            }
        }
        for (key2, value2) in value_map2.iter() {
            if !value_map.contains_key(key2) {
                value_map.insert_mut(key2.clone(), merge_absent(key2, value2));
            }
        }
        Environment { value_map }
    }

    /// Returns the merge of previous and self, where values that changed relative to previous
    /// are widened, so that a chain of growing environments is guaranteed to stabilize.
    #[logfn(TRACE)]
    pub fn widen_with<F>(&self, previous: &Environment<K, V>, merge_absent: F) -> Environment<K, V>
    where
        F: Fn(&K, &V) -> V,
    {
        let mut result = previous.merge_with(self, merge_absent);
        let changed: Vec<(K, V)> = result
            .value_map
            .iter()
            .filter_map(|(key, value)| {
                let old = previous.value_map.get(key)?;
                if old == value {
                    None
                } else {
                    Some((key.clone(), value.widen(old)))
                }
            })
            .collect();
        for (key, value) in changed {
            result.value_map.insert_mut(key, value);
        }
        result
    }

    /// Returns true if for every key, self.value_at(key).subset(other.value_at(key))
    #[logfn_inputs(TRACE)]
    pub fn is_subset_of(&self, other: &Environment<K, V>) -> bool {
        for (key, value1) in self.value_map.iter().filter(|(_, v)| !v.is_bottom()) {
            match other.value_map.get(key) {
                Some(value2) => {
                    if !value1.subset(value2) {
                        trace!("self at {:?} is {:?} other is {:?}", key, value1, value2);
                        return false;
                    }
                }
                None => {
                    trace!("self at {:?} is {:?} other is None", key, value1);
                    return false;
                }
            }
        }
        true
    }
}

/// The value an unobserved key contributes to a merge.
fn merge_with_unknown<K, V: AbstractValueDomain>(_key: &K, value: &V) -> V {
    value.merge(&V::unknown_or_may_be_value())
}

impl<K: EnvironmentKey, V: AbstractValueDomain> AbstractDomain for Environment<K, V> {
    fn bottom() -> Self {
        Environment::default()
    }

    fn merge(&self, other: &Self) -> Self {
        self.merge_with(other, merge_with_unknown)
    }

    fn widen(&self, previous: &Self) -> Self {
        self.widen_with(previous, merge_with_unknown)
    }

    fn subset(&self, other: &Self) -> bool {
        self.is_subset_of(other)
    }
}
