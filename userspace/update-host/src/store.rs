// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Runtime override tier backed by the application's persistent preference store.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::value::ConfigValue;

/// Persistent preference store scoped to the host application.
///
/// Implementations must make each `get`/`set`/`remove` atomic; the resolver
/// serializes writers on top of that.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<ConfigValue>;
    fn set(&self, key: &str, value: ConfigValue);
    fn remove(&self, key: &str);
}

/// In-memory preference store for hosts that persist elsewhere, and for tests.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    entries: Mutex<BTreeMap<String, ConfigValue>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, e.g. with values restored by the embedding application.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { entries: Mutex::new(entries) }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copies the current contents out for persistence by the caller.
    pub fn snapshot(&self) -> BTreeMap<String, ConfigValue> {
        self.entries.lock().clone()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: ConfigValue) {
        self.entries.lock().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}
