// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Publish/subscribe registry for override-store key changes.
//!
//! Subscriptions live until their owner calls [`ChangeHub::unobserve`]. Handlers are
//! invoked synchronously from [`ChangeHub::publish`] with the registry lock released,
//! so a handler may register further subscriptions or trigger another write.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::key::ConfigKey;

/// Callback receiving the name of the key that changed.
pub type ChangeHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Identifier returned by [`ChangeHub::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn value(self) -> u64 {
        self.0
    }
}

struct Subscription {
    id: SubscriptionId,
    keys: BTreeSet<String>,
    handler: ChangeHandler,
}

struct HubState {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

pub struct ChangeHub {
    state: Mutex<HubState>,
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self { state: Mutex::new(HubState { next_id: 1, subscriptions: Vec::new() }) }
    }
}

impl fmt::Debug for ChangeHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeHub").field("subscriptions", &self.subscription_count()).finish()
    }
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for changes to any of `keys`. Registration is additive.
    pub fn observe<I, K, F>(&self, keys: I, handler: F) -> SubscriptionId
    where
        I: IntoIterator<Item = K>,
        K: Into<ConfigKey>,
        F: Fn(&str) + Send + Sync + 'static,
    {
        let keys = keys.into_iter().map(|key| key.into().as_str().to_string()).collect();
        let mut state = self.state.lock();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.subscriptions.push(Subscription { id, keys, handler: Arc::new(handler) });
        id
    }

    /// Drops a subscription. Returns `false` if it was already gone.
    pub fn unobserve(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|sub| sub.id != id);
        state.subscriptions.len() != before
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Delivers a change of `key` to every subscription watching it, in registration
    /// order. Returns the number of handlers invoked.
    pub fn publish(&self, key: &str) -> usize {
        let handlers: Vec<ChangeHandler> = {
            let state = self.state.lock();
            state
                .subscriptions
                .iter()
                .filter(|sub| sub.keys.contains(key))
                .map(|sub| Arc::clone(&sub.handler))
                .collect()
        };
        for handler in &handlers {
            handler(key);
        }
        handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_only_watchers() {
        let hub = ChangeHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        hub.observe(["SUEnableAutomaticChecks", "SUFeedURL"], move |key| sink.lock().push(key.to_string()));

        assert_eq!(hub.publish("SUFeedURL"), 1);
        assert_eq!(hub.publish("SUAutomaticallyUpdate"), 0);
        assert_eq!(hub.publish("SUEnableAutomaticChecks"), 1);
        assert_eq!(*seen.lock(), vec!["SUFeedURL".to_string(), "SUEnableAutomaticChecks".to_string()]);
    }

    #[test]
    fn fan_out_and_unobserve() {
        let hub = ChangeHub::new();
        let count = Arc::new(Mutex::new(0usize));
        let a = Arc::clone(&count);
        let b = Arc::clone(&count);
        let first = hub.observe([ConfigKey::FeedUrl], move |_| *a.lock() += 1);
        hub.observe([ConfigKey::FeedUrl], move |_| *b.lock() += 1);

        assert_eq!(hub.publish("SUFeedURL"), 2);
        assert!(hub.unobserve(first));
        assert!(!hub.unobserve(first));
        assert_eq!(hub.publish("SUFeedURL"), 1);
        assert_eq!(*count.lock(), 3);
    }

    #[test]
    fn handler_may_register_during_delivery() {
        let hub = Arc::new(ChangeHub::new());
        let inner = Arc::clone(&hub);
        hub.observe(["k"], move |_| {
            inner.observe(["other"], |_| {});
        });
        hub.publish("k");
        assert_eq!(hub.subscription_count(), 2);
    }
}
