//! Per-connection subscription manager.
//!
//! Tracks which users a WebSocket client follows and filters events on
//! the server side.

use std::collections::HashSet;

use crate::domain::UserId;

/// Manages the set of user subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Followed users. Ignored while `subscribe_all` is set.
    user_ids: HashSet<UserId>,
    /// Whether the client follows every user (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds users to the subscription set; `wildcard` follows everyone.
    pub fn subscribe(&mut self, ids: &[UserId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.user_ids.extend(ids.iter().cloned());
    }

    /// Removes users from the subscription set. Unsubscribing `"*"` clears
    /// the wildcard.
    pub fn unsubscribe(&mut self, ids: &[UserId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for id in ids {
            self.user_ids.remove(id);
        }
    }

    /// Returns `true` if events for `user_id` should be forwarded.
    #[must_use]
    pub fn matches(&self, user_id: &UserId) -> bool {
        self.subscribe_all || self.user_ids.contains(user_id)
    }

    /// Returns the number of explicitly followed users.
    #[must_use]
    pub fn count(&self) -> usize {
        self.user_ids.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub const fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
