//! Plugin registry
//!
//! Maps a concrete tag to the ordered list of analyzer handlers subscribed to
//! it. Symbolic subscriptions are expanded once, at registration time.
//!
//! Subscriber order per tag is registration order. Unregistering an analyzer
//! removes its entries but keeps the per-tag lists in place, so a tag whose
//! only subscriber left maps to an empty list rather than disappearing.

pub mod categories;
pub mod tag_spec;

use crate::errors::RegistrationError;
use std::collections::HashMap;

pub use tag_spec::{expand_spec, TagSpec};

/// One `(tag, analyzer handler)` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Owning analyzer name
    pub analyzer: String,
    /// Handler inside the analyzer that receives the event
    pub handler: String,
}

#[derive(Debug, Default)]
pub struct Registry {
    table: HashMap<String, Vec<Subscription>>,
    analyzers: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` with `(tag spec, handler)` pairs
    ///
    /// All specs are expanded before anything is inserted, so a failing spec
    /// leaves the registry unchanged. Returns the concrete tags subscribed,
    /// in insertion order.
    pub fn register(
        &mut self,
        name: &str,
        subscriptions: &[(String, String)],
    ) -> Result<Vec<String>, RegistrationError> {
        if name.trim().is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if self.contains(name) {
            return Err(RegistrationError::DuplicateAnalyzer(name.to_string()));
        }
        if subscriptions.is_empty() {
            return Err(RegistrationError::NoSubscriptions(name.to_string()));
        }

        let mut entries: Vec<(String, String)> = Vec::new();
        for (spec, handler) in subscriptions {
            for tag in expand_spec(spec)? {
                let entry = (tag, handler.clone());
                if !entries.contains(&entry) {
                    entries.push(entry);
                }
            }
        }

        let mut tags = Vec::with_capacity(entries.len());
        for (tag, handler) in entries {
            self.table.entry(tag.clone()).or_default().push(Subscription {
                analyzer: name.to_string(),
                handler,
            });
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        self.analyzers.push(name.to_string());
        log::debug!("registered analyzer {} on {} tags", name, tags.len());
        Ok(tags)
    }

    /// Remove every entry owned by `name`; returns how many were removed
    pub fn unregister(&mut self, name: &str) -> Result<usize, RegistrationError> {
        let position = self
            .analyzers
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| RegistrationError::UnknownAnalyzer(name.to_string()))?;
        self.analyzers.remove(position);

        let mut removed = 0;
        for subscribers in self.table.values_mut() {
            let before = subscribers.len();
            subscribers.retain(|s| s.analyzer != name);
            removed += before - subscribers.len();
        }
        log::debug!("unregistered analyzer {} ({} entries)", name, removed);
        Ok(removed)
    }

    /// Whether at least one handler is subscribed to `tag`
    pub fn is_registered(&self, tag: &str) -> bool {
        self.table.get(tag).is_some_and(|s| !s.is_empty())
    }

    pub fn subscribers(&self, tag: &str) -> &[Subscription] {
        self.table.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `tag` has a subscriber list, even an empty one
    pub fn has_entry(&self, tag: &str) -> bool {
        self.table.contains_key(tag)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.analyzers.iter().any(|n| n == name)
    }

    /// Registered analyzer names in registration order
    pub fn analyzers(&self) -> &[String] {
        &self.analyzers
    }

    /// Concrete tags `name` is subscribed to, sorted
    pub fn tags_of(&self, name: &str) -> Vec<String> {
        let mut tags: Vec<String> = self
            .table
            .iter()
            .filter(|(_, subs)| subs.iter().any(|s| s.analyzer == name))
            .map(|(tag, _)| tag.clone())
            .collect();
        tags.sort();
        tags
    }
}
