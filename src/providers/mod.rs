// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS providers.
//!
//! A [`Provider`] programs the external side of a [`DNSRecord`]: the embedded zone
//! store ([`embedded::EmbeddedProvider`]) or a hosted DNS API
//! ([`libdns::RemoteProvider`]). Providers are looked up by name in a [`Registry`]
//! populated once at startup.
//!
//! # Ownership
//!
//! `status.provider` is sticky. A provider that finds another provider's name there
//! returns [`ProviderOutcome::skipped`] without touching anything.

pub mod embedded;
pub mod libdns;

use crate::crd::DNSRecord;
use crate::errors::ProviderError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Result of [`Provider::reconcile`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProviderOutcome {
    /// `false` when the record belongs to another provider
    pub handled: bool,
    /// Ask the reconciler to come back after this delay
    pub requeue_after: Option<Duration>,
}

impl ProviderOutcome {
    /// The provider owns the record and processed it.
    #[must_use]
    pub fn handled() -> Self {
        Self {
            handled: true,
            requeue_after: None,
        }
    }

    /// The record belongs to someone else.
    #[must_use]
    pub fn skipped() -> Self {
        Self::default()
    }
}

/// Backend that programs declared records.
#[async_trait]
pub trait Provider: fmt::Debug + Send + Sync {
    /// Name stamped into `status.provider`.
    fn name(&self) -> &str;

    /// Bring the external state in line with `record`, updating `status.provider` and
    /// `status.id` in place. The caller persists any status change.
    async fn reconcile(&self, record: &mut DNSRecord) -> Result<ProviderOutcome, ProviderError>;
}

/// Environment variables visible to provider factories.
#[derive(Clone, Debug, Default)]
pub struct ProviderEnv {
    vars: HashMap<String, String>,
}

impl ProviderEnv {
    /// Snapshot of the process environment.
    #[must_use]
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Environment built from explicit pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Non-empty value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Non-empty value of `key`, or a configuration error naming `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Config`] when the variable is unset or empty.
    pub fn require(&self, provider: &str, key: &str) -> Result<String, ProviderError> {
        self.get(key)
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Config {
                provider: provider.to_string(),
                reason: format!("environment variable {key} is not set"),
            })
    }
}

/// Builds a provider from the environment.
pub type ProviderFactory =
    Box<dyn Fn(&ProviderEnv) -> Result<Arc<dyn Provider>, ProviderError> + Send + Sync>;

/// Name to factory map, written during startup and read-only afterwards.
#[derive(Default)]
pub struct Registry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every hosted DNS backend.
    #[must_use]
    pub fn with_remote_providers() -> Self {
        let mut registry = Self::new();
        libdns::register_all(&mut registry);
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ProviderEnv) -> Result<Arc<dyn Provider>, ProviderError> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiate the provider registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::NotFound`] for unknown names and whatever the factory
    /// returns, typically [`ProviderError::Config`].
    pub fn build(&self, name: &str, env: &ProviderEnv) -> Result<Arc<dyn Provider>, ProviderError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        factory(env)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.names())
            .finish()
    }
}

/// Clear the ownership fields of `record`.
pub(crate) fn release(record: &mut DNSRecord) {
    if let Some(status) = record.status.as_mut() {
        status.provider.clear();
        status.id.clear();
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
