//! ProviderRegistry: an ordered list of named, health-tracked providers.
//!
//! Shared (read-only) by the FailoverController; generic over whatever
//! provider trait object a crate plugs in. Mirrors the teacher's
//! provider-list-with-health-flags shape used for STT/LLM backend
//! selection in `llm/factory.rs`, generalized here to any provider kind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A named provider entry with an atomically-readable health flag.
pub struct ProviderEntry<P> {
    pub name: String,
    pub provider: Arc<P>,
    healthy: AtomicBool,
}

impl<P> ProviderEntry<P> {
    pub fn new(name: impl Into<String>, provider: Arc<P>) -> Self {
        Self { name: name.into(), provider, healthy: AtomicBool::new(true) }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn mark_healthy(&self) {
        self.healthy.store(true, Ordering::Release);
    }

    pub fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::Release);
    }
}

/// Ordered registry of providers of one kind (STT, LLM, Moderation, or
/// Chat). Invariant: constructed with at least one provider.
pub struct ProviderRegistry<P> {
    entries: Vec<ProviderEntry<P>>,
}

impl<P> ProviderRegistry<P> {
    /// Returns `None` if `providers` is empty — the registry invariant
    /// requires at least one entry.
    pub fn new(providers: Vec<(String, Arc<P>)>) -> Option<Self> {
        if providers.is_empty() {
            return None;
        }
        Some(Self {
            entries: providers.into_iter().map(|(name, p)| ProviderEntry::new(name, p)).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false // invariant: never empty once constructed
    }

    pub fn entries(&self) -> &[ProviderEntry<P>] {
        &self.entries
    }

    /// First provider whose health flag is currently true, in list order.
    pub fn first_healthy(&self) -> Option<&ProviderEntry<P>> {
        self.entries.iter().find(|e| e.is_healthy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_provider_list() {
        let registry: Option<ProviderRegistry<()>> = ProviderRegistry::new(vec![]);
        assert!(registry.is_none());
    }

    #[test]
    fn first_healthy_respects_list_order() {
        let registry = ProviderRegistry::new(vec![
            ("a".into(), Arc::new(())),
            ("b".into(), Arc::new(())),
        ])
        .unwrap();
        assert_eq!(registry.first_healthy().unwrap().name, "a");
        registry.entries()[0].mark_unhealthy();
        assert_eq!(registry.first_healthy().unwrap().name, "b");
    }
}
