//! SyncEngine (spec §4.11): fetch → merge → validate → persist against a
//! remote config store, driven either on demand or by an auto-sync tick.
//!
//! Grounded on the teacher's `config::builder()` layered-source pattern
//! (`settings.rs::load_settings`) for the "multiple sources, one typed
//! result" shape, generalized here to a remote document instead of a
//! second file source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::document::ConfigDocument;
use crate::error::ConfigError;

/// JSON-pointer-style paths stripped from the remote payload before any
/// merge runs, regardless of strategy.
pub const PROTECTED_PATHS: &[&str] = &["/credentials", "/providers/api_keys", "/tokens"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    Remote,
    Local,
    Timestamp,
    SafetyFirst,
}

/// Abstracts the remote document store; production implementations talk
/// to whatever config backend the deployment uses.
#[async_trait]
pub trait RemoteConfigStore: Send + Sync {
    async fn fetch(&self, document_name: &str) -> Result<Option<ConfigDocument>, ConfigError>;
}

/// Strips protected fields from a raw remote document before it is ever
/// considered by a merge strategy.
pub fn strip_protected(mut remote: ConfigDocument) -> ConfigDocument {
    remote.last_modified.retain(|path, _| !PROTECTED_PATHS.contains(&path.as_str()));
    remote
}

/// Produces a merged document from `local` and `remote` per `strategy`.
/// Does not validate; callers must call `ConfigDocument::validate` on the
/// result before persisting.
pub fn merge(local: &ConfigDocument, remote: &ConfigDocument, strategy: MergeStrategy) -> ConfigDocument {
    match strategy {
        MergeStrategy::Remote => remote.clone(),
        MergeStrategy::Local => local.clone(),
        MergeStrategy::Timestamp => merge_by_timestamp(local, remote),
        MergeStrategy::SafetyFirst => {
            let mut merged = merge_by_timestamp(local, remote);
            merged.safety_policy = stricter_safety(&local.safety_policy, &remote.safety_policy);
            merged
        }
    }
}

fn merge_by_timestamp(local: &ConfigDocument, remote: &ConfigDocument) -> ConfigDocument {
    let local_newer = |path: &str| {
        let l = local.last_modified.get(path);
        let r = remote.last_modified.get(path);
        match (l, r) {
            (Some(l), Some(r)) => l >= r,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => true,
        }
    };

    ConfigDocument {
        providers: if local_newer("/providers") { local.providers.clone() } else { remote.providers.clone() },
        comment_policy: if local_newer("/comment_policy") { local.comment_policy.clone() } else { remote.comment_policy.clone() },
        safety_policy: if local_newer("/safety_policy") { local.safety_policy.clone() } else { remote.safety_policy.clone() },
        rate_limit: if local_newer("/rate_limit") { local.rate_limit.clone() } else { remote.rate_limit.clone() },
        sync: if local_newer("/sync") { local.sync.clone() } else { remote.sync.clone() },
        last_modified: {
            let mut merged = local.last_modified.clone();
            for (k, v) in &remote.last_modified {
                merged.entry(k.clone()).and_modify(|e| if *v > *e { *e = *v }).or_insert(*v);
            }
            merged
        },
    }
}

/// For the safety subtree: the stricter value wins per field. A smaller
/// numeric threshold is stricter (flags content earlier); a higher
/// `SafetyLevel` rank is stricter.
fn stricter_safety(local: &castbot_core::SafetyPolicy, remote: &castbot_core::SafetyPolicy) -> castbot_core::SafetyPolicy {
    let level = if local.level.rank() >= remote.level.rank() { local.level } else { remote.level };
    let block_on_uncertainty = local.block_on_uncertainty || remote.block_on_uncertainty;

    let mut thresholds = castbot_core::SafetyPolicy::thresholds_for_level(level);
    for (category, local_v) in &local.thresholds {
        let remote_v = remote.thresholds.get(category).copied().unwrap_or(*local_v);
        thresholds.insert(*category, local_v.min(remote_v));
    }
    for (category, remote_v) in &remote.thresholds {
        thresholds.entry(*category).or_insert(*remote_v);
    }

    castbot_core::SafetyPolicy { enabled: local.enabled || remote.enabled, level, block_on_uncertainty, thresholds }
}

pub struct SyncEvent {
    pub kind: SyncEventKind,
}

pub enum SyncEventKind {
    BeforeSync,
    AfterSync { updated_fields: Vec<String> },
    SyncError { error_type: String },
}

/// Drives fetch → merge → validate → persist, with a mutual-exclusion
/// flag so concurrent `sync` calls are rejected rather than racing.
pub struct SyncEngine<S: RemoteConfigStore> {
    store: S,
    document_name: String,
    strategy: MergeStrategy,
    in_progress: AtomicBool,
    current: Mutex<ConfigDocument>,
}

impl<S: RemoteConfigStore> SyncEngine<S> {
    pub fn new(store: S, document_name: impl Into<String>, strategy: MergeStrategy, initial: ConfigDocument) -> Self {
        Self {
            store,
            document_name: document_name.into(),
            strategy,
            in_progress: AtomicBool::new(false),
            current: Mutex::new(initial),
        }
    }

    pub fn current(&self) -> ConfigDocument {
        self.current.lock().clone()
    }

    /// `fetch` pulls a named document from the remote store; returns
    /// `Ok(None)` if the store is disabled.
    pub async fn fetch(&self) -> Result<Option<ConfigDocument>, ConfigError> {
        self.store.fetch(&self.document_name).await
    }

    /// Runs one sync pass: fetch → strip protected paths → merge →
    /// validate → persist. Rejects if another sync is already running.
    pub async fn sync<F>(&self, mut on_event: F) -> Result<Vec<String>, ConfigError>
    where
        F: FnMut(SyncEvent),
    {
        if self.in_progress.swap(true, Ordering::AcqRel) {
            return Err(ConfigError::SyncInProgress);
        }
        let result = self.sync_inner(&mut on_event).await;
        self.in_progress.store(false, Ordering::Release);
        if let Err(err) = &result {
            on_event(SyncEvent { kind: SyncEventKind::SyncError { error_type: err.to_string() } });
        }
        result
    }

    async fn sync_inner<F>(&self, on_event: &mut F) -> Result<Vec<String>, ConfigError>
    where
        F: FnMut(SyncEvent),
    {
        on_event(SyncEvent { kind: SyncEventKind::BeforeSync });

        let remote = match self.fetch().await? {
            Some(doc) => doc,
            None => {
                info!("remote sync disabled or no remote document; nothing to merge");
                return Ok(Vec::new());
            }
        };
        let remote = strip_protected(remote);

        let local = self.current.lock().clone();
        let merged = merge(&local, &remote, self.strategy);
        merged.validate()?;

        let updated_fields = diff_fields(&local, &merged);
        *self.current.lock() = merged;

        on_event(SyncEvent { kind: SyncEventKind::AfterSync { updated_fields: updated_fields.clone() } });
        Ok(updated_fields)
    }

    /// Runs `sync` on a fixed interval forever; a failed pass is logged
    /// and does not stop the loop (spec §4.11: "failures do not stop the
    /// loop").
    pub async fn run_auto_sync(self: std::sync::Arc<Self>, interval: Duration)
    where
        S: 'static,
    {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match self.sync(|_| {}).await {
                Ok(fields) if !fields.is_empty() => info!(?fields, "config sync updated fields"),
                Ok(_) => {}
                Err(ConfigError::SyncInProgress) => warn!("auto-sync tick skipped, sync already in progress"),
                Err(err) => error!(error = %err, "config sync failed"),
            }
        }
    }
}

fn diff_fields(before: &ConfigDocument, after: &ConfigDocument) -> Vec<String> {
    let mut fields = Vec::new();
    if before.providers != after.providers {
        fields.push("providers".to_string());
    }
    if before.comment_policy != after.comment_policy {
        fields.push("comment_policy".to_string());
    }
    if before.safety_policy.level != after.safety_policy.level
        || before.safety_policy.thresholds != after.safety_policy.thresholds
        || before.safety_policy.block_on_uncertainty != after.safety_policy.block_on_uncertainty
        || before.safety_policy.enabled != after.safety_policy.enabled
    {
        fields.push("safety_policy".to_string());
    }
    if before.rate_limit != after.rate_limit {
        fields.push("rate_limit".to_string());
    }
    if before.sync != after.sync {
        fields.push("sync".to_string());
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use castbot_core::SafetyPolicy;

    struct StaticStore(Option<ConfigDocument>);

    #[async_trait]
    impl RemoteConfigStore for StaticStore {
        async fn fetch(&self, _name: &str) -> Result<Option<ConfigDocument>, ConfigError> {
            Ok(self.0.clone())
        }
    }

    fn base_doc() -> ConfigDocument {
        let mut doc = ConfigDocument::default();
        doc.providers.stt = vec!["a".into()];
        doc.providers.llm = vec!["a".into()];
        doc.providers.moderation = vec!["a".into()];
        doc
    }

    #[test]
    fn remote_strategy_takes_remote_wholesale() {
        let local = base_doc();
        let mut remote = base_doc();
        remote.providers.stt = vec!["remote-provider".into()];
        let merged = merge(&local, &remote, MergeStrategy::Remote);
        assert_eq!(merged.providers.stt, vec!["remote-provider".to_string()]);
    }

    #[test]
    fn safety_first_picks_stricter_level_and_lower_thresholds() {
        let mut local = base_doc();
        local.safety_policy = SafetyPolicy::new(castbot_core::SafetyLevel::Relaxed, true);
        let mut remote = base_doc();
        remote.safety_policy = SafetyPolicy::new(castbot_core::SafetyLevel::Strict, false);

        let merged = merge(&local, &remote, MergeStrategy::SafetyFirst);
        assert_eq!(merged.safety_policy.level, castbot_core::SafetyLevel::Strict);
        // strict thresholds are lower than relaxed; stricter wins.
        let strict_table = SafetyPolicy::thresholds_for_level(castbot_core::SafetyLevel::Strict);
        for (cat, v) in &strict_table {
            assert!((merged.safety_policy.threshold_for(*cat) - v).abs() < 1e-6);
        }
    }

    #[test]
    fn protected_paths_are_stripped_before_merge() {
        let mut remote = base_doc();
        remote.last_modified.insert("/credentials".to_string(), Utc::now());
        remote.last_modified.insert("/comment_policy".to_string(), Utc::now());
        let stripped = strip_protected(remote);
        assert!(!stripped.last_modified.contains_key("/credentials"));
        assert!(stripped.last_modified.contains_key("/comment_policy"));
    }

    #[tokio::test]
    async fn sync_rejects_concurrent_calls() {
        let engine = std::sync::Arc::new(SyncEngine::new(
            StaticStore(Some(base_doc())),
            "doc",
            MergeStrategy::Remote,
            base_doc(),
        ));
        engine.in_progress.store(true, Ordering::Release);
        let result = engine.sync(|_| {}).await;
        assert!(matches!(result, Err(ConfigError::SyncInProgress)));
    }

    #[tokio::test]
    async fn sync_with_no_remote_document_is_a_no_op() {
        let engine = SyncEngine::new(StaticStore(None), "doc", MergeStrategy::Remote, base_doc());
        let updated = engine.sync(|_| {}).await.unwrap();
        assert!(updated.is_empty());
    }
}
