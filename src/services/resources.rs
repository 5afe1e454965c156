use crate::services::backend::{ResourceConfig, ResourceKind, ScoringBackend};
use crate::services::system::{MemoryStats, SystemInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

/// Errors surfaced by resource lifecycle operations
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource '{0}' is already loaded")]
    AlreadyLoaded(String),

    #[error("insufficient memory: {available_mb}MB available, budget requires more than {required_mb}MB")]
    InsufficientMemory { available_mb: u64, required_mb: u64 },

    #[error("unsupported resource kind: {0}")]
    UnsupportedKind(String),

    #[error("resource construction failed: {reason}")]
    ConstructionFailed { reason: String },

    #[error("resource not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadOutcome {
    Pending,
    Succeeded,
    Failed,
}

/// A loaded scoring resource with its usage accounting
pub struct LoadedResource {
    name: String,
    config: ResourceConfig,
    backend: ScoringBackend,
    loaded_at: DateTime<Utc>,
    usage: Mutex<Usage>,
    leases: AtomicU32,
}

#[derive(Debug, Clone, Copy)]
struct Usage {
    last_used_at: DateTime<Utc>,
    usage_count: u64,
}

impl LoadedResource {
    fn new(name: String, config: ResourceConfig, backend: ScoringBackend) -> Self {
        let now = Utc::now();
        Self {
            name,
            config,
            backend,
            loaded_at: now,
            usage: Mutex::new(Usage {
                last_used_at: now,
                usage_count: 0,
            }),
            leases: AtomicU32::new(0),
        }
    }

    /// Bump usage accounting; serialized per resource by the usage lock
    fn touch(&self) {
        let mut usage = self.usage.lock().expect("usage lock poisoned");
        usage.last_used_at = Utc::now();
        usage.usage_count += 1;
    }

    fn usage(&self) -> Usage {
        *self.usage.lock().expect("usage lock poisoned")
    }

    fn leased(&self) -> bool {
        self.leases.load(Ordering::Acquire) > 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &ScoringBackend {
        &self.backend
    }

    pub fn kind(&self) -> ResourceKind {
        self.backend.kind()
    }
}

/// RAII usage lease returned by `get_resource`.
///
/// While any lease is alive the resource is pinned: the idle sweep will
/// not unload it. Dropping the lease releases the pin.
pub struct ResourceLease {
    resource: Arc<LoadedResource>,
}

impl ResourceLease {
    fn acquire(resource: Arc<LoadedResource>) -> Self {
        resource.leases.fetch_add(1, Ordering::AcqRel);
        Self { resource }
    }

    pub fn name(&self) -> &str {
        self.resource.name()
    }

    pub fn backend(&self) -> &ScoringBackend {
        self.resource.backend()
    }

    pub fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        self.resource.leases.fetch_sub(1, Ordering::AcqRel);
    }
}

enum Slot {
    /// Construction in flight; joiners wait on the channel
    Loading(watch::Receiver<LoadOutcome>),
    Ready(Arc<LoadedResource>),
}

/// Point-in-time view of one loaded resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub kind: ResourceKind,
    #[serde(rename = "loadedAt")]
    pub loaded_at: DateTime<Utc>,
    #[serde(rename = "lastUsedAt")]
    pub last_used_at: DateTime<Utc>,
    #[serde(rename = "usageCount")]
    pub usage_count: u64,
    #[serde(rename = "estimatedMemoryMB")]
    pub estimated_memory_mb: u64,
}

/// Lifecycle manager for named scoring backends.
///
/// Owned by the service root and passed to handlers by reference; each
/// test constructs its own isolated instance. A resource is admitted
/// only while system-available memory exceeds the configured per-resource
/// budget; concurrent loads for one name collapse into a single
/// construction.
pub struct ResourceManager {
    slots: RwLock<HashMap<String, Slot>>,
    system: Arc<dyn SystemInfo>,
    memory_budget_mb: u64,
    load_timeout: Duration,
}

impl ResourceManager {
    pub fn new(system: Arc<dyn SystemInfo>, memory_budget_mb: u64, load_timeout: Duration) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            system,
            memory_budget_mb,
            load_timeout,
        }
    }

    /// Load a named resource.
    ///
    /// Fails with AlreadyLoaded, UnsupportedKind, InsufficientMemory or
    /// ConstructionFailed; every failure leaves manager state unchanged.
    /// A call that finds a load for the same name in flight joins its
    /// outcome instead of constructing a second backend.
    pub async fn load_resource(&self, name: &str, config: ResourceConfig) -> Result<(), ResourceError> {
        let (tx, kind) = {
            let mut slots = self.slots.write().await;
            match slots.get(name) {
                Some(Slot::Ready(_)) => return Err(ResourceError::AlreadyLoaded(name.to_string())),
                Some(Slot::Loading(rx)) => {
                    let rx = rx.clone();
                    drop(slots);
                    return Self::join_inflight(name, rx).await;
                }
                None => {
                    let kind = ResourceKind::parse(&config.kind)
                        .ok_or_else(|| ResourceError::UnsupportedKind(config.kind.clone()))?;

                    // Admission check under the slot lock keeps concurrent
                    // admissions serialized against the same reading
                    let available_mb = self.system.available_memory_mb();
                    if available_mb <= self.memory_budget_mb {
                        return Err(ResourceError::InsufficientMemory {
                            available_mb,
                            required_mb: self.memory_budget_mb,
                        });
                    }

                    let (tx, rx) = watch::channel(LoadOutcome::Pending);
                    slots.insert(name.to_string(), Slot::Loading(rx));
                    (tx, kind)
                }
            }
        };

        tracing::info!("Loading resource '{}' ({})", name, kind.as_str());

        let constructed =
            tokio::time::timeout(self.load_timeout, ScoringBackend::construct(kind, &config)).await;

        let mut slots = self.slots.write().await;
        match constructed {
            Ok(Ok(backend)) => {
                let resource = Arc::new(LoadedResource::new(name.to_string(), config, backend));
                slots.insert(name.to_string(), Slot::Ready(resource));
                let _ = tx.send(LoadOutcome::Succeeded);
                tracing::info!("Resource '{}' loaded", name);
                Ok(())
            }
            Ok(Err(e)) => {
                slots.remove(name);
                let _ = tx.send(LoadOutcome::Failed);
                tracing::error!("Failed to construct resource '{}': {}", name, e);
                Err(e)
            }
            Err(_) => {
                slots.remove(name);
                let _ = tx.send(LoadOutcome::Failed);
                tracing::error!("Construction of resource '{}' timed out", name);
                Err(ResourceError::ConstructionFailed {
                    reason: format!("timed out after {:?}", self.load_timeout),
                })
            }
        }
    }

    async fn join_inflight(
        name: &str,
        mut rx: watch::Receiver<LoadOutcome>,
    ) -> Result<(), ResourceError> {
        loop {
            let outcome = *rx.borrow();
            match outcome {
                LoadOutcome::Succeeded => return Ok(()),
                LoadOutcome::Failed => {
                    return Err(ResourceError::ConstructionFailed {
                        reason: format!("concurrent load of '{}' failed", name),
                    })
                }
                LoadOutcome::Pending => {
                    if rx.changed().await.is_err() {
                        // Loader dropped without an outcome; treat as failed
                        return Err(ResourceError::ConstructionFailed {
                            reason: format!("load of '{}' was cancelled", name),
                        });
                    }
                }
            }
        }
    }

    /// Lease a loaded resource, bumping its usage accounting.
    /// A resource still mid-construction is not yet loaded.
    pub async fn get_resource(&self, name: &str) -> Result<ResourceLease, ResourceError> {
        let slots = self.slots.read().await;
        match slots.get(name) {
            Some(Slot::Ready(resource)) => {
                resource.touch();
                Ok(ResourceLease::acquire(Arc::clone(resource)))
            }
            _ => Err(ResourceError::NotFound(name.to_string())),
        }
    }

    /// Unload a resource, releasing its slot. Outstanding leases keep the
    /// backing allocation alive until they drop.
    pub async fn unload_resource(&self, name: &str) -> Result<(), ResourceError> {
        let mut slots = self.slots.write().await;
        match slots.get(name) {
            Some(Slot::Ready(_)) => {
                slots.remove(name);
                tracing::info!("Unloaded resource '{}'", name);
                Ok(())
            }
            _ => Err(ResourceError::NotFound(name.to_string())),
        }
    }

    /// Unload then load with the stored config
    pub async fn reload(&self, name: &str) -> Result<(), ResourceError> {
        let config = {
            let slots = self.slots.read().await;
            match slots.get(name) {
                Some(Slot::Ready(resource)) => resource.config.clone(),
                _ => return Err(ResourceError::NotFound(name.to_string())),
            }
        };

        self.unload_resource(name).await?;
        self.load_resource(name, config).await
    }

    /// Unload every resource idle beyond the threshold, skipping leased
    /// resources and loads in flight. Returns the evicted names.
    pub async fn evict_idle(&self, max_idle: Duration) -> Vec<String> {
        let now = Utc::now();
        let max_idle = chrono::Duration::from_std(max_idle).unwrap_or(chrono::Duration::MAX);

        let mut evicted = Vec::new();
        let mut slots = self.slots.write().await;
        slots.retain(|name, slot| match slot {
            Slot::Loading(_) => true,
            Slot::Ready(resource) => {
                if resource.leased() {
                    return true;
                }
                let idle = now - resource.usage().last_used_at;
                if idle > max_idle {
                    evicted.push(name.clone());
                    false
                } else {
                    true
                }
            }
        });
        drop(slots);

        for name in &evicted {
            tracing::info!("Evicted idle resource '{}'", name);
        }
        evicted
    }

    /// Spawn the periodic idle-eviction sweep
    pub fn start_eviction_sweep(
        self: &Arc<Self>,
        every: Duration,
        max_idle: Duration,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = manager.evict_idle(max_idle).await;
                if !evicted.is_empty() {
                    tracing::info!("Idle sweep evicted {} resource(s)", evicted.len());
                }
            }
        })
    }

    /// Snapshot of every loaded resource
    pub async fn status(&self) -> HashMap<String, ResourceStatus> {
        let slots = self.slots.read().await;
        slots
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Ready(resource) => {
                    let usage = resource.usage();
                    Some((
                        name.clone(),
                        ResourceStatus {
                            kind: resource.kind(),
                            loaded_at: resource.loaded_at,
                            last_used_at: usage.last_used_at,
                            usage_count: usage.usage_count,
                            estimated_memory_mb: resource.backend.estimated_memory_mb(),
                        },
                    ))
                }
                Slot::Loading(_) => None,
            })
            .collect()
    }

    pub async fn loaded_count(&self) -> usize {
        let slots = self.slots.read().await;
        slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    /// System memory statistics via the SystemInfo collaborator
    pub fn memory_usage(&self) -> MemoryStats {
        let total_mb = self.system.total_memory_mb();
        let available_mb = self.system.available_memory_mb();
        let used_mb = total_mb.saturating_sub(available_mb);
        let percent = if total_mb > 0 {
            used_mb as f64 / total_mb as f64 * 100.0
        } else {
            0.0
        };

        MemoryStats {
            total_mb,
            available_mb,
            used_mb,
            percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::system::FixedSystemInfo;

    fn manager_with_memory(available_mb: u64) -> ResourceManager {
        ResourceManager::new(
            Arc::new(FixedSystemInfo {
                available_mb,
                total_mb: 16_384,
            }),
            2_048,
            Duration::from_secs(5),
        )
    }

    fn cf_config() -> ResourceConfig {
        ResourceConfig::collaborative_filtering(&["gpa", "academic_interests"])
    }

    #[tokio::test]
    async fn test_load_and_get() {
        let manager = manager_with_memory(8_192);
        manager.load_resource("matcher", cf_config()).await.unwrap();

        let lease = manager.get_resource("matcher").await.unwrap();
        assert_eq!(lease.kind(), ResourceKind::CollaborativeFiltering);
        assert_eq!(manager.loaded_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_load_rejected() {
        let manager = manager_with_memory(8_192);
        manager.load_resource("matcher", cf_config()).await.unwrap();

        let result = manager.load_resource("matcher", cf_config()).await;
        assert!(matches!(result, Err(ResourceError::AlreadyLoaded(_))));
        assert_eq!(manager.loaded_count().await, 1);
    }

    #[tokio::test]
    async fn test_unsupported_kind_leaves_state_unchanged() {
        let manager = manager_with_memory(8_192);

        let mut config = cf_config();
        config.kind = "unsupported".to_string();
        let result = manager.load_resource("bogus", config).await;

        assert!(matches!(result, Err(ResourceError::UnsupportedKind(_))));
        assert_eq!(manager.loaded_count().await, 0);
        assert!(manager.get_resource("bogus").await.is_err());
    }

    #[tokio::test]
    async fn test_admission_check_blocks_when_memory_low() {
        // Budget 2048MB but only 1024MB available
        let manager = manager_with_memory(1_024);

        let result = manager.load_resource("matcher", cf_config()).await;
        assert!(matches!(
            result,
            Err(ResourceError::InsufficientMemory { .. })
        ));
        assert_eq!(manager.loaded_count().await, 0);
    }

    #[tokio::test]
    async fn test_construction_failure_releases_slot() {
        let manager = manager_with_memory(8_192);

        let config = ResourceConfig::transformer_pipeline("", 512);
        let result = manager.load_resource("essay", config).await;
        assert!(matches!(
            result,
            Err(ResourceError::ConstructionFailed { .. })
        ));
        assert_eq!(manager.loaded_count().await, 0);

        // The name is free for a valid retry
        let config = ResourceConfig::transformer_pipeline("bert-base-uncased", 512);
        manager.load_resource("essay", config).await.unwrap();
        assert_eq!(manager.loaded_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_loads_collapse_into_one() {
        let manager = Arc::new(manager_with_memory(8_192));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.load_resource("matcher", cf_config()).await })
            })
            .collect();

        let mut outcomes = Vec::new();
        for task in tasks {
            outcomes.push(task.await.unwrap());
        }

        // No lost load: at least one caller succeeds outright or joins
        // the winning construction, and exactly one resource exists
        assert!(outcomes.iter().any(|r| r.is_ok()));
        assert_eq!(manager.loaded_count().await, 1);
    }

    #[tokio::test]
    async fn test_get_resource_updates_usage() {
        let manager = manager_with_memory(8_192);
        manager.load_resource("matcher", cf_config()).await.unwrap();

        for _ in 0..3 {
            let _lease = manager.get_resource("matcher").await.unwrap();
        }

        let status = manager.status().await;
        assert_eq!(status["matcher"].usage_count, 3);
        assert!(status["matcher"].last_used_at >= status["matcher"].loaded_at);
    }

    #[tokio::test]
    async fn test_unload_and_not_found() {
        let manager = manager_with_memory(8_192);
        manager.load_resource("matcher", cf_config()).await.unwrap();

        manager.unload_resource("matcher").await.unwrap();
        assert!(matches!(
            manager.unload_resource("matcher").await,
            Err(ResourceError::NotFound(_))
        ));
        assert!(manager.get_resource("matcher").await.is_err());
    }

    #[tokio::test]
    async fn test_evict_idle_skips_fresh_resources() {
        let manager = manager_with_memory(8_192);
        manager.load_resource("matcher", cf_config()).await.unwrap();

        let evicted = manager.evict_idle(Duration::from_secs(3600)).await;
        assert!(evicted.is_empty());
        assert_eq!(manager.loaded_count().await, 1);
    }

    #[tokio::test]
    async fn test_evict_idle_removes_stale_resources() {
        let manager = manager_with_memory(8_192);
        manager.load_resource("matcher", cf_config()).await.unwrap();

        // Zero threshold makes any resource stale immediately
        tokio::time::sleep(Duration::from_millis(5)).await;
        let evicted = manager.evict_idle(Duration::ZERO).await;
        assert_eq!(evicted, vec!["matcher".to_string()]);
        assert_eq!(manager.loaded_count().await, 0);
    }

    #[tokio::test]
    async fn test_evict_idle_never_removes_leased_resource() {
        let manager = manager_with_memory(8_192);
        manager.load_resource("matcher", cf_config()).await.unwrap();

        let lease = manager.get_resource("matcher").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let evicted = manager.evict_idle(Duration::ZERO).await;
        assert!(evicted.is_empty());
        assert_eq!(manager.loaded_count().await, 1);

        drop(lease);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let evicted = manager.evict_idle(Duration::ZERO).await;
        assert_eq!(evicted.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_keeps_config_and_resets_usage() {
        let manager = manager_with_memory(8_192);
        manager
            .load_resource("essay", ResourceConfig::transformer_pipeline("bert-base-uncased", 256))
            .await
            .unwrap();
        let _ = manager.get_resource("essay").await.unwrap();

        manager.reload("essay").await.unwrap();

        let status = manager.status().await;
        assert_eq!(status["essay"].kind, ResourceKind::TransformerPipeline);
        assert_eq!(status["essay"].usage_count, 0);

        let lease = manager.get_resource("essay").await.unwrap();
        match lease.backend() {
            ScoringBackend::TransformerPipeline(tp) => assert_eq!(tp.max_length, 256),
            other => panic!("unexpected backend: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reload_unknown_resource() {
        let manager = manager_with_memory(8_192);
        assert!(matches!(
            manager.reload("ghost").await,
            Err(ResourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_usage_snapshot() {
        let manager = manager_with_memory(4_096);
        let stats = manager.memory_usage();

        assert_eq!(stats.total_mb, 16_384);
        assert_eq!(stats.available_mb, 4_096);
        assert_eq!(stats.used_mb, 12_288);
        assert!((stats.percent - 75.0).abs() < 1e-9);
    }
}
