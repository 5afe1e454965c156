// Service exports
pub mod backend;
pub mod cache;
pub mod resources;
pub mod system;

pub use backend::{
    CollaborativeFilteringBackend, GradientBoostingBackend, ResourceConfig, ResourceKind,
    ScoringBackend, TransformerPipelineBackend,
};
pub use cache::{Cache, CacheError, CacheKey, InMemoryCache, RedisCache};
pub use resources::{ResourceError, ResourceLease, ResourceManager, ResourceStatus};
pub use system::{FixedSystemInfo, MemoryStats, ProcSystemInfo, SystemInfo};
