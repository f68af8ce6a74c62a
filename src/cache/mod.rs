// Cache layer - bounded recency caches for user and role snapshots
pub mod layer;
pub mod recency;

pub use layer::{CacheLayer, CacheStats};
pub use recency::RecencyCache;
