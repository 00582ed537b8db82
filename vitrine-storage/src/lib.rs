//! Tenant cache layer with explicit freshness and self-healing.
//!
//! Tenant records are persisted per slug in a durable key-value store so a
//! restarted client can theme itself before the network answers. Reads are
//! classified rather than merely hit-or-miss: a [`CacheLookup::Corrupt`]
//! entry (stored identity disagrees with its key, unknown schema version,
//! undecodable payload) is distinguished from a plain miss because the
//! remedy is a full purge, not a refetch.
//!
//! # Example
//!
//! ```ignore
//! let cache = TenantCache::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
//!
//! match cache.get(&slug)? {
//!     CacheLookup::Fresh(read) => use_tenant(read.into_value()),
//!     CacheLookup::Stale { .. } | CacheLookup::Miss => refetch(),
//!     CacheLookup::Corrupt(reason) => { cache.invalidate_all()?; restart(reason) }
//! }
//! ```

pub mod cache;
pub mod entry;
pub mod freshness;
pub mod key;
pub mod kv;
pub mod lmdb;
pub mod marker;

pub use cache::{CacheLookup, CacheStats, Corruption, TenantCache};
pub use entry::{CacheEntry, CACHE_ENTRY_VERSION};
pub use freshness::{CacheRead, MAX_CLOCK_SKEW};
pub use key::{cache_key, slug_from_cache_key, CURRENT_TENANT_SLUG_KEY};
pub use kv::{KeyValueStore, MemoryStore};
pub use lmdb::{LmdbStore, LmdbStoreError};
pub use marker::ResolutionMarker;
