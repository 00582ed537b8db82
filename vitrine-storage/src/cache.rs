//! Per-slug tenant cache with TTL freshness and corruption detection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;
use vitrine_core::{Clock, Slug, StorageError, Tenant, TENANT_CACHE_TTL_SECS};

use crate::entry::{CacheEntry, CACHE_ENTRY_VERSION};
use crate::freshness::{age_between, CacheRead};
use crate::key::{cache_key, slug_from_cache_key};
use crate::kv::KeyValueStore;

/// Why a stored entry cannot be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    /// The entry under `tenant_<key>_cache` holds a record for another slug.
    SlugMismatch { key: Slug, stored: Option<String> },
    /// The entry was written with an unknown schema version.
    VersionMismatch { found: Option<u64> },
    /// The payload is not a decodable entry.
    Undecodable { reason: String },
    /// The entry is stamped further in the future than clock skew explains.
    FutureTimestamp { timestamp: i64 },
}

impl std::fmt::Display for Corruption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SlugMismatch { key, stored } => write!(
                f,
                "entry for {} holds slug {}",
                key,
                stored.as_deref().unwrap_or("<missing>")
            ),
            Self::VersionMismatch { found: Some(v) } => {
                write!(f, "entry version {} (expected {})", v, CACHE_ENTRY_VERSION)
            }
            Self::VersionMismatch { found: None } => write!(f, "entry carries no version"),
            Self::Undecodable { reason } => write!(f, "entry undecodable: {}", reason),
            Self::FutureTimestamp { timestamp } => {
                write!(f, "entry stamped in the future ({} ms)", timestamp)
            }
        }
    }
}

/// Outcome of reading one slug from the cache.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// Entry present, trustworthy and younger than the TTL.
    Fresh(CacheRead<Tenant>),
    /// Entry present and trustworthy but expired. The caller refetches.
    Stale { age: Duration },
    Miss,
    /// Entry present but untrustworthy. The caller purges everything.
    Corrupt(Corruption),
}

impl CacheLookup {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}

/// Counters for one cache instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Reads that found an expired entry.
    pub stale: u64,
    pub corruptions: u64,
    /// Full purges performed through [`TenantCache::invalidate_all`].
    pub purges: u64,
    pub writes: u64,
}

impl CacheStats {
    /// Hit rate over all reads (0.0 to 1.0). Stale and corrupt reads count
    /// as misses.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.stale + self.corruptions;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
    corruptions: AtomicU64,
    purges: AtomicU64,
    writes: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            corruptions: self.corruptions.load(Ordering::Relaxed),
            purges: self.purges.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}

/// Tenant cache over a [`KeyValueStore`].
///
/// Entries are keyed by slug and stamped with the writer's clock. Reads
/// classify each entry as fresh, stale, missing or corrupt; nothing here
/// decides what to do about corruption.
#[derive(Clone)]
pub struct TenantCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    counters: Arc<Counters>,
}

impl TenantCache {
    /// A cache with the standard one-hour TTL.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(store, clock, Duration::from_secs(TENANT_CACHE_TTL_SECS))
    }

    pub fn with_ttl(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Read and classify the entry for `slug`.
    ///
    /// An entry is fresh iff `now - timestamp < ttl`. Classification checks
    /// the schema version first, then that the stored record's slug equals
    /// the key's slug, then that the record decodes.
    pub fn get(&self, slug: &Slug) -> Result<CacheLookup, StorageError> {
        let key = cache_key(slug);
        let Some(raw) = self.store.get(&key)? else {
            Counters::bump(&self.counters.misses);
            return Ok(CacheLookup::Miss);
        };

        let now = self.clock.now();
        let classified = self.classify(slug, &raw).and_then(|entry| {
            let cached_at = DateTime::from_timestamp_millis(entry.timestamp).ok_or_else(|| {
                Corruption::Undecodable {
                    reason: format!("timestamp {} out of range", entry.timestamp),
                }
            })?;
            let age = age_between(cached_at, now).ok_or(Corruption::FutureTimestamp {
                timestamp: entry.timestamp,
            })?;
            Ok((entry.data, cached_at, age))
        });

        let lookup = match classified {
            Ok((tenant, cached_at, age)) => {
                if age < self.ttl {
                    Counters::bump(&self.counters.hits);
                    CacheLookup::Fresh(CacheRead::new(tenant, cached_at, age))
                } else {
                    Counters::bump(&self.counters.stale);
                    CacheLookup::Stale { age }
                }
            }
            Err(corruption) => {
                Counters::bump(&self.counters.corruptions);
                tracing::warn!(slug = %slug, reason = %corruption, "Corrupt tenant cache entry");
                CacheLookup::Corrupt(corruption)
            }
        };
        Ok(lookup)
    }

    fn classify(&self, slug: &Slug, raw: &str) -> Result<CacheEntry<Tenant>, Corruption> {
        let value: Value = serde_json::from_str(raw).map_err(|e| Corruption::Undecodable {
            reason: e.to_string(),
        })?;

        let version = value.get("version").and_then(Value::as_u64);
        if version != Some(u64::from(CACHE_ENTRY_VERSION)) {
            return Err(Corruption::VersionMismatch { found: version });
        }

        let stored = value
            .get("data")
            .and_then(|d| d.get("slug"))
            .and_then(Value::as_str);
        let matches = stored
            .and_then(|s| Slug::parse(s).ok())
            .is_some_and(|s| s == *slug);
        if !matches {
            return Err(Corruption::SlugMismatch {
                key: slug.clone(),
                stored: stored.map(str::to_owned),
            });
        }

        serde_json::from_value(value).map_err(|e| Corruption::Undecodable {
            reason: e.to_string(),
        })
    }

    /// Write `tenant` under `slug`, stamped with the current time.
    ///
    /// Refuses to write a record whose own slug differs from `slug`; such an
    /// entry would read back as corrupt.
    pub fn put(&self, slug: &Slug, tenant: &Tenant) -> Result<(), StorageError> {
        if tenant.slug != *slug {
            return Err(StorageError::KeyMismatch {
                key: slug.clone(),
                stored: tenant.slug.clone(),
            });
        }

        let key = cache_key(slug);
        let entry = CacheEntry::new(tenant, self.clock.now_millis());
        let raw = serde_json::to_string(&entry).map_err(|e| StorageError::Serialization {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.store.set(&key, &raw)?;
        Counters::bump(&self.counters.writes);
        tracing::debug!(slug = %slug, "Cached tenant");
        Ok(())
    }

    /// Remove the entry for `slug`. Returns whether one existed.
    pub fn invalidate(&self, slug: &Slug) -> Result<bool, StorageError> {
        let removed = self.store.remove(&cache_key(slug))?;
        if removed {
            tracing::debug!(slug = %slug, "Invalidated tenant cache entry");
        }
        Ok(removed)
    }

    /// Remove every tenant cache entry, whatever its payload. Keys that are
    /// not tenant entries are left alone. Returns the number removed.
    pub fn invalidate_all(&self) -> Result<usize, StorageError> {
        let mut removed = 0;
        for key in self.store.keys()? {
            if slug_from_cache_key(&key).is_some() && self.store.remove(&key)? {
                removed += 1;
            }
        }
        Counters::bump(&self.counters.purges);
        tracing::info!(removed, "Purged tenant cache");
        Ok(removed)
    }

    /// Slugs with an entry currently stored, as raw key segments.
    pub fn cached_slugs(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .store
            .keys()?
            .iter()
            .filter_map(|k| slug_from_cache_key(k).map(str::to_owned))
            .collect())
    }
}
