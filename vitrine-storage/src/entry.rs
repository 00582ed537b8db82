//! On-disk entry format.

use serde::{Deserialize, Serialize};

/// Current schema version of [`CacheEntry`]. Entries carrying any other
/// version are treated as corrupt.
pub const CACHE_ENTRY_VERSION: u32 = 1;

/// A cached tenant record as stored under `tenant_<slug>_cache`.
///
/// Serialized as `{"version": 1, "data": {...}, "timestamp": <unix millis>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub version: u32,
    pub data: T,
    /// Write time in unix milliseconds.
    pub timestamp: i64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, timestamp: i64) -> Self {
        Self {
            version: CACHE_ENTRY_VERSION,
            data,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_wire_shape() {
        let entry = CacheEntry::new(json!({"slug": "acme"}), 1_700_000_000_000);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({"version": 1, "data": {"slug": "acme"}, "timestamp": 1_700_000_000_000i64})
        );
    }
}
