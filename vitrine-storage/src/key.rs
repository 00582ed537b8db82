//! Storage key layout.
//!
//! Every tenant entry lives under `tenant_<slug>_cache`; the single
//! resolution marker lives under `current_tenant_slug`. Purges match on the
//! key shape alone, so an entry is removable even when its payload is
//! garbage or its slug segment no longer parses.

use vitrine_core::Slug;

const KEY_PREFIX: &str = "tenant_";
const KEY_SUFFIX: &str = "_cache";

/// Key of the last-resolved-slug marker.
pub const CURRENT_TENANT_SLUG_KEY: &str = "current_tenant_slug";

/// Storage key for a slug's cache entry.
pub fn cache_key(slug: &Slug) -> String {
    format!("{}{}{}", KEY_PREFIX, slug, KEY_SUFFIX)
}

/// The raw slug segment of a tenant cache key, or `None` for any other key.
///
/// The segment is returned unparsed: a key written by an older client may
/// not satisfy today's slug rules and still has to be recognised as a
/// tenant entry.
pub fn slug_from_cache_key(key: &str) -> Option<&str> {
    key.strip_prefix(KEY_PREFIX)
        .and_then(|rest| rest.strip_suffix(KEY_SUFFIX))
        .filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_shape() {
        let slug = Slug::parse("acme").unwrap();
        assert_eq!(cache_key(&slug), "tenant_acme_cache");
    }

    #[test]
    fn test_slug_from_cache_key() {
        assert_eq!(slug_from_cache_key("tenant_acme_cache"), Some("acme"));
        assert_eq!(slug_from_cache_key("tenant_Old Slug_cache"), Some("Old Slug"));
        assert_eq!(slug_from_cache_key("tenant__cache"), None);
        assert_eq!(slug_from_cache_key(CURRENT_TENANT_SLUG_KEY), None);
        assert_eq!(slug_from_cache_key("session_token"), None);
    }

    #[test]
    fn test_marker_key_is_not_a_cache_key() {
        // A purge of cache entries must never take the marker with it by accident.
        assert!(slug_from_cache_key(CURRENT_TENANT_SLUG_KEY).is_none());
    }
}
