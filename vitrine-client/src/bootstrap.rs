//! Wiring a [`TenantContext`] from configuration.

use std::sync::Arc;

use vitrine_core::{Clock, MembershipLookup, TenantFetcher};
use vitrine_storage::{KeyValueStore, LmdbStore, MemoryStore, ResolutionMarker, TenantCache};
use vitrine_theme::{DocumentSurface, ThemeApplicator};

use crate::config::{ClientConfig, ConfigError, StoreKind};
use crate::context::{ContextParts, TenantContext};
use crate::events::InvalidationBus;
use crate::error::ClientResult;
use crate::membership::OverrideResolver;
use crate::rest::{RestClient, RestMembershipLookup, RestTenantFetcher};

/// Open the configured key-value store.
pub fn open_store(config: &ClientConfig) -> ClientResult<Arc<dyn KeyValueStore>> {
    match config.cache.store {
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreKind::Lmdb => {
            let path = config
                .cache
                .path
                .as_ref()
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "cache.path",
                    reason: "required when cache.store = \"lmdb\"".to_string(),
                })?;
            Ok(Arc::new(LmdbStore::open(path, config.cache.max_size_mb)?))
        }
    }
}

/// Build a context over arbitrary sources.
pub fn build_context(
    config: &ClientConfig,
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn TenantFetcher>,
    membership: Arc<dyn MembershipLookup>,
    document: Box<dyn DocumentSurface>,
    clock: Arc<dyn Clock>,
) -> ClientResult<TenantContext> {
    let parts = ContextParts {
        routes: config.route_table()?,
        fetcher,
        overrides: OverrideResolver::new(membership, config.fetch_timeout()),
        cache: TenantCache::with_ttl(store.clone(), clock.clone(), config.cache_ttl()),
        marker: ResolutionMarker::new(store),
        theme: ThemeApplicator::new(document, clock),
        fetch_timeout: config.fetch_timeout(),
    };
    Ok(TenantContext::new(parts))
}

/// Build a context backed by the REST sources and the configured store.
pub fn build_rest_context(
    config: &ClientConfig,
    document: Box<dyn DocumentSurface>,
    clock: Arc<dyn Clock>,
) -> ClientResult<TenantContext> {
    let client = RestClient::new(config)?;
    let store = open_store(config)?;
    build_context(
        config,
        store,
        Arc::new(RestTenantFetcher::new(client.clone())),
        Arc::new(RestMembershipLookup::new(client)),
        document,
        clock,
    )
}

/// Event bus sized by `event_capacity`.
pub fn invalidation_bus(config: &ClientConfig) -> InvalidationBus {
    InvalidationBus::new(config.event_capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::SystemClock;
    use vitrine_test_utils::{slug, tenant_fixture, ScriptedFetcher, StaticMembership};
    use vitrine_theme::RecordingDocument;

    fn config(store: &str, path: Option<&std::path::Path>) -> ClientConfig {
        let path_line = path
            .map(|p| format!("path = {:?}\n", p.display().to_string()))
            .unwrap_or_default();
        ClientConfig::from_toml(&format!(
            r#"
api_base_url = "https://api.example.com"
api_key = "anon-key"
default_slug = "main"
tenant_prefixes = ["t"]
institutional_routes = ["/portal"]
request_timeout_ms = 1000
fetch_timeout_ms = 2000
event_capacity = 8

[cache]
ttl_secs = 3600
store = "{store}"
{path_line}max_size_mb = 8

[log]
format = "json"
filter = "vitrine=debug"
"#
        ))
        .unwrap()
    }

    #[test]
    fn test_open_memory_store() {
        let store = open_store(&config("memory", None)).unwrap();
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_open_lmdb_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&config("lmdb", Some(dir.path()))).unwrap();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_lmdb_without_path_is_rejected() {
        assert!(matches!(
            open_store(&config("lmdb", None)),
            Err(crate::error::ClientError::Config(ConfigError::InvalidValue {
                field: "cache.path",
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_build_context_uses_configured_routes() {
        let config = config("memory", None);
        let context = build_context(
            &config,
            open_store(&config).unwrap(),
            Arc::new(ScriptedFetcher::with_tenants([tenant_fixture("acme")])),
            Arc::new(StaticMembership::new()),
            Box::new(RecordingDocument::new()),
            Arc::new(SystemClock),
        )
        .unwrap();

        let state = context.navigate("/t/acme/portal", None).await;
        assert_eq!(state.tenant.unwrap().slug, slug("acme"));
        assert_eq!(context.cache().ttl(), config.cache_ttl());
        assert_eq!(invalidation_bus(&config).tenant_updated(slug("acme")), 0);
    }
}
