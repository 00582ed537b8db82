#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use vitrine_client::{ContextParts, OverrideResolver, TenantContext};
use vitrine_core::{RouteTable, TenantFetcher};
use vitrine_storage::{KeyValueStore, MemoryStore, ResolutionMarker, TenantCache};
use vitrine_test_utils::{slug, ManualClock, ScriptedFetcher, StaticMembership};
use vitrine_theme::{RecordingDocument, ThemeApplicator};

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// A context over in-memory doubles, plus handles to inspect them.
pub struct Harness {
    pub context: Arc<TenantContext>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub membership: Arc<StaticMembership>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub document: RecordingDocument,
}

pub fn routes() -> RouteTable {
    RouteTable::new(slug("main"))
        .with_tenant_prefix("t")
        .with_institutional_route("portal")
}

pub fn harness(fetcher: ScriptedFetcher) -> Harness {
    harness_with(fetcher, StaticMembership::new())
}

pub fn harness_with(fetcher: ScriptedFetcher, membership: StaticMembership) -> Harness {
    assemble(
        Arc::new(fetcher),
        Arc::new(membership),
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::default()),
    )
}

impl Harness {
    /// A fresh context over the same store, clock and sources, as after a
    /// page reload.
    pub fn reload(&self) -> Harness {
        assemble(
            self.fetcher.clone(),
            self.membership.clone(),
            self.store.clone(),
            self.clock.clone(),
        )
    }

    /// A cache view over the harness store.
    pub fn cache(&self) -> TenantCache {
        TenantCache::new(self.store.clone(), self.clock.clone())
    }

    pub fn marker(&self) -> ResolutionMarker {
        ResolutionMarker::new(self.store.clone())
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.store.get(key).unwrap().is_some()
    }
}

/// Context parts over the given doubles, writing theme effects to `document`.
pub fn parts(
    fetcher: Arc<dyn TenantFetcher>,
    membership: Arc<StaticMembership>,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    document: &RecordingDocument,
) -> ContextParts {
    ContextParts {
        routes: routes(),
        fetcher,
        overrides: OverrideResolver::new(membership, FETCH_TIMEOUT),
        cache: TenantCache::new(store.clone(), clock.clone()),
        marker: ResolutionMarker::new(store),
        theme: ThemeApplicator::new(Box::new(document.clone()), clock),
        fetch_timeout: FETCH_TIMEOUT,
    }
}

fn assemble(
    fetcher: Arc<ScriptedFetcher>,
    membership: Arc<StaticMembership>,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
) -> Harness {
    let document = RecordingDocument::new();
    let parts = parts(
        fetcher.clone(),
        membership.clone(),
        store.clone(),
        clock.clone(),
        &document,
    );
    Harness {
        context: Arc::new(TenantContext::new(parts)),
        fetcher,
        membership,
        store,
        clock,
        document,
    }
}
