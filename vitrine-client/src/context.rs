//! Tenant context: the single owner of resolved tenant state.
//!
//! Every state change goes through [`TenantContext`]: navigation, manual
//! refresh, external invalidation and corruption recovery. Consumers read
//! [`TenantState`] through [`TenantContext::snapshot`] or a
//! [`tokio::sync::watch`] subscription and never mutate it.
//!
//! # Race guard
//!
//! Each resolution claims a generation number up front. State is only
//! written while holding the commit lock and only if the resolution's
//! generation is still the latest, so a slow response for slug A can never
//! overwrite state after the user has moved on to slug B.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use vitrine_core::{
    ensure_slug_matches, FetchError, RouteTable, Slug, Tenant, TenantFetcher, UserIdentity,
    VitrineError,
};
use vitrine_storage::{CacheLookup, ResolutionMarker, TenantCache};
use vitrine_theme::ThemeApplicator;

use crate::membership::OverrideResolver;

/// Whether a resolution may be served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Use,
    /// Skip the read; the fetched record is still written through.
    Bypass,
}

/// Conceptual phase of the context, derived from [`TenantState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Resolving,
    Ready,
    Failed,
}

/// What consumers see.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantState {
    /// The slug most recently requested (URL or override), not necessarily
    /// the slug of `tenant` after a fallback.
    pub active_slug: Option<Slug>,
    pub tenant: Option<Arc<Tenant>>,
    pub loading: bool,
    pub error: Option<VitrineError>,
}

impl TenantState {
    pub fn phase(&self) -> Phase {
        match (self.loading, &self.tenant, &self.error) {
            (true, _, _) => Phase::Resolving,
            (false, Some(_), _) => Phase::Ready,
            (false, None, Some(_)) => Phase::Failed,
            (false, None, None) => Phase::Idle,
        }
    }

    fn is_ready_for(&self, slug: &Slug) -> bool {
        self.phase() == Phase::Ready && self.active_slug.as_ref() == Some(slug)
    }

    /// Whether `slug` names the requested or the displayed tenant.
    fn concerns(&self, slug: &Slug) -> bool {
        self.active_slug.as_ref() == Some(slug)
            || self.tenant.as_ref().is_some_and(|t| t.slug == *slug)
    }
}

/// Why a single-slug load failed.
#[derive(Debug)]
enum LoadError {
    Fetch(FetchError),
    Superseded,
}

/// Per-resolution bookkeeping.
struct Attempt {
    generation: u64,
    restarted: bool,
}

/// Wiring for a [`TenantContext`].
pub struct ContextParts {
    pub routes: RouteTable,
    pub fetcher: Arc<dyn TenantFetcher>,
    pub overrides: OverrideResolver,
    pub cache: TenantCache,
    pub marker: ResolutionMarker,
    pub theme: ThemeApplicator,
    pub fetch_timeout: Duration,
}

/// Orchestrates slug resolution, caching, fetching and theming.
pub struct TenantContext {
    routes: RouteTable,
    fetcher: Arc<dyn TenantFetcher>,
    overrides: OverrideResolver,
    cache: TenantCache,
    marker: ResolutionMarker,
    fetch_timeout: Duration,
    /// Serializes state transitions and owns the document.
    theme: Mutex<ThemeApplicator>,
    generation: AtomicU64,
    restarts: AtomicU64,
    state: watch::Sender<TenantState>,
}

impl TenantContext {
    pub fn new(parts: ContextParts) -> Self {
        let (state, _rx) = watch::channel(TenantState::default());
        Self {
            routes: parts.routes,
            fetcher: parts.fetcher,
            overrides: parts.overrides,
            cache: parts.cache,
            marker: parts.marker,
            fetch_timeout: parts.fetch_timeout,
            theme: Mutex::new(parts.theme),
            generation: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
            state,
        }
    }

    pub fn snapshot(&self) -> TenantState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TenantState> {
        self.state.subscribe()
    }

    pub fn active_slug(&self) -> Option<Slug> {
        self.state.borrow().active_slug.clone()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn cache(&self) -> &TenantCache {
        &self.cache
    }

    /// How many times corruption forced a re-initialization.
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::SeqCst)
    }

    /// Resolve the tenant for a route change.
    ///
    /// On institutional routes the user's membership, when present, wins
    /// over the URL slug.
    pub async fn navigate(&self, path: &str, user: Option<&UserIdentity>) -> TenantState {
        let generation = self.claim();
        let url_slug = self.routes.resolve_slug(path);

        let slug = if self.routes.is_institutional(path) {
            match self.overrides.resolve(user).await {
                Some(slug) => {
                    if slug != url_slug {
                        tracing::debug!(url_slug = %url_slug, slug = %slug, "Membership overrides URL tenant");
                    }
                    slug
                }
                None => url_slug,
            }
        } else {
            url_slug
        };

        if !self.is_current(generation) {
            tracing::debug!(slug = %slug, "Navigation superseded during override lookup");
            return self.snapshot();
        }
        self.run(generation, slug, CacheMode::Use).await
    }

    /// Resolve `slug` directly.
    pub async fn resolve(&self, slug: Slug, mode: CacheMode) -> TenantState {
        let generation = self.claim();
        self.run(generation, slug, mode).await
    }

    /// Re-resolve the active slug (or the default, if nothing is active)
    /// without reading the cache.
    pub async fn refresh(&self) -> TenantState {
        let slug = self
            .active_slug()
            .unwrap_or_else(|| self.routes.default_slug().clone());
        tracing::debug!(slug = %slug, "Refreshing tenant");
        self.resolve(slug, CacheMode::Bypass).await
    }

    /// Handle an external edit notification for `slug`.
    ///
    /// The slug's entry is always evicted. If it is the requested or the
    /// displayed tenant, resolution re-runs. Returns whether it did.
    pub async fn on_tenant_updated(&self, slug: &Slug) -> bool {
        if let Err(e) = self.cache.invalidate(slug) {
            tracing::warn!(slug = %slug, error = %e, "Failed to evict updated tenant");
        }

        if !self.state.borrow().concerns(slug) {
            tracing::debug!(slug = %slug, "Evicted inactive tenant after update");
            return false;
        }
        self.refresh().await;
        true
    }

    /// Purge every cache entry, clear the marker and reset exposed state,
    /// then resolve the active slug again from empty.
    ///
    /// Stands in for a full application reload after cache corruption:
    /// everything that could hold a wrong tenant is discarded.
    pub async fn reinitialize(&self) -> TenantState {
        let generation = self.claim();
        self.reinitialize_for(generation).await;
        match self.active_slug() {
            Some(slug) if self.is_current(generation) => self.run(generation, slug, CacheMode::Use).await,
            _ => self.snapshot(),
        }
    }

    async fn reinitialize_for(&self, generation: u64) {
        let _guard = self.theme.lock().await;

        match self.cache.invalidate_all() {
            Ok(removed) => tracing::error!(removed, "Re-initializing tenant context after cache corruption"),
            Err(e) => tracing::error!(error = %e, "Cache purge failed during re-initialization"),
        }
        if let Err(e) = self.marker.clear() {
            tracing::warn!(error = %e, "Failed to clear tenant marker");
        }
        self.restarts.fetch_add(1, Ordering::SeqCst);

        if self.is_current(generation) {
            let active_slug = self.state.borrow().active_slug.clone();
            let loading = active_slug.is_some();
            self.state.send_replace(TenantState {
                active_slug,
                tenant: None,
                loading,
                error: None,
            });
        }
    }

    fn claim(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn run(&self, generation: u64, slug: Slug, mode: CacheMode) -> TenantState {
        if mode == CacheMode::Use && self.state.borrow().is_ready_for(&slug) {
            tracing::debug!(slug = %slug, "Tenant already active");
            return self.snapshot();
        }

        if !self.begin(generation, &slug).await {
            return self.snapshot();
        }

        let mut attempt = Attempt {
            generation,
            restarted: false,
        };
        let outcome = self.load_with_fallback(&slug, mode, &mut attempt).await;
        self.commit(generation, slug, outcome).await
    }

    /// Enter RESOLVING. Returns false if a newer resolution already started.
    async fn begin(&self, generation: u64, slug: &Slug) -> bool {
        let _guard = self.theme.lock().await;
        if !self.is_current(generation) {
            return false;
        }

        match self.marker.get() {
            Ok(Some(previous)) if previous != *slug => {
                if let Err(e) = self.cache.invalidate(&previous) {
                    tracing::warn!(slug = %previous, error = %e, "Failed to evict previous tenant");
                } else {
                    tracing::debug!(previous = %previous, slug = %slug, "Evicted previous tenant entry");
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read tenant marker"),
        }

        self.state.send_modify(|state| {
            state.active_slug = Some(slug.clone());
            state.loading = true;
            state.error = None;
        });
        tracing::debug!(slug = %slug, generation, "Resolving tenant");
        true
    }

    async fn load_with_fallback(
        &self,
        slug: &Slug,
        mode: CacheMode,
        attempt: &mut Attempt,
    ) -> Result<Arc<Tenant>, Option<VitrineError>> {
        let default = self.routes.default_slug();
        match self.load(slug, mode, attempt).await {
            Ok(tenant) => Ok(tenant),
            Err(LoadError::Superseded) => Err(None),
            Err(LoadError::Fetch(e)) if e.is_fallback_eligible() && slug != default => {
                tracing::warn!(slug = %slug, fallback = %default, error = %e, "Falling back to default tenant");
                match self.load(default, mode, attempt).await {
                    Ok(tenant) => Ok(tenant),
                    Err(LoadError::Superseded) => Err(None),
                    Err(LoadError::Fetch(fallback_err)) => {
                        tracing::error!(
                            slug = %slug,
                            error = %e,
                            fallback_error = %fallback_err,
                            "Default tenant unavailable"
                        );
                        Err(Some(fallback_err.into()))
                    }
                }
            }
            Err(LoadError::Fetch(e)) => {
                tracing::error!(slug = %slug, error = %e, "Tenant resolution failed");
                Err(Some(e.into()))
            }
        }
    }

    /// Cache-or-fetch for one slug.
    async fn load(
        &self,
        slug: &Slug,
        mode: CacheMode,
        attempt: &mut Attempt,
    ) -> Result<Arc<Tenant>, LoadError> {
        if mode == CacheMode::Use {
            match self.cache.get(slug) {
                Ok(CacheLookup::Fresh(read)) => {
                    tracing::debug!(slug = %slug, age_secs = read.age().as_secs(), "Tenant cache hit");
                    return Ok(Arc::new(read.into_value()));
                }
                Ok(CacheLookup::Stale { age }) => {
                    tracing::debug!(slug = %slug, age_secs = age.as_secs(), "Tenant cache stale");
                }
                Ok(CacheLookup::Miss) => {
                    tracing::debug!(slug = %slug, "Tenant cache miss");
                }
                Ok(CacheLookup::Corrupt(reason)) => {
                    tracing::error!(slug = %slug, reason = %reason, "Tenant cache corrupt");
                    if attempt.restarted {
                        // Already restarted once for this resolution.
                        if let Err(e) = self.cache.invalidate(slug) {
                            tracing::warn!(slug = %slug, error = %e, "Failed to evict corrupt entry");
                        }
                    } else {
                        attempt.restarted = true;
                        self.reinitialize_for(attempt.generation).await;
                    }
                    if !self.is_current(attempt.generation) {
                        return Err(LoadError::Superseded);
                    }
                }
                Err(e) => {
                    tracing::warn!(slug = %slug, error = %e, "Tenant cache unreadable; fetching");
                }
            }
        }

        let tenant = self.fetch(slug).await.map_err(LoadError::Fetch)?;
        if let Err(e) = self.cache.put(slug, &tenant) {
            tracing::warn!(slug = %slug, error = %e, "Failed to cache tenant");
        }
        Ok(Arc::new(tenant))
    }

    async fn fetch(&self, slug: &Slug) -> Result<Tenant, FetchError> {
        let result = match tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(slug)).await {
            // Fetchers are not trusted to check identity themselves.
            Ok(result) => result.and_then(|tenant| ensure_slug_matches(slug, tenant)),
            Err(_) => Err(FetchError::Timeout {
                slug: slug.clone(),
                after: self.fetch_timeout,
            }),
        };

        if let Err(e) = &result {
            if e.is_corruption() {
                tracing::error!(slug = %slug, error = %e, "Backend disagrees about tenant identity; purging cache");
                if let Err(purge) = self.cache.invalidate_all() {
                    tracing::error!(error = %purge, "Cache purge failed");
                }
            }
        }
        result
    }

    async fn commit(
        &self,
        generation: u64,
        slug: Slug,
        outcome: Result<Arc<Tenant>, Option<VitrineError>>,
    ) -> TenantState {
        let mut theme = self.theme.lock().await;
        if !self.is_current(generation) {
            tracing::debug!(slug = %slug, "Discarding superseded resolution");
            return self.snapshot();
        }

        let next = match outcome {
            Ok(tenant) => {
                theme.apply(&tenant);
                if let Err(e) = self.marker.set(&tenant.slug) {
                    tracing::warn!(slug = %tenant.slug, error = %e, "Failed to persist tenant marker");
                }
                tracing::info!(slug = %slug, tenant = %tenant.slug, "Tenant ready");
                TenantState {
                    active_slug: Some(slug),
                    tenant: Some(tenant),
                    loading: false,
                    error: None,
                }
            }
            Err(Some(error)) => TenantState {
                active_slug: Some(slug),
                tenant: None,
                loading: false,
                error: Some(error),
            },
            // Superseded loads are stopped by the generation check above.
            Err(None) => return self.snapshot(),
        };

        self.state.send_replace(next.clone());
        next
    }
}
