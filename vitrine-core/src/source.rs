//! Remote data seams.
//!
//! The orchestrator only talks to the backend through these traits. The
//! REST implementations live in `vitrine-client`; test doubles live in
//! `vitrine-test-utils`.

use crate::{FetchError, Slug, Tenant, UserId, VitrineResult};
use async_trait::async_trait;

/// Loads a tenant record by slug.
#[async_trait]
pub trait TenantFetcher: Send + Sync {
    /// Fetch the active tenant for `slug`.
    ///
    /// # Errors
    /// * `FetchError::NotFound` - no active tenant has this slug
    /// * `FetchError::Mismatch` - the backend returned a record for another slug
    /// * `FetchError::Ambiguous` - more than one active record matched
    /// * `FetchError::Transport` / `InvalidResponse` - the request itself failed
    async fn fetch(&self, slug: &Slug) -> Result<Tenant, FetchError>;
}

/// Looks up the tenant of a user's active institutional membership.
#[async_trait]
pub trait MembershipLookup: Send + Sync {
    /// Returns `Ok(None)` when the user has no active membership.
    async fn active_tenant_slug(&self, user_id: UserId) -> VitrineResult<Option<Slug>>;
}

/// Guard applied to every fetched record before it is trusted.
///
/// Inactive records count as not found; a record whose own slug differs from
/// the requested one is a mismatch.
pub fn ensure_slug_matches(requested: &Slug, tenant: Tenant) -> Result<Tenant, FetchError> {
    if !tenant.is_active {
        return Err(FetchError::NotFound {
            slug: requested.clone(),
        });
    }
    if tenant.slug != *requested {
        return Err(FetchError::Mismatch {
            requested: requested.clone(),
            returned: tenant.slug,
        });
    }
    Ok(tenant)
}
