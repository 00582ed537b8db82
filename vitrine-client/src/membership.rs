//! User-tenant override resolution for institutional routes.

use std::sync::Arc;
use std::time::Duration;

use vitrine_core::{MembershipLookup, Slug, UserIdentity};

/// Picks the tenant of a user's institutional membership.
///
/// Never fails: no user, no membership, a lookup error or a lookup that
/// outlives `timeout` all mean "no override", and the caller keeps the
/// URL slug.
#[derive(Clone)]
pub struct OverrideResolver {
    lookup: Arc<dyn MembershipLookup>,
    timeout: Duration,
}

impl OverrideResolver {
    pub fn new(lookup: Arc<dyn MembershipLookup>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    pub async fn resolve(&self, user: Option<&UserIdentity>) -> Option<Slug> {
        let user = user?;
        match tokio::time::timeout(self.timeout, self.lookup.active_tenant_slug(user.user_id)).await
        {
            Ok(Ok(slug)) => {
                tracing::debug!(user_id = %user.user_id, slug = ?slug, "Membership lookup settled");
                slug
            }
            Ok(Err(e)) => {
                tracing::warn!(user_id = %user.user_id, error = %e, "Membership lookup failed; no override");
                None
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %user.user_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Membership lookup timed out; no override"
                );
                None
            }
        }
    }
}
