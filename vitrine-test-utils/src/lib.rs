//! Vitrine Test Utilities
//!
//! Shared test infrastructure for the vitrine workspace:
//! - Fixtures for tenants and slugs
//! - A manually driven clock for TTL boundaries
//! - Scripted fetch and membership doubles with call accounting
//! - Proptest generators for slugs, colors and paths

pub use vitrine_core::{
    FetchError, MembershipLookup, Slug, Tenant, TenantFetcher, Timestamp, UserId, VitrineError,
    VitrineResult,
};

pub use clock::ManualClock;
pub use fixtures::{slug, tenant_fixture, themed_tenant};
pub use membership::StaticMembership;
pub use scripted::ScriptedFetcher;

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built tenants for common scenarios.

    use super::*;

    /// Parse a slug, panicking on invalid input.
    #[track_caller]
    pub fn slug(s: &str) -> Slug {
        Slug::parse(s).unwrap_or_else(|e| panic!("invalid test slug {:?}: {}", s, e))
    }

    /// Minimal active tenant named after its slug.
    pub fn tenant_fixture(s: &str) -> Tenant {
        Tenant::new(format!("id-{}", s), slug(s), format!("Tenant {}", s))
    }

    /// Tenant with every themed field populated.
    pub fn themed_tenant(s: &str) -> Tenant {
        let mut tenant = tenant_fixture(s);
        tenant.colors.primary_color = Some("#123456".to_string());
        tenant.colors.accent_color = Some("#ff8800".to_string());
        tenant.colors.footer_color = Some("#222222".to_string());
        tenant.colors.button_color = Some("#0a7cff".to_string());
        tenant.colors.specialty_tag_color = Some("160 84% 39%".to_string());
        tenant.colors.primary_color_dark = Some("#abcdef".to_string());
        tenant.heading_font = Some("Playfair Display".to_string());
        tenant.body_font = Some("Inter".to_string());
        tenant.logo_url = Some(format!("https://cdn.example.com/{}/logo.png", s));
        tenant.favicon_url = Some(format!("https://cdn.example.com/{}/favicon.ico", s));
        tenant.google_analytics_id = Some("G-TEST123".to_string());
        tenant.meta_pixel_id = Some("998877".to_string());
        tenant
    }
}

// ============================================================================
// CLOCK
// ============================================================================

pub mod clock {
    //! Deterministic clock.

    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Mutex;
    use std::time::Duration;
    use vitrine_core::{Clock, Timestamp};

    /// Clock that only moves when told to.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(start: Timestamp) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::from_std(by).expect("duration out of range");
        }

        pub fn set(&self, to: Timestamp) {
            *self.now.lock().unwrap() = to;
        }
    }

    impl Default for ManualClock {
        /// Starts at 2024-01-01T00:00:00Z.
        fn default() -> Self {
            Self::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            *self.now.lock().unwrap()
        }
    }
}

// ============================================================================
// SCRIPTED FETCHER
// ============================================================================

pub mod scripted {
    //! Tenant fetcher whose answers are set up front.

    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Script {
        responses: HashMap<Slug, Result<Tenant, FetchError>>,
        delays: HashMap<Slug, Duration>,
        calls: Vec<Slug>,
    }

    /// Serves canned results per slug. Unscripted slugs are `NotFound`.
    ///
    /// Delays use `tokio::time::sleep`, so tests running with a paused
    /// clock can interleave slow and fast fetches deterministically.
    #[derive(Default)]
    pub struct ScriptedFetcher {
        script: Mutex<Script>,
    }

    impl ScriptedFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fetcher that serves each tenant under its own slug.
        pub fn with_tenants(tenants: impl IntoIterator<Item = Tenant>) -> Self {
            let fetcher = Self::new();
            for tenant in tenants {
                fetcher.serve(tenant);
            }
            fetcher
        }

        pub fn serve(&self, tenant: Tenant) {
            let mut script = self.script.lock().unwrap();
            script.responses.insert(tenant.slug.clone(), Ok(tenant));
        }

        /// Answer `slug` with `tenant` even if its own slug differs.
        pub fn serve_as(&self, slug: &Slug, tenant: Tenant) {
            let mut script = self.script.lock().unwrap();
            script.responses.insert(slug.clone(), Ok(tenant));
        }

        pub fn fail(&self, slug: &Slug, error: FetchError) {
            let mut script = self.script.lock().unwrap();
            script.responses.insert(slug.clone(), Err(error));
        }

        pub fn delay(&self, slug: &Slug, by: Duration) {
            let mut script = self.script.lock().unwrap();
            script.delays.insert(slug.clone(), by);
        }

        /// Every slug fetched, in call order.
        pub fn calls(&self) -> Vec<Slug> {
            self.script.lock().unwrap().calls.clone()
        }

        pub fn call_count(&self, slug: &Slug) -> usize {
            self.script
                .lock()
                .unwrap()
                .calls
                .iter()
                .filter(|s| *s == slug)
                .count()
        }
    }

    #[async_trait]
    impl TenantFetcher for ScriptedFetcher {
        async fn fetch(&self, slug: &Slug) -> Result<Tenant, FetchError> {
            let (delay, response) = {
                let mut script = self.script.lock().unwrap();
                script.calls.push(slug.clone());
                let response = script
                    .responses
                    .get(slug)
                    .cloned()
                    .unwrap_or_else(|| Err(FetchError::NotFound { slug: slug.clone() }));
                (script.delays.get(slug).copied(), response)
            };

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            // Same guard the REST fetcher applies.
            response.and_then(|tenant| vitrine_core::ensure_slug_matches(slug, tenant))
        }
    }
}

// ============================================================================
// MEMBERSHIP
// ============================================================================

pub mod membership {
    //! Membership lookup double.

    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fixed user-to-tenant memberships.
    #[derive(Default)]
    pub struct StaticMembership {
        members: HashMap<UserId, Slug>,
        failure: Option<String>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl StaticMembership {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_member(mut self, user_id: UserId, slug: Slug) -> Self {
            self.members.insert(user_id, slug);
            self
        }

        /// Lookup that always errors.
        pub fn failing(reason: impl Into<String>) -> Self {
            Self {
                failure: Some(reason.into()),
                ..Self::default()
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MembershipLookup for StaticMembership {
        async fn active_tenant_slug(&self, user_id: UserId) -> VitrineResult<Option<Slug>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(reason) = &self.failure {
                return Err(VitrineError::Membership {
                    reason: reason.clone(),
                });
            }
            Ok(self.members.get(&user_id).cloned())
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for vitrine inputs.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate a valid slug.
    pub fn arb_slug() -> impl Strategy<Value = Slug> {
        "[a-z0-9]([a-z0-9-]{0,20}[a-z0-9])?".prop_map(|s| {
            Slug::parse(&s).unwrap_or_else(|e| panic!("generated invalid slug {:?}: {}", s, e))
        })
    }

    /// Generate a six-digit hex color with a leading `#`.
    pub fn arb_hex_color() -> impl Strategy<Value = String> {
        any::<[u8; 3]>().prop_map(|[r, g, b]| format!("#{:02x}{:02x}{:02x}", r, g, b))
    }

    /// Generate a random user id.
    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    /// Generate a path made of lowercase segments, possibly empty.
    pub fn arb_path() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-z0-9-]{1,12}", 0..5)
            .prop_map(|segments| format!("/{}", segments.join("/")))
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for fetch outcomes.

    use super::*;

    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &Result<T, FetchError>, expected: &Slug) {
        match result {
            Err(FetchError::NotFound { slug }) => assert_eq!(slug, expected),
            other => panic!("Expected NotFound for {}, got: {:?}", expected, other),
        }
    }

    #[track_caller]
    pub fn assert_mismatch<T: std::fmt::Debug>(result: &Result<T, FetchError>) {
        match result {
            Err(FetchError::Mismatch { .. }) => {}
            other => panic!("Expected Mismatch, got: {:?}", other),
        }
    }
}
