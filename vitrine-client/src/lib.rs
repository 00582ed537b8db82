//! Vitrine client: tenant resolution and dynamic theming.
//!
//! Given a route, [`TenantContext`] decides which tenant is active, serves
//! it from the cache or the backend, recovers from cache corruption, falls
//! back to the default tenant when a slug cannot be loaded, and applies the
//! tenant's theme to the document.

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod membership;
pub mod rest;
pub mod telemetry;

pub use bootstrap::{build_context, build_rest_context, invalidation_bus, open_store};
pub use config::{CacheSettings, ClientConfig, ConfigError, LogFormat, LogSettings, StoreKind};
pub use context::{CacheMode, ContextParts, Phase, TenantContext, TenantState};
pub use error::{ClientError, ClientResult};
pub use events::{spawn_invalidation_listener, InvalidationBus, TenantEvent, TENANT_UPDATED_EVENT};
pub use membership::OverrideResolver;
pub use rest::{ApiClientError, RestClient, RestMembershipLookup, RestTenantFetcher};
pub use telemetry::init_tracing;
