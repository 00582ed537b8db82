//! Vitrine Core - Tenant Types
//!
//! Pure data structures and pure functions shared by every other crate:
//! the tenant record, slugs, route resolution, color math and the error
//! taxonomy. Network and storage access live in the outer crates; this
//! crate only declares the seams ([`TenantFetcher`], [`MembershipLookup`]).

pub mod clock;
pub mod color;
pub mod error;
pub mod identity;
pub mod routing;
pub mod source;
pub mod tenant;

pub use clock::{Clock, SystemClock};
pub use color::{contrast_foreground, parse_color, ColorScheme, Hsl};
pub use error::{
    ColorError, FetchError, StorageError, VitrineError, VitrineResult,
};
pub use identity::{Slug, SlugParseError, TenantId, Timestamp, UserId, UserIdentity};
pub use routing::RouteTable;
pub use source::{ensure_slug_matches, MembershipLookup, TenantFetcher};
pub use tenant::{
    ContactInfo, HeroContent, LegalLinks, MetaConfig, SocialLinks, Tenant, TenantColors,
    ThemeConfig,
};

/// How long a cached tenant record stays fresh (one hour).
pub const TENANT_CACHE_TTL_SECS: u64 = 3600;
