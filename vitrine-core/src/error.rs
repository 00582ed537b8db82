//! Error types for vitrine operations

use crate::Slug;
use std::time::Duration;
use thiserror::Error;

/// Tenant fetch errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("No active tenant matches slug {slug}")]
    NotFound { slug: Slug },

    #[error("Tenant record for slug {requested} carries slug {returned}")]
    Mismatch { requested: Slug, returned: Slug },

    #[error("Slug {slug} matched {count} active tenants")]
    Ambiguous { slug: Slug, count: usize },

    #[error("Fetching tenant {slug} timed out after {after:?}")]
    Timeout { slug: Slug, after: Duration },

    #[error("Transport failure fetching tenant: {reason}")]
    Transport { reason: String },

    #[error("Invalid tenant response: {reason}")]
    InvalidResponse { reason: String },
}

impl FetchError {
    /// Whether the orchestrator may retry against the default tenant.
    ///
    /// Identity disagreements are never retried: the record cannot be
    /// trusted and the remedy is a purge, not another lookup.
    pub fn is_fallback_eligible(&self) -> bool {
        !self.is_corruption()
    }

    /// Whether this failure means the backend disagrees about tenant identity.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Mismatch { .. } | Self::Ambiguous { .. })
    }
}

/// Durable storage errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage backend failure: {reason}")]
    Backend { reason: String },

    #[error("Serialization failed for key {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Refusing to cache tenant {stored} under key slug {key}")]
    KeyMismatch { key: Slug, stored: Slug },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Color parsing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ColorError {
    #[error("Empty color value")]
    Empty,

    #[error("Invalid hex color: {value}")]
    InvalidHex { value: String },

    #[error("Invalid HSL color: {value}")]
    InvalidHsl { value: String },
}

/// Master error type for all vitrine errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VitrineError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Color error: {0}")]
    Color(#[from] ColorError),

    #[error("Membership lookup failed: {reason}")]
    Membership { reason: String },
}

/// Result type alias for vitrine operations.
pub type VitrineResult<T> = Result<T, VitrineError>;
