//! The tenant record: one white-labeled site configuration.
//!
//! Field names follow the backend's snake_case row layout so a fetched row
//! deserializes directly. Grouped fields (colors, hero, links, contact) are
//! flattened, which keeps the wire format flat while giving Rust callers a
//! structured view.

use crate::{Slug, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A white-labeled brand/site configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub slug: Slug,
    pub name: String,
    #[serde(default)]
    pub base_path: Option<String>,
    /// Inactive tenants never resolve.
    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub logo_url_dark: Option<String>,
    #[serde(default)]
    pub favicon_url: Option<String>,

    #[serde(flatten)]
    pub colors: TenantColors,

    #[serde(flatten)]
    pub hero: HeroContent,

    #[serde(default)]
    pub heading_font: Option<String>,
    #[serde(default)]
    pub body_font: Option<String>,

    /// Google Analytics measurement id (`G-...`).
    #[serde(default)]
    pub google_analytics_id: Option<String>,
    /// Meta (Facebook) pixel id.
    #[serde(default)]
    pub meta_pixel_id: Option<String>,

    #[serde(flatten)]
    pub legal: LegalLinks,
    #[serde(flatten)]
    pub social: SocialLinks,
    #[serde(flatten)]
    pub contact: ContactInfo,

    #[serde(default)]
    pub theme_config: Option<ThemeConfig>,
    #[serde(default)]
    pub meta_config: Option<MetaConfig>,
}

/// Themed colors. Each value is either hex (`#1a2b3c`, `#abc`) or the
/// pre-converted HSL triple (`210 65% 20%`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantColors {
    #[serde(default)]
    pub primary_color: Option<String>,
    #[serde(default)]
    pub primary_color_dark: Option<String>,
    #[serde(default)]
    pub accent_color: Option<String>,
    #[serde(default)]
    pub accent_color_dark: Option<String>,
    #[serde(default)]
    pub header_color: Option<String>,
    #[serde(default)]
    pub header_color_dark: Option<String>,
    #[serde(default)]
    pub footer_color: Option<String>,
    #[serde(default)]
    pub footer_color_dark: Option<String>,
    #[serde(default)]
    pub button_color: Option<String>,
    #[serde(default)]
    pub button_color_dark: Option<String>,
    #[serde(default)]
    pub specialty_tag_color: Option<String>,
    #[serde(default)]
    pub specialty_tag_color_dark: Option<String>,
}

/// Landing-page hero block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroContent {
    #[serde(default)]
    pub hero_title: Option<String>,
    #[serde(default)]
    pub hero_subtitle: Option<String>,
    /// Ordered carousel images.
    #[serde(default)]
    pub hero_images: Vec<String>,
    #[serde(default)]
    pub hero_autoplay: bool,
    #[serde(default)]
    pub hero_autoplay_delay_ms: Option<u32>,
}

/// Overrides for the platform's legal pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalLinks {
    #[serde(default)]
    pub terms_url: Option<String>,
    #[serde(default)]
    pub privacy_url: Option<String>,
    #[serde(default)]
    pub cookies_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default)]
    pub instagram_url: Option<String>,
    #[serde(default)]
    pub facebook_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub whatsapp_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub contact_address: Option<String>,
}

/// Free-form theme overrides.
///
/// `secondary_color` and `muted_color` are understood; every other key is
/// kept verbatim so newer backends can ship settings older clients ignore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default)]
    pub secondary_color: Option<String>,
    #[serde(default)]
    pub muted_color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// SEO / browser-tab fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
}

impl Tenant {
    /// Minimal active tenant; every optional field empty.
    pub fn new(id: impl Into<TenantId>, slug: Slug, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug,
            name: name.into(),
            base_path: None,
            is_active: true,
            logo_url: None,
            logo_url_dark: None,
            favicon_url: None,
            colors: TenantColors::default(),
            hero: HeroContent::default(),
            heading_font: None,
            body_font: None,
            google_analytics_id: None,
            meta_pixel_id: None,
            legal: LegalLinks::default(),
            social: SocialLinks::default(),
            contact: ContactInfo::default(),
            theme_config: None,
            meta_config: None,
        }
    }

    /// Document title: explicit meta title, else the tenant name.
    pub fn display_title(&self) -> &str {
        non_empty(self.meta_config.as_ref().and_then(|m| m.title.as_deref()))
            .unwrap_or(&self.name)
    }

    pub fn description(&self) -> Option<&str> {
        non_empty(self.meta_config.as_ref().and_then(|m| m.description.as_deref()))
    }

    /// Favicon: explicit field first, then the meta fallback.
    pub fn favicon(&self) -> Option<&str> {
        non_empty(self.favicon_url.as_deref())
            .or_else(|| non_empty(self.meta_config.as_ref().and_then(|m| m.favicon.as_deref())))
    }

    /// URL prefix for this tenant's routes.
    pub fn route_prefix(&self) -> String {
        match non_empty(self.base_path.as_deref()) {
            Some(path) => format!("/{}", path.trim_matches('/')),
            None => format!("/{}", self.slug),
        }
    }

    /// Reads a boolean flag from the forward-compatible theme keys.
    /// Absent or non-boolean values are off.
    pub fn feature_enabled(&self, key: &str) -> bool {
        self.theme_config
            .as_ref()
            .and_then(|cfg| cfg.extra.get(key))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
