//! Tenant record to document side effects.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use vitrine_core::{contrast_foreground, parse_color, Clock, ColorScheme, Hsl, Tenant};

use crate::document::{DocumentSurface, IconLink, MetaKey, ScriptTag};

static GA_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{1,3}-[A-Z0-9]{4,20}$").expect("static regex")
});

static PIXEL_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{5,20}$").expect("static regex"));

/// A themed color slot and where its value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSlot {
    Primary,
    Accent,
    Secondary,
    Muted,
    Header,
    Footer,
    Button,
    SpecialtyTag,
}

impl ColorSlot {
    pub const ALL: [ColorSlot; 8] = [
        Self::Primary,
        Self::Accent,
        Self::Secondary,
        Self::Muted,
        Self::Header,
        Self::Footer,
        Self::Button,
        Self::SpecialtyTag,
    ];

    /// Base custom property name, without the leading `--`.
    pub fn css_name(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Accent => "accent",
            Self::Secondary => "secondary",
            Self::Muted => "muted",
            Self::Header => "header",
            Self::Footer => "footer",
            Self::Button => "button",
            Self::SpecialtyTag => "specialty-tag",
        }
    }

    /// Background property for `scheme`, e.g. `--accent-dark`.
    pub fn property(self, scheme: ColorScheme) -> String {
        match scheme {
            ColorScheme::Light => format!("--{}", self.css_name()),
            ColorScheme::Dark => format!("--{}-dark", self.css_name()),
        }
    }

    /// Foreground property paired with [`ColorSlot::property`].
    pub fn foreground_property(self, scheme: ColorScheme) -> String {
        format!("{}-foreground", self.property(scheme))
    }

    /// The tenant's raw value for this slot, if any.
    fn raw(self, tenant: &Tenant, scheme: ColorScheme) -> Option<&str> {
        let colors = &tenant.colors;
        let theme = tenant.theme_config.as_ref();
        let value = match (self, scheme) {
            (Self::Primary, ColorScheme::Light) => colors.primary_color.as_deref(),
            (Self::Primary, ColorScheme::Dark) => colors.primary_color_dark.as_deref(),
            (Self::Accent, ColorScheme::Light) => colors.accent_color.as_deref(),
            (Self::Accent, ColorScheme::Dark) => colors.accent_color_dark.as_deref(),
            (Self::Secondary, ColorScheme::Light) => theme.and_then(|t| t.secondary_color.as_deref()),
            (Self::Muted, ColorScheme::Light) => theme.and_then(|t| t.muted_color.as_deref()),
            (Self::Secondary | Self::Muted, ColorScheme::Dark) => None,
            (Self::Header, ColorScheme::Light) => colors.header_color.as_deref(),
            (Self::Header, ColorScheme::Dark) => colors.header_color_dark.as_deref(),
            (Self::Footer, ColorScheme::Light) => colors.footer_color.as_deref(),
            (Self::Footer, ColorScheme::Dark) => colors.footer_color_dark.as_deref(),
            (Self::Button, ColorScheme::Light) => colors.button_color.as_deref(),
            (Self::Button, ColorScheme::Dark) => colors.button_color_dark.as_deref(),
            (Self::SpecialtyTag, ColorScheme::Light) => colors.specialty_tag_color.as_deref(),
            (Self::SpecialtyTag, ColorScheme::Dark) => colors.specialty_tag_color_dark.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    fn field_name(self, scheme: ColorScheme) -> String {
        let base = match self {
            Self::Secondary => "theme_config.secondary_color",
            Self::Muted => "theme_config.muted_color",
            Self::SpecialtyTag => "specialty_tag_color",
            _ => return format!("{}_color{}", self.css_name(), dark_suffix(scheme)),
        };
        format!("{}{}", base, dark_suffix(scheme))
    }
}

fn dark_suffix(scheme: ColorScheme) -> &'static str {
    match scheme {
        ColorScheme::Light => "",
        ColorScheme::Dark => "_dark",
    }
}

/// Built-in palette used when a tenant value is malformed, and for the
/// header when neither header nor primary color is set.
pub fn default_color(slot: ColorSlot) -> Hsl {
    match slot {
        ColorSlot::Primary | ColorSlot::Header | ColorSlot::Button => Hsl::new(222.2, 47.4, 11.2),
        ColorSlot::Accent | ColorSlot::Secondary | ColorSlot::Muted => Hsl::new(210.0, 40.0, 96.1),
        ColorSlot::Footer => Hsl::new(217.2, 32.6, 17.5),
        ColorSlot::SpecialtyTag => Hsl::new(160.0, 84.0, 39.0),
    }
}

/// Something the applicator had to degrade on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThemeWarning {
    /// A color could not be parsed; the default palette value was used
    /// (light) or the property was cleared (dark).
    MalformedColor {
        field: String,
        value: String,
        reason: String,
    },
    /// An analytics id did not look like one and was not injected.
    InvalidAnalyticsId { provider: String, value: String },
}

impl fmt::Display for ThemeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedColor {
                field,
                value,
                reason,
            } => write!(f, "{} = {:?}: {}", field, value, reason),
            Self::InvalidAnalyticsId { provider, value } => {
                write!(f, "invalid {} id {:?}", provider, value)
            }
        }
    }
}

/// What one `apply` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ThemeReport {
    pub properties_set: usize,
    pub properties_removed: usize,
    /// Ids of scripts injected by this call.
    pub scripts_injected: Vec<String>,
    pub favicon: Option<String>,
    pub warnings: Vec<ThemeWarning>,
}

impl ThemeReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Applies a tenant's visual identity to a document.
///
/// Re-applying the same tenant leaves the document in the same state
/// (apart from the favicon cache-buster) and never duplicates scripts.
/// Switching tenants removes properties the new tenant does not set.
pub struct ThemeApplicator {
    document: Box<dyn DocumentSurface>,
    clock: Arc<dyn Clock>,
    /// Style properties written by the previous `apply`.
    written: BTreeSet<String>,
    favicon_seq: u64,
}

impl ThemeApplicator {
    pub fn new(document: Box<dyn DocumentSurface>, clock: Arc<dyn Clock>) -> Self {
        Self {
            document,
            clock,
            written: BTreeSet::new(),
            favicon_seq: 0,
        }
    }

    /// Apply every themed aspect of `tenant`. Never fails; degradations are
    /// reported in [`ThemeReport::warnings`].
    pub fn apply(&mut self, tenant: &Tenant) -> ThemeReport {
        let mut report = ThemeReport::default();
        let mut next = Vec::new();

        self.collect_colors(tenant, &mut next, &mut report);
        collect_fonts(tenant, &mut next);

        let keep: BTreeSet<String> = next.iter().map(|(name, _)| name.clone()).collect();
        for stale in self.written.difference(&keep) {
            self.document.remove_style_property(stale);
            report.properties_removed += 1;
        }
        for (name, value) in &next {
            self.document.set_style_property(name, value);
        }
        report.properties_set = next.len();
        self.written = keep;

        self.apply_analytics(tenant, &mut report);
        self.apply_metadata(tenant);
        report.favicon = self.apply_favicon(tenant);

        for warning in &report.warnings {
            tracing::warn!(slug = %tenant.slug, warning = %warning, "Theme degraded");
        }
        tracing::debug!(
            slug = %tenant.slug,
            properties = report.properties_set,
            removed = report.properties_removed,
            scripts = report.scripts_injected.len(),
            "Applied tenant theme"
        );
        report
    }

    fn collect_colors(
        &self,
        tenant: &Tenant,
        out: &mut Vec<(String, String)>,
        report: &mut ThemeReport,
    ) {
        for slot in ColorSlot::ALL {
            if let Some(bg) = resolve_light(slot, tenant, report) {
                push_pair(out, slot, ColorScheme::Light, bg);
            }

            if let Some(raw) = slot.raw(tenant, ColorScheme::Dark) {
                match parse_color(raw) {
                    Ok(bg) => push_pair(out, slot, ColorScheme::Dark, bg),
                    Err(e) => report.warnings.push(ThemeWarning::MalformedColor {
                        field: slot.field_name(ColorScheme::Dark),
                        value: raw.to_string(),
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }

    fn apply_analytics(&mut self, tenant: &Tenant, report: &mut ThemeReport) {
        if let Some(id) = tenant.google_analytics_id.as_deref().map(str::trim) {
            if GA_ID_PATTERN.is_match(id) {
                let loader = format!("analytics-gtag-{}", id);
                if !self.document.has_script(&loader) {
                    self.document.inject_script(ScriptTag::external(
                        &loader,
                        format!("https://www.googletagmanager.com/gtag/js?id={}", id),
                    ));
                    self.document.inject_script(ScriptTag::inline(
                        format!("analytics-gtag-config-{}", id),
                        format!(
                            "window.dataLayer=window.dataLayer||[];\
                             function gtag(){{dataLayer.push(arguments);}}\
                             gtag('js',new Date());gtag('config','{}');",
                            id
                        ),
                    ));
                    report.scripts_injected.push(loader);
                }
            } else if !id.is_empty() {
                report.warnings.push(ThemeWarning::InvalidAnalyticsId {
                    provider: "google_analytics".to_string(),
                    value: id.to_string(),
                });
            }
        }

        if let Some(id) = tenant.meta_pixel_id.as_deref().map(str::trim) {
            if PIXEL_ID_PATTERN.is_match(id) {
                let script_id = format!("analytics-pixel-{}", id);
                if !self.document.has_script(&script_id) {
                    self.document.inject_script(ScriptTag::inline(
                        &script_id,
                        format!(
                            "!function(f,b,e,v,n,t,s){{if(f.fbq)return;n=f.fbq=function(){{\
                             n.callMethod?n.callMethod.apply(n,arguments):n.queue.push(arguments)}};\
                             if(!f._fbq)f._fbq=n;n.push=n;n.loaded=!0;n.version='2.0';n.queue=[];\
                             t=b.createElement(e);t.async=!0;t.src=v;s=b.getElementsByTagName(e)[0];\
                             s.parentNode.insertBefore(t,s)}}(window,document,'script',\
                             'https://connect.facebook.net/en_US/fbevents.js');\
                             fbq('init','{}');fbq('track','PageView');",
                            id
                        ),
                    ));
                    report.scripts_injected.push(script_id);
                }
            } else if !id.is_empty() {
                report.warnings.push(ThemeWarning::InvalidAnalyticsId {
                    provider: "meta_pixel".to_string(),
                    value: id.to_string(),
                });
            }
        }
    }

    fn apply_metadata(&mut self, tenant: &Tenant) {
        let title = tenant.display_title();
        self.document.set_title(title);
        self.document.set_meta(&MetaKey::property("og:title"), title);
        self.document
            .set_meta(&MetaKey::property("og:site_name"), &tenant.name);

        let description_keys = [MetaKey::name("description"), MetaKey::property("og:description")];
        match tenant.description() {
            Some(description) => {
                for key in &description_keys {
                    self.document.set_meta(key, description);
                }
            }
            None => {
                for key in &description_keys {
                    self.document.remove_meta(key);
                }
            }
        }

        let image = MetaKey::property("og:image");
        match tenant.logo_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(logo) => self.document.set_meta(&image, logo),
            None => self.document.remove_meta(&image),
        }
    }

    fn apply_favicon(&mut self, tenant: &Tenant) -> Option<String> {
        let url = tenant.favicon()?;
        self.favicon_seq += 1;
        let version = format!("{}-{}", self.clock.now_millis(), self.favicon_seq);
        let href = cache_busted(url, &version);

        self.document.remove_icon_links();
        self.document.append_icon_link(IconLink {
            rel: "icon".to_string(),
            href: href.clone(),
        });
        Some(href)
    }
}

/// Light background for `slot`. Header falls back to primary, then to the
/// default palette; other unset slots are left unset.
fn resolve_light(slot: ColorSlot, tenant: &Tenant, report: &mut ThemeReport) -> Option<Hsl> {
    let parse_or_default = |slot: ColorSlot, raw: &str, report: &mut ThemeReport| {
        parse_color(raw).unwrap_or_else(|e| {
            report.warnings.push(ThemeWarning::MalformedColor {
                field: slot.field_name(ColorScheme::Light),
                value: raw.to_string(),
                reason: e.to_string(),
            });
            default_color(slot)
        })
    };

    match slot.raw(tenant, ColorScheme::Light) {
        Some(raw) => Some(parse_or_default(slot, raw, report)),
        None if slot == ColorSlot::Header => {
            let primary = ColorSlot::Primary
                .raw(tenant, ColorScheme::Light)
                .and_then(|raw| parse_color(raw).ok());
            Some(primary.unwrap_or_else(|| default_color(ColorSlot::Header)))
        }
        None => None,
    }
}

fn push_pair(out: &mut Vec<(String, String)>, slot: ColorSlot, scheme: ColorScheme, bg: Hsl) {
    out.push((slot.property(scheme), bg.to_css()));
    out.push((
        slot.foreground_property(scheme),
        contrast_foreground(&bg).to_css(),
    ));
}

fn collect_fonts(tenant: &Tenant, out: &mut Vec<(String, String)>) {
    let fonts = [
        ("--font-heading", tenant.heading_font.as_deref(), "serif"),
        ("--font-body", tenant.body_font.as_deref(), "sans-serif"),
    ];
    for (property, family, generic) in fonts {
        if let Some(family) = family.map(str::trim).filter(|f| !f.is_empty()) {
            let family = family.replace('"', "");
            out.push((property.to_string(), format!("\"{}\", {}", family, generic)));
        }
    }
}

/// Append `v=<version>` to `url`, before any fragment.
pub fn cache_busted(url: &str, version: &str) -> String {
    let (base, fragment) = match url.find('#') {
        Some(i) => url.split_at(i),
        None => (url, ""),
    };
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{}{}v={}{}", base, sep, version, fragment)
}
