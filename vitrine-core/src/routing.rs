//! URL path to tenant slug resolution.
//!
//! Paths look like `/{prefix}/{slug}/rest...` where `prefix` is one of the
//! configured tenant prefixes (for example `t`). Anything else belongs to the
//! default tenant. Resolution is pure and total: no I/O, no errors.

use crate::Slug;

/// Route knowledge needed to pick a tenant from a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    default_slug: Slug,
    tenant_prefixes: Vec<String>,
    institutional_routes: Vec<String>,
}

impl RouteTable {
    pub fn new(default_slug: Slug) -> Self {
        Self {
            default_slug,
            tenant_prefixes: Vec::new(),
            institutional_routes: Vec::new(),
        }
    }

    /// Add a path segment that introduces a tenant slug.
    pub fn with_tenant_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        let prefix = prefix.as_ref().trim_matches('/').to_string();
        if !prefix.is_empty() && !self.tenant_prefixes.contains(&prefix) {
            self.tenant_prefixes.push(prefix);
        }
        self
    }

    /// Add a route whose tenant comes from the user's institutional
    /// membership. Matched against the path with the tenant prefix removed.
    pub fn with_institutional_route(mut self, route: impl AsRef<str>) -> Self {
        let route = normalize_route(route.as_ref());
        if !self.institutional_routes.contains(&route) {
            self.institutional_routes.push(route);
        }
        self
    }

    pub fn default_slug(&self) -> &Slug {
        &self.default_slug
    }

    pub fn tenant_prefixes(&self) -> &[String] {
        &self.tenant_prefixes
    }

    pub fn institutional_routes(&self) -> &[String] {
        &self.institutional_routes
    }

    /// Map a path (or full URL) to the tenant slug it names.
    pub fn resolve_slug(&self, path: &str) -> Slug {
        self.split(path)
            .0
            .unwrap_or_else(|| self.default_slug.clone())
    }

    /// The path with any tenant prefix removed, always starting with `/`.
    pub fn strip_tenant_prefix(&self, path: &str) -> String {
        self.split(path).1
    }

    pub fn is_institutional(&self, path: &str) -> bool {
        let rest = self.strip_tenant_prefix(path);
        self.institutional_routes
            .iter()
            .any(|route| rest == *route || rest.starts_with(&format!("{}/", route)))
    }

    fn split(&self, path: &str) -> (Option<Slug>, String) {
        let segments: Vec<&str> = path_only(path)
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if let [prefix, candidate, rest @ ..] = segments.as_slice() {
            if self.tenant_prefixes.iter().any(|p| p.as_str() == *prefix) {
                if let Ok(slug) = Slug::parse(candidate) {
                    return (Some(slug), join(rest));
                }
            }
        }
        (None, join(&segments))
    }
}

fn path_only(input: &str) -> &str {
    let without_origin = match input.find("://") {
        Some(idx) => {
            let after = &input[idx + 3..];
            after.find('/').map(|i| &after[i..]).unwrap_or("/")
        }
        None => input,
    };
    let end = without_origin
        .find(|c: char| c == '?' || c == '#')
        .unwrap_or(without_origin.len());
    &without_origin[..end]
}

fn join(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}

fn normalize_route(route: &str) -> String {
    format!("/{}", route.trim_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table() -> RouteTable {
        RouteTable::new(Slug::parse("main").unwrap())
            .with_tenant_prefix("t")
            .with_tenant_prefix("/site/")
            .with_institutional_route("portal")
            .with_institutional_route("/institution/")
    }

    #[test]
    fn test_prefixed_path_yields_slug() {
        let t = table();
        assert_eq!(t.resolve_slug("/t/acme/booking").as_str(), "acme");
        assert_eq!(t.resolve_slug("/site/Clinic-X").as_str(), "clinic-x");
        assert_eq!(
            t.resolve_slug("https://app.example.com/t/acme/blog?page=2#top").as_str(),
            "acme"
        );
    }

    #[test]
    fn test_unknown_paths_use_default() {
        let t = table();
        for path in ["/", "", "/booking", "/t", "/t/", "/t/not a slug/x", "/x/acme", "https://host"] {
            assert_eq!(t.resolve_slug(path).as_str(), "main", "path {path:?}");
        }
    }

    #[test]
    fn test_strip_tenant_prefix() {
        let t = table();
        assert_eq!(t.strip_tenant_prefix("/t/acme/portal/home"), "/portal/home");
        assert_eq!(t.strip_tenant_prefix("/portal"), "/portal");
        assert_eq!(t.strip_tenant_prefix("/t/acme"), "/");
    }

    #[test]
    fn test_institutional_routes() {
        let t = table();
        assert!(t.is_institutional("/portal"));
        assert!(t.is_institutional("/portal/dashboard"));
        assert!(t.is_institutional("/t/public/portal/dashboard"));
        assert!(t.is_institutional("/institution/reports?x=1"));
        assert!(!t.is_institutional("/portalx"));
        assert!(!t.is_institutional("/t/acme/blog"));
    }

    proptest! {
        #[test]
        fn prop_resolution_is_total(path in ".{0,80}") {
            // Never panics, always yields a valid slug.
            let slug = table().resolve_slug(&path);
            prop_assert!(Slug::parse(slug.as_str()).is_ok());
        }

        #[test]
        fn prop_prefixed_valid_slug_roundtrips(slug in "[a-z0-9]([a-z0-9-]{0,20}[a-z0-9])?", tail in "(/[a-z]{1,8}){0,3}") {
            let path = format!("/t/{}{}", slug, tail);
            let resolved = table().resolve_slug(&path);
            prop_assert_eq!(resolved.as_str(), slug.as_str());
        }
    }
}
