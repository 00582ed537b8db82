//! REST implementations of the tenant and membership sources.

use crate::config::ClientConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use vitrine_core::{
    ensure_slug_matches, FetchError, MembershipLookup, Slug, Tenant, TenantFetcher, UserId,
    VitrineError, VitrineResult,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(String),
}

impl From<ApiClientError> for FetchError {
    fn from(e: ApiClientError) -> Self {
        match e {
            ApiClientError::Serde(e) => FetchError::InvalidResponse {
                reason: e.to_string(),
            },
            other => FetchError::Transport {
                reason: other.to_string(),
            },
        }
    }
}

/// Thin client over the backend's REST endpoint.
#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let auth_header = build_auth_headers(&config.api_key)?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    async fn get_rows<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiClientError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let response = self
            .client
            .get(url)
            .headers(self.auth_header.clone())
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

fn build_auth_headers(api_key: &str) -> Result<HeaderMap, ApiClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("apikey"),
        HeaderValue::from_str(api_key).map_err(|e| ApiClientError::Config(e.to_string()))?,
    );
    let bearer = format!("Bearer {}", api_key);
    headers.insert(
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&bearer).map_err(|e| ApiClientError::Config(e.to_string()))?,
    );
    Ok(headers)
}

/// Query parameters selecting the active tenant with `slug`.
pub fn tenant_query(slug: &Slug) -> Vec<(&'static str, String)> {
    vec![
        ("slug", format!("eq.{}", slug)),
        ("is_active", "eq.true".to_string()),
        ("select", "*".to_string()),
    ]
}

/// Query parameters selecting a user's active membership.
pub fn membership_query(user_id: UserId) -> Vec<(&'static str, String)> {
    vec![
        ("user_id", format!("eq.{}", user_id)),
        ("is_active", "eq.true".to_string()),
        ("select", "tenant_slug".to_string()),
        ("limit", "1".to_string()),
    ]
}

/// Reduce the rows returned for `slug` to the one trusted tenant.
pub fn select_tenant(slug: &Slug, mut rows: Vec<Tenant>) -> Result<Tenant, FetchError> {
    match rows.len() {
        0 => Err(FetchError::NotFound { slug: slug.clone() }),
        1 => ensure_slug_matches(slug, rows.remove(0)),
        count => Err(FetchError::Ambiguous {
            slug: slug.clone(),
            count,
        }),
    }
}

/// Loads tenants from the `tenants` table.
#[derive(Clone)]
pub struct RestTenantFetcher {
    client: RestClient,
}

impl RestTenantFetcher {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TenantFetcher for RestTenantFetcher {
    async fn fetch(&self, slug: &Slug) -> Result<Tenant, FetchError> {
        let rows: Vec<Tenant> = self.client.get_rows("tenants", &tenant_query(slug)).await?;
        tracing::debug!(slug = %slug, rows = rows.len(), "Fetched tenant rows");
        select_tenant(slug, rows)
    }
}

#[derive(Debug, Deserialize)]
struct MembershipRow {
    tenant_slug: Option<String>,
}

/// Reads `tenant_slug` from the first membership row. Rows naming no
/// tenant, or an unusable slug, count as no membership.
fn membership_slug(rows: Vec<MembershipRow>) -> Option<Slug> {
    rows.into_iter()
        .next()
        .and_then(|row| row.tenant_slug)
        .and_then(|raw| Slug::parse(&raw).ok())
}

/// Looks up memberships in the `institution_members` table.
#[derive(Clone)]
pub struct RestMembershipLookup {
    client: RestClient,
}

impl RestMembershipLookup {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MembershipLookup for RestMembershipLookup {
    async fn active_tenant_slug(&self, user_id: UserId) -> VitrineResult<Option<Slug>> {
        let rows: Vec<MembershipRow> = self
            .client
            .get_rows("institution_members", &membership_query(user_id))
            .await
            .map_err(|e| VitrineError::Membership {
                reason: e.to_string(),
            })?;
        Ok(membership_slug(rows))
    }
}
