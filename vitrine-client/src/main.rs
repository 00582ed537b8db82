//! Vitrine CLI
//!
//! Resolve a route against the configured backend and inspect or maintain
//! the local tenant cache:
//! - `resolve` a path, printing the resolved state and document effects,
//!   optionally replaying tenant-updated notifications afterwards
//! - `invalidate` one slug's cache entry
//! - `purge` every tenant cache entry
//! - `stats` classify every cached entry

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;
use vitrine_client::{
    build_rest_context, init_tracing, invalidation_bus, open_store, spawn_invalidation_listener,
    ClientConfig, ClientResult, TenantState,
};
use vitrine_core::{Slug, SystemClock, UserIdentity};
use vitrine_storage::{CacheLookup, TenantCache};
use vitrine_theme::RecordingDocument;

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tenant resolution and theming for white-labeled sites")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (falls back to VITRINE_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the tenant for a path and print the outcome as JSON
    Resolve {
        /// Route path or full URL
        path: String,
        /// Authenticated user id, for institutional routes
        #[arg(short, long)]
        user: Option<Uuid>,
        /// Skip the cache read
        #[arg(long)]
        refresh: bool,
        /// Publish a tenant-updated event for this slug after resolving
        /// (repeatable)
        #[arg(long = "updated", value_name = "SLUG")]
        updated: Vec<String>,
    },

    /// Evict one slug's cache entry
    Invalidate {
        slug: String,
    },

    /// Remove every tenant cache entry
    Purge,

    /// Classify every cached entry
    Stats,
}

#[tokio::main]
async fn main() -> ClientResult<()> {
    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref())?;
    init_tracing(&config.log)?;

    match cli.command {
        Commands::Resolve {
            path,
            user,
            refresh,
            updated,
        } => resolve(&config, &path, user, refresh, &updated).await,
        Commands::Invalidate { slug } => {
            let slug = Slug::parse(&slug)?;
            let cache = cache(&config)?;
            let removed = cache.invalidate(&slug)?;
            print_json(&json!({ "slug": slug, "removed": removed }))
        }
        Commands::Purge => {
            let removed = cache(&config)?.invalidate_all()?;
            print_json(&json!({ "removed": removed }))
        }
        Commands::Stats => stats(&config),
    }
}

async fn resolve(
    config: &ClientConfig,
    path: &str,
    user: Option<Uuid>,
    refresh: bool,
    updated: &[String],
) -> ClientResult<()> {
    let document = RecordingDocument::new();
    let context = Arc::new(build_rest_context(
        config,
        Box::new(document.clone()),
        Arc::new(SystemClock),
    )?);
    let user = user.map(UserIdentity::new);

    let mut state = context.navigate(path, user.as_ref()).await;
    if refresh {
        state = context.refresh().await;
    }

    if !updated.is_empty() {
        let slugs = updated
            .iter()
            .map(|raw| Slug::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;
        let bus = invalidation_bus(config);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let listener = spawn_invalidation_listener(context.clone(), bus.subscribe(), shutdown_rx);
        for slug in slugs {
            bus.tenant_updated(slug);
        }
        // Closing the bus lets the listener drain and exit.
        drop(bus);
        listener.await?;
        state = context.snapshot();
    }

    print_json(&json!({
        "path": path,
        "phase": format!("{:?}", state.phase()),
        "state": state_json(&state),
        "restarts": context.restarts(),
        "document": document.snapshot(),
    }))
}

fn state_json(state: &TenantState) -> serde_json::Value {
    json!({
        "active_slug": state.active_slug,
        "tenant": state.tenant.as_deref(),
        "loading": state.loading,
        "error": state.error.as_ref().map(ToString::to_string),
    })
}

fn cache(config: &ClientConfig) -> ClientResult<TenantCache> {
    let store = open_store(config)?;
    Ok(TenantCache::with_ttl(store, Arc::new(SystemClock), config.cache_ttl()))
}

fn stats(config: &ClientConfig) -> ClientResult<()> {
    let cache = cache(config)?;
    let mut entries = Vec::new();
    for raw in cache.cached_slugs()? {
        let status = match Slug::parse(&raw) {
            Ok(slug) => match cache.get(&slug)? {
                CacheLookup::Fresh(read) => json!({
                    "status": "fresh",
                    "age_secs": read.age().as_secs(),
                }),
                CacheLookup::Stale { age } => json!({
                    "status": "stale",
                    "age_secs": age.as_secs(),
                }),
                CacheLookup::Miss => json!({ "status": "missing" }),
                CacheLookup::Corrupt(reason) => json!({
                    "status": "corrupt",
                    "reason": reason.to_string(),
                }),
            },
            Err(e) => json!({ "status": "invalid-key", "reason": e.to_string() }),
        };
        entries.push(json!({ "slug": raw, "entry": status }));
    }

    let stats = cache.stats();
    let mut report = serde_json::to_value(&stats)?;
    report["entries"] = json!(entries);
    report["hit_rate"] = json!(stats.hit_rate());
    print_json(&report)
}

fn print_json(value: &serde_json::Value) -> ClientResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
