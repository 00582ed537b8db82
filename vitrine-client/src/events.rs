//! Tenant invalidation events.
//!
//! Admin surfaces publish [`TenantEvent::Updated`] after editing a tenant.
//! The listener task forwards each event to
//! [`TenantContext::on_tenant_updated`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vitrine_core::Slug;

use crate::context::TenantContext;

/// Wire name of the tenant edit notification.
pub const TENANT_UPDATED_EVENT: &str = "tenant-updated";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "detail")]
pub enum TenantEvent {
    #[serde(rename = "tenant-updated")]
    Updated { slug: Slug },
}

impl TenantEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Updated { .. } => TENANT_UPDATED_EVENT,
        }
    }

    pub fn slug(&self) -> &Slug {
        match self {
            Self::Updated { slug } => slug,
        }
    }
}

/// Broadcast channel for tenant events.
#[derive(Clone)]
pub struct InvalidationBus {
    tx: broadcast::Sender<TenantEvent>,
}

impl InvalidationBus {
    /// Create a bus buffering up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Returns how many subscribers will see it; zero
    /// subscribers is not an error.
    pub fn publish(&self, event: TenantEvent) -> usize {
        let event_type = event.event_type();
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(event_type, receivers, "Published tenant event");
                receivers
            }
            Err(_) => {
                debug!(event_type, "No receivers for tenant event");
                0
            }
        }
    }

    pub fn tenant_updated(&self, slug: Slug) -> usize {
        self.publish(TenantEvent::Updated { slug })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TenantEvent> {
        self.tx.subscribe()
    }
}

/// Spawn the task that applies tenant events to `context`.
///
/// Runs until the bus closes or `shutdown` turns true. If the receiver
/// lags, the missed events may have named the active tenant, so the
/// active tenant is refreshed.
pub fn spawn_invalidation_listener(
    context: Arc<TenantContext>,
    mut rx: broadcast::Receiver<TenantEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Tenant invalidation listener started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Tenant invalidation listener shutting down");
                        break;
                    }
                }
                result = rx.recv() => {
                    match result {
                        Ok(event) => {
                            debug!(event_type = event.event_type(), slug = %event.slug(), "Tenant event received");
                            context.on_tenant_updated(event.slug()).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Invalidation listener lagged; refreshing active tenant");
                            if context.active_slug().is_some() {
                                context.refresh().await;
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("Tenant event bus closed");
                            break;
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_test_utils::slug;

    #[test]
    fn test_event_wire_shape() {
        let event = TenantEvent::Updated { slug: slug("acme") };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"event": "tenant-updated", "detail": {"slug": "acme"}})
        );
        let back: TenantEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_publish_without_receivers() {
        let bus = InvalidationBus::new(4);
        assert_eq!(bus.tenant_updated(slug("acme")), 0);
    }

    #[tokio::test]
    async fn test_publish_with_receiver() {
        let bus = InvalidationBus::new(4);
        let mut rx = bus.subscribe();
        assert_eq!(bus.tenant_updated(slug("acme")), 1);
        assert_eq!(rx.recv().await.unwrap().slug(), &slug("acme"));
    }
}
