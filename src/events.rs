//! Publishing of domain events to NATS.

use crate::domain::events::DomainEvent;

/// Fire-and-forget publisher; a missing client turns publishing into a no-op.
#[derive(Clone, Default)]
pub struct EventPublisher { nats: Option<async_nats::Client> }

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::default() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "Connected to NATS");
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::warn!(error = %e, %url, "NATS unavailable, domain events disabled");
                Self::default()
            }
        }
    }

    pub fn is_enabled(&self) -> bool { self.nats.is_some() }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        let Some(nats) = &self.nats else { return };
        for event in events {
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to encode domain event");
                    continue;
                }
            };
            if let Err(e) = nats.publish(event.subject().to_string(), payload.into()).await {
                tracing::warn!(error = %e, subject = event.subject(), "Failed to publish domain event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::OrderEvent;

    #[tokio::test]
    async fn disabled_publisher_drops_events() {
        let publisher = EventPublisher::connect(None).await;
        assert!(!publisher.is_enabled());
        publisher.publish_all(vec![DomainEvent::Order(OrderEvent::Cancelled { order_id: 1 })]).await;
    }
}
