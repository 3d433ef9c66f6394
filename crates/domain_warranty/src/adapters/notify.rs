//! Notification adapters

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use core_kernel::{CustomerId, DomainPort, PortError};

use crate::events::ClaimEvent;
use crate::ports::ClaimNotifier;

/// Logs every event instead of delivering it
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl DomainPort for TracingNotifier {}

#[async_trait]
impl ClaimNotifier for TracingNotifier {
    async fn notify(&self, customer_id: CustomerId, event: &ClaimEvent) -> Result<(), PortError> {
        let payload = serde_json::to_string(event).map_err(|e| PortError::internal(e.to_string()))?;
        info!(
            customer_id = %customer_id,
            claim_id = %event.claim_id(),
            event_type = event.event_type(),
            payload = %payload,
            "Customer notification"
        );
        Ok(())
    }
}

/// Forwards events to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<(CustomerId, ClaimEvent)>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(CustomerId, ClaimEvent)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl DomainPort for ChannelNotifier {}

#[async_trait]
impl ClaimNotifier for ChannelNotifier {
    async fn notify(&self, customer_id: CustomerId, event: &ClaimEvent) -> Result<(), PortError> {
        self.sender
            .send((customer_id, event.clone()))
            .map_err(|_| PortError::ServiceUnavailable {
                service: "notification-channel".to_string(),
            })
    }
}
