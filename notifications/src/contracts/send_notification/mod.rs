use async_trait::async_trait;
use shared_kernel::recipient_id::RecipientId;
use shared_kernel::region_name::RegionName;
use thiserror::Error;

pub mod telegram;

/// One message, sent to every recipient of a region.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionNotification {
    pub region: RegionName,
    pub recipients: Vec<RecipientId>,
    pub text: String,
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The recipient blocked the bot or the chat no longer exists.
    #[error("Recipient {recipient} is unreachable: {reason}")]
    RecipientUnreachable {
        recipient: RecipientId,
        reason: String,
    },
    #[error("Failed to deliver to {recipient}")]
    Failed {
        recipient: RecipientId,
        #[source]
        source: anyhow::Error,
    },
}

#[async_trait]
pub trait DeliveryStrategy: Send + Sync {
    async fn deliver(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError>;
}
