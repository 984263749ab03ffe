//! Mailbox gateway seam — pure I/O, no business logic.

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::pipeline::types::InboundMessage;

/// A reply ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingReply {
    pub to: String,
    pub subject: String,
    pub body: String,
    /// Message-ID of the email being answered, for threading.
    pub in_reply_to: Option<String>,
}

/// Fetches inbound mail and sends replies.
#[async_trait]
pub trait MailboxGateway: Send + Sync {
    /// Gateway name for logging (e.g. "imap").
    fn name(&self) -> &str;

    /// Fetch the most recent unread message and mark it read.
    /// `Ok(None)` when nothing is unread.
    async fn fetch_latest_unread(&self) -> Result<Option<InboundMessage>, ChannelError>;

    /// Send a reply. Returns the Message-ID of the sent email.
    async fn send_reply(&self, reply: &OutgoingReply) -> Result<String, ChannelError>;
}
