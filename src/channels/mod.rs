//! Mailbox I/O and the single-slot handoff file.

pub mod email;
pub mod handoff;
pub mod mailbox;

pub use email::{EmailConfig, ImapSmtpMailbox};
pub use handoff::HandoffFile;
pub use mailbox::{MailboxGateway, OutgoingReply};
