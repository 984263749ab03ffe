//! Single-slot JSON handoff file holding the most recently fetched message.
//!
//! Overwritten every run; this is not a log or a queue.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ChannelError;
use crate::pipeline::types::InboundMessage;

pub struct HandoffFile {
    path: PathBuf,
}

impl HandoffFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `message`, replacing whatever the previous run left.
    pub async fn store(&self, message: &InboundMessage) -> Result<(), ChannelError> {
        let json = serde_json::to_string_pretty(message).map_err(|e| self.error(e))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.error(e))?;
        }

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.error(e))?;
        debug!(path = %self.path.display(), "Stored message in handoff file");
        Ok(())
    }

    /// Read the stored message. `Ok(None)` if the file does not exist.
    pub async fn load(&self) -> Result<Option<InboundMessage>, ChannelError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error(e)),
        };
        let message = serde_json::from_str(&raw).map_err(|e| self.error(e))?;
        Ok(Some(message))
    }

    fn error(&self, e: impl std::fmt::Display) -> ChannelError {
        ChannelError::Handoff {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let handoff = HandoffFile::new(dir.path().join("temp_email.json"));
        assert!(handoff.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_overwrites_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let handoff = HandoffFile::new(dir.path().join("state/temp_email.json"));

        handoff
            .store(&InboundMessage::new("First", "one", "a@example.com"))
            .await
            .unwrap();
        handoff
            .store(&InboundMessage::new("Second", "two", "b@example.com").with_message_id("<m2@x>"))
            .await
            .unwrap();

        let loaded = handoff.load().await.unwrap().unwrap();
        assert_eq!(loaded.subject, "Second");
        assert_eq!(loaded.sender_email, "b@example.com");
        assert_eq!(loaded.message_id.as_deref(), Some("<m2@x>"));
    }

    #[tokio::test]
    async fn reads_legacy_three_field_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_email.json");
        std::fs::write(
            &path,
            r#"{"subject": "Need help", "body": "SIP question", "email": "user@example.com"}"#,
        )
        .unwrap();

        let loaded = HandoffFile::new(&path).load().await.unwrap().unwrap();
        assert_eq!(loaded.sender_email, "user@example.com");
        assert!(loaded.message_id.is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_email.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = HandoffFile::new(&path).load().await.unwrap_err();
        assert!(matches!(err, ChannelError::Handoff { .. }));
    }
}
