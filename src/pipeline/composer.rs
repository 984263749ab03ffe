//! Reply composer — turns advisor output into an outgoing email.
//!
//! With a drafting model configured, the advice is rewritten as a polite
//! reply first. Drafting never blocks a reply: on failure the raw advice is
//! sent instead.

use std::sync::Arc;

use tracing::{info, warn};

use crate::channels::mailbox::OutgoingReply;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::types::{Category, InboundMessage};

const DRAFT_MAX_TOKENS: u32 = 2000;
const DRAFT_TEMPERATURE: f32 = 0.3;

pub struct ReplyComposer {
    drafter: Option<Arc<dyn LlmProvider>>,
}

impl ReplyComposer {
    /// Send advice as-is.
    pub fn plain() -> Self {
        Self { drafter: None }
    }

    /// Rewrite advice with `drafter` before sending.
    pub fn with_drafter(drafter: Arc<dyn LlmProvider>) -> Self {
        Self {
            drafter: Some(drafter),
        }
    }

    /// Build the reply to `message` carrying `advice`.
    pub async fn compose(
        &self,
        message: &InboundMessage,
        category: Category,
        advice: &str,
    ) -> OutgoingReply {
        let body = match &self.drafter {
            Some(llm) => self.draft(llm.as_ref(), message, category, advice).await,
            None => advice.to_string(),
        };

        OutgoingReply {
            to: message.sender_email.clone(),
            subject: reply_subject(&message.subject),
            body,
            in_reply_to: message.message_id.clone(),
        }
    }

    async fn draft(
        &self,
        llm: &dyn LlmProvider,
        message: &InboundMessage,
        category: Category,
        advice: &str,
    ) -> String {
        let prompt = format!(
            "Read the email subject, body, and its context category. Use the output provided by \
             the advisor to write a clear, polite and complete response email.\n\n\
             Email Subject: {subject}\n\n\
             Email Body:\n{body}\n\n\
             Email Category: {category}\n\n\
             Advisor Output:\n{advice}\n\n\
             Now draft the email reply for the user. Output only the reply body.",
            subject = message.subject,
            body = message.body,
            category = category.description(),
        );

        let request = CompletionRequest::new(vec![
            ChatMessage::system("You are a helpful assistant drafting polite email replies."),
            ChatMessage::user(prompt),
        ])
        .with_temperature(DRAFT_TEMPERATURE)
        .with_max_tokens(DRAFT_MAX_TOKENS);

        match llm.complete(request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                info!(model = llm.model_name(), "Reply drafted");
                response.content.trim().to_string()
            }
            Ok(_) => {
                warn!("Drafting model returned nothing, sending advice as-is");
                advice.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Reply drafting failed, sending advice as-is");
                advice.to_string()
            }
        }
    }
}

/// `Re: <subject>`, unless the subject already carries a reply prefix.
pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("re:")) {
        trimmed.to_string()
    } else {
        format!("Re: {trimmed}")
    }
}
