//! FI Q&A: strictly factual answers grounded in a local knowledge base.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::advisors::prompt::{complete_once, customer_profile, data_section};
use crate::advisors::{Advisor, AdvisorInput, AdvisorKind, AdvisorOutcome};
use crate::llm::provider::LlmProvider;

const SYSTEM_PROMPT: &str =
    "You are a strict factual financial Q&A assistant. No hallucinations allowed.";

pub struct FiQaAdvisor {
    llm: Arc<dyn LlmProvider>,
    knowledge_base: String,
}

impl FiQaAdvisor {
    pub fn new(llm: Arc<dyn LlmProvider>, knowledge_base: impl Into<String>) -> Self {
        Self {
            llm,
            knowledge_base: knowledge_base.into(),
        }
    }

    /// Load the knowledge base from `path`. A missing or unreadable file
    /// leaves it empty.
    pub fn with_knowledge_base_file(llm: Arc<dyn LlmProvider>, path: Option<&Path>) -> Self {
        let knowledge_base = match path {
            None => String::new(),
            Some(path) => match std::fs::read_to_string(path) {
                Ok(text) => {
                    info!(path = %path.display(), chars = text.len(), "Knowledge base loaded");
                    text
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Knowledge base unreadable, continuing without it");
                    String::new()
                }
            },
        };
        Self::new(llm, knowledge_base)
    }

    pub fn knowledge_base(&self) -> &str {
        &self.knowledge_base
    }
}

#[async_trait]
impl Advisor for FiQaAdvisor {
    fn kind(&self) -> AdvisorKind {
        AdvisorKind::FiQa
    }

    async fn advise(&self, input: &AdvisorInput<'_>) -> AdvisorOutcome {
        let prompt = build_prompt(&self.knowledge_base, input);
        complete_once(self.llm.as_ref(), SYSTEM_PROMPT, prompt).await
    }
}

fn build_prompt(knowledge_base: &str, input: &AdvisorInput<'_>) -> String {
    let question = if input.message.body.trim().is_empty() {
        input.message.subject.trim()
    } else {
        input.message.body.trim()
    };

    let mut context = customer_profile(input);
    if !input.data.is_empty() {
        context.push_str("\n\nFinancial Data:\n");
        context.push_str(&data_section(input.data));
    }

    format!(
        "You are a highly factual Q&A AI agent for finance-related queries.\n\
         You have access to the following verified knowledge base:\n\n\
         Knowledge Base:\n\"\"\"{kb}\"\"\"\n\n\
         Additional Context:\n\"\"\"{context}\"\"\"\n\n\
         Email Subject: {subject}\n\
         User has asked:\n\"{question}\"\n\n\
         Respond strictly based on the knowledge base and real, factual information. Never \
         hallucinate or assume facts. If you don't know, say you don't know. Be professional, \
         concise and accurate.",
        kb = knowledge_base.trim(),
        context = context.trim(),
        subject = input.message.subject.trim(),
    )
}
