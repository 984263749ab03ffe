//! Categorizer — asks a model to label an email and extract contact details.
//!
//! **Never fails.** Any transport error, malformed reply or unknown label
//! becomes `Category::NonStandard`, which ends the run without a reply.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::types::{Category, CategoryResult};

/// Max tokens for the categorization call; the reply is a tiny JSON object.
const CATEGORIZE_MAX_TOKENS: u32 = 256;

/// Temperature for categorization (deterministic-ish).
const CATEGORIZE_TEMPERATURE: f32 = 0.0;

/// Body characters sent to the model.
const BODY_PREVIEW_CHARS: usize = 4000;

/// Labels inbound emails with one of the closed-set categories.
pub struct Categorizer {
    llm: Arc<dyn LlmProvider>,
}

impl Categorizer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Categorize one email. Single attempt, no retry.
    pub async fn categorize(&self, subject: &str, body: &str) -> CategoryResult {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_system_prompt()),
            ChatMessage::user(build_user_prompt(subject, body)),
        ])
        .with_temperature(CATEGORIZE_TEMPERATURE)
        .with_max_tokens(CATEGORIZE_MAX_TOKENS);

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Categorizer call failed, falling back to Non-standard");
                return CategoryResult::non_standard();
            }
        };

        match parse_category_response(&response.content) {
            Ok(result) => {
                info!(
                    category = %result.category,
                    has_name = !result.name.is_empty(),
                    has_phone = !result.phone.is_empty(),
                    "Email categorized"
                );
                result
            }
            Err(e) => {
                warn!(
                    raw_response = %response.content,
                    error = %e,
                    "Failed to parse categorizer response, falling back to Non-standard"
                );
                CategoryResult::non_standard()
            }
        }
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_system_prompt() -> String {
    let mut prompt = String::from(
        "You are a strict email categorizer and personal info extractor.\n\n\
         Understand the context of the email from its subject and body and assign \
         exactly ONE category identifier:\n",
    );
    for category in Category::ALL {
        prompt.push_str(&format!(
            "- \"{}\": {}\n",
            category.as_str(),
            category.description()
        ));
    }
    prompt.push_str(
        "\nAlso extract the sender's name and phone number if present (empty string otherwise).\n\n\
         Respond with ONLY a JSON object, no explanation:\n\
         {\"category\": \"...\", \"name\": \"...\", \"phone\": \"...\"}",
    );
    prompt
}

fn build_user_prompt(subject: &str, body: &str) -> String {
    let body_preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
    format!("Email Subject: {subject}\n\nEmail Body:\n{body_preview}")
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse a model reply into a `CategoryResult`.
///
/// Accepts a JSON object, optionally wrapped in a Markdown code fence or in
/// prose. Errors on anything else; the caller maps errors to `NonStandard`.
pub fn parse_category_response(raw: &str) -> Result<CategoryResult, String> {
    let value = first_json_object(raw)?;

    let object = value
        .as_object()
        .ok_or_else(|| "response is not a JSON object".to_string())?;

    let label = object
        .get("category")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing string field 'category'".to_string())?;

    let category = Category::from_label(label);
    if category == Category::NonStandard {
        debug!(label = %label, "Category label mapped to Non-standard");
    }

    Ok(CategoryResult {
        category,
        name: text_field(object.get("name")),
        phone: text_field(object.get("phone")),
    })
}

/// Read an optional string-ish field; numbers are kept as their digits.
fn text_field(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Read the first JSON value in model output (handles Markdown fences and
/// surrounding prose). Text after the value is ignored. An array is rejected,
/// not unwrapped, even when an object sits inside it.
fn first_json_object(text: &str) -> Result<serde_json::Value, String> {
    let mut trimmed = text.trim();

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            trimmed = after[..end].trim();
        }
    }

    let start = trimmed
        .find(|c| c == '{' || c == '[')
        .ok_or_else(|| "no JSON object in response".to_string())?;
    let candidate = &trimmed[start..];
    if candidate.starts_with('[') {
        return Err("response is a JSON array".into());
    }

    serde_json::Deserializer::from_str(candidate)
        .into_iter::<serde_json::Value>()
        .next()
        .ok_or_else(|| "no JSON object in response".to_string())?
        .map_err(|e| format!("JSON parse error: {e}"))
}
