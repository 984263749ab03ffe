//! Prompt building blocks shared by the advisors, and the single completion
//! call each advisor makes.

use tracing::debug;

use crate::advisors::{AdvisorInput, AdvisorOutcome};
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::types::FetchedFinancialData;

/// Max tokens for an advice reply.
pub const ADVICE_MAX_TOKENS: u32 = 1500;

/// Temperature for advice generation.
pub const ADVICE_TEMPERATURE: f32 = 0.3;

/// Make one completion call and trim the reply.
pub async fn complete_once(llm: &dyn LlmProvider, system: &str, user: String) -> AdvisorOutcome {
    let request = CompletionRequest::new(vec![ChatMessage::system(system), ChatMessage::user(user)])
        .with_temperature(ADVICE_TEMPERATURE)
        .with_max_tokens(ADVICE_MAX_TOKENS);

    match llm.complete(request).await {
        Ok(response) => {
            debug!(
                model = llm.model_name(),
                input_tokens = response.input_tokens,
                output_tokens = response.output_tokens,
                "Advice generated"
            );
            AdvisorOutcome::Advice(response.content.trim().to_string())
        }
        Err(e) => AdvisorOutcome::failed(e.to_string()),
    }
}

/// Customer block: the categorizer's contact details plus the sender address.
pub fn customer_profile(input: &AdvisorInput<'_>) -> String {
    let mut lines = Vec::new();
    if !input.customer.name.is_empty() {
        lines.push(format!("Name: {}", input.customer.name));
    }
    if !input.customer.phone.is_empty() {
        lines.push(format!("Phone: {}", input.customer.phone));
    }
    if !input.message.sender_email.is_empty() {
        lines.push(format!("Email: {}", input.message.sender_email));
    }
    if lines.is_empty() {
        "No personal details provided.".to_string()
    } else {
        lines.join("\n")
    }
}

/// The customer's email, quoted for the model.
pub fn email_section(input: &AdvisorInput<'_>) -> String {
    format!(
        "Email Subject: {}\n\nEmail Body:\n{}",
        input.message.subject,
        if input.message.body.is_empty() {
            "(empty)"
        } else {
            input.message.body.as_str()
        }
    )
}

/// All fetched tool results as pretty JSON.
pub fn data_section(data: &FetchedFinancialData) -> String {
    if data.is_empty() {
        return "No financial data available.".to_string();
    }
    serde_json::to_string_pretty(&data.to_json())
        .unwrap_or_else(|_| data.to_json().to_string())
}

/// One tool's result as pretty JSON, or a placeholder when it was not fetched
/// or came back as an error payload.
pub fn tool_section(data: &FetchedFinancialData, tool: &str) -> String {
    match data.responses.iter().find(|r| r.tool == tool) {
        Some(r) if !r.is_error_payload() => serde_json::to_string_pretty(&r.response)
            .unwrap_or_else(|_| r.response.to_string()),
        Some(_) => "Unavailable (the data service returned an error).".to_string(),
        None => "Not available.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pipeline::types::{Category, CategoryResult, InboundMessage};

    #[test]
    fn customer_profile_skips_missing_fields() {
        let message = InboundMessage::new("s", "b", "a@example.com");
        let customer = CategoryResult {
            category: Category::Finance,
            name: "Ravi".into(),
            phone: String::new(),
        };
        let data = FetchedFinancialData::default();
        let input = AdvisorInput {
            message: &message,
            customer: &customer,
            data: &data,
        };
        assert_eq!(customer_profile(&input), "Name: Ravi\nEmail: a@example.com");
    }

    #[test]
    fn tool_section_hides_error_payloads() {
        let mut data = FetchedFinancialData::default();
        data.push("fetch_net_worth", json!({"total": 5}));
        data.push(
            "fetch_stock_transactions",
            json!({"error": "Request failed", "content": "timeout"}),
        );

        assert!(tool_section(&data, "fetch_net_worth").contains("\"total\": 5"));
        assert!(tool_section(&data, "fetch_stock_transactions").starts_with("Unavailable"));
        assert_eq!(tool_section(&data, "fetch_mf_transactions"), "Not available.");
    }

    #[test]
    fn empty_data_section_says_so() {
        assert_eq!(
            data_section(&FetchedFinancialData::default()),
            "No financial data available."
        );
    }
}
