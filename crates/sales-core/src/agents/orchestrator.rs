//! Conversation orchestration
//!
//! Prompt construction for both agents, transcript formatting, and the
//! fallback replies used when the completion capability fails.

use crate::a2a::ConsultationOutcome;
use crate::llm::ResponseSchema;

use super::catalog::{self, COMPANY_DATA};

const CUSTOMER_PREFIX: &str = "Customer: ";
const AGENT_PREFIX: &str = "Manager: ";

/// Who said a line of a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Customer,
    Agent,
}

/// Render chat turns as a transcript, one turn per line, oldest first
pub fn format_transcript<'a>(turns: impl IntoIterator<Item = (Speaker, &'a str)>) -> String {
    turns
        .into_iter()
        .map(|(speaker, text)| {
            let prefix = match speaker {
                Speaker::Customer => CUSTOMER_PREFIX,
                Speaker::Agent => AGENT_PREFIX,
            };
            format!("{}{}", prefix, text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The customer's most recent utterance.
///
/// Plain single messages are returned unchanged.
pub fn latest_customer_message(input: &str) -> &str {
    input
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(CUSTOMER_PREFIX))
        .map(str::trim)
        .unwrap_or_else(|| input.trim())
}

fn is_transcript(input: &str) -> bool {
    input.lines().any(|line| line.starts_with(CUSTOMER_PREFIX))
}

/// Leading `max_chars` characters, marked with an ellipsis when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// ============================================================================
// Expert
// ============================================================================

pub fn expert_system_prompt() -> String {
    format!(
        "You are a helpful AI expert at AI Solutions Corp.
You have deep knowledge about our products (Document Analyzer, Vision AI) and services, based SOLELY on the following information:
{COMPANY_DATA}
When a sales manager asks for information to help them in a chat with a customer, provide clear, concise, and factual information derived ONLY from the provided company data.
Focus on product details, capabilities, and how they solve problems as described in the company data.
Your response will be used by the manager in their chat, so make it easy for them to extract key points.
Quote prices and figures exactly as written.
Do not invent or infer information beyond what is given in the company data.
If the query cannot be answered using the company data, state that the information is not available in the provided data.
Do not write a full reply for the customer. Just provide the necessary information or data.
If asked to perform calculations, use the 'calculate' tool."
    )
}

pub fn expert_schema() -> ResponseSchema {
    ResponseSchema::new(
        "ExpertResponse",
        "information",
        "the factual information for the sales manager",
    )
}

/// Degraded expert answer built from the static catalog
pub fn expert_fallback(query: &str) -> String {
    let products = catalog::products_mentioned(query);
    let details = if products.is_empty() {
        format!(
            "Document Analyzer processes documents, Vision AI is for warehouse monitoring. {}",
            catalog::COMPANY_FACTS
        )
    } else {
        products
            .iter()
            .map(|p| p.fact_sheet())
            .collect::<Vec<_>>()
            .join(" ")
    };

    format!(
        "An error occurred while processing your request '{}'. Basic product info: {}",
        preview(query.trim(), 50),
        details
    )
}

// ============================================================================
// Manager
// ============================================================================

pub const MANAGER_SYSTEM_PROMPT: &str = "You are a friendly and professional sales manager for AI solutions.
Your goal is to understand the customer's needs based on their message, provide relevant information (possibly after consulting an expert), and guide them towards a product demonstration.
Respond in a conversational, helpful, and concise chat style.
Avoid email formalities like salutations or signatures. Just provide the chat message.
If the user asks something unrelated to AI solutions, politely steer the conversation back or state you can only help with AI solutions.";

pub fn manager_schema() -> ResponseSchema {
    ResponseSchema::new(
        "ManagerChatResponse",
        "chat_reply",
        "the direct, conversational reply to the user's message",
    )
}

/// Request sent to the expert for one customer input
pub fn expert_query(customer_input: &str) -> String {
    let framing = if is_transcript(customer_input) {
        "A customer is chatting with me. The conversation so far (most recent last):"
    } else {
        "A customer asked in chat:"
    };

    format!(
        "{framing}
\"{}\"

Please provide brief information about our products (especially Document Analyzer and Vision AI, if relevant) that will help me answer the customer. I need the essence: features, benefits.
The response should be in the form of facts/theses that I can use in the chat.
Do not write a full reply to the customer, just the information for me.",
        customer_input.trim()
    )
}

/// Prompt for the manager's own completion.
///
/// The consultation outcome is passed on verbatim. An unavailable expert is
/// framed as an internal note the model must not repeat.
pub fn manager_prompt(customer_input: &str, consultation: &ConsultationOutcome) -> String {
    let opening = if is_transcript(customer_input) {
        "A customer is chatting with you. The conversation so far (most recent last):"
    } else {
        "A customer has sent the following chat message:"
    };

    let expert_section = match consultation {
        ConsultationOutcome::Reply(info) => format!(
            "Information from our company expert (use this to enhance your response if relevant, otherwise rely on your general knowledge):\n\"{}\"",
            info
        ),
        ConsultationOutcome::Unavailable(reason) => format!(
            "Internal note, never quote or mention it to the customer: the company expert could not be consulted ({}). Rely on general knowledge of our AI solutions.",
            reason
        ),
    };

    format!(
        "{opening}
\"{}\"

{expert_section}

Your task is to craft a helpful and concise chat response:
1. Acknowledge the customer's query.
2. If expert information is provided and relevant, integrate it naturally into your response to explain how our AI solutions (like Document Analyzer or Vision AI) can address their needs.
3. If appropriate, enthusiastically suggest scheduling a demonstration of our products.
4. Keep your response conversational, friendly, and directly address the user's message.
5. Do NOT use any email formatting, salutations (like \"Dear User\"), or closing signatures (like \"Best regards\"). Just provide the direct chat message.",
        customer_input.trim()
    )
}

/// Templated manager reply used when the completion capability fails.
///
/// Expert text is spliced in only when the consultation produced a reply.
pub fn manager_fallback(customer_input: &str, consultation: &ConsultationOutcome) -> String {
    let question = latest_customer_message(customer_input);
    let mut reply = format!("Thank you for your question: \"{}\". ", preview(question, 50));

    if let Some(info) = consultation.reply() {
        let info = info.trim();
        if !info.is_empty() {
            reply.push_str(&format!("Our expert suggested: \"{}\". ", preview(info, 70)));
        }
    }

    reply.push_str(
        "Our AI solutions, like Document Analyzer for document processing and Vision AI for monitoring, might be helpful for you. Would you like to learn more or schedule a demo?",
    );
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::Unavailability;

    fn unavailable() -> ConsultationOutcome {
        ConsultationOutcome::Unavailable(Unavailability::Transport(
            "error sending request: connection refused".to_string(),
        ))
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("héllo wörld", 5), "héllo...");
        assert_eq!(preview("short", 50), "short");
        assert_eq!(preview("ab", 2), "ab");
    }

    #[test]
    fn test_transcript_round_trip() {
        let transcript = format_transcript([
            (Speaker::Customer, "Hi"),
            (Speaker::Agent, "Hello! How can I help?"),
            (Speaker::Customer, " How much is Vision AI? "),
        ]);
        assert_eq!(
            transcript,
            "Customer: Hi\nManager: Hello! How can I help?\nCustomer: How much is Vision AI?"
        );
        assert_eq!(latest_customer_message(&transcript), "How much is Vision AI?");
        assert_eq!(latest_customer_message("  plain question "), "plain question");
    }

    #[test]
    fn test_expert_fallback_quotes_catalog() {
        let text = expert_fallback("What is the price of Vision AI?");
        assert!(text.contains("$8,000/month"));
        assert!(!text.contains("$5,000/month"));
    }

    #[test]
    fn test_expert_fallback_without_product() {
        let text = expert_fallback("Tell me about your company");
        assert!(text.contains("Document Analyzer processes documents"));
        assert!(text.contains("15 countries"));
    }

    #[test]
    fn test_manager_fallback_splices_reply() {
        let consultation = ConsultationOutcome::Reply("Vision AI costs from $8,000/month".to_string());
        let text = manager_fallback("How much is Vision AI?", &consultation);
        assert!(text.starts_with("Thank you for your question: \"How much is Vision AI?\"."));
        assert!(text.contains("Our expert suggested: \"Vision AI costs from $8,000/month\"."));
        assert!(text.ends_with("schedule a demo?"));
    }

    #[test]
    fn test_manager_fallback_hides_unavailability() {
        let text = manager_fallback("How much is Vision AI?", &unavailable());
        assert!(!text.contains("expert suggested"));
        assert!(!text.contains("connection refused"));
        assert!(!text.to_lowercase().contains("unavailable"));
        assert!(text.contains("Document Analyzer"));
    }

    #[test]
    fn test_manager_fallback_uses_latest_turn() {
        let transcript = format_transcript([
            (Speaker::Customer, "Hi"),
            (Speaker::Agent, "Hello!"),
            (Speaker::Customer, "Do you do invoices?"),
        ]);
        let text = manager_fallback(&transcript, &unavailable());
        assert!(text.contains("\"Do you do invoices?\""));
    }

    #[test]
    fn test_manager_prompt_frames_unavailability() {
        let prompt = manager_prompt("Hi there", &unavailable());
        assert!(prompt.contains("A customer has sent the following chat message"));
        assert!(prompt.contains("never quote or mention it to the customer"));
        assert!(prompt.contains("connection refused"));
    }

    #[test]
    fn test_manager_prompt_includes_reply_verbatim() {
        let consultation = ConsultationOutcome::Reply("Fact A. Fact B.".to_string());
        let prompt = manager_prompt("Customer: Hi\nManager: Hello\nCustomer: Prices?", &consultation);
        assert!(prompt.contains("The conversation so far"));
        assert!(prompt.contains("\"Fact A. Fact B.\""));
    }

    #[test]
    fn test_expert_query_embeds_customer_text() {
        let query = expert_query("Do you monitor warehouses?");
        assert!(query.starts_with("A customer asked in chat:"));
        assert!(query.contains("\"Do you monitor warehouses?\""));
    }
}
