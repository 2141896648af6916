//! Agent cards published for discovery

use crate::a2a::{AgentCapabilities, AgentCard, AgentSkill};
use crate::config::AgentRole;

fn card(name: &str, description: &str, url: &str, version: &str, skills: Vec<AgentSkill>) -> AgentCard {
    AgentCard {
        name: name.to_string(),
        description: description.to_string(),
        url: url.to_string(),
        version: version.to_string(),
        capabilities: AgentCapabilities {
            streaming: false,
            push_notifications: false,
        },
        skills,
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
    }
}

pub fn expert_card(url: &str) -> AgentCard {
    card(
        "Company Information Expert Agent",
        "Expert on AI Solutions Corp products and services (based on company data). Can perform calculations.",
        url,
        "1.1.0",
        vec![
            AgentSkill::new(
                "company_data_expertise",
                "Company Data Expertise",
                "Expert knowledge about AI Solutions Corp products and services based on provided company data.",
                &["company", "products", "expertise", "static-data"],
            ),
            AgentSkill::new(
                "calculations",
                "Calculations",
                "Performing mathematical calculations.",
                &["math", "calculations"],
            ),
        ],
    )
}

pub fn manager_card(url: &str) -> AgentCard {
    card(
        "Sales Manager Chat Agent",
        "Friendly sales manager for AI solutions. Chats with clients, answers questions, and helps choose products.",
        url,
        "1.0.1",
        vec![
            AgentSkill::new(
                "client_chat_communication",
                "Client Chat Communication",
                "Conducting dialogue with clients in chat, providing information about AI Solutions Corp. products.",
                &["sales", "chat", "communication"],
            ),
            AgentSkill::new(
                "expert_info_query",
                "Expert Information Query",
                "Requesting additional information from the company's internal expert for more accurate answers.",
                &["consultation", "expertise", "internal"],
            ),
        ],
    )
}

pub fn card_for(role: AgentRole, url: &str) -> AgentCard {
    match role {
        AgentRole::Expert => expert_card(url),
        AgentRole::Manager => manager_card(url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cards_by_role() {
        let expert = card_for(AgentRole::Expert, "http://expert-agent:10007/");
        assert_eq!(expert.version, "1.1.0");
        assert_eq!(expert.skills.len(), 2);
        assert!(!expert.capabilities.streaming);

        let manager = card_for(AgentRole::Manager, "http://manager-agent:10008/");
        assert_eq!(manager.name, "Sales Manager Chat Agent");
        assert_eq!(manager.skills[1].id, "expert_info_query");
        assert_eq!(manager.url, "http://manager-agent:10008/");
    }
}
