//! Declarative request rules in the shape the blocking engine accepts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DomainType {
    FirstParty,
    ThirdParty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedirectTarget {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleAction {
    Allow,
    Redirect { redirect: RedirectTarget },
}

impl RuleAction {
    pub fn redirect_to(url: &str) -> Self {
        Self::Redirect {
            redirect: RedirectTarget { url: url.to_string() },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_domains: Option<Vec<String>>,
    #[serde(default)]
    pub resource_types: Vec<ResourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_type: Option<DomainType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_initiator_domains: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

impl Rule {
    pub fn is_allow(&self) -> bool {
        matches!(self.action, RuleAction::Allow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redirect_rule_uses_engine_field_names() {
        let rule = Rule {
            id: 100,
            priority: 1,
            action: RuleAction::redirect_to("focuslens://blocked.html"),
            condition: RuleCondition {
                request_domains: Some(vec!["bbc.com".into()]),
                resource_types: vec![ResourceType::MainFrame],
                domain_type: Some(DomainType::FirstParty),
                excluded_initiator_domains: Some(vec!["localhost".into()]),
                ..RuleCondition::default()
            },
        };

        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({
                "id": 100,
                "priority": 1,
                "action": {"type": "redirect", "redirect": {"url": "focuslens://blocked.html"}},
                "condition": {
                    "requestDomains": ["bbc.com"],
                    "resourceTypes": ["main_frame"],
                    "domainType": "firstParty",
                    "excludedInitiatorDomains": ["localhost"]
                }
            })
        );
    }

    #[test]
    fn allow_action_is_a_bare_tag() {
        assert_eq!(
            serde_json::to_value(RuleAction::Allow).unwrap(),
            json!({"type": "allow"})
        );
    }
}
