//! Role profiles: prompt template, expected headers and confidence
//!
//! Templates use `{placeholder}` substitution. Placeholders with no value
//! are left in the text as-is.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::AgentRole;
use super::sections::SectionParser;

pub const RESEARCH_HEADERS: [&str; 4] = ["SUMMARY", "ANALYSIS", "RECOMMENDATIONS", "CONSIDERATIONS"];

pub const PLANNING_HEADERS: [&str; 5] = [
    "IMPLEMENTATION_PLAN",
    "TECHNICAL_SPECIFICATIONS",
    "TIMELINE",
    "RESOURCES",
    "RISKS_AND_MITIGATIONS",
];

pub const RESEARCH_CONFIDENCE: f64 = 0.85;
pub const PLANNING_CONFIDENCE: f64 = 0.9;

const RESEARCH_TEMPLATE: &str = r#"Task: {description}

{task_details}

Please provide a detailed analysis in the following structure:

SUMMARY:
[Provide a brief executive summary of your findings]

ANALYSIS:
[Detailed analysis of available options]

RECOMMENDATIONS:
[Clear recommendations with justification]

CONSIDERATIONS:
[Important factors to consider during implementation]

Format your response using these exact section headers.
Make sure each section starts with the exact header followed by a colon."#;

const PLANNING_TEMPLATE: &str = r#"Task: {description}

{task_details}

Research Summary: {summary}
Detailed Analysis: {detailed_analysis}
Recommendations: {recommendations}
Implementation Considerations: {considerations}

Based on the research findings above, create a detailed implementation plan.
Format your response using these exact section headers:

## IMPLEMENTATION_PLAN:
[Provide a detailed, step-by-step implementation guide]

## TECHNICAL_SPECIFICATIONS:
[List API endpoints, data structures, and technical requirements]

## TIMELINE:
[Provide time estimates and milestones]

## RESOURCES:
[List required tools and dependencies]

## RISKS_AND_MITIGATIONS:
[List potential risks and mitigation strategies]

Make each section comprehensive and immediately actionable."#;

/// Everything role-specific about an agent that is data rather than code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleProfile {
    pub role: AgentRole,
    pub headers: Vec<String>,
    pub template: String,
    /// Fixed confidence attached to completed results
    pub confidence: f64,
}

impl RoleProfile {
    pub fn research() -> Self {
        Self {
            role: AgentRole::Research,
            headers: RESEARCH_HEADERS.iter().map(|h| h.to_string()).collect(),
            template: RESEARCH_TEMPLATE.to_string(),
            confidence: RESEARCH_CONFIDENCE,
        }
    }

    pub fn planning() -> Self {
        Self {
            role: AgentRole::Planning,
            headers: PLANNING_HEADERS.iter().map(|h| h.to_string()).collect(),
            template: PLANNING_TEMPLATE.to_string(),
            confidence: PLANNING_CONFIDENCE,
        }
    }

    /// Default profile for a role
    pub fn for_role(role: AgentRole) -> Self {
        match role {
            AgentRole::Research => Self::research(),
            AgentRole::Planning => Self::planning(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn parser(&self) -> SectionParser {
        SectionParser::new(self.headers.iter().cloned())
    }

    /// Substitute `{name}` placeholders from `vars`
    pub fn render(&self, vars: &HashMap<&str, String>) -> String {
        render_template(&self.template, vars)
    }
}

/// Single left-to-right pass; substituted values are not rescanned
fn render_template(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match vars.get(name) {
            Some(value) if is_placeholder_name(name) => out.push_str(value),
            _ => {
                // not ours; keep the brace and continue scanning after it
                out.push('{');
                rest = after;
                continue;
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> HashMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_render_substitutes_known_placeholders() {
        let profile = RoleProfile::research().with_template("Task: {description}!");
        assert_eq!(
            profile.render(&vars(&[("description", "build it")])),
            "Task: build it!"
        );
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let profile = RoleProfile::research().with_template("{description} {unknown} {");
        assert_eq!(profile.render(&vars(&[("description", "x")])), "x {unknown} {");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let profile = RoleProfile::research().with_template("{description}");
        assert_eq!(
            profile.render(&vars(&[("description", "{summary}"), ("summary", "s")])),
            "{summary}"
        );
    }

    #[test]
    fn test_render_handles_json_braces() {
        let profile = RoleProfile::research().with_template(r#"{"a": {description}}"#);
        assert_eq!(
            profile.render(&vars(&[("description", "1")])),
            r#"{"a": 1}"#
        );
    }

    #[test]
    fn test_default_research_profile() {
        let profile = RoleProfile::research();
        assert_eq!(profile.role, AgentRole::Research);
        assert_eq!(profile.confidence, 0.85);
        assert_eq!(profile.parser().headers().len(), 4);

        let rendered = profile.render(&vars(&[
            ("description", "Design a cache"),
            ("task_details", "Priority: HIGH"),
        ]));
        assert!(rendered.starts_with("Task: Design a cache"));
        assert!(rendered.contains("Priority: HIGH"));
        assert!(rendered.contains("\nSUMMARY:\n"));
        assert!(rendered.contains("\nCONSIDERATIONS:\n"));
    }

    #[test]
    fn test_default_planning_profile_embeds_research() {
        let profile = RoleProfile::planning();
        assert_eq!(profile.confidence, 0.9);

        let rendered = profile.render(&vars(&[
            ("description", "d"),
            ("task_details", ""),
            ("summary", "sum"),
            ("detailed_analysis", "ana"),
            ("recommendations", "rec"),
            ("considerations", "con"),
        ]));
        assert!(rendered.contains("Research Summary: sum"));
        assert!(rendered.contains("Detailed Analysis: ana"));
        assert!(rendered.contains("Recommendations: rec"));
        assert!(rendered.contains("Implementation Considerations: con"));
        assert!(rendered.contains("## RISKS_AND_MITIGATIONS:"));
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(RoleProfile::planning().with_confidence(1.5).confidence, 1.0);
    }
}
