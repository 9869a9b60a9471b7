//! Built-in agents: arithmetic and email writing.

use super::AgentDefinition;
use crate::error::HandoffError;
use crate::tools::{math_tools, DivisionByZeroPolicy};

pub const MATH_AGENT: &str = "math_agent";
pub const EMAIL_AGENT: &str = "email_agent";

const MATH_INSTRUCTION: &str = "You are a math expert. You must use the provided tools to solve \
mathematical problems. Do not answer directly.";

const EMAIL_INSTRUCTION: &str = "You are an expert at writing professional and concise emails.";

/// Tool-using agent solving arithmetic through `add`, `subtract`,
/// `multiply` and `divide`.
pub fn math_agent(policy: DivisionByZeroPolicy) -> Result<AgentDefinition, HandoffError> {
    AgentDefinition::tool_using(
        MATH_AGENT,
        "Use this agent for any mathematical calculations, like addition, subtraction, \
         multiplication, or division.",
        MATH_INSTRUCTION,
        "The mathematical question or expression to be solved.",
        math_tools(policy),
    )
}

pub fn email_agent() -> AgentDefinition {
    AgentDefinition::direct(
        EMAIL_AGENT,
        "Use this agent to write an email to a person based on a given topic or context.",
        EMAIL_INSTRUCTION,
        "The name of the person and the topic for the email.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        let math = math_agent(DivisionByZeroPolicy::Sentinel).unwrap();
        assert!(math.validate().is_ok());
        assert!(math.is_tool_using());
        assert_eq!(
            math.tools().unwrap().names(),
            vec!["add", "divide", "multiply", "subtract"]
        );

        let email = email_agent();
        assert!(email.validate().is_ok());
        assert!(email.tools().is_none());
    }
}
