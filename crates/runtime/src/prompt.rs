//! System prompt template.

use crate::model::ToolSpec;

/// Build the system prompt listing the available tools.
pub fn system_prompt(tools: &[ToolSpec]) -> String {
    let tool_descriptions = tools
        .iter()
        .map(|t| format!("- {}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You have access to the following tools that you can and should use if they are relevant to the user's query:

{tool_descriptions}

You should use these tools to help users accomplish their goals. Don't say you can't do something if a tool exists to do it."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(name: &str, description: &str) -> ToolSpec {
        ToolSpec {
            name: name.into(),
            description: description.into(),
            input_schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn lists_every_tool_in_order() {
        let prompt = system_prompt(&[
            spec("add", "Add two numbers"),
            spec("create_meme", "Generate a meme"),
        ]);
        assert!(prompt.contains("- add: Add two numbers\n- create_meme: Generate a meme"));
        assert!(prompt.contains("Don't say you can't do something"));
    }

    #[test]
    fn is_deterministic() {
        let tools = [spec("add", "Add two numbers")];
        assert_eq!(system_prompt(&tools), system_prompt(&tools));
    }
}
