//! Prompt construction from the context snapshot, mode and new message.

use crate::ContextMode;

const RESPONSE_DIRECTIVES: &str = "Please craft a response that:
1. Directly addresses the user's message
2. Reflects the selected context type
3. Maintains conversation coherence
";

/// Build the request payload sent to the generation service.
///
/// Pure and deterministic: identical inputs always produce identical output.
#[must_use]
pub fn build_prompt(context_snapshot: &str, mode: &ContextMode, user_message: &str) -> String {
    format!(
        "\nContext Type: {label}\nSpecial Instructions: {instruction}\n\n\
         Recent Conversation Context:\n{context_snapshot}\n\n\
         User's Latest Message: {user_message}\n\n\
         {RESPONSE_DIRECTIVES}",
        label = mode.label(),
        instruction = mode.instruction(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_layout() {
        let prompt = build_prompt(
            "User said: hi\nAI responded: hello",
            &ContextMode::Casual,
            "how are you?",
        );

        let expected = "
Context Type: Casual
Special Instructions: Use a friendly, conversational tone.

Recent Conversation Context:
User said: hi
AI responded: hello

User's Latest Message: how are you?

Please craft a response that:
1. Directly addresses the user's message
2. Reflects the selected context type
3. Maintains conversation coherence
";
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_build_prompt_is_deterministic() {
        let mode = ContextMode::Creative;
        let first = build_prompt("ctx", &mode, "write a poem");
        let second = build_prompt("ctx", &mode, "write a poem");
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_mode_has_empty_instruction_segment() {
        let prompt = build_prompt("", &ContextMode::Default, "Hello");
        assert!(prompt.contains("Context Type: Default Context\nSpecial Instructions: \n"));
        assert!(prompt.contains("Recent Conversation Context:\n\n"));
        assert!(prompt.contains("User's Latest Message: Hello\n"));
    }

    #[test]
    fn test_unrecognized_mode_never_fails() {
        let mode = ContextMode::from_name("Noir");
        let prompt = build_prompt("", &mode, "Hello");
        assert!(prompt.contains("Context Type: Noir\nSpecial Instructions: \n"));
    }
}
