//! Prompt templates for avatar conversations

/// Templates for generating prompts
pub struct PromptTemplate;

impl PromptTemplate {
    /// System prompt that puts the model in the avatar's character
    pub fn avatar_system(description: &str) -> String {
        format!(
            "You are a {} with the intelligence of an AI. We are having a VERY casual conversation. You are my friend.",
            description.trim()
        )
    }
}
