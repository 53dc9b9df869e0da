//! Canned provider for dry runs
//!
//! Answers every capability deterministically without network access, so a
//! full campaign can be exercised end to end before credentials exist.

use async_trait::async_trait;

use super::{ChatMessage, ChatProvider, GroundedProvider, GroundedReply, RagProvider};
use crate::types::Result;

pub const OFFLINE_CITATION: &str = "https://example.com/offline";

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProvider;

fn last_user_prompt(messages: &[ChatMessage]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == super::Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or_default()
}

#[async_trait]
impl ChatProvider for OfflineProvider {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let prompt = last_user_prompt(messages);
        let subject = prompt.lines().next().unwrap_or_default();
        Ok(format!("Offline draft for: {}", subject.trim()))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

#[async_trait]
impl GroundedProvider for OfflineProvider {
    async fn search(
        &self,
        messages: &[ChatMessage],
        want_citations: bool,
    ) -> Result<GroundedReply> {
        // Verification prompts ask for a one-word verdict
        if last_user_prompt(messages).contains("true or false") {
            return Ok(GroundedReply {
                text: "true".to_string(),
                citations: Vec::new(),
            });
        }

        Ok(GroundedReply {
            text: "Offline research note.".to_string(),
            citations: if want_citations {
                vec![OFFLINE_CITATION.to_string()]
            } else {
                Vec::new()
            },
        })
    }

    fn name(&self) -> &str {
        "offline"
    }
}

#[async_trait]
impl RagProvider for OfflineProvider {
    async fn rag(&self, _prompt: &str) -> Result<String> {
        Ok("Offline case study summary.".to_string())
    }

    fn name(&self) -> &str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verification_prompts_affirm() {
        let reply = OfflineProvider
            .search(
                &[ChatMessage::user("Is this statement likely true or false: x")],
                false,
            )
            .await
            .unwrap();
        assert_eq!(reply.text, "true");
    }

    #[tokio::test]
    async fn test_research_prompts_cite_when_asked() {
        let messages = [ChatMessage::user("What is Acme working on?")];
        let cited = OfflineProvider.search(&messages, true).await.unwrap();
        assert_eq!(cited.citations, vec![OFFLINE_CITATION.to_string()]);

        let bare = OfflineProvider.search(&messages, false).await.unwrap();
        assert!(bare.citations.is_empty());
    }

    #[tokio::test]
    async fn test_chat_echoes_first_prompt_line() {
        let text = OfflineProvider
            .chat(&[ChatMessage::user("Write a PAS email\nmore context")])
            .await
            .unwrap();
        assert_eq!(text, "Offline draft for: Write a PAS email");
    }
}
