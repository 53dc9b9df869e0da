//! Scripted provider for tests
//!
//! Each capability is a closure over the prompt text, and every call is
//! counted and recorded so tests can assert on what the pipeline sent.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{
    ChatMessage, ChatProvider, GroundedProvider, GroundedReply, ProviderRegistry, RagProvider,
    Role,
};
use crate::types::{ErrorCategory, ProviderError, Result};

type ChatFn = dyn Fn(&str) -> Result<String> + Send + Sync;
/// (system prompt, user prompt)
type SearchFn = dyn Fn(&str, &str) -> Result<GroundedReply> + Send + Sync;
type RagFn = dyn Fn(&str) -> Result<String> + Send + Sync;

pub struct ScriptedProvider {
    chat: Box<ChatFn>,
    search: Box<SearchFn>,
    rag: Box<RagFn>,
    pub chat_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    pub rag_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

pub fn outage() -> crate::types::ResearchError {
    ProviderError::new(ErrorCategory::Unavailable, "scripted outage").into()
}

fn prompt_of(messages: &[ChatMessage], role: Role) -> String {
    messages
        .iter()
        .filter(|m| m.role == role)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self {
            chat: Box::new(|_| Ok("Scripted draft.".to_string())),
            search: Box::new(|_, user| {
                if user.contains("true or false") {
                    Ok(GroundedReply {
                        text: "True.".to_string(),
                        citations: Vec::new(),
                    })
                } else {
                    Ok(GroundedReply {
                        text: "Scripted finding.".to_string(),
                        citations: vec!["https://source.example/finding".to_string()],
                    })
                }
            }),
            rag: Box::new(|_| Ok("Scripted knowledge base answer.".to_string())),
            chat_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            rag_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every capability fails
    pub fn failing() -> Self {
        Self::new()
            .with_chat(|_| Err(outage()))
            .with_search(|_, _| Err(outage()))
            .with_rag(|_| Err(outage()))
    }

    pub fn with_chat(mut self, f: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        self.chat = Box::new(f);
        self
    }

    pub fn with_search(
        mut self,
        f: impl Fn(&str, &str) -> Result<GroundedReply> + Send + Sync + 'static,
    ) -> Self {
        self.search = Box::new(f);
        self
    }

    pub fn with_rag(mut self, f: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        self.rag = Box::new(f);
        self
    }

    /// Use this provider for all three capabilities
    pub fn registry(self: &Arc<Self>) -> ProviderRegistry {
        ProviderRegistry::new(self.clone(), self.clone(), self.clone())
    }

    /// User prompts seen so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn record(&self, prompt: &str) {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        let user = prompt_of(messages, Role::User);
        self.record(&user);
        (self.chat)(&user)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[async_trait]
impl GroundedProvider for ScriptedProvider {
    async fn search(
        &self,
        messages: &[ChatMessage],
        want_citations: bool,
    ) -> Result<GroundedReply> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let system = prompt_of(messages, Role::System);
        let user = prompt_of(messages, Role::User);
        self.record(&user);
        let mut reply = (self.search)(&system, &user)?;
        if !want_citations {
            reply.citations.clear();
        }
        Ok(reply)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[async_trait]
impl RagProvider for ScriptedProvider {
    async fn rag(&self, prompt: &str) -> Result<String> {
        self.rag_calls.fetch_add(1, Ordering::SeqCst);
        self.record(prompt);
        (self.rag)(prompt)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
