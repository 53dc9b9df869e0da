//! Throttled provider operations used by research.
//!
//! Every operation has its own [`Throttle`], matching how the pipeline
//! rate-limits knowledge-base lookups, title checks, web queries,
//! verification queries and draft generation independently. All throttles
//! share one cancellation token.

use tokio_util::sync::CancellationToken;

use super::prompts;
use crate::ai::{
    AcceptanceFilter, ChatMessage, GroundedReply, ProviderRegistry, Throttle, Validity,
    is_exactly_true,
};
use crate::config::Config;
use crate::types::{Prospect, Result};

pub struct ResearchService {
    providers: ProviderRegistry,
    filter: AcceptanceFilter,
    rag: Throttle,
    title: Throttle,
    web_query: Throttle,
    verify: Throttle,
    drafts: Throttle,
    cancel: CancellationToken,
}

impl ResearchService {
    pub fn new(providers: ProviderRegistry, config: &Config, cancel: CancellationToken) -> Result<Self> {
        let throttle = |name: &str| {
            Throttle::new(
                name,
                config.throttle.concurrency,
                config.throttle.batch_delay(),
                cancel.clone(),
            )
        };

        Ok(Self {
            filter: AcceptanceFilter::from_config(&config.acceptance),
            rag: throttle("rag")?,
            title: throttle("title")?,
            web_query: throttle("web_query")?,
            verify: throttle("verify")?,
            drafts: throttle("drafts")?,
            providers,
            cancel,
        })
    }

    pub fn filter(&self) -> &AcceptanceFilter {
        &self.filter
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Retrieve-and-generate against the seller knowledge base
    pub async fn rag(&self, prompt: String) -> Result<String> {
        let provider = self.providers.rag.clone();
        self.rag
            .call(move || async move { provider.rag(&prompt).await })
            .await?
    }

    /// Grounded yes/no check of the prospect's job title
    pub async fn verify_title(&self, prospect: &Prospect) -> Result<bool> {
        let provider = self.providers.grounded.clone();
        let messages = prompts::title_verification_messages(prospect);
        let reply = self
            .title
            .call(move || async move { provider.search(&messages, false).await })
            .await??;
        Ok(is_exactly_true(&reply.text))
    }

    /// Web-grounded research query with citations
    pub async fn web_query(&self, query: &str) -> Result<GroundedReply> {
        let provider = self.providers.grounded.clone();
        let messages = prompts::web_query_messages(query);
        self.web_query
            .call(move || async move { provider.search(&messages, true).await })
            .await?
    }

    /// Second acceptance stage. Cancellation counts as "not verified".
    pub async fn verify(&self, text: &str, validity: &Validity) -> bool {
        let provider = self.providers.grounded.clone();
        let filter = self.filter.clone();
        let text = text.to_string();
        let validity = validity.clone();
        self.verify
            .call(move || async move { filter.verify(provider.as_ref(), &text, &validity).await })
            .await
            .unwrap_or(false)
    }

    /// One chat completion for an outreach draft
    pub async fn draft(&self, prompt: String) -> Result<String> {
        let provider = self.providers.chat.clone();
        self.drafts
            .call(move || async move { provider.chat(&[ChatMessage::user(prompt)]).await })
            .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::testing::ScriptedProvider;
    use crate::types::ResearchError;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    fn fast_config() -> Config {
        let mut config = Config::default();
        config.throttle.batch_delay_ms = 0;
        config
    }

    fn prospect() -> Prospect {
        let row = serde_json::json!({"id": 1, "f_name": "Ada", "l_name": "King", "company": "Acme", "title": "CTO"});
        Prospect::from_row(row.as_object().unwrap(), "Q3")
    }

    #[tokio::test]
    async fn test_title_verification() {
        let scripted = Arc::new(ScriptedProvider::new());
        let service =
            ResearchService::new(scripted.registry(), &fast_config(), CancellationToken::new())
                .unwrap();

        assert!(service.verify_title(&prospect()).await.unwrap());
        let prompt = scripted.prompts().pop().unwrap();
        assert!(prompt.contains("Is Ada, King with LinkedIn profile"));
        assert!(prompt.contains("job title CTO at Acme company"));
    }

    #[tokio::test]
    async fn test_web_query_keeps_citations() {
        let scripted = Arc::new(ScriptedProvider::new());
        let service =
            ResearchService::new(scripted.registry(), &fast_config(), CancellationToken::new())
                .unwrap();

        let reply = service.web_query("What does Acme sell?").await.unwrap();
        assert_eq!(reply.text, "Scripted finding.");
        assert_eq!(reply.citations.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_service_refuses_work() {
        let scripted = Arc::new(ScriptedProvider::new());
        let cancel = CancellationToken::new();
        let service = ResearchService::new(scripted.registry(), &fast_config(), cancel.clone())
            .unwrap();

        cancel.cancel();
        assert!(service.is_cancelled());
        assert!(matches!(
            service.rag("anything".to_string()).await,
            Err(ResearchError::Cancelled)
        ));
        assert!(!service.verify("Acme grew.", &Validity::Irrelevant).await);
        assert_eq!(scripted.rag_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = fast_config();
        config.throttle.concurrency = 0;
        let result = ResearchService::new(
            ProviderRegistry::offline(),
            &config,
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(ResearchError::Config(_))));
    }
}
