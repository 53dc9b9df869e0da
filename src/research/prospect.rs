//! Per-prospect research step
//!
//! Stages run strictly in order because each one feeds the next:
//!
//! 1. Case study and value proposition from the knowledge base (concurrent)
//! 2. Title verification
//! 3. Topic fan-out: every buy-side topic queried concurrently, filtered,
//!    verified and folded into buckets once all of them settle
//! 4. Five outreach drafts
//!
//! No provider failure aborts the step. A failed or rejected call becomes
//! an empty string (or `false` for the title check) and the templates
//! work around the gap. Only cancellation ends the step early.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use super::prompts::{self, DraftContext};
use super::service::ResearchService;
use super::topics::{BucketAccumulator, ResearchFindings, bucket_for, validity_for};
use crate::ai::{RejectReason, Verdict};
use crate::config::ResearchConfig;
use crate::types::{
    CampaignDetails, CaseStudyResult, EmailDraftSet, Prospect, ResearchAnswer, ResearchError,
    Result, Topic,
};

/// Everything one prospect contributes to staging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProspectOutcome {
    pub answers: Vec<ResearchAnswer>,
    pub drafts: EmailDraftSet,
}

struct TopicOutcome {
    ordinal: usize,
    topic_identifier: String,
    verdict: Verdict,
    citations: Vec<String>,
}

pub struct ProspectResearcher {
    service: Arc<ResearchService>,
    campaign: Arc<CampaignDetails>,
    topics: Arc<Vec<Topic>>,
    config: ResearchConfig,
}

impl ProspectResearcher {
    pub fn new(
        service: Arc<ResearchService>,
        campaign: Arc<CampaignDetails>,
        topics: Arc<Vec<Topic>>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            service,
            campaign,
            topics,
            config,
        }
    }

    /// Research one prospect. `fallback_case_study` is used when the
    /// knowledge base has nothing for this prospect.
    #[instrument(skip_all, fields(buyer = %prospect.buyer_identifier))]
    pub async fn research(
        &self,
        prospect: &Prospect,
        fallback_case_study: Option<&str>,
    ) -> Result<ProspectOutcome> {
        let mut knowledge = self.knowledge(prospect).await;
        if knowledge.case_study.is_empty()
            && let Some(text) = fallback_case_study
        {
            knowledge.case_study = text.to_string();
        }
        self.checkpoint()?;

        let title_verified = match self.service.verify_title(prospect).await {
            Ok(verified) => verified,
            Err(e) => {
                warn!(error = %e, "Title verification failed");
                false
            }
        };
        self.checkpoint()?;

        let (answers, findings) = self.research_topics(prospect).await;
        self.checkpoint()?;

        let drafts = self
            .drafts(prospect, title_verified, &knowledge, &findings)
            .await;
        self.checkpoint()?;

        debug!(
            answers = answers.len(),
            title_verified,
            blank_drafts = drafts.is_blank(),
            "Prospect researched"
        );

        Ok(ProspectOutcome { answers, drafts })
    }

    fn checkpoint(&self) -> Result<()> {
        if self.service.is_cancelled() {
            Err(ResearchError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn knowledge(&self, prospect: &Prospect) -> CaseStudyResult {
        let seller = &self.campaign.company_name;
        let (case_study, value_prop) = tokio::join!(
            self.service.rag(prompts::case_study_prompt(seller, prospect)),
            self.service.rag(prompts::value_prop_prompt(seller, prospect)),
        );

        let usable = |result: Result<String>, what: &str| match result {
            Ok(text) => prompts::usable_knowledge(text),
            Err(e) => {
                warn!(error = %e, "{} lookup failed", what);
                String::new()
            }
        };

        CaseStudyResult {
            case_study: usable(case_study, "Case study"),
            value_prop: usable(value_prop, "Value proposition"),
        }
    }

    async fn research_topics(&self, prospect: &Prospect) -> (Vec<ResearchAnswer>, ResearchFindings) {
        let values = prompts::topic_values(&self.campaign, prospect);

        let outcomes = join_all(self.topics.iter().enumerate().map(|(idx, topic)| {
            let query = prompts::fill_placeholders(&topic.detail, &values);
            self.research_topic(idx + 1, topic, query)
        }))
        .await;

        let mut answers = Vec::new();
        let mut buckets = BucketAccumulator::new();

        // join_all preserves input order, so buckets fill in topic order
        for outcome in outcomes {
            match outcome.verdict {
                Verdict::Accepted(text) => {
                    if let Some(bucket) = bucket_for(outcome.ordinal) {
                        buckets.add(bucket, &text, &outcome.citations);
                    }
                    answers.push(ResearchAnswer {
                        buyer_id: prospect.buyer_identifier.clone(),
                        product_id: self.campaign.product_id,
                        topic_id: outcome.topic_identifier,
                        description: text,
                    });
                }
                Verdict::Rejected(reason) => {
                    debug!(
                        topic = %outcome.topic_identifier,
                        %reason,
                        "Topic answer rejected"
                    );
                }
            }
        }

        (answers, buckets.finish())
    }

    async fn research_topic(&self, ordinal: usize, topic: &Topic, query: String) -> TopicOutcome {
        let (verdict, citations) = match self.service.web_query(&query).await {
            Ok(reply) => (self.service.filter().evaluate(Ok(reply.text)), reply.citations),
            Err(e) => {
                warn!(topic = %topic.topic_identifier, error = %e, "Web query failed");
                (self.service.filter().evaluate(Err(e)), Vec::new())
            }
        };

        let verdict = match verdict {
            Verdict::Accepted(text) => {
                let validity = validity_for(ordinal, &self.config);
                if self.service.verify(&text, &validity).await {
                    Verdict::Accepted(text)
                } else {
                    Verdict::Rejected(RejectReason::Unverified)
                }
            }
            rejected => rejected,
        };

        TopicOutcome {
            ordinal,
            topic_identifier: topic.topic_identifier.clone(),
            verdict,
            citations,
        }
    }

    async fn drafts(
        &self,
        prospect: &Prospect,
        title_verified: bool,
        knowledge: &CaseStudyResult,
        findings: &ResearchFindings,
    ) -> EmailDraftSet {
        let ctx = DraftContext {
            seller: &self.campaign.company_name,
            sender_role: &self.config.sender_role,
            prospect,
            title_verified,
            knowledge,
            findings,
        };

        let (pas, aida, fab, linkedin_1, linkedin_2) = tokio::join!(
            self.draft("PAS email", prompts::pas_prompt(&ctx), findings.pas_citations()),
            self.draft("AIDA email", prompts::aida_prompt(&ctx), findings.aida_citations()),
            self.draft("FAB email", prompts::fab_prompt(&ctx), findings.fab_citations()),
            self.draft(
                "LinkedIn message 1",
                prompts::linkedin_prompt(&ctx, &findings.priorities_1),
                Vec::new(),
            ),
            self.draft(
                "LinkedIn message 2",
                prompts::linkedin_prompt(&ctx, &findings.priorities_2),
                Vec::new(),
            ),
        );

        EmailDraftSet {
            buyer_identifier: prospect.buyer_identifier.clone(),
            email_pas: pas,
            email_aida: aida,
            email_fab: fab,
            linkedin_1,
            linkedin_2,
        }
    }

    async fn draft(&self, kind: &str, prompt: String, citations: Vec<String>) -> String {
        match self.service.draft(prompt).await {
            Ok(text) => {
                let text = prompts::strip_recency(text.trim());
                prompts::with_references(text, &citations)
            }
            Err(e) => {
                warn!(draft = kind, error = %e, "Draft generation failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GroundedReply;
    use crate::ai::provider::testing::{ScriptedProvider, outage};
    use crate::config::Config;
    use std::sync::atomic::Ordering;
    use tokio_util::sync::CancellationToken;

    fn researcher(scripted: &Arc<ScriptedProvider>, topics: usize) -> ProspectResearcher {
        researcher_with(scripted, topics, CancellationToken::new())
    }

    fn researcher_with(
        scripted: &Arc<ScriptedProvider>,
        topics: usize,
        cancel: CancellationToken,
    ) -> ProspectResearcher {
        let mut config = Config::default();
        config.throttle.batch_delay_ms = 0;
        let service = ResearchService::new(scripted.registry(), &config, cancel).unwrap();
        let campaign = CampaignDetails {
            campaign_name: "Q3".to_string(),
            company_name: "Nimbus".to_string(),
            product_id: Some(7),
            product_category: "AI agents".to_string(),
            ..Default::default()
        };
        let topics = (1..=topics)
            .map(|i| {
                Topic::new(
                    "Q3",
                    &format!("topic_{}", i),
                    "buy",
                    &format!("Question {} about {{buyer_company}}", i),
                )
            })
            .collect();
        ProspectResearcher::new(
            Arc::new(service),
            Arc::new(campaign),
            Arc::new(topics),
            config.research,
        )
    }

    fn prospect() -> Prospect {
        let row = serde_json::json!({
            "id": 1, "f_name": "Ada", "l_name": "King", "company": "Acme",
            "title": "CTO", "industry": "Retail"
        });
        Prospect::from_row(row.as_object().unwrap(), "Q3")
    }

    #[tokio::test]
    async fn test_full_research() {
        let scripted = Arc::new(ScriptedProvider::new());
        let outcome = researcher(&scripted, 9)
            .research(&prospect(), None)
            .await
            .unwrap();

        assert_eq!(outcome.answers.len(), 9);
        assert_eq!(outcome.answers[0].topic_id, "Q3_topic_1");
        assert_eq!(outcome.answers[0].product_id, Some(7));
        assert_eq!(outcome.answers[0].buyer_id, "Q31AdaKing");

        let drafts = outcome.drafts;
        assert!(drafts.email_pas.starts_with("Scripted draft."));
        assert!(drafts.email_pas.contains("Research References:\nhttps://source.example/finding"));
        assert_eq!(drafts.linkedin_1, "Scripted draft.");

        // 2 knowledge lookups, 5 drafts; title + 9 queries + 9 verifications
        assert_eq!(scripted.rag_calls.load(Ordering::SeqCst), 2);
        assert_eq!(scripted.chat_calls.load(Ordering::SeqCst), 5);
        assert_eq!(scripted.search_calls.load(Ordering::SeqCst), 19);
        assert!(
            scripted
                .prompts()
                .iter()
                .any(|p| p == "Question 3 about Acme")
        );
    }

    #[tokio::test]
    async fn test_total_outage_degrades_to_empty() {
        let scripted = Arc::new(ScriptedProvider::failing());
        let outcome = researcher(&scripted, 9)
            .research(&prospect(), None)
            .await
            .unwrap();

        assert!(outcome.answers.is_empty());
        assert!(outcome.drafts.is_blank());
        assert_eq!(outcome.drafts.buyer_identifier, "Q31AdaKing");
    }

    #[tokio::test]
    async fn test_rejected_and_unverified_topics_dropped() {
        let scripted = Arc::new(ScriptedProvider::new().with_search(|_, user| {
            let text = if user.contains("true or false") {
                if user.contains("stale") { "False" } else { "True" }
            } else if user.contains("Question 1 ") {
                "Nothing found for this company"
            } else if user.contains("Question 2 ") {
                "Acme sold shares last year"
            } else if user.contains("Question 3 ") {
                "A stale fact about Acme"
            } else {
                "Acme prioritizes sustainability"
            };
            Ok(GroundedReply {
                text: text.to_string(),
                citations: Vec::new(),
            })
        }));

        let outcome = researcher(&scripted, 4)
            .research(&prospect(), None)
            .await
            .unwrap();

        let topics: Vec<_> = outcome.answers.iter().map(|a| a.topic_id.as_str()).collect();
        assert_eq!(topics, vec!["Q3_topic_4"]);
    }

    #[tokio::test]
    async fn test_knowledge_fallback_and_title_failure() {
        let scripted = Arc::new(
            ScriptedProvider::new()
                .with_rag(|prompt| {
                    if prompt.contains("case study") {
                        Ok("Nothing found".to_string())
                    } else {
                        Err(outage())
                    }
                })
                .with_search(|system, _| {
                    if system.contains("verify the job title") {
                        Err(outage())
                    } else {
                        Ok(GroundedReply::default())
                    }
                }),
        );

        let outcome = researcher(&scripted, 1)
            .research(&prospect(), Some("Helped Beta cut costs 30%."))
            .await
            .unwrap();

        assert!(outcome.answers.is_empty());
        let pas_prompt = scripted
            .prompts()
            .into_iter()
            .find(|p| p.contains("problem") || p.contains("challenge"))
            .unwrap();
        assert!(pas_prompt.contains("Helped Beta cut costs 30%."));
        assert!(pas_prompt.contains("Create a short, friendly greeting."));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let scripted = Arc::new(ScriptedProvider::new());
        let cancel = CancellationToken::new();
        let researcher = researcher_with(&scripted, 3, cancel.clone());
        cancel.cancel();

        let result = researcher.research(&prospect(), None).await;
        assert!(matches!(result, Err(ResearchError::Cancelled)));
        assert_eq!(scripted.search_calls.load(Ordering::SeqCst), 0);
    }
}
