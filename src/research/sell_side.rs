//! Seller-side research
//!
//! Answers the sell-side question sheet against the seller knowledge base
//! and stages one [`SellSideScript`] per question. Questions fan out per
//! target industry, persona or function; each script keeps at most five
//! answer columns.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::prompts::fill_placeholders;
use super::service::ResearchService;
use crate::ai::ProviderRegistry;
use crate::campaign::SourceWorkbook;
use crate::config::Config;
use crate::storage::StagingStore;
use crate::types::{
    CampaignDetails, Row, ScriptCategory, SellSideScript, ServiceResponse, Topic, row_string,
};

/// Answer columns per script row
const MAX_COLUMNS: usize = 5;

/// Category column of the sell-side question sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    SelfIntroduction,
    ValuePropIndustry,
    ValuePropPersona,
    CaseStudyIndustry,
    CaseStudyFunction,
}

impl QuestionKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "self_introduction" => Some(Self::SelfIntroduction),
            "valueprop_industry" => Some(Self::ValuePropIndustry),
            "valueprop_persona" => Some(Self::ValuePropPersona),
            "casestudy_industry" => Some(Self::CaseStudyIndustry),
            "casestudy_function" => Some(Self::CaseStudyFunction),
            _ => None,
        }
    }

    pub fn script_category(&self) -> ScriptCategory {
        match self {
            Self::SelfIntroduction => ScriptCategory::SelfIntro,
            Self::ValuePropIndustry | Self::ValuePropPersona => ScriptCategory::ValueProp,
            Self::CaseStudyIndustry | Self::CaseStudyFunction => ScriptCategory::CaseStudy,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellSideQuestion {
    pub kind: QuestionKind,
    pub topic_id: String,
    pub detail: String,
}

impl SellSideQuestion {
    /// `None` for rows with an unknown category
    pub fn from_row(row: &Row, campaign_name: &str) -> Option<Self> {
        let kind = QuestionKind::parse(&row_string(row, "category"))?;
        let title = row_string(row, "title");
        let topic_id = if title.is_empty() {
            row_string(row, "id")
        } else {
            Topic::identifier(campaign_name, &title)
        };

        Some(Self {
            kind,
            topic_id,
            detail: row_string(row, "detail"),
        })
    }
}

/// Per-category counts of staged scripts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SellSideSummary {
    pub questions: usize,
    pub self_intro: usize,
    pub value_prop: usize,
    pub case_study: usize,
}

pub struct SellSideResearcher {
    providers: ProviderRegistry,
    staging: StagingStore,
    config: Arc<Config>,
}

impl SellSideResearcher {
    pub fn new(providers: ProviderRegistry, staging: StagingStore, config: Arc<Config>) -> Self {
        Self {
            providers,
            staging,
            config,
        }
    }

    #[instrument(skip_all, fields(questions = workbook.sellside_questions.len()))]
    pub async fn run(
        &self,
        workbook: &SourceWorkbook,
        cancel: CancellationToken,
    ) -> ServiceResponse<SellSideSummary> {
        let details = workbook.details();
        if details.campaign_name.is_empty() {
            return ServiceResponse::failed("Campaign name missing from settings");
        }

        let questions: Vec<SellSideQuestion> = workbook
            .sellside_questions
            .iter()
            .filter_map(|row| {
                let question = SellSideQuestion::from_row(row, &details.campaign_name);
                if question.is_none() {
                    debug!(category = %row_string(row, "category"), "Skipping sell-side question");
                }
                question
            })
            .collect();

        let service = match ResearchService::new(self.providers.clone(), &self.config, cancel.clone())
        {
            Ok(service) => service,
            Err(e) => return ServiceResponse::failed(format!("An error occurred: {}", e)),
        };

        let context = ScriptContext::new(&details, workbook);
        let batch_size = self.config.research.sell_side_batch_size.max(1);
        let mut scripts = Vec::with_capacity(questions.len());

        for (index, batch) in questions.chunks(batch_size).enumerate() {
            info!(batch = index + 1, size = batch.len(), "Processing sell-side batch");
            let answered = join_all(
                batch
                    .iter()
                    .map(|question| context.answer(&service, question, details.product_id)),
            )
            .await;
            scripts.extend(answered);

            if cancel.is_cancelled() {
                warn!("Seller-side research cancelled; nothing staged");
                return ServiceResponse::failed("Seller-side research cancelled before completion");
            }
        }

        if let Err(e) = self.staging.stage_sell_side(&scripts) {
            warn!(error = %e, "Failed to stage seller-side scripts");
            return ServiceResponse::failed(format!("Failed to stage seller-side scripts: {}", e));
        }

        let count = |category: ScriptCategory| scripts.iter().filter(|s| s.category == category).count();
        let summary = SellSideSummary {
            questions: questions.len(),
            self_intro: count(ScriptCategory::SelfIntro),
            value_prop: count(ScriptCategory::ValueProp),
            case_study: count(ScriptCategory::CaseStudy),
        };
        info!(?summary, "Seller-side research staged");

        ServiceResponse::ok("Successfully got seller-side results", summary)
    }
}

/// Campaign-wide inputs shared by every question
struct ScriptContext<'a> {
    replacements: HashMap<&'static str, String>,
    industries: Vec<String>,
    functions: Vec<String>,
    personas: Vec<String>,
    case_studies: &'a [Row],
}

impl<'a> ScriptContext<'a> {
    fn new(details: &CampaignDetails, workbook: &'a SourceWorkbook) -> Self {
        let industries = dedup(&details.industries);
        let replacements = HashMap::from([
            ("company_name", details.company_name.clone()),
            ("industries", industries.join(",")),
            ("product_category", details.product_category.clone()),
        ]);

        Self {
            replacements,
            industries,
            functions: dedup(&details.functions),
            personas: workbook.persona_names(),
            case_studies: &workbook.case_studies,
        }
    }

    async fn answer(
        &self,
        service: &ResearchService,
        question: &SellSideQuestion,
        product_id: Option<i64>,
    ) -> SellSideScript {
        let queries = self.queries(question);
        let answers = join_all(queries.into_iter().map(|query| ask(service, query))).await;

        let mut script = SellSideScript {
            category: question.kind.script_category(),
            topic_id: question.topic_id.clone(),
            product_id,
            industries: Vec::new(),
            functions: Vec::new(),
        };
        match question.kind.script_category() {
            ScriptCategory::CaseStudy => script.functions = answers,
            _ => script.industries = answers,
        }
        script
    }

    /// Knowledge-base queries for one question, capped at five
    fn queries(&self, question: &SellSideQuestion) -> Vec<String> {
        let base = |extra: Option<(&'static str, &str)>| {
            let mut values = self.replacements.clone();
            if let Some((key, value)) = extra {
                values.insert(key, value.to_string());
            }
            fill_placeholders(&question.detail, &values)
        };

        let queries: Vec<String> = match question.kind {
            QuestionKind::SelfIntroduction => vec![base(None)],
            QuestionKind::ValuePropIndustry => self
                .industries
                .iter()
                .map(|industry| {
                    let context = match self.case_study_for("industry", industry) {
                        Some(study) => format!("This is based on the case study: \"{}\"", study),
                        None => "No specific case study available for this industry.".to_string(),
                    };
                    format!("{}.\n\n{}", base(Some(("industry_type", industry))), context)
                })
                .collect(),
            QuestionKind::ValuePropPersona => self
                .personas
                .iter()
                .map(|persona| format!("For {}: {}", persona, base(None)))
                .collect(),
            QuestionKind::CaseStudyIndustry => self
                .industries
                .iter()
                .map(|industry| {
                    let context = match self.case_study_for("industry", industry) {
                        Some(study) => format!(
                            "This case study is relevant to the {} industry: \"{}\"",
                            industry, study
                        ),
                        None => format!(
                            "No specific case study available for the {} industry.",
                            industry
                        ),
                    };
                    format!("{}.\n\n{}", base(Some(("industry_type", industry))), context)
                })
                .collect(),
            QuestionKind::CaseStudyFunction => self
                .functions
                .iter()
                .map(|function| {
                    let context = match self.case_study_for("function", function) {
                        Some(study) => format!(
                            "This case study is relevant to the {} function: \"{}\"",
                            function, study
                        ),
                        None => format!(
                            "No specific case study available for the {} function.",
                            function
                        ),
                    };
                    format!("{}.\n\n{}", base(None), context)
                })
                .collect(),
        };

        queries.into_iter().take(MAX_COLUMNS).collect()
    }

    /// First case study whose `column` lists `target` (comma separated, case-insensitive)
    fn case_study_for(&self, column: &str, target: &str) -> Option<String> {
        let target = target.trim().to_lowercase();
        self.case_studies
            .iter()
            .find(|row| {
                row_string(row, column)
                    .split(',')
                    .any(|entry| entry.trim().to_lowercase() == target)
            })
            .map(|row| row_string(row, "value"))
            .filter(|study| !study.is_empty())
    }
}

async fn ask(service: &ResearchService, query: String) -> String {
    match service.rag(query).await {
        Ok(answer) => answer.trim().to_string(),
        Err(e) => {
            warn!(error = %e, "Sell-side knowledge base query failed");
            String::new()
        }
    }
}

fn dedup(values: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for value in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if !seen.iter().any(|s: &String| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}
