//! Research and Drafting Prompts
//!
//! Templates for every provider call made while researching a prospect:
//! knowledge-base lookups, title verification, topic web queries and the
//! five outreach drafts. Draft templates degrade when research came back
//! empty so a prospect with no findings still gets sensible prose.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use super::topics::ResearchFindings;
use crate::ai::ChatMessage;
use crate::constants::research::REFERENCES_HEADER;
use crate::types::{CampaignDetails, CaseStudyResult, Prospect};

const TITLE_SYSTEM_PROMPT: &str = "You are an artificial intelligence web-search assistant. \
Your role is to search the web to verify the job title of the person provided.";

const WEB_QUERY_SYSTEM_PROMPT: &str = "You are an artificial intelligence research assistant \
to sales executives. Your role is to search information from websites and summarize all \
answers in one sentence of less than 100 words. Return {NOT FOUND} if no results.";

fn re_placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"))
}

fn re_recency() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(recently|recent)\b").expect("recency pattern is valid"))
}

fn re_nothing_found() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)nothing found").expect("nothing-found pattern is valid"))
}

// =============================================================================
// Placeholders
// =============================================================================

/// Replace every `{key}` with its value. Unknown keys are left intact.
pub fn fill_placeholders(template: &str, values: &HashMap<&str, String>) -> String {
    re_placeholder()
        .replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Values available to buy-side topic templates
pub fn topic_values(campaign: &CampaignDetails, prospect: &Prospect) -> HashMap<&'static str, String> {
    HashMap::from([
        ("product_category", campaign.product_category.clone()),
        ("company_name", campaign.company_name.clone()),
        ("buyer_function", prospect.function.clone()),
        ("buyer_industry", prospect.industry.clone()),
        ("buyer_website", prospect.website.clone()),
        ("buyer_company", prospect.company.clone()),
        ("buyer_title", prospect.title.clone()),
        ("f_name", prospect.f_name.clone()),
        ("l_name", prospect.l_name.clone()),
    ])
}

// =============================================================================
// Knowledge Base & Web Queries
// =============================================================================

pub fn case_study_prompt(seller: &str, prospect: &Prospect) -> String {
    format!(
        "Summarize in 2 sentences a customer success case study when {seller} helped a customer \
         who is the {title} in the {industry} industry. Include any quantifiable customer impact \
         in your response. If you do not find a case study from the same industry, simply say \
         nothing found",
        seller = seller,
        title = prospect.title,
        industry = prospect.industry,
    )
}

pub fn value_prop_prompt(seller: &str, prospect: &Prospect) -> String {
    format!(
        "What products or services can {seller} offer to a customer who is the {title} in the \
         {industry} industry? Summarize your answer in 2 sentences and name relevant products \
         and services offered by {seller}",
        seller = seller,
        title = prospect.title,
        industry = prospect.industry,
    )
}

pub fn title_verification_messages(prospect: &Prospect) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(TITLE_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Conduct a web query to respond in True or False. Is {}, {} with LinkedIn profile {} \
             having a job title {} at {} company? Answer in one word only: true or false, and do \
             not provide any details.",
            prospect.f_name, prospect.l_name, prospect.linkedin, prospect.title, prospect.company
        )),
    ]
}

pub fn web_query_messages(query: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(WEB_QUERY_SYSTEM_PROMPT),
        ChatMessage::user(query),
    ]
}

/// Knowledge-base answers that admit finding nothing carry no information.
pub fn usable_knowledge(text: String) -> String {
    if re_nothing_found().is_match(&text) {
        String::new()
    } else {
        text.trim().to_string()
    }
}

// =============================================================================
// Drafts
// =============================================================================

/// Everything a draft template can draw on
pub struct DraftContext<'a> {
    pub seller: &'a str,
    pub sender_role: &'a str,
    pub prospect: &'a Prospect,
    pub title_verified: bool,
    pub knowledge: &'a CaseStudyResult,
    pub findings: &'a ResearchFindings,
}

impl DraftContext<'_> {
    fn recipient(&self) -> String {
        let name = self.prospect.full_name();
        if self.title_verified {
            format!("{}, the {} of {}", name, self.prospect.title, self.prospect.company)
        } else {
            name
        }
    }

    fn case_study_line(&self) -> String {
        if self.knowledge.case_study.is_empty() {
            format!(
                "describe in general terms how {} helps companies in the {} industry",
                self.seller, self.prospect.industry
            )
        } else {
            format!(
                "describe how {} has helped similar customers, using this case study: {}",
                self.seller, self.knowledge.case_study
            )
        }
    }
}

/// Problem-agitate-solve email
pub fn pas_prompt(ctx: &DraftContext<'_>) -> String {
    let greeting = if !ctx.title_verified {
        "Create a short, friendly greeting.".to_string()
    } else if ctx.findings.personal_facts.is_empty() {
        format!(
            "Create a personalized greeting by praising the customer for their role as {} of {}.",
            ctx.prospect.title, ctx.prospect.company
        )
    } else {
        format!(
            "Create a personalized greeting using the following customer information: {}",
            ctx.findings.personal_facts
        )
    };

    let problem = if ctx.findings.job_challenges.is_empty() {
        format!(
            "Name a common challenge that leaders in the {} industry face today.",
            ctx.prospect.industry
        )
    } else {
        format!(
            "Name this challenge the customer is likely facing: {}",
            ctx.findings.job_challenges
        )
    };

    format!(
        "Generate an email of 200 words or less from the Sender to a customer. The Sender is the \
         {role} of {seller}, and the customer is {recipient}.\n\
         The email format should strictly follow these steps:\n\
         1. {greeting}\n\
         2. {problem}\n\
         3. Explain what is at stake for {company} if the challenge is left unsolved.\n\
         4. In one or two sentences, {case_study}.\n\
         5. Conclude the email by inviting the customer to a call next Tuesday or Friday.",
        role = ctx.sender_role,
        seller = ctx.seller,
        recipient = ctx.recipient(),
        greeting = greeting,
        problem = problem,
        company = ctx.prospect.company,
        case_study = ctx.case_study_line(),
    )
}

/// Attention-interest-desire-action email
pub fn aida_prompt(ctx: &DraftContext<'_>) -> String {
    let priorities = ctx.findings.priorities();
    let attention = if !ctx.findings.company_news.is_empty() {
        format!(
            "If relevant, mention customer company news: {}.",
            ctx.findings.company_news
        )
    } else if !priorities.is_empty() {
        format!(
            "Highlight a business priority or core value of {} using this context: {}.",
            ctx.prospect.company, priorities
        )
    } else {
        format!(
            "Mention a trend shaping the {} industry this year.",
            ctx.prospect.industry
        )
    };

    let value = if ctx.knowledge.value_prop.is_empty() {
        format!(
            "Summarize how {} helps companies in the {} industry.",
            ctx.seller, ctx.prospect.industry
        )
    } else {
        format!(
            "Summarize how {} helps similar customers using this information: {}.",
            ctx.seller, ctx.knowledge.value_prop
        )
    };

    format!(
        "Generate an email of 200 words or less from the {role} of {seller} to the customer \
         {recipient}.\n\
         The email should follow these steps:\n\
         1. Create a personalized greeting reminding the customer you are following up on an \
         earlier email.\n\
         2. {attention}\n\
         3. {value}\n\
         4. Conclude by inviting the customer to a call next Tuesday or Thursday.",
        role = ctx.sender_role,
        seller = ctx.seller,
        recipient = ctx.recipient(),
        attention = attention,
        value = value,
    )
}

/// Feature-advantage-benefit email
pub fn fab_prompt(ctx: &DraftContext<'_>) -> String {
    let priorities = ctx.findings.priorities();
    let mut steps = Vec::new();

    if ctx.findings.company_values.is_empty() {
        steps.push(
            "Create a personalized greeting and mention that you are following up to your \
             earlier email"
                .to_string(),
        );
    } else {
        steps.push(format!(
            "Create a personalized greeting using this context: {}",
            ctx.findings.company_values
        ));
        steps.push("Mention that you are following up to your earlier email".to_string());
    }

    if !priorities.is_empty() {
        steps.push(format!(
            "In one sentence highlight a business priority or core value of {} using this \
             context: {}",
            ctx.prospect.company, priorities
        ));
    }
    steps.push(format!("In one sentence, {}", ctx.case_study_line()));
    steps.push("Conclude by inviting the customer to a call next Wednesday or Friday".to_string());

    let numbered = steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("Step {}: {}", i + 1, step))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Generate an email of 200 words or less, from the Sender to a customer. The Sender is \
         the {role} at {seller} and the customer is {recipient}.\n\
         The email format should strictly follow the following instructions:\n{steps}",
        role = ctx.sender_role,
        seller = ctx.seller,
        recipient = ctx.recipient(),
        steps = numbered,
    )
}

/// Connection request built around one company priority
pub fn linkedin_prompt(ctx: &DraftContext<'_>, priority: &str) -> String {
    let hook = if priority.is_empty() {
        format!(
            "say that you follow the work of leaders in the {} industry",
            ctx.prospect.industry
        )
    } else {
        format!("say that you got familiar with their inspiring work related to {}", priority)
    };

    format!(
        "Generate a LinkedIn connect message strictly less than 250 characters to customer {}. \
         The message should strictly follow the following instructions. \
         Step 1: {}. \
         Step 2: say that as the {} of {} you would like to connect and share insights.",
        ctx.prospect.f_name, hook, ctx.sender_role, ctx.seller
    )
}

/// Drop "recent"/"recently" from generated prose.
pub fn strip_recency(text: &str) -> String {
    re_recency().replace_all(text, "").into_owned()
}

/// Append a references block, but only to non-empty drafts.
pub fn with_references(draft: String, citations: &[String]) -> String {
    if draft.is_empty() || citations.is_empty() {
        return draft;
    }

    let mut unique: Vec<&str> = Vec::with_capacity(citations.len());
    for url in citations {
        if !unique.contains(&url.as_str()) {
            unique.push(url);
        }
    }

    format!("{}{}{}", draft, REFERENCES_HEADER, unique.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn prospect() -> Prospect {
        Prospect {
            buyer_identifier: "Q31GraceHopper".to_string(),
            campaign_name: "Q3".to_string(),
            s_no: "1".to_string(),
            f_name: "Grace".to_string(),
            l_name: "Hopper".to_string(),
            company: "Acme".to_string(),
            title: "CTO".to_string(),
            industry: "Retail".to_string(),
            function: "Engineering".to_string(),
            website: "acme.example".to_string(),
            linkedin: "https://linkedin.example/grace".to_string(),
            location: String::new(),
            email: String::new(),
            phone: String::new(),
            case_study_id: None,
        }
    }

    fn ctx<'a>(
        prospect: &'a Prospect,
        knowledge: &'a CaseStudyResult,
        findings: &'a ResearchFindings,
        title_verified: bool,
    ) -> DraftContext<'a> {
        DraftContext {
            seller: "Nimbus",
            sender_role: "Co-founder",
            prospect,
            title_verified,
            knowledge,
            findings,
        }
    }

    #[test]
    fn test_fill_known_and_unknown_placeholders() {
        let campaign = CampaignDetails {
            company_name: "Nimbus".to_string(),
            product_category: "AI agents".to_string(),
            ..Default::default()
        };
        let values = topic_values(&campaign, &prospect());

        let filled = fill_placeholders(
            "How does {buyer_company} ({buyer_industry}) use {product_category}? Ask {f_name} {l_name} about {mystery}.",
            &values,
        );
        assert_eq!(
            filled,
            "How does Acme (Retail) use AI agents? Ask Grace Hopper about {mystery}."
        );
    }

    #[test]
    fn test_fill_repeated_placeholder() {
        let values = HashMap::from([("f_name", "Ada".to_string())]);
        assert_eq!(fill_placeholders("{f_name}, {f_name}!", &values), "Ada, Ada!");
    }

    #[test]
    fn test_strip_recency() {
        assert_eq!(
            strip_recency("They Recently opened a store and a recent launch"),
            "They  opened a store and a  launch"
        );
        assert_eq!(strip_recency("decency"), "decency");
    }

    #[test]
    fn test_references_only_on_non_empty_drafts() {
        let urls = vec!["https://a.example".to_string(), "https://a.example".to_string()];
        assert_eq!(with_references(String::new(), &urls), "");
        assert_eq!(with_references("Hi".to_string(), &[]), "Hi");
        assert_eq!(
            with_references("Hi".to_string(), &urls),
            "Hi\n\nResearch References:\nhttps://a.example"
        );
    }

    #[test]
    fn test_usable_knowledge() {
        assert_eq!(usable_knowledge("Nothing found.".to_string()), "");
        assert_eq!(usable_knowledge(" Cut costs 20%. ".to_string()), "Cut costs 20%.");
    }

    #[test]
    fn test_pas_greeting_degrades() {
        let p = prospect();
        let knowledge = CaseStudyResult::default();
        let mut findings = ResearchFindings::default();

        let unverified = pas_prompt(&ctx(&p, &knowledge, &findings, false));
        assert!(unverified.contains("Create a short, friendly greeting."));
        assert!(unverified.contains("the customer is Grace Hopper."));

        let praise = pas_prompt(&ctx(&p, &knowledge, &findings, true));
        assert!(praise.contains("praising the customer for their role as CTO of Acme"));
        assert!(praise.contains("in general terms how Nimbus helps"));

        findings.personal_facts = "Grace ran a marathon.".to_string();
        let personal = pas_prompt(&ctx(&p, &knowledge, &findings, true));
        assert!(personal.contains("customer information: Grace ran a marathon."));
        assert!(personal.contains("Grace Hopper, the CTO of Acme"));
    }

    #[test]
    fn test_aida_prefers_news_then_priorities() {
        let p = prospect();
        let knowledge = CaseStudyResult::default();
        let mut findings = ResearchFindings {
            priorities_1: "Expanding online.".to_string(),
            ..Default::default()
        };

        assert!(aida_prompt(&ctx(&p, &knowledge, &findings, true))
            .contains("using this context: Expanding online."));

        findings.company_news = "Acme opened 10 stores.".to_string();
        let prompt = aida_prompt(&ctx(&p, &knowledge, &findings, true));
        assert!(prompt.contains("company news: Acme opened 10 stores."));
        assert!(!prompt.contains("Expanding online."));
    }

    #[test]
    fn test_fab_without_values() {
        let p = prospect();
        let knowledge = CaseStudyResult {
            case_study: "Saved Beta 30%.".to_string(),
            value_prop: String::new(),
        };
        let findings = ResearchFindings::default();

        let prompt = fab_prompt(&ctx(&p, &knowledge, &findings, true));
        assert!(prompt.contains("Step 1: Create a personalized greeting and mention"));
        assert!(prompt.contains("Step 2: In one sentence, describe how Nimbus has helped"));
        assert!(prompt.contains("Step 3: Conclude"));
    }

    #[test]
    fn test_linkedin_generic_hook() {
        let p = prospect();
        let knowledge = CaseStudyResult::default();
        let findings = ResearchFindings::default();
        let c = ctx(&p, &knowledge, &findings, true);

        assert!(linkedin_prompt(&c, "").contains("leaders in the Retail industry"));
        assert!(linkedin_prompt(&c, "green logistics").contains("related to green logistics"));
    }

    proptest! {
        #[test]
        fn templates_without_placeholders_are_untouched(text in "[^{}]{0,64}") {
            let values = HashMap::from([("f_name", "Ada".to_string())]);
            prop_assert_eq!(fill_placeholders(&text, &values), text);
        }

        #[test]
        fn unknown_placeholders_survive(key in "[a-z_]{1,12}") {
            prop_assume!(key != "f_name");
            let values = HashMap::from([("f_name", "Ada".to_string())]);
            let template = format!("{{{}}}", key);
            prop_assert_eq!(fill_placeholders(&template, &values), template);
        }
    }
}
