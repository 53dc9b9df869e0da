//! Prospect (buyer) records and research outputs.

use serde::{Deserialize, Serialize};

use super::utils::{Row, row_opt_string, row_string};

/// One buyer/lead researched during a campaign.
///
/// `buyer_identifier` is derived from campaign name, row ordinal and
/// name, so re-importing the same row yields the same key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    pub buyer_identifier: String,
    pub campaign_name: String,
    /// Row ordinal from the buy-side list
    pub s_no: String,
    pub f_name: String,
    pub l_name: String,
    pub company: String,
    pub title: String,
    pub industry: String,
    pub function: String,
    pub website: String,
    pub linkedin: String,
    pub location: String,
    pub email: String,
    pub phone: String,
    pub case_study_id: Option<String>,
}

impl Prospect {
    pub fn from_row(row: &Row, campaign_name: &str) -> Self {
        let s_no = row_string(row, "id");
        let f_name = row_string(row, "f_name");
        let l_name = row_string(row, "l_name");

        Self {
            buyer_identifier: Self::derive_identifier(campaign_name, &s_no, &f_name, &l_name),
            campaign_name: campaign_name.to_string(),
            s_no,
            f_name,
            l_name,
            company: row_string(row, "company"),
            title: row_string(row, "title"),
            industry: row_string(row, "industry"),
            function: row_string(row, "function"),
            website: row_string(row, "website"),
            linkedin: row_string(row, "linkedin"),
            location: row_string(row, "location"),
            email: row_string(row, "email"),
            phone: row_string(row, "phone"),
            case_study_id: row_opt_string(row, "casestudy_no"),
        }
    }

    /// `campaign_name + id + f_name + l_name`, concatenated without separators.
    ///
    /// Distinct rows can collide: id `1` with first name `1Ada` and id `11`
    /// with first name `Ada` give the same key. Research keeps only the first
    /// row for a repeated key and logs the rest.
    pub fn derive_identifier(campaign_name: &str, id: &str, f_name: &str, l_name: &str) -> String {
        format!("{}{}{}{}", campaign_name, id, f_name, l_name)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.f_name, self.l_name).trim().to_string()
    }
}

/// Verified answer to one research topic for one prospect.
///
/// Keyed by `(buyer_id, topic_id)` in permanent storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchAnswer {
    pub buyer_id: String,
    pub product_id: Option<i64>,
    pub topic_id: String,
    pub description: String,
}

/// The five generated outreach texts for one prospect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailDraftSet {
    pub buyer_identifier: String,
    /// Problem-agitate-solve email
    pub email_pas: String,
    /// Attention-interest-desire-action email
    pub email_aida: String,
    /// Feature-advantage-benefit email
    pub email_fab: String,
    pub linkedin_1: String,
    pub linkedin_2: String,
}

impl EmailDraftSet {
    pub fn empty(buyer_identifier: impl Into<String>) -> Self {
        Self {
            buyer_identifier: buyer_identifier.into(),
            ..Self::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        [
            &self.email_pas,
            &self.email_aida,
            &self.email_fab,
            &self.linkedin_1,
            &self.linkedin_2,
        ]
        .iter()
        .all(|s| s.is_empty())
    }
}

/// Seller case study and value proposition matched to a prospect.
/// Feeds draft generation only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseStudyResult {
    pub case_study: String,
    pub value_prop: String,
}
