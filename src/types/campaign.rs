//! Campaign-level records: settings, users, topics and seller-side scripts.

use serde::{Deserialize, Serialize};

use super::utils::{Row, row_i64, row_opt_string, row_string};

/// Campaign settings parsed from the `settings` rows.
///
/// Each settings row is a `{setting, value}` pair. Keys are matched by
/// substring so exports with prefixed names still resolve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignDetails {
    pub campaign_name: String,
    pub company_name: String,
    pub company_website: String,
    pub product_id: Option<i64>,
    pub product_name: String,
    pub product_category: String,
    pub subcategories: Vec<String>,
    pub industries: Vec<String>,
    pub functions: Vec<String>,
}

impl CampaignDetails {
    pub fn from_settings(rows: &[Row]) -> Self {
        let mut details = Self::default();

        for row in rows {
            let key = row_string(row, "setting");
            let Some(value) = row_opt_string(row, "value") else {
                continue;
            };

            if key.contains("campaign_name") {
                details.campaign_name = value;
            } else if key.contains("website") {
                details.company_website = value;
            } else if key.contains("company") {
                details.company_name = value;
            } else if key.contains("product_id") {
                details.product_id = value.parse().ok();
            } else if key.contains("product_name") {
                details.product_name = value;
            } else if key.contains("product_category") {
                details.product_category = value;
            } else if key.contains("sub_category") {
                details.subcategories.push(value);
            } else if key.starts_with("industry_") {
                details.industries.push(value);
            } else if key.starts_with("function_") {
                details.functions.push(value);
            }
        }

        details
    }
}

/// Campaign record, keyed by unique `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub name: String,
    pub company_name: String,
    pub company_site: String,
    pub product_id: Option<i64>,
    pub product_name: String,
    pub product_category: String,
    pub vertical_1: Option<String>,
    pub vertical_2: Option<String>,
    pub vertical_3: Option<String>,
    pub active: bool,
}

impl From<&CampaignDetails> for Campaign {
    fn from(details: &CampaignDetails) -> Self {
        let vertical = |i: usize| details.industries.get(i).cloned();
        Self {
            name: details.campaign_name.clone(),
            company_name: details.company_name.clone(),
            company_site: details.company_website.clone(),
            product_id: details.product_id,
            product_name: details.product_name.clone(),
            product_category: details.product_category.clone(),
            vertical_1: vertical(0),
            vertical_2: vertical(1),
            vertical_3: vertical(2),
            active: true,
        }
    }
}

/// Application user, keyed by unique `email`. Existing users are never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub password_hint: Option<String>,
    pub role_id: Option<i64>,
}

impl User {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            email: row_opt_string(row, "user_email")?,
            password_hint: row_opt_string(row, "password_hint"),
            role_id: row_i64(row, "role_id"),
        })
    }
}

/// Membership of a user in a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignUser {
    pub user_email: String,
    pub campaign_name: String,
    pub user_queue_id: Option<String>,
}

impl CampaignUser {
    pub fn from_row(row: &Row, campaign_name: &str) -> Option<Self> {
        Some(Self {
            user_email: row_opt_string(row, "user_email")?,
            campaign_name: campaign_name.to_string(),
            user_queue_id: row_opt_string(row, "user_queueID"),
        })
    }
}

/// A research question template, keyed by `topic_identifier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    pub category: String,
    /// Question template with `{placeholder}` fields
    pub detail: String,
    pub topic_identifier: String,
}

impl Topic {
    pub fn new(campaign_name: &str, title: &str, category: &str, detail: &str) -> Self {
        Self {
            title: title.to_string(),
            category: category.to_string(),
            detail: detail.to_string(),
            topic_identifier: Self::identifier(campaign_name, title),
        }
    }

    pub fn from_row(row: &Row, campaign_name: &str) -> Self {
        Self::new(
            campaign_name,
            &row_string(row, "title"),
            &row_string(row, "category"),
            &row_string(row, "detail"),
        )
    }

    /// `{campaign}_{title}`
    pub fn identifier(campaign_name: &str, title: &str) -> String {
        format!("{}_{}", campaign_name, title)
    }
}

/// Seller-side script category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptCategory {
    SelfIntro,
    ValueProp,
    CaseStudy,
}

impl ScriptCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfIntro => "self_intro",
            Self::ValueProp => "value_prop",
            Self::CaseStudy => "case_study",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "self_intro" => Some(Self::SelfIntro),
            "value_prop" => Some(Self::ValueProp),
            "case_study" => Some(Self::CaseStudy),
            _ => None,
        }
    }
}

/// Seller-side talking points: up to five answers per industry or function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellSideScript {
    pub category: ScriptCategory,
    pub topic_id: String,
    pub product_id: Option<i64>,
    pub industries: Vec<String>,
    pub functions: Vec<String>,
}
