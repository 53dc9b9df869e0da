//! Topic buckets
//!
//! Buy-side topics are grouped by their 1-based position in the question
//! list. The bucket decides which draft consumes the answer and how recent
//! the answer has to be.

use crate::ai::Validity;
use crate::config::ResearchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    PersonalFacts,
    JobChallenges,
    CompanyNews,
    Priorities1,
    Priorities2,
    CompanyValues,
}

/// Bucket for a 1-based topic ordinal. Topics past the ninth feed no bucket.
pub fn bucket_for(ordinal: usize) -> Option<Bucket> {
    match ordinal {
        1..=3 => Some(Bucket::PersonalFacts),
        4 => Some(Bucket::JobChallenges),
        5 | 6 => Some(Bucket::CompanyNews),
        7 => Some(Bucket::Priorities1),
        8 => Some(Bucket::Priorities2),
        9 => Some(Bucket::CompanyValues),
        _ => None,
    }
}

/// Recency anchor for the verification query of a 1-based topic ordinal
pub fn validity_for(ordinal: usize, config: &ResearchConfig) -> Validity {
    match ordinal {
        0..=3 => Validity::Irrelevant,
        4 => Validity::parse(&config.job_challenges_anchor),
        _ => Validity::parse(&config.recent_anchor),
    }
}

/// Verified research text per bucket, with the sources that backed it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearchFindings {
    pub personal_facts: String,
    pub job_challenges: String,
    pub company_news: String,
    pub priorities_1: String,
    pub priorities_2: String,
    pub company_values: String,
    pub personal_facts_citations: Vec<String>,
    pub job_challenges_citations: Vec<String>,
    pub company_news_citations: Vec<String>,
    pub priorities_citations: Vec<String>,
    pub company_values_citations: Vec<String>,
}

impl ResearchFindings {
    /// Both priorities answers merged
    pub fn priorities(&self) -> String {
        join_sentences(&self.priorities_1, &self.priorities_2)
    }

    /// Sources for the problem-agitate-solve email
    pub fn pas_citations(&self) -> Vec<String> {
        concat(&self.personal_facts_citations, &self.job_challenges_citations)
    }

    /// Sources for the attention-interest-desire-action email
    pub fn aida_citations(&self) -> Vec<String> {
        concat(&self.priorities_citations, &self.company_news_citations)
    }

    /// Sources for the feature-advantage-benefit email
    pub fn fab_citations(&self) -> Vec<String> {
        concat(&self.priorities_citations, &self.company_values_citations)
    }
}

/// Folds verified topic answers into [`ResearchFindings`].
///
/// Answers must be added in topic order so the merged text is stable
/// regardless of which query finished first.
#[derive(Debug, Default)]
pub struct BucketAccumulator {
    findings: ResearchFindings,
}

impl BucketAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bucket: Bucket, text: &str, citations: &[String]) {
        let f = &mut self.findings;
        let (target, sources) = match bucket {
            Bucket::PersonalFacts => (&mut f.personal_facts, &mut f.personal_facts_citations),
            Bucket::JobChallenges => (&mut f.job_challenges, &mut f.job_challenges_citations),
            Bucket::CompanyNews => (&mut f.company_news, &mut f.company_news_citations),
            Bucket::Priorities1 => (&mut f.priorities_1, &mut f.priorities_citations),
            Bucket::Priorities2 => (&mut f.priorities_2, &mut f.priorities_citations),
            Bucket::CompanyValues => (&mut f.company_values, &mut f.company_values_citations),
        };
        *target = join_sentences(target, text);
        sources.extend(citations.iter().cloned());
    }

    pub fn finish(self) -> ResearchFindings {
        self.findings
    }
}

fn join_sentences(a: &str, b: &str) -> String {
    match (a.trim(), b.trim()) {
        ("", b) => b.to_string(),
        (a, "") => a.to_string(),
        (a, b) => format!("{} {}", a, b),
    }
}

fn concat(a: &[String], b: &[String]) -> Vec<String> {
    a.iter().chain(b).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_layout() {
        let buckets: Vec<_> = (1..=10).map(bucket_for).collect();
        assert_eq!(
            buckets,
            vec![
                Some(Bucket::PersonalFacts),
                Some(Bucket::PersonalFacts),
                Some(Bucket::PersonalFacts),
                Some(Bucket::JobChallenges),
                Some(Bucket::CompanyNews),
                Some(Bucket::CompanyNews),
                Some(Bucket::Priorities1),
                Some(Bucket::Priorities2),
                Some(Bucket::CompanyValues),
                None,
            ]
        );
    }

    #[test]
    fn test_validity_anchors() {
        let config = ResearchConfig::default();
        assert_eq!(validity_for(3, &config), Validity::Irrelevant);
        assert_eq!(
            validity_for(4, &config),
            Validity::Since("July 1, 2024".to_string())
        );
        assert_eq!(
            validity_for(9, &config),
            Validity::Since("January 1, 2024".to_string())
        );
    }

    #[test]
    fn test_accumulate_and_merge_priorities() {
        let mut acc = BucketAccumulator::new();
        acc.add(Bucket::PersonalFacts, "Runs marathons.", &["https://a".to_string()]);
        acc.add(Bucket::PersonalFacts, "Plays chess.", &[]);
        acc.add(Bucket::Priorities1, "Growth.", &["https://p1".to_string()]);
        acc.add(Bucket::Priorities2, "Margins.", &["https://p2".to_string()]);
        acc.add(Bucket::CompanyValues, "Integrity.", &["https://v".to_string()]);

        let findings = acc.finish();
        assert_eq!(findings.personal_facts, "Runs marathons. Plays chess.");
        assert_eq!(findings.priorities(), "Growth. Margins.");
        assert_eq!(findings.pas_citations(), vec!["https://a"]);
        assert_eq!(findings.fab_citations(), vec!["https://p1", "https://p2", "https://v"]);
        assert!(findings.aida_citations().iter().all(|c| c.starts_with("https://p")));
    }

    #[test]
    fn test_priorities_with_one_side_missing() {
        let findings = ResearchFindings {
            priorities_2: "Margins.".to_string(),
            ..Default::default()
        };
        assert_eq!(findings.priorities(), "Margins.");
    }
}
