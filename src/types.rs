//! Core data types for the LearnPal tutoring service
//!
//! Tenants own learners; learners accumulate progress against concepts; every
//! tutor turn is classified into a [`ReplyTier`]. Streak keys identify the
//! in-memory escalation slot for one learner on one concept.

use crate::error::{LearnPalError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Label of the single concept the correctness evaluator understands
pub const TARGET_CONCEPT_LABEL: &str = "addition within 10";

/// Concepts seeded into an empty store: (domain, label, grade)
pub const STARTER_CONCEPTS: &[(&str, &str, &str)] = &[
    ("math", TARGET_CONCEPT_LABEL, "K"),
    ("math", "counting by 5s", "K"),
    ("reading", "identify main idea", "6"),
];

/// Learners born in this year or later get the kindergarten persona
pub const KINDERGARTEN_BIRTH_YEAR_CUTOFF: i32 = 2018;

/// Identifies one streak-tracking slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreakKey {
    pub learner_id: i64,
    pub concept_id: i64,
}

impl StreakKey {
    pub fn new(learner_id: i64, concept_id: i64) -> Self {
        Self {
            learner_id,
            concept_id,
        }
    }
}

impl std::fmt::Display for StreakKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "learner:{}/concept:{}", self.learner_id, self.concept_id)
    }
}

/// Escalation level of a tutor reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyTier {
    /// Plain tutoring
    Normal,
    /// One hint, never the answer
    Hint,
    /// State the answer directly
    Answer,
}

impl ReplyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyTier::Normal => "normal",
            ReplyTier::Hint => "hint",
            ReplyTier::Answer => "answer",
        }
    }
}

impl std::fmt::Display for ReplyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing plan of a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Family,
    School,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Family => "family",
            Plan::School => "school",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "family" => Plan::Family,
            "school" => Plan::School,
            _ => Plan::Free,
        }
    }
}

/// A family or school account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub plan: Plan,
}

/// A child profile owned by a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Learner {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    /// Birth month as `YYYY-MM`
    pub dob: String,
    #[serde(default = "empty_persona")]
    pub persona_json: String,
}

fn empty_persona() -> String {
    "{}".to_string()
}

impl Learner {
    /// Year of birth, taken from the `YYYY` prefix of `dob`
    pub fn birth_year(&self) -> Option<i32> {
        parse_birth_month(&self.dob).ok().map(|d| d.year())
    }
}

/// Validated input for creating a learner
#[derive(Debug, Clone, Deserialize)]
pub struct NewLearner {
    pub name: String,
    pub dob: String,
}

impl NewLearner {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LearnPalError::InvalidInput(
                "learner name must not be empty".to_string(),
            ));
        }
        parse_birth_month(&self.dob)?;
        Ok(())
    }
}

/// Parse a `YYYY-MM` birth month
pub fn parse_birth_month(dob: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", dob.trim()), "%Y-%m-%d").map_err(|_| {
        LearnPalError::InvalidInput(format!("dob must be formatted YYYY-MM, got {:?}", dob))
    })
}

/// A skill unit progress is tracked against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: i64,
    pub domain: String,
    pub label: String,
    pub grade: String,
}

/// Per (learner, concept) accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub learner_id: i64,
    pub concept_id: i64,
    pub correct: u64,
    pub attempts: u64,
}

/// One row of a learner's progress report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub correct: u64,
    pub attempts: u64,
}

/// Explicit thumbs-up / thumbs-down on a tutor reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub learner_id: i64,
    pub latency_ms: u64,
    pub rating: i8,
    pub created: DateTime<Utc>,
}

/// Input for recording feedback
#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub learner_id: i64,
    pub latency_ms: i64,
    pub rating: i64,
}

impl NewFeedback {
    /// Returns the validated `(latency_ms, rating)` pair
    pub fn validate(&self) -> Result<(u64, i8)> {
        if self.rating != 1 && self.rating != -1 {
            return Err(LearnPalError::InvalidInput(
                "rating must be +1 or -1".to_string(),
            ));
        }
        let latency = u64::try_from(self.latency_ms).map_err(|_| {
            LearnPalError::InvalidInput("latency_ms must be non-negative".to_string())
        })?;
        Ok((latency, self.rating as i8))
    }
}
