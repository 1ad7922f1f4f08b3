//! Storage layer for LearnPal
//!
//! Provides the persistence seam for tenants, learners, concepts, progress
//! accumulators and reply feedback.

pub mod schema;
pub mod sqlite;

use crate::error::Result;
use crate::types::{
    Concept, Feedback, Learner, NewFeedback, NewLearner, Plan, Progress, ProgressSummary, Tenant,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Storage backend trait defining all required operations
#[async_trait]
pub trait TutorStore: Send + Sync {
    /// Create a tenant
    async fn create_tenant(&self, name: &str, plan: Plan) -> Result<Tenant>;

    /// Retrieve a tenant by ID
    async fn get_tenant(&self, id: i64) -> Result<Option<Tenant>>;

    /// Create a learner under a tenant (input is validated first)
    async fn create_learner(&self, tenant_id: i64, learner: &NewLearner) -> Result<Learner>;

    /// Retrieve a learner by ID
    async fn get_learner(&self, id: i64) -> Result<Option<Learner>>;

    /// All learners of one tenant, oldest first
    async fn list_learners(&self, tenant_id: i64) -> Result<Vec<Learner>>;

    /// Retrieve a concept by ID
    async fn get_concept(&self, id: i64) -> Result<Option<Concept>>;

    /// Look up a concept by its label
    async fn concept_by_label(&self, label: &str) -> Result<Option<Concept>>;

    /// Return the concept with `label`, inserting it if absent
    async fn ensure_concept(&self, domain: &str, label: &str, grade: &str) -> Result<Concept>;

    /// Insert the starter concepts into an empty concept table
    ///
    /// Returns how many concepts were inserted (0 if any already existed).
    async fn seed_concepts(&self) -> Result<usize>;

    /// All concepts
    async fn list_concepts(&self) -> Result<Vec<Concept>>;

    /// Count one attempt, creating the accumulator on first use
    ///
    /// Increments `attempts` always and `correct` only when `correct` is true,
    /// as one atomic write. Returns the updated accumulator.
    async fn record_attempt(&self, learner_id: i64, concept_id: i64, correct: bool)
        -> Result<Progress>;

    /// Current accumulator for a (learner, concept) pair
    async fn get_progress(&self, learner_id: i64, concept_id: i64) -> Result<Option<Progress>>;

    /// Concept label to counters, for every concept the learner has attempted
    async fn progress_report(&self, learner_id: i64) -> Result<BTreeMap<String, ProgressSummary>>;

    /// Store feedback on a tutor reply (input is validated first)
    async fn record_feedback(&self, feedback: &NewFeedback) -> Result<Feedback>;
}
