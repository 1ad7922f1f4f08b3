//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use learnpal_core::services::{CollaboratorFailure, GeneratedReply, GenerationRequest};
use learnpal_core::{
    HintTierController, Learner, NewLearner, Plan, SqliteStore, TextGenerator, Tutor, TutorStore,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a SQLite store in a fresh temporary directory
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub async fn create_test_store() -> (Arc<SqliteStore>, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = SqliteStore::open(dir.path().join("learnpal_test.db"))
        .await
        .expect("Failed to create test store");
    (Arc::new(store), dir)
}

/// Create a tenant with one learner born in `dob` (`YYYY-MM`)
pub async fn create_test_learner(store: &SqliteStore, dob: &str) -> Learner {
    let tenant = store
        .create_tenant("Test Family", Plan::Family)
        .await
        .expect("Failed to create tenant");
    store
        .create_learner(
            tenant.id,
            &NewLearner {
                name: "Test Kid".to_string(),
                dob: dob.to_string(),
            },
        )
        .await
        .expect("Failed to create learner")
}

/// Text generator that always answers with the same text and records requests
pub struct FixedReply {
    text: String,
    latency_ms: u64,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FixedReply {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            latency_ms: 25,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FixedReply {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GeneratedReply, CollaboratorFailure> {
        self.requests.lock().unwrap().push(request);
        Ok(GeneratedReply {
            text: self.text.clone(),
            latency_ms: self.latency_ms,
        })
    }
}

/// Text generator that always fails the same way
pub struct FailingGenerator(pub CollaboratorFailure);

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GeneratedReply, CollaboratorFailure> {
        Err(self.0.clone())
    }
}

/// Build a tutor over `store` with the given streak capacity and generator
pub fn create_test_tutor(
    store: Arc<SqliteStore>,
    max_streak_entries: usize,
    generator: Arc<dyn TextGenerator>,
) -> Tutor {
    Tutor::new(
        store,
        Arc::new(HintTierController::new(max_streak_entries)),
        generator,
    )
}
