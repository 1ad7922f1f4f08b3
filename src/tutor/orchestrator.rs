//! Per-turn tutoring flow
//!
//! evaluate utterance → count the attempt → advance the streak → pick the
//! persona/tier instructions → ask the text generator → reply.

use super::evaluator::is_correct;
use super::prompts::{system_instructions, Persona};
use super::streak::HintTierController;
use crate::error::{LearnPalError, Result};
use crate::services::{CollaboratorFailure, GenerationRequest, TextGenerator};
use crate::storage::TutorStore;
use crate::types::{Progress, ReplyTier, StreakKey, TARGET_CONCEPT_LABEL};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reply used when no text generator is configured
pub const NOT_CONFIGURED_REPLY: &str = "OK, let's keep going!";

/// Reply used when the text generator fails or times out
pub const APOLOGY_REPLY: &str = "I'm having trouble responding right now.";

/// Result of evaluating one utterance against the core state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    pub tier: ReplyTier,
    pub correct: bool,
    pub updated_attempts: u64,
    pub updated_correct: u64,
}

/// Full tutor reply for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TutorReply {
    pub tier: ReplyTier,
    pub correct: bool,
    pub content: String,
    pub latency_ms: u64,
    pub progress: Progress,
}

/// Adaptive tutor
///
/// Owns nothing process-global: the streak controller is injected so one
/// instance can be shared by every request in the process.
pub struct Tutor {
    store: Arc<dyn TutorStore>,
    controller: Arc<HintTierController>,
    generator: Arc<dyn TextGenerator>,
}

impl Tutor {
    pub fn new(
        store: Arc<dyn TutorStore>,
        controller: Arc<HintTierController>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            store,
            controller,
            generator,
        }
    }

    pub fn store(&self) -> &Arc<dyn TutorStore> {
        &self.store
    }

    pub fn controller(&self) -> &Arc<HintTierController> {
        &self.controller
    }

    /// Evaluate an utterance, count it, and advance the streak
    ///
    /// Fails with [`LearnPalError::LearnerNotFound`] or
    /// [`LearnPalError::ConceptNotFound`] before touching any state if either
    /// side of the key does not exist.
    pub async fn evaluate_and_advance(
        &self,
        learner_id: i64,
        concept_id: i64,
        utterance: &str,
    ) -> Result<TurnOutcome> {
        if self.store.get_learner(learner_id).await?.is_none() {
            return Err(LearnPalError::LearnerNotFound(learner_id));
        }
        if self.store.get_concept(concept_id).await?.is_none() {
            return Err(LearnPalError::ConceptNotFound(format!("id {}", concept_id)));
        }
        self.advance_turn(learner_id, concept_id, utterance).await
    }

    /// Run one complete tutoring turn for the target concept
    pub async fn reply(&self, learner_id: i64, utterance: &str) -> Result<TutorReply> {
        let learner = self
            .store
            .get_learner(learner_id)
            .await?
            .ok_or(LearnPalError::LearnerNotFound(learner_id))?;

        let concept = self
            .store
            .ensure_concept("math", TARGET_CONCEPT_LABEL, "K")
            .await?;

        // Progress is written before the generator call, so a request
        // cancelled while waiting on it has already counted the attempt.
        let outcome = self.advance_turn(learner.id, concept.id, utterance).await?;

        let persona = Persona::for_learner(&learner);
        let request = GenerationRequest {
            system_instructions: system_instructions(persona, outcome.tier),
            user_text: utterance.to_string(),
        };

        let (content, latency_ms) = match self.generator.generate(request).await {
            Ok(reply) => (reply.text, reply.latency_ms),
            Err(CollaboratorFailure::NotConfigured) => {
                debug!("Text generator not configured, using fallback reply");
                (NOT_CONFIGURED_REPLY.to_string(), 0)
            }
            Err(failure) => {
                warn!("Tutor reply degraded for learner {}: {}", learner.id, failure);
                (APOLOGY_REPLY.to_string(), 0)
            }
        };

        Ok(TutorReply {
            tier: outcome.tier,
            correct: outcome.correct,
            content,
            latency_ms,
            progress: Progress {
                learner_id: learner.id,
                concept_id: concept.id,
                correct: outcome.updated_correct,
                attempts: outcome.updated_attempts,
            },
        })
    }

    async fn advance_turn(
        &self,
        learner_id: i64,
        concept_id: i64,
        utterance: &str,
    ) -> Result<TurnOutcome> {
        let correct = is_correct(utterance);
        let progress = self
            .store
            .record_attempt(learner_id, concept_id, correct)
            .await?;

        // No await between the write above and the streak update. A request
        // dropped while `record_attempt` is pending may still commit the row on
        // the pool worker and skip the streak, so a streak is never applied
        // twice but can lag the stored attempts by one.
        let tier = self
            .controller
            .advance(StreakKey::new(learner_id, concept_id), correct);

        debug!(
            "Learner {} concept {}: correct={} tier={} ({}/{})",
            learner_id, concept_id, correct, tier, progress.correct, progress.attempts
        );

        Ok(TurnOutcome {
            tier,
            correct,
            updated_attempts: progress.attempts,
            updated_correct: progress.correct,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm::MockTextGenerator;
    use crate::services::GeneratedReply;
    use crate::storage::sqlite::SqliteStore;
    use crate::types::{NewLearner, Plan};
    use std::time::Duration;
    use tempfile::TempDir;

    async fn setup(generator: MockTextGenerator, dob: &str) -> (Tutor, i64, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("tutor.db")).await.unwrap();
        let tenant = store.create_tenant("T", Plan::Free).await.unwrap();
        let learner = store
            .create_learner(
                tenant.id,
                &NewLearner {
                    name: "Kid".to_string(),
                    dob: dob.to_string(),
                },
            )
            .await
            .unwrap();

        let tutor = Tutor::new(
            Arc::new(store),
            Arc::new(HintTierController::new(1000)),
            Arc::new(generator),
        );
        (tutor, learner.id, dir)
    }

    #[tokio::test]
    async fn test_reply_passes_tier_instructions() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .withf(|req| req.user_text == "12" && req.system_instructions.contains("kindergarten"))
            .times(3)
            .returning(|_| {
                Ok(GeneratedReply {
                    text: "Let's count together!".to_string(),
                    latency_ms: 42,
                })
            });

        let (tutor, learner_id, _dir) = setup(generator, "2019-03").await;

        let first = tutor.reply(learner_id, "12").await.unwrap();
        assert_eq!(first.tier, ReplyTier::Normal);
        assert_eq!(first.content, "Let's count together!");
        assert_eq!(first.latency_ms, 42);

        assert_eq!(tutor.reply(learner_id, "12").await.unwrap().tier, ReplyTier::Hint);
        let third = tutor.reply(learner_id, "12").await.unwrap();
        assert_eq!(third.tier, ReplyTier::Answer);
        assert_eq!(third.progress.attempts, 3);
        assert_eq!(third.progress.correct, 0);
    }

    #[tokio::test]
    async fn test_hint_tier_instructions_sent() {
        let mut generator = MockTextGenerator::new();
        let mut seq = mockall::Sequence::new();
        generator
            .expect_generate()
            .withf(|req| !req.system_instructions.contains("hint"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(CollaboratorFailure::NotConfigured));
        generator
            .expect_generate()
            .withf(|req| req.system_instructions.contains("DO NOT reveal the answer"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(CollaboratorFailure::NotConfigured));

        let (tutor, learner_id, _dir) = setup(generator, "2010-09").await;
        tutor.reply(learner_id, "nope").await.unwrap();
        let reply = tutor.reply(learner_id, "still nope").await.unwrap();
        assert_eq!(reply.tier, ReplyTier::Hint);
    }

    #[tokio::test]
    async fn test_not_configured_fallback() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(CollaboratorFailure::NotConfigured));

        let (tutor, learner_id, _dir) = setup(generator, "2018-01").await;
        let reply = tutor.reply(learner_id, "3 + 4").await.unwrap();
        assert_eq!(reply.content, NOT_CONFIGURED_REPLY);
        assert_eq!(reply.latency_ms, 0);
        assert!(reply.correct);
    }

    #[tokio::test]
    async fn test_failure_fallback_keeps_progress() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(CollaboratorFailure::Timeout(Duration::from_secs(10))));

        let (tutor, learner_id, _dir) = setup(generator, "2018-01").await;
        let reply = tutor.reply(learner_id, "5").await.unwrap();
        assert_eq!(reply.content, APOLOGY_REPLY);
        assert_eq!(reply.latency_ms, 0);
        assert_eq!(reply.progress.attempts, 1);
        assert_eq!(reply.progress.correct, 1);

        let stored = tutor
            .store()
            .get_progress(learner_id, reply.progress.concept_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, reply.progress);
    }

    #[tokio::test]
    async fn test_unknown_learner_short_circuits() {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();

        let (tutor, _learner_id, _dir) = setup(generator, "2018-01").await;
        let result = tutor.reply(9999, "12").await;
        assert!(matches!(result, Err(LearnPalError::LearnerNotFound(9999))));

        let result = tutor.evaluate_and_advance(9999, 1, "12").await;
        assert!(matches!(result, Err(LearnPalError::LearnerNotFound(9999))));
        assert_eq!(tutor.controller().tracked(), 0);
        assert!(tutor
            .store()
            .concept_by_label(TARGET_CONCEPT_LABEL)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_concept_short_circuits() {
        let mut generator = MockTextGenerator::new();
        generator.expect_generate().never();

        let (tutor, learner_id, _dir) = setup(generator, "2018-01").await;
        let result = tutor.evaluate_and_advance(learner_id, 9999, "12").await;
        assert!(matches!(result, Err(LearnPalError::ConceptNotFound(_))));
        assert_eq!(tutor.controller().tracked(), 0);
        assert!(tutor
            .store()
            .get_progress(learner_id, 9999)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_evaluate_and_advance_counts() {
        let generator = MockTextGenerator::new();
        let (tutor, learner_id, _dir) = setup(generator, "2018-01").await;
        let concept = tutor
            .store()
            .ensure_concept("math", TARGET_CONCEPT_LABEL, "K")
            .await
            .unwrap();

        let verdicts = ["7", "12", "3+4", "banana", "6 + 6"];
        let mut last = None;
        for text in verdicts {
            last = Some(
                tutor
                    .evaluate_and_advance(learner_id, concept.id, text)
                    .await
                    .unwrap(),
            );
        }

        let last = last.unwrap();
        assert_eq!(last.updated_attempts, 5);
        assert_eq!(last.updated_correct, 2);
        // "banana", "6 + 6" are two wrong in a row after "3+4"
        assert_eq!(last.tier, ReplyTier::Hint);
        assert!(!last.correct);
    }
}
