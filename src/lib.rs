//! LearnPal - Adaptive Tutoring Core
//!
//! Scores a learner's answer, tracks consecutive wrong answers per
//! (learner, concept), and escalates tutor replies from normal to hint to
//! answer. Provides:
//! - Correctness evaluation for addition within 10
//! - A bounded, shared hint-tier streak controller
//! - Per-turn orchestration over a store and a text generator
//!
//! # Architecture
//!
//! - **Types**: Core data structures (Learner, Progress, ReplyTier, ...)
//! - **Storage**: SQLite backend behind the [`TutorStore`] trait
//! - **Services**: Text generation (OpenAI-compatible chat API)
//! - **Tutor**: Evaluator, streak controller, orchestrator
//! - **API**: HTTP surface
//!
//! # Example
//!
//! ```ignore
//! use learnpal_core::{HintTierController, OpenAiGenerator, SqliteStore, Tutor};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SqliteStore::open("learnpal.db").await?;
//!     let tutor = Tutor::new(
//!         Arc::new(store),
//!         Arc::new(HintTierController::new(1000)),
//!         Arc::new(OpenAiGenerator::with_default()?),
//!     );
//!
//!     let reply = tutor.reply(1, "3 + 4").await?;
//!     println!("[{}] {}", reply.tier, reply.content);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod storage;
pub mod tutor;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{LearnPalError, Result};
pub use services::{CollaboratorFailure, LlmConfig, OpenAiGenerator, TextGenerator};
pub use storage::{sqlite::SqliteStore, TutorStore};
pub use tutor::{is_correct, HintTierController, Tutor, TutorReply, TurnOutcome};
pub use types::{
    Concept, Feedback, Learner, NewFeedback, NewLearner, Plan, Progress, ProgressSummary,
    ReplyTier, StreakKey, Tenant,
};
