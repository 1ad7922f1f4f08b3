//! Adaptive tutoring engine
//!
//! - **evaluator**: is the learner's answer correct?
//! - **streak**: bounded wrong-answer streaks and hint-tier escalation
//! - **prompts**: persona and per-tier system instructions
//! - **orchestrator**: one tutoring turn end to end

pub mod evaluator;
pub mod orchestrator;
pub mod prompts;
pub mod streak;

pub use evaluator::is_correct;
pub use orchestrator::{Tutor, TutorReply, TurnOutcome, APOLOGY_REPLY, NOT_CONFIGURED_REPLY};
pub use prompts::{system_instructions, Persona};
pub use streak::{HintTierController, StreakTable, ANSWER_THRESHOLD, HINT_THRESHOLD};
