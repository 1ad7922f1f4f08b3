//! Tutor personas and per-tier system instructions

use crate::types::{Learner, ReplyTier, KINDERGARTEN_BIRTH_YEAR_CUTOFF};
use serde::{Deserialize, Serialize};

/// Voice the tutor speaks in, derived from the learner's age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Kindergarten,
    Analytical,
}

impl Persona {
    /// Born in the cutoff year or later gets the kindergarten voice
    pub fn for_learner(learner: &Learner) -> Self {
        match learner.birth_year() {
            Some(year) if year >= KINDERGARTEN_BIRTH_YEAR_CUTOFF => Persona::Kindergarten,
            _ => Persona::Analytical,
        }
    }

    pub fn base_instructions(&self) -> &'static str {
        match self {
            Persona::Kindergarten => {
                "You are a friendly kindergarten math tutor. Use very short sentences and emojis."
            }
            Persona::Analytical => {
                "You are a supportive 6th-grade tutor. Encourage analytical thinking."
            }
        }
    }
}

/// System instructions for one turn
pub fn system_instructions(persona: Persona, tier: ReplyTier) -> String {
    let base = persona.base_instructions();
    match tier {
        ReplyTier::Normal => base.to_string(),
        ReplyTier::Hint => format!(
            "{} Provide **one** helpful hint only. DO NOT reveal the answer.",
            base
        ),
        ReplyTier::Answer => format!("{} State the correct answer as simply as possible.", base),
    }
}
