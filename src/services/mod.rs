//! Services layer for LearnPal
//!
//! Provides the text-generation collaborator behind the tutor.

pub mod llm;

pub use llm::{
    CollaboratorFailure, GeneratedReply, GenerationRequest, LlmConfig, OpenAiGenerator,
    TextGenerator,
};
