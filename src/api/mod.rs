//! HTTP API for the tutoring service
//!
//! Provides:
//! - Tenant and learner management
//! - Lesson turns and progress reports
//! - Reply feedback

pub mod server;

pub use server::{ApiError, ApiServer, ApiServerConfig, AppState, TENANT_HEADER};
