//! Ingot Core
//!
//! Core domain types, traits, and error handling for the Ingot dispatch
//! plane. This crate has minimal dependencies and defines the shared
//! vocabulary used across all other crates.

pub mod error;
pub mod ids;
pub mod task;

pub use error::{Error, Result};
pub use ids::AgentId;
pub use task::{RunCondition, Task, TaskStatus};
