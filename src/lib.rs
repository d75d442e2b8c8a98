//! Gift Advisor — credit-gated gift recommendation quiz.

pub mod config;
pub mod credits;
pub mod error;
pub mod llm;
pub mod quiz;
pub mod recommend;
pub mod store;
