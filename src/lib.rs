//! Mail Advisor — routes customer emails to LLM financial advisors.

pub mod advisors;
pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
