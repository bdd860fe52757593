//! # rajni-providers
//!
//! Completion and speech gateways for RajniAI.

pub mod openai;
pub mod voice;
