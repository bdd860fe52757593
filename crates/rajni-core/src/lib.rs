//! # rajni-core
//!
//! Core types, traits, configuration, and error handling for the RajniAI
//! assistant backend.

pub mod config;
pub mod context;
pub mod error;
pub mod lenient;
pub mod prefs;
pub mod profile;
pub mod prompt;
pub mod traits;
