//! AI Integration Module for ProtoSpirit
//!
//! This module turns plain-language application descriptions into raw
//! project models using Claude Code CLI integration.

pub mod client;
pub mod prompts;
pub mod responses;

pub use client::{AiClient, AiError, AiMode};
pub use responses::parse_model_response;
