//! Completion backend port.

pub mod client;

pub use client::{CompletionClient, CompletionError, MAX_OUTPUT_TOKENS};
