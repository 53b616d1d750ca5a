//! Core domain + application logic for the completion relay bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the completion
//! backend live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod conversation;
pub mod credentials;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod model;
pub mod registry;
pub mod replies;
pub mod router;
pub mod store;

pub use errors::{Error, Result};
