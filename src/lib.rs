//! Telegram bot relaying chat to a text-completion API and image prompts to a
//! text-to-image API, with retrying upstream calls and a keep-alive monitor.

#![deny(missing_docs)]

/// Telegram front end
pub mod bot;
/// Configuration and settings
pub mod config;
/// Keep-alive after user inactivity
pub mod liveness;
/// Upstream generation APIs
pub mod llm;
/// Exponential backoff driver
pub mod retry;
/// Bot bootstrap
pub mod runner;
/// Utility functions
pub mod utils;

#[cfg(test)]
mod testing;
