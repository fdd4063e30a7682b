//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the collaborators relay-bot
//! depends on:
//! - Chat services (e.g., Slack): history, file download, message posting.
//! - Model services (e.g., Azure OpenAI): text and vision completion.
//!
//! Each service module defines a generic trait and a concrete implementation,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod llm;
