//! Core components, types, and utilities for relay-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - System prompts for the text and vision model calls.
//! - Common types and result handling.
//! - Markdown to Slack `mrkdwn` rendering.

pub mod config;
pub mod mrkdwn;
pub mod prompts;
pub mod types;
