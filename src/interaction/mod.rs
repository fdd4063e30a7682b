//! Per-event processing for relay-bot.
//!
//! This module contains everything that happens after an event has been
//! accepted at the webhook boundary:
//! - Assembling conversation context from channel history.
//! - Fetching and inline-encoding image attachments.
//! - Dispatch orchestration: model invocation and reply publishing in a
//!   detached background task.

pub mod attachment;
pub mod context;
pub mod dispatch;
