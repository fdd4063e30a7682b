//! Library root for `relay-bot`.
//!
//! Relay-bot is a webhook-driven bridge between Slack and an Azure OpenAI
//! vision-capable model:
//! - Authenticates inbound Slack events (HMAC signature, replay window)
//! - Suppresses webhook retransmissions by event id
//! - Classifies each message as text or image content
//! - Assembles recent channel history as model context
//! - Posts the generated answer back to the originating channel/thread
//!
//! The webhook handler acknowledges within the platform's response deadline;
//! all remote work runs in a detached task per accepted event. The
//! architecture is built around extensible traits that allow for different
//! implementations of each service.

#[deny(missing_docs)]
pub mod base;
pub mod ingress;
pub mod interaction;
pub mod prelude;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the relay-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the chat and model clients
/// - Starts the webhook server
pub async fn start(config: Config) -> Void {
    info!("Starting relay-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider().install_default().unwrap();

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the webhook server.
    runtime.start().await?;

    Ok(())
}
