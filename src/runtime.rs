//! Runtime services and shared state for relay-bot.

use std::{sync::Arc, time::Duration};

use crate::{
    ingress::{self, dedup::DuplicateSuppressor, signature::SignatureVerifier},
    prelude::*,
    service::{chat::ChatClient, llm::LlmClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the configuration, the boundary components (signature
/// verifier and duplicate suppressor), and the chat and model clients. It is
/// designed to be trivially cloneable, allowing it to be passed around (and
/// into axum state) without additional wrapping.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// Verifier for inbound webhook signatures.
    pub verifier: SignatureVerifier,
    /// The shared duplicate suppressor. The only shared mutable state in the
    /// pipeline.
    pub dedup: Arc<DuplicateSuppressor>,
    /// The chat client instance.
    pub chat: ChatClient,
    /// The model gateway instance.
    pub llm: LlmClient,
}

impl Runtime {
    /// Create a new runtime instance with real service clients.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the chat client (performs identity discovery).
        let chat = ChatClient::slack(&config).await?;

        // Initialize the model gateway.
        let llm = LlmClient::azure(&config);

        Ok(Self::with_clients(config, chat, llm))
    }

    /// Assemble a runtime around existing clients.
    ///
    /// The boundary components are derived from the configuration. Used by
    /// `new` and by tests that inject mock clients.
    pub fn with_clients(config: Config, chat: ChatClient, llm: LlmClient) -> Self {
        let verifier = SignatureVerifier::new(config.slack_signing_secret.clone(), config.replay_tolerance_secs);
        let dedup = Arc::new(DuplicateSuppressor::new(Duration::from_secs(config.dedup_window_secs)));

        Self {
            config,
            verifier,
            dedup,
            chat,
            llm,
        }
    }

    /// Serve the webhook endpoint until the process is stopped.
    pub async fn start(&self) -> Void {
        let app = ingress::router(self.clone());

        let listener = tokio::net::TcpListener::bind(&self.config.listen_address).await?;
        info!("Listening for webhook events on {}{}", self.config.listen_address, ingress::EVENTS_PATH);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
