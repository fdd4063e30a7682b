//! Slack implementation of the chat service.
//!
//! REST calls (history, posting, deletion) go through `slack-morphism` over a
//! hyper/rustls connector; private file downloads use a plain authenticated
//! HTTP GET since they are served outside the Web API.

use crate::{
    base::types::{AttachmentPayload, AttachmentRef, TranscriptEntry},
    prelude::*,
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;

use std::{ops::Deref, sync::Arc};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    bot_token: SlackApiToken,
    bot_token_value: String,
    bot_user_id: String,
    client: Arc<FullClient>,
    http: reqwest::Client,
}

impl Deref for SlackChatClient {
    type Target = FullClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID: needed for self-loop prevention and for
        // telling its own messages apart in channel history.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            bot_token,
            bot_token_value: config.slack_bot_token.clone(),
            bot_user_id,
            client,
            http: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    #[instrument(skip(self))]
    async fn fetch_recent_messages(&self, conversation_id: &str, limit: usize) -> Res<Vec<TranscriptEntry>> {
        let request = SlackApiConversationsHistoryRequest::new()
            .with_channel(SlackChannelId(conversation_id.to_string()))
            .with_limit(limit as u16);

        let session = self.client.open_session(&self.bot_token);
        let response = session
            .conversations_history(&request)
            .await
            .map_err(|e| anyhow!("Failed to fetch channel history: {}", e))?;

        // Slack returns newest first; the transcript wants oldest first.
        let mut entries = Vec::new();
        for message in response.messages.into_iter().rev() {
            let Some(user) = message.sender.user else {
                continue;
            };
            let Some(text) = message.content.text else {
                continue;
            };
            if text.is_empty() {
                continue;
            }

            entries.push(TranscriptEntry {
                from_bot: user.0 == self.bot_user_id,
                sender_id: user.0,
                text,
                ts: message.origin.ts.0,
            });
        }

        Ok(entries)
    }

    #[instrument(skip(self, attachment), fields(attachment_id = %attachment.id))]
    async fn fetch_attachment(&self, attachment: &AttachmentRef) -> Res<AttachmentPayload> {
        // Private file URLs require the bot token as a bearer credential.
        let response = self
            .http
            .get(&attachment.url)
            .bearer_auth(&self.bot_token_value)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to download attachment: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("Attachment download returned status {}", response.status()));
        }

        let bytes = response.bytes().await.map_err(|e| anyhow!("Failed to read attachment body: {}", e))?;

        Ok(AttachmentPayload {
            mime_type: attachment.mime_type.clone(),
            bytes: bytes.to_vec(),
        })
    }

    #[instrument(skip(self, text))]
    async fn post_message(&self, conversation_id: &str, thread_ref: Option<String>, text: &str) -> Res<String> {
        let content = SlackMessageContent::new().with_text(text.to_string());

        let mut request = SlackApiChatPostMessageRequest::new(SlackChannelId(conversation_id.to_string()), content).with_link_names(true);

        if let Some(thread_ts) = thread_ref {
            request = request.with_thread_ts(SlackTs(thread_ts));
        }

        let session = self.client.open_session(&self.bot_token);
        let response = session.chat_post_message(&request).await.map_err(|e| anyhow!("Failed to post message: {}", e))?;

        Ok(response.ts.0)
    }

    #[instrument(skip(self))]
    async fn delete_message(&self, conversation_id: &str, ts: &str) -> Void {
        let request = SlackApiChatDeleteRequest::new(SlackChannelId(conversation_id.to_string()), SlackTs(ts.to_string()));

        let session = self.client.open_session(&self.bot_token);
        let _ = session.chat_delete(&request).await.map_err(|e| anyhow!("Failed to delete message: {}", e))?;

        Ok(())
    }
}
