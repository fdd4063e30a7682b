pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{AttachmentPayload, AttachmentRef, Res, TranscriptEntry, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait covers everything relay-bot needs from the chat platform:
/// discovering its own identity, reading recent channel history, downloading
/// file attachments, and posting replies. Implementing this trait allows
/// different chat services to be used with the bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Returns the unique identifier for the bot in the chat platform, used
    /// for self-loop prevention and for role-tagging transcript entries.
    fn bot_user_id(&self) -> &str;

    /// Fetch the most recent messages of a conversation, oldest first.
    ///
    /// At most `limit` entries are returned. Messages without an authoring
    /// user or without text are omitted.
    async fn fetch_recent_messages(&self, conversation_id: &str, limit: usize) -> Res<Vec<TranscriptEntry>>;

    /// Download the binary content of a referenced attachment.
    ///
    /// The download is authenticated with the bot's credentials.
    async fn fetch_attachment(&self, attachment: &AttachmentRef) -> Res<AttachmentPayload>;

    /// Post a message to a conversation, threaded when `thread_ref` is given.
    ///
    /// Returns the platform timestamp of the posted message so it can be
    /// referenced (e.g. deleted) later.
    async fn post_message(&self, conversation_id: &str, thread_ref: Option<String>, text: &str) -> Res<String>;

    /// Delete a previously posted message.
    async fn delete_message(&self, conversation_id: &str, ts: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
