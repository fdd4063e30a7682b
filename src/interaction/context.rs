//! Conversation context assembly.

use crate::{base::types::Transcript, prelude::*, service::chat::ChatClient};

/// Fetch the last `limit` messages of a conversation and render them into a
/// transcript, oldest first.
///
/// History failure degrades gracefully: a missing transcript should never
/// block answering the current message, so the error is logged and an empty
/// transcript returned.
#[instrument(skip(chat))]
pub async fn gather_transcript(chat: &ChatClient, conversation_id: &str, limit: usize) -> Transcript {
    match chat.fetch_recent_messages(conversation_id, limit).await {
        Ok(mut entries) => {
            entries.truncate(limit);
            Transcript { entries }
        }
        Err(err) => {
            warn!("Conversation history unavailable, proceeding without context: {err}");
            Transcript::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use mockall::mock;

    use super::*;
    use crate::{
        base::types::{AttachmentPayload, AttachmentRef, Res, TranscriptEntry, Void},
        service::chat::GenericChatClient,
    };

    mock! {
        pub Chat {}

        #[async_trait]
        impl GenericChatClient for Chat {
            fn bot_user_id(&self) -> &str;
            async fn fetch_recent_messages(&self, conversation_id: &str, limit: usize) -> Res<Vec<TranscriptEntry>>;
            async fn fetch_attachment(&self, attachment: &AttachmentRef) -> Res<AttachmentPayload>;
            async fn post_message(&self, conversation_id: &str, thread_ref: Option<String>, text: &str) -> Res<String>;
            async fn delete_message(&self, conversation_id: &str, ts: &str) -> Void;
        }
    }

    fn entry(sender: &str, text: &str, ts: &str) -> TranscriptEntry {
        TranscriptEntry {
            sender_id: sender.to_string(),
            from_bot: false,
            text: text.to_string(),
            ts: ts.to_string(),
        }
    }

    #[tokio::test]
    async fn renders_history_oldest_first_and_bounded() {
        let mut mock = MockChat::new();
        mock.expect_fetch_recent_messages()
            .returning(|_, _| Ok(vec![entry("U1", "first", "1.0"), entry("U2", "second", "2.0"), entry("U1", "third", "3.0")]));

        let chat = ChatClient::new(Arc::new(mock));
        let transcript = gather_transcript(&chat, "C1", 2).await;

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.entries[0].text, "first");
        assert_eq!(transcript.entries[1].text, "second");
    }

    #[tokio::test]
    async fn history_failure_degrades_to_empty_transcript() {
        let mut mock = MockChat::new();
        mock.expect_fetch_recent_messages().returning(|_, _| Err(anyhow::anyhow!("boom")));

        let chat = ChatClient::new(Arc::new(mock));
        let transcript = gather_transcript(&chat, "C1", 6).await;

        assert!(transcript.is_empty());
    }
}
