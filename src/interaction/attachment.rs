//! Attachment fetching and inline encoding.

use crate::{
    base::types::{AttachmentRef, EventError, InlineImage},
    prelude::*,
    service::chat::ChatClient,
};

/// Resolve and download an image attachment, returning its inline encoding.
///
/// Unlike a missing transcript, a requested image that cannot be fetched must
/// not produce a misleading text-only answer; every failure here is an
/// [`EventError::AttachmentUnavailable`] that aborts the event.
#[instrument(skip(chat, attachment), fields(attachment_id = %attachment.id))]
pub async fn fetch_inline_image(chat: &ChatClient, attachment: &AttachmentRef) -> Result<InlineImage, EventError> {
    if !attachment.mime_type.starts_with("image/") {
        return Err(EventError::AttachmentUnavailable(format!("unsupported MIME type `{}`", attachment.mime_type)));
    }

    let payload = chat
        .fetch_attachment(attachment)
        .await
        .map_err(|e| EventError::AttachmentUnavailable(e.to_string()))?;

    if payload.bytes.is_empty() {
        return Err(EventError::AttachmentUnavailable("attachment download returned no data".to_string()));
    }

    Ok(payload.into_inline())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use mockall::mock;

    use super::*;
    use crate::{
        base::types::{AttachmentPayload, Res, TranscriptEntry, Void},
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

    fn image_ref() -> AttachmentRef {
        AttachmentRef {
            id: "F1".to_string(),
            mime_type: "image/png".to_string(),
            url: "https://files.example/F1".to_string(),
        }
    }

    #[tokio::test]
    async fn downloads_and_encodes_an_image() {
        let mut mock = MockChat::new();
        mock.expect_fetch_attachment().returning(|attachment| {
            Ok(AttachmentPayload {
                mime_type: attachment.mime_type.clone(),
                bytes: vec![1, 2, 3],
            })
        });

        let chat = ChatClient::new(Arc::new(mock));
        let inline = fetch_inline_image(&chat, &image_ref()).await.unwrap();

        assert_eq!(inline.mime_type, "image/png");
        assert!(!inline.base64.is_empty());
    }

    #[tokio::test]
    async fn non_image_mime_type_is_rejected_without_download() {
        // No `fetch_attachment` expectation: a download attempt would panic.
        let mock = MockChat::new();
        let chat = ChatClient::new(Arc::new(mock));

        let attachment = AttachmentRef {
            id: "F1".to_string(),
            mime_type: "application/pdf".to_string(),
            url: "https://files.example/F1".to_string(),
        };

        let err = fetch_inline_image(&chat, &attachment).await.unwrap_err();
        assert!(matches!(err, EventError::AttachmentUnavailable(_)));
    }

    #[tokio::test]
    async fn download_failure_aborts_the_event() {
        let mut mock = MockChat::new();
        mock.expect_fetch_attachment().returning(|_| Err(anyhow::anyhow!("403 Forbidden")));

        let chat = ChatClient::new(Arc::new(mock));
        let err = fetch_inline_image(&chat, &image_ref()).await.unwrap_err();

        assert!(matches!(err, EventError::AttachmentUnavailable(_)));
    }

    #[tokio::test]
    async fn empty_download_aborts_the_event() {
        let mut mock = MockChat::new();
        mock.expect_fetch_attachment().returning(|attachment| {
            Ok(AttachmentPayload {
                mime_type: attachment.mime_type.clone(),
                bytes: Vec::new(),
            })
        });

        let chat = ChatClient::new(Arc::new(mock));
        let err = fetch_inline_image(&chat, &image_ref()).await.unwrap_err();

        assert!(matches!(err, EventError::AttachmentUnavailable(_)));
    }
}
