//! Common types and result handling shared across the application.

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The common error type used throughout the application.
pub type Err = anyhow::Error;
/// The common result type used throughout the application.
pub type Res<T> = Result<T, Err>;
/// A result with no value.
pub type Void = Res<()>;

/// A normalized inbound chat event.
///
/// Produced by the event normalizer once a webhook body has been verified and
/// decoded; immutable from then on. Every `CanonicalEvent` handed to the
/// dispatcher has already passed signature verification and duplicate
/// suppression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// Platform-unique event identifier, used for duplicate suppression.
    pub event_id: String,
    /// The channel the message was posted in.
    pub conversation_id: String,
    /// The user that authored the message.
    pub sender_id: String,
    /// The message text (possibly empty for pure file shares).
    pub text: String,
    /// Optional reference to an attached file.
    pub attachment: Option<AttachmentRef>,
    /// Thread timestamp, present when the message was posted in a thread.
    pub thread_ref: Option<String>,
}

/// Opaque pointer to a file carried on an inbound event.
///
/// Slack delivers the download location and MIME type inline on the event
/// envelope, so resolution is captured at normalization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    /// Platform file identifier.
    pub id: String,
    /// MIME type as reported by the platform.
    pub mime_type: String,
    /// Private download URL; fetching it requires the bot token.
    pub url: String,
}

/// One prior message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    /// The user that authored the message.
    pub sender_id: String,
    /// Whether the message was authored by the bot itself. Used to pick the
    /// role when the transcript is rendered into model turns.
    pub from_bot: bool,
    /// The message text.
    pub text: String,
    /// Platform timestamp of the message.
    pub ts: String,
}

/// Bounded window of recent conversation messages, oldest first.
///
/// Rebuilt for every dispatched event; never cached across events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    /// The window's messages, oldest first.
    pub entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// Number of messages in the window.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window holds no messages.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Raw downloaded attachment content.
#[derive(Debug, Clone)]
pub struct AttachmentPayload {
    /// MIME type carried over from the attachment reference.
    pub mime_type: String,
    /// The downloaded bytes.
    pub bytes: Vec<u8>,
}

impl AttachmentPayload {
    /// Encode the binary content into its inline representation, consuming
    /// the raw bytes.
    pub fn into_inline(self) -> InlineImage {
        InlineImage {
            base64: base64::engine::general_purpose::STANDARD.encode(&self.bytes),
            mime_type: self.mime_type,
        }
    }
}

/// Base64 inline encoding of an image, ready to embed in a vision request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// MIME type of the encoded image.
    pub mime_type: String,
    /// Base64 encoding of the image bytes.
    pub base64: String,
}

impl InlineImage {
    /// Render as a `data:` URL, the shape the model backend expects.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Request to the model gateway. Exactly one variant per dispatched event.
#[derive(Debug, Clone)]
pub enum ModelRequest {
    /// A plain text completion request.
    Text {
        /// Prior conversation messages, oldest first.
        transcript: Transcript,
        /// The triggering message text.
        prompt: String,
    },
    /// A completion request carrying an inline image.
    Vision {
        /// Prior conversation messages, oldest first.
        transcript: Transcript,
        /// The triggering message text, possibly empty.
        prompt: String,
        /// The image to describe or answer about.
        image: InlineImage,
    },
}

impl ModelRequest {
    /// The conversation context, regardless of variant.
    pub fn transcript(&self) -> &Transcript {
        match self {
            Self::Text { transcript, .. } | Self::Vision { transcript, .. } => transcript,
        }
    }

    /// The triggering message text, regardless of variant.
    pub fn prompt(&self) -> &str {
        match self {
            Self::Text { prompt, .. } | Self::Vision { prompt, .. } => prompt,
        }
    }
}

/// Outcome of a model gateway call.
///
/// Backend error modes (auth, quota, malformed request, transient network
/// failure) are all folded into `Failed`; the dispatcher reports a uniform
/// user-visible failure rather than differentiating causes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    /// The generated answer text.
    Completed(String),
    /// The backend failed; the payload is diagnostic only and never posted.
    Failed(String),
}

/// Error taxonomy for the ingestion and dispatch pipeline.
#[derive(Debug, Error)]
pub enum EventError {
    /// Bad or stale request signature. Rejected at the boundary with a 401.
    #[error("request signature invalid or stale")]
    Unauthorized,
    /// Unparseable event envelope. Dropped with a 400, no reply.
    #[error("malformed event envelope: {0}")]
    Malformed(String),
    /// The bot's own message echoed back. Dropped silently.
    #[error("event authored by the bot itself")]
    SelfAuthored,
    /// Retransmission of an already-accepted event. Dropped silently.
    #[error("duplicate delivery of event `{0}`")]
    Duplicate(String),
    /// Channel history fetch failed. The event proceeds with empty context.
    #[error("conversation history unavailable: {0}")]
    ContextUnavailable(String),
    /// Attachment fetch or decode failed. Aborts the event with an apology.
    #[error("attachment unavailable: {0}")]
    AttachmentUnavailable(String),
    /// The remote completion backend failed. Aborts the event with an apology.
    #[error("model backend failure: {0}")]
    ModelBackendFailure(String),
    /// The final reply post failed. Logged only; never retried.
    #[error("failed to publish reply: {0}")]
    PublishFailure(String),
}

/// Stages an event moves through once received.
///
/// The webhook handler runs `Received` through `Accepted` synchronously; the
/// rest happens in a detached task. Surfaced in logs so partial completion is
/// observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStage {
    /// The webhook request has arrived.
    Received,
    /// The request signature checked out.
    Verified,
    /// The envelope decoded into a canonical event.
    Normalized,
    /// The event passed duplicate suppression and was handed off.
    Accepted,
    /// The conversation context was assembled.
    ContextGathered,
    /// The model produced a reply.
    Completed,
    /// The event failed somewhere past acceptance.
    Failed,
    /// The reply was posted back to the conversation.
    Published,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_image_data_url_embeds_mime_and_payload() {
        let payload = AttachmentPayload {
            mime_type: "image/png".to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        };

        let inline = payload.into_inline();

        assert_eq!(inline.mime_type, "image/png");
        assert_eq!(inline.data_url(), format!("data:image/png;base64,{}", inline.base64));
        assert!(!inline.base64.is_empty());
    }

    #[test]
    fn model_request_accessors_cover_both_variants() {
        let text = ModelRequest::Text {
            transcript: Transcript::default(),
            prompt: "hi".to_string(),
        };
        let vision = ModelRequest::Vision {
            transcript: Transcript::default(),
            prompt: "look".to_string(),
            image: InlineImage {
                mime_type: "image/jpeg".to_string(),
                base64: "aGk=".to_string(),
            },
        };

        assert_eq!(text.prompt(), "hi");
        assert_eq!(vision.prompt(), "look");
        assert!(text.transcript().is_empty());
        assert!(vision.transcript().is_empty());
    }
}
