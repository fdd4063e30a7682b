//! Decoding of the webhook event envelope into canonical events.
//!
//! The envelope is a tagged union: a one-time `url_verification` handshake,
//! or an `event_callback` wrapping a message event. Decoding fails closed:
//! any missing required field is a [`EventError::Malformed`] and the event is
//! dropped with no reply.

use serde::Deserialize;

use crate::base::types::{AttachmentRef, CanonicalEvent, EventError};

/// Outer webhook payload. The handshake case is checked first by virtue of
/// the tag; unknown envelope types fail the decode.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Envelope {
    UrlVerification { challenge: String },
    EventCallback { event_id: String, event: InnerEvent },
}

#[derive(Debug, Deserialize)]
struct InnerEvent {
    #[serde(rename = "type")]
    kind: String,
    subtype: Option<String>,
    user: Option<String>,
    bot_id: Option<String>,
    text: Option<String>,
    channel: Option<String>,
    ts: Option<String>,
    thread_ts: Option<String>,
    #[serde(default)]
    files: Vec<FileRef>,
}

#[derive(Debug, Deserialize)]
struct FileRef {
    id: Option<String>,
    mimetype: Option<String>,
    url_private: Option<String>,
}

/// Result of normalizing a verified webhook body.
#[derive(Debug, PartialEq, Eq)]
pub enum Normalized {
    /// Echo the token back verbatim; no event is produced.
    Handshake(String),
    /// A message event accepted for dispatch.
    Event(CanonicalEvent),
    /// The bot's own message echoed back; dropped silently.
    SelfAuthored,
    /// An event type or subtype this bot does not handle; dropped silently.
    Ignored(&'static str),
}

/// Parses the platform's event envelope into a [`CanonicalEvent`].
#[derive(Debug, Clone)]
pub struct EventNormalizer {
    bot_user_id: String,
}

impl EventNormalizer {
    pub fn new(bot_user_id: impl Into<String>) -> Self {
        Self {
            bot_user_id: bot_user_id.into(),
        }
    }

    /// Normalize a verified request body.
    ///
    /// Only call this after signature verification has succeeded.
    pub fn normalize(&self, body: &[u8]) -> Result<Normalized, EventError> {
        let envelope: Envelope = serde_json::from_slice(body).map_err(|e| EventError::Malformed(e.to_string()))?;

        match envelope {
            Envelope::UrlVerification { challenge } => Ok(Normalized::Handshake(challenge)),
            Envelope::EventCallback { event_id, event } => self.normalize_event(event_id, event),
        }
    }

    fn normalize_event(&self, event_id: String, event: InnerEvent) -> Result<Normalized, EventError> {
        if event.kind != "message" {
            return Ok(Normalized::Ignored("non-message event"));
        }

        // Normal user messages and file shares only.
        if !matches!(event.subtype.as_deref(), None | Some("file_share")) {
            return Ok(Normalized::Ignored("unsupported message subtype"));
        }

        // Self-loop prevention: anything authored by a bot identity is dropped
        // before the user field is even required.
        if event.bot_id.is_some() {
            return Ok(Normalized::SelfAuthored);
        }

        let sender_id = event.user.ok_or_else(|| EventError::Malformed("missing `user`".to_string()))?;

        if sender_id == self.bot_user_id {
            return Ok(Normalized::SelfAuthored);
        }

        let conversation_id = event.channel.ok_or_else(|| EventError::Malformed("missing `channel`".to_string()))?;
        let _ts = event.ts.ok_or_else(|| EventError::Malformed("missing `ts`".to_string()))?;

        // First file with a complete reference wins; partial file objects are
        // skipped rather than failing the event.
        let attachment = event.files.into_iter().find_map(|f| {
            Some(AttachmentRef {
                id: f.id?,
                mime_type: f.mimetype?,
                url: f.url_private?,
            })
        });

        Ok(Normalized::Event(CanonicalEvent {
            event_id,
            conversation_id,
            sender_id,
            text: event.text.unwrap_or_default(),
            attachment,
            thread_ref: event.thread_ts,
        }))
    }
}
