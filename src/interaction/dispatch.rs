//! Background dispatch of accepted events.
//!
//! The webhook handler hands an accepted [`CanonicalEvent`] to
//! [`spawn_dispatch`] and returns immediately; the spawned task gathers
//! context, invokes the model, and publishes the reply. Failures past
//! acceptance never leave the user in total silence: attachment and model
//! failures produce a short apologetic reply, and only a failed publish is
//! log-only (retrying a post risks duplicate visible replies).
//!
//! Replies within one conversation are posted in the order their model calls
//! finish, which is best-effort FIFO only: a slow model call for an earlier
//! event can be overtaken by a fast one for a later event.

use tracing::Instrument;

use crate::{
    base::{
        mrkdwn,
        types::{CanonicalEvent, DispatchStage, EventError, ModelReply, ModelRequest},
    },
    interaction::{attachment, context},
    prelude::*,
    runtime::Runtime,
};

/// Posted while the model call is in flight, removed before the reply.
const PLACEHOLDER_TEXT: &str = "Hmmm, let me think... :eyes:";

/// Apology for an image the bot accepted but could not fetch or read.
const ATTACHMENT_APOLOGY: &str = "Sorry, I couldn't read that image. Please try uploading it again.";

/// Apology for any other failure while producing an answer.
const GENERIC_APOLOGY: &str = "Sorry, something went wrong while answering that. Please try again.";

/// Terminal outcome of one dispatched event.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The generated reply was posted.
    Replied { text: String },
    /// The event failed and a best-effort apology was posted.
    FailureReported { error: EventError },
    /// The final post itself failed; logged, never retried.
    PublishFailed { error: EventError },
}

/// Spawn the background task for an accepted event.
///
/// The task runs to completion or failure; it is not interrupted by later
/// duplicates or unrelated events.
#[instrument(skip_all, fields(event_id = %event.event_id))]
pub fn spawn_dispatch(event: CanonicalEvent, runtime: Runtime) {
    tokio::spawn(async move {
        let outcome = dispatch(event, &runtime).in_current_span().await;

        match &outcome {
            DispatchOutcome::Replied { .. } => {}
            DispatchOutcome::FailureReported { error } => error!("Event failed: {error}"),
            DispatchOutcome::PublishFailed { error } => error!("Error while publishing reply: {error}"),
        }
    });
}

/// Process one accepted event end to end.
#[instrument(skip_all, fields(event_id = %event.event_id, conversation_id = %event.conversation_id))]
pub async fn dispatch(event: CanonicalEvent, runtime: &Runtime) -> DispatchOutcome {
    info!("Dispatching event ...");

    // Let the channel know something is happening while the model works.
    let placeholder_ts = if runtime.config.show_placeholder {
        runtime
            .chat
            .post_message(&event.conversation_id, event.thread_ref.clone(), PLACEHOLDER_TEXT)
            .await
            .map_err(|err| warn!("Failed to post placeholder: {err}"))
            .ok()
    } else {
        None
    };

    // Gather the conversation context; failure degrades to an empty transcript.
    let transcript = context::gather_transcript(&runtime.chat, &event.conversation_id, runtime.config.transcript_length).await;
    debug!(stage = ?DispatchStage::ContextGathered, entries = transcript.len(), "Context gathered.");

    // Classify: an attachment reference makes this a vision request.
    let request = match &event.attachment {
        None => ModelRequest::Text {
            transcript,
            prompt: event.text.clone(),
        },
        Some(attachment_ref) => match attachment::fetch_inline_image(&runtime.chat, attachment_ref).await {
            Ok(image) => ModelRequest::Vision {
                transcript,
                prompt: event.text.clone(),
                image,
            },
            Err(error) => {
                debug!(stage = ?DispatchStage::Failed, "Attachment unavailable.");
                clear_placeholder(runtime, &event, placeholder_ts).await;
                return report_failure(runtime, &event, error).await;
            }
        },
    };

    // Invoke the model. The image payload is dropped with the request.
    let reply = runtime.llm.complete(&request).await;
    drop(request);

    let text = match reply {
        ModelReply::Completed(text) => text,
        ModelReply::Failed(reason) => {
            debug!(stage = ?DispatchStage::Failed, "Model backend failed.");
            clear_placeholder(runtime, &event, placeholder_ts).await;
            return report_failure(runtime, &event, EventError::ModelBackendFailure(reason)).await;
        }
    };

    debug!(stage = ?DispatchStage::Completed, "Model reply received.");
    clear_placeholder(runtime, &event, placeholder_ts).await;

    // Publish, rendering the model's Markdown into the platform's markup.
    let rendered = mrkdwn::markdown_to_mrkdwn(&text);

    match runtime.chat.post_message(&event.conversation_id, event.thread_ref.clone(), &rendered).await {
        Ok(_) => {
            info!(stage = ?DispatchStage::Published, "Reply published.");
            DispatchOutcome::Replied { text: rendered }
        }
        Err(err) => DispatchOutcome::PublishFailed {
            error: EventError::PublishFailure(err.to_string()),
        },
    }
}

/// Remove the placeholder message, if one was posted.
async fn clear_placeholder(runtime: &Runtime, event: &CanonicalEvent, placeholder_ts: Option<String>) {
    if let Some(ts) = placeholder_ts
        && let Err(err) = runtime.chat.delete_message(&event.conversation_id, &ts).await
    {
        warn!("Failed to delete placeholder message: {err}");
    }
}

/// Post a best-effort user-visible failure reply.
///
/// The message distinguishes an unreadable image from a general failure, and
/// never contains raw backend error text.
async fn report_failure(runtime: &Runtime, event: &CanonicalEvent, error: EventError) -> DispatchOutcome {
    let apology = match &error {
        EventError::AttachmentUnavailable(_) => ATTACHMENT_APOLOGY,
        _ => GENERIC_APOLOGY,
    };

    if let Err(post_err) = runtime.chat.post_message(&event.conversation_id, event.thread_ref.clone(), apology).await {
        error!("Failed to post failure reply: {post_err}");
    }

    DispatchOutcome::FailureReported { error }
}
