//! Inbound webhook surface: authentication, normalization, and hand-off.
//!
//! A single POST endpoint receives the platform's event envelope. The handler
//! runs the synchronous portion of the pipeline (signature verification,
//! envelope normalization, duplicate suppression) and acknowledges
//! immediately; everything that touches a remote service happens in a
//! detached task so the upstream response deadline is never at risk.

pub mod dedup;
pub mod envelope;
pub mod signature;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use crate::{
    base::types::DispatchStage,
    ingress::envelope::{EventNormalizer, Normalized},
    interaction::dispatch,
    prelude::*,
    runtime::Runtime,
};

/// Path the chat platform is configured to deliver events to.
pub const EVENTS_PATH: &str = "/slack/events";

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

/// Build the webhook router over the shared runtime.
pub fn router(runtime: Runtime) -> Router {
    Router::new().route(EVENTS_PATH, post(handle_events)).with_state(runtime)
}

/// Webhook entry point.
///
/// Responses: `200` with the echoed challenge (handshake), `200` empty (event
/// accepted, or silently dropped), `401` (signature invalid or stale), `400`
/// (malformed envelope).
#[instrument(skip_all)]
async fn handle_events(State(runtime): State<Runtime>, headers: HeaderMap, body: Bytes) -> Response {
    // Authenticate before interpreting a single byte of the body.

    let sig = header_str(&headers, SIGNATURE_HEADER);
    let ts = header_str(&headers, TIMESTAMP_HEADER);

    if let Err(err) = runtime.verifier.verify(&body, sig, ts) {
        warn!("Rejected webhook request: {err}");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    debug!(stage = ?DispatchStage::Verified, "Webhook request authenticated.");

    // Decode the envelope.

    let normalizer = EventNormalizer::new(runtime.chat.bot_user_id());
    let normalized = match normalizer.normalize(&body) {
        Ok(normalized) => normalized,
        Err(err) => {
            warn!("Dropping webhook request: {err}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    debug!(stage = ?DispatchStage::Normalized, "Webhook body decoded.");

    match normalized {
        // Handshake: echo the token synchronously, spawn nothing.
        Normalized::Handshake(challenge) => {
            info!("Responding to endpoint verification handshake.");
            challenge.into_response()
        }
        Normalized::SelfAuthored => {
            debug!("Ignoring the bot's own message.");
            StatusCode::OK.into_response()
        }
        Normalized::Ignored(reason) => {
            debug!("Ignoring event: {reason}.");
            StatusCode::OK.into_response()
        }
        Normalized::Event(event) => {
            // Check-and-insert is atomic: concurrent redeliveries of the same
            // id cannot both reach this point.
            if !runtime.dedup.check_and_insert(&event.event_id) {
                info!("Dropping duplicate delivery of event `{}`.", event.event_id);
                return StatusCode::OK.into_response();
            }

            info!(stage = ?DispatchStage::Accepted, event_id = %event.event_id, "Event accepted; dispatching in the background.");
            dispatch::spawn_dispatch(event, runtime.clone());

            StatusCode::OK.into_response()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|value| value.to_str().ok()).unwrap_or("")
}
