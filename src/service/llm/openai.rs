//! Azure OpenAI implementation of the model gateway.
//!
//! The outbound payload is a transcript-seeded conversation: prior messages
//! as role-tagged turns, the new user turn last. For vision requests the new
//! user turn carries both the prompt text and the inline image data.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    base::types::{ModelReply, ModelRequest},
    prelude::*,
};
use async_openai::{
    Client,
    config::AzureConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs, ChatCompletionRequestMessageContentPartTextArgs,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, ImageUrlArgs,
    },
};
use async_trait::async_trait;
use tokio::time::timeout;

use super::{GenericLlmClient, LlmClient};

/// Fallback prompt when an image arrives with no accompanying text.
const DEFAULT_VISION_PROMPT: &str = "Please describe this image:";

// Extra methods on `LlmClient` applied by the Azure OpenAI implementation.

impl LlmClient {
    pub fn azure(config: &Config) -> Self {
        let client = AzureLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// Azure OpenAI model gateway implementation.
#[derive(Clone)]
pub struct AzureLlmClient {
    client: Client<AzureConfig>,
    config: Config,
}

impl AzureLlmClient {
    /// Create a new Azure OpenAI client bound to the configured endpoint,
    /// credential, deployment, and API version.
    #[instrument(name = "AzureLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = AzureConfig::new()
            .with_api_base(config.azure_openai_endpoint.clone())
            .with_api_key(config.azure_openai_api_key.clone())
            .with_deployment_id(config.azure_openai_deployment.clone())
            .with_api_version(config.azure_openai_api_version.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    /// Render a model request into role-tagged conversation turns.
    #[instrument(name = "AzureLlmClient::build_messages", skip_all)]
    fn build_messages(config: &Config, request: &ModelRequest) -> Res<Vec<ChatCompletionRequestMessage>> {
        let system_directive = match request {
            ModelRequest::Text { .. } => &config.text_system_directive,
            ModelRequest::Vision { .. } => &config.vision_system_directive,
        };

        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(request.transcript().len() + 2);
        messages.push(ChatCompletionRequestSystemMessageArgs::default().content(system_directive.clone()).build()?.into());

        // Prior messages, oldest first; the bot's own turns become assistant turns.
        for entry in &request.transcript().entries {
            if entry.from_bot {
                messages.push(ChatCompletionRequestAssistantMessageArgs::default().content(entry.text.clone()).build()?.into());
            } else {
                messages.push(ChatCompletionRequestUserMessageArgs::default().content(entry.text.clone()).build()?.into());
            }
        }

        // The triggering message is always the final user turn.
        match request {
            ModelRequest::Text { prompt, .. } => {
                messages.push(ChatCompletionRequestUserMessageArgs::default().content(prompt.clone()).build()?.into());
            }
            ModelRequest::Vision { prompt, image, .. } => {
                let prompt = if prompt.trim().is_empty() { DEFAULT_VISION_PROMPT } else { prompt.trim() };

                let parts: Vec<ChatCompletionRequestUserMessageContentPart> = vec![
                    ChatCompletionRequestMessageContentPartTextArgs::default().text(prompt).build()?.into(),
                    ChatCompletionRequestMessageContentPartImageArgs::default()
                        .image_url(ImageUrlArgs::default().url(image.data_url()).build()?)
                        .build()?
                        .into(),
                ];

                messages.push(ChatCompletionRequestUserMessageArgs::default().content(parts).build()?.into());
            }
        }

        Ok(messages)
    }

    /// Helper function to make model API calls with retry logic and timeout handling.
    async fn call_model_api(&self, request_builder: CreateChatCompletionRequestArgs) -> Res<CreateChatCompletionResponse> {
        const MAX_RETRIES: u32 = 2;
        const TIMEOUT: u64 = 120;
        const RETRY_DELAY_MS: u64 = 1000;

        let mut retries = 0;

        loop {
            let request = request_builder.build()?;
            let result = timeout(Duration::from_secs(TIMEOUT), self.client.chat().create(request)).await;

            match result {
                Ok(Ok(response)) => {
                    info!("Model API call succeeded after {} attempts", retries + 1);
                    return Ok(response);
                }
                Ok(Err(err)) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow!("Model API call failed after {MAX_RETRIES} retries: {err}"));
                    }
                    retries += 1;
                    warn!("Model API call failed, retrying {retries}/{MAX_RETRIES}: {err}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
                Err(_) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow!("Model API call timed out after {MAX_RETRIES} attempts"));
                    }
                    retries += 1;
                    warn!("Model API call timed out, retrying {retries}/{MAX_RETRIES}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn try_complete(&self, request: &ModelRequest) -> Res<String> {
        let messages = Self::build_messages(&self.config, request)?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.config.azure_openai_deployment)
            .messages(messages)
            .temperature(self.config.openai_temperature)
            .max_tokens(self.config.openai_max_tokens);

        let response = self.call_model_api(args).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Model returned no content"))?;

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl GenericLlmClient for AzureLlmClient {
    #[instrument(name = "AzureLlmClient::complete", skip_all)]
    async fn complete(&self, request: &ModelRequest) -> ModelReply {
        match self.try_complete(request).await {
            Ok(text) => ModelReply::Completed(text),
            Err(err) => {
                warn!("Model backend call failed: {err}");
                ModelReply::Failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{
        config::ConfigInner,
        types::{InlineImage, Transcript, TranscriptEntry},
    };
    use async_openai::types::ChatCompletionRequestUserMessageContent;

    fn test_config() -> Config {
        Config {
            inner: Arc::new(ConfigInner {
                text_system_directive: "text directive".to_string(),
                vision_system_directive: "vision directive".to_string(),
                ..Default::default()
            }),
        }
    }

    fn transcript() -> Transcript {
        Transcript {
            entries: vec![
                TranscriptEntry {
                    sender_id: "U1".to_string(),
                    from_bot: false,
                    text: "earlier question".to_string(),
                    ts: "1.0".to_string(),
                },
                TranscriptEntry {
                    sender_id: "UBOT".to_string(),
                    from_bot: true,
                    text: "earlier answer".to_string(),
                    ts: "2.0".to_string(),
                },
            ],
        }
    }

    #[test]
    fn text_request_renders_system_transcript_and_prompt() {
        let request = ModelRequest::Text {
            transcript: transcript(),
            prompt: "What is the capital of France?".to_string(),
        };

        let messages = AzureLlmClient::build_messages(&test_config(), &request).unwrap();

        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Assistant(_)));

        let ChatCompletionRequestMessage::User(last) = &messages[3] else {
            panic!("final turn must be the user prompt");
        };
        let ChatCompletionRequestUserMessageContent::Text(text) = &last.content else {
            panic!("text request must carry a plain text turn");
        };
        assert_eq!(text, "What is the capital of France?");
    }

    #[test]
    fn vision_request_carries_text_and_image_parts() {
        let request = ModelRequest::Vision {
            transcript: Transcript::default(),
            prompt: "what is this?".to_string(),
            image: InlineImage {
                mime_type: "image/png".to_string(),
                base64: "aGVsbG8=".to_string(),
            },
        };

        let messages = AzureLlmClient::build_messages(&test_config(), &request).unwrap();

        assert_eq!(messages.len(), 2);
        let ChatCompletionRequestMessage::User(last) = messages.last().unwrap() else {
            panic!("final turn must be the user prompt");
        };
        let ChatCompletionRequestUserMessageContent::Array(parts) = &last.content else {
            panic!("vision request must carry content parts");
        };

        assert_eq!(parts.len(), 2);
        let ChatCompletionRequestUserMessageContentPart::ImageUrl(image_part) = &parts[1] else {
            panic!("second part must be the inline image");
        };
        assert_eq!(image_part.image_url.url, "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn empty_vision_prompt_falls_back_to_describe() {
        let request = ModelRequest::Vision {
            transcript: Transcript::default(),
            prompt: "  ".to_string(),
            image: InlineImage {
                mime_type: "image/jpeg".to_string(),
                base64: "aGk=".to_string(),
            },
        };

        let messages = AzureLlmClient::build_messages(&test_config(), &request).unwrap();

        let ChatCompletionRequestMessage::User(last) = messages.last().unwrap() else {
            panic!("final turn must be the user prompt");
        };
        let ChatCompletionRequestUserMessageContent::Array(parts) = &last.content else {
            panic!("vision request must carry content parts");
        };
        let ChatCompletionRequestUserMessageContentPart::Text(text_part) = &parts[0] else {
            panic!("first part must be text");
        };

        assert_eq!(text_part.text, DEFAULT_VISION_PROMPT);
    }

    #[test]
    fn directive_tracks_request_variant() {
        let text = ModelRequest::Text {
            transcript: Transcript::default(),
            prompt: "hi".to_string(),
        };
        let vision = ModelRequest::Vision {
            transcript: Transcript::default(),
            prompt: "hi".to_string(),
            image: InlineImage {
                mime_type: "image/png".to_string(),
                base64: "aGk=".to_string(),
            },
        };

        let config = test_config();
        let text_messages = AzureLlmClient::build_messages(&config, &text).unwrap();
        let vision_messages = AzureLlmClient::build_messages(&config, &vision).unwrap();

        let system_of = |messages: &[ChatCompletionRequestMessage]| match &messages[0] {
            ChatCompletionRequestMessage::System(system) => match &system.content {
                async_openai::types::ChatCompletionRequestSystemMessageContent::Text(text) => text.clone(),
                other => panic!("unexpected system content: {other:?}"),
            },
            other => panic!("unexpected first message: {other:?}"),
        };

        assert_eq!(system_of(&text_messages), "text directive");
        assert_eq!(system_of(&vision_messages), "vision directive");
    }
}
