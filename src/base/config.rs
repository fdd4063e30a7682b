//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use crate::base::prompts;

use super::types::Res;

/// Default Azure OpenAI API version to use.
fn default_azure_openai_api_version() -> String {
    "2024-02-15-preview".to_string()
}

/// Default sampling temperature for the model.
fn default_openai_temperature() -> f32 {
    0.7
}

/// Default max output tokens for the model.
fn default_openai_max_tokens() -> u32 {
    1024
}

/// Default number of prior messages rendered into the transcript.
fn default_transcript_length() -> usize {
    6
}

/// Default duplicate-suppression window in seconds.
fn default_dedup_window_secs() -> u64 {
    600
}

/// Default signature replay tolerance in seconds.
fn default_replay_tolerance_secs() -> i64 {
    300
}

/// Default webhook listen address.
fn default_listen_address() -> String {
    "0.0.0.0:8000".to_string()
}

/// Default for posting a placeholder message while the model is working.
fn default_show_placeholder() -> bool {
    true
}

/// Default system directive for text-only requests.
fn default_text_system_directive() -> String {
    prompts::TEXT_SYSTEM_DIRECTIVE.to_string()
}

/// Default system directive for vision requests.
fn default_vision_system_directive() -> String {
    prompts::VISION_SYSTEM_DIRECTIVE.to_string()
}

/// Configuration for the relay-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The inner configuration values, shared across clones.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// The configuration values for the relay-bot application.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Slack signing secret used to authenticate webhook requests (`SLACK_SIGNING_SECRET`).
    pub slack_signing_secret: String,
    /// Azure OpenAI endpoint, e.g. `https://my-resource.openai.azure.com` (`AZURE_OPENAI_ENDPOINT`).
    pub azure_openai_endpoint: String,
    /// Azure OpenAI API key (`AZURE_OPENAI_API_KEY`).
    pub azure_openai_api_key: String,
    /// Azure OpenAI deployment identifier (`AZURE_OPENAI_DEPLOYMENT`).
    pub azure_openai_deployment: String,
    /// Azure OpenAI API version (`AZURE_OPENAI_API_VERSION`).
    #[serde(default = "default_azure_openai_api_version")]
    pub azure_openai_api_version: String,
    /// Sampling temperature for the model (`OPENAI_TEMPERATURE`).
    /// Value between 0 and 2. Higher values make output more random,
    /// lower values make it more focused and deterministic.
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,
    /// Max output tokens for the model (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Number of prior channel messages used as model context (`TRANSCRIPT_LENGTH`).
    #[serde(default = "default_transcript_length")]
    pub transcript_length: usize,
    /// How long an event id is remembered for duplicate suppression, in seconds
    /// (`DEDUP_WINDOW_SECS`). Must cover the platform's retry horizon.
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: u64,
    /// Maximum allowed clock skew on the signature timestamp, in seconds
    /// (`REPLAY_TOLERANCE_SECS`).
    #[serde(default = "default_replay_tolerance_secs")]
    pub replay_tolerance_secs: i64,
    /// Address the webhook server binds to (`LISTEN_ADDRESS`).
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Whether to post a temporary placeholder message while the model call is
    /// in flight (`SHOW_PLACEHOLDER`).
    #[serde(default = "default_show_placeholder")]
    pub show_placeholder: bool,
    /// Optional custom system directive for text requests (`TEXT_SYSTEM_DIRECTIVE`).
    #[serde(default = "default_text_system_directive")]
    pub text_system_directive: String,
    /// Optional custom system directive for vision requests (`VISION_SYSTEM_DIRECTIVE`).
    #[serde(default = "default_vision_system_directive")]
    pub vision_system_directive: String,
}

impl Config {
    /// Load configuration from the environment and an optional TOML file,
    /// then validate value ranges.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("RELAY_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        if result.openai_temperature < 0.0 || result.openai_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI temperature must be between 0 and 2."));
        }

        if result.openai_max_tokens < 1 || result.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        if result.transcript_length < 1 || result.transcript_length > 100 {
            return Err(anyhow::anyhow!("Transcript length must be between 1 and 100."));
        }

        if result.replay_tolerance_secs < 1 {
            return Err(anyhow::anyhow!("Replay tolerance must be at least 1 second."));
        }

        if result.dedup_window_secs < 1 {
            return Err(anyhow::anyhow!("Duplicate suppression window must be at least 1 second."));
        }

        Ok(result)
    }
}
