pub mod openai;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{ModelReply, ModelRequest};

// Traits.

/// Generic model gateway trait that clients must implement.
///
/// One operation: complete a request, selecting the text or vision call shape
/// by the request variant. Backend failures of any kind (authentication,
/// quota, malformed request, transient network errors) are folded into
/// [`ModelReply::Failed`] rather than surfaced as distinct errors; the
/// dispatcher only needs to know whether it has text to post.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Generate a completion for the given request.
    async fn complete(&self, request: &ModelRequest) -> ModelReply;
}

// Structs.

/// Model gateway client for the application.
///
/// This is trivially cloneable and can be passed around without the need for
/// `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
