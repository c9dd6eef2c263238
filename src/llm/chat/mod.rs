pub mod completion;

use async_trait::async_trait;
use std::sync::Arc;
use super::CompletionConfig;
use super::rate_limit::RateLimiter;
use self::completion::CompletionClient;
use crate::error::CompletionError;
use crate::models::chat::Message;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends the whole transcript, in order, and returns the assistant reply.
    async fn send(
        &self,
        transcript: &[Message],
        credential: &str
    ) -> Result<String, CompletionError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(
    config: &CompletionConfig,
    limiter: Arc<RateLimiter>
) -> Result<Arc<dyn ChatClient>, CompletionError> {
    let client = CompletionClient::from_config(config, limiter)?;
    Ok(Arc::new(client))
}
