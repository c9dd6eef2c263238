use crate::conversation::ConversationStore;
use crate::error::{ CompletionError, StorageError };
use crate::llm::chat::ChatClient;
use crate::llm::DEFAULT_REQUEST_TIMEOUT;
use crate::models::chat::{ Message, Role };

use log::{ info, warn };
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("A request is already in progress")]
    Busy,
    #[error("Please enter your API key to continue")]
    CredentialRequired,
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

impl SubmitError {
    /// True when the view should ask for an API key before the next try.
    pub fn requires_credential(&self) -> bool {
        match self {
            SubmitError::CredentialRequired => true,
            SubmitError::Completion(e) => e.indicates_credential_problem(),
            _ => false,
        }
    }
}

/// Drives one submission at a time from user input to assistant reply.
#[derive(Clone)]
pub struct ChatAgent {
    store: Arc<ConversationStore>,
    chat_client: Arc<dyn ChatClient>,
    request_timeout: Duration,
}

impl ChatAgent {
    pub fn new(store: Arc<ConversationStore>, chat_client: Arc<dyn ChatClient>) -> Self {
        Self {
            store,
            chat_client,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Appends the user message, asks for a completion over the whole
    /// transcript and appends the reply. Returns the assistant message.
    ///
    /// Nothing is appended when the input is blank, another request is in
    /// flight, or no API key is set. The loading flag is released on every
    /// path out of this function.
    pub async fn submit(&self, input: &str) -> Result<Message, SubmitError> {
        if input.trim().is_empty() {
            return Err(SubmitError::EmptyInput);
        }
        if self.store.is_loading() {
            return Err(SubmitError::Busy);
        }
        let credential = match self.store.credential() {
            Some(key) if !key.trim().is_empty() => key,
            _ => {
                info!("Submission held back: no API key set");
                return Err(SubmitError::CredentialRequired);
            }
        };

        let _loading = self.store.begin_request().ok_or(SubmitError::Busy)?;
        self.store.add_message(Role::User, input);
        let transcript = self.store.messages();

        let result = match
            timeout(self.request_timeout, self.chat_client.send(&transcript, &credential)).await
        {
            Ok(result) => result,
            Err(_) => Err(CompletionError::Timeout(self.request_timeout)),
        };

        match result {
            Ok(reply) => Ok(self.store.add_message(Role::Assistant, reply)),
            Err(e) => {
                warn!("Completion failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Saves a key typed by the user. Blank input is ignored and yields `false`.
    pub fn save_credential(&self, input: &str) -> Result<bool, StorageError> {
        let key = input.trim();
        if key.is_empty() {
            return Ok(false);
        }
        self.store.set_credential(key)?;
        Ok(true)
    }
}
