//! Conversation state shared by the chat panel and the submission workflow.
//!
//! State lives inside a `watch` channel: the sender serializes every
//! mutation, so the transcript is totally ordered by append, and views can
//! `subscribe` to be woken on each change.

use crate::error::StorageError;
use crate::models::chat::{ ConversationState, Message, Role };
use crate::storage::{ KeyValueStore, CREDENTIAL_KEY };
use log::{ debug, error, info };
use std::sync::Arc;
use tokio::sync::watch;

pub struct ConversationStore {
    state: watch::Sender<ConversationState>,
    storage: Arc<dyn KeyValueStore>,
}

impl ConversationStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::with_fallback_credential(storage, None)
    }

    /// Loads the saved credential; when none is saved, `fallback` is used for
    /// this session only and is not written back to storage.
    pub fn with_fallback_credential(
        storage: Arc<dyn KeyValueStore>,
        fallback: Option<String>
    ) -> Self {
        let stored = match storage.get(CREDENTIAL_KEY) {
            Ok(value) => non_empty(value),
            Err(e) => {
                error!("Failed to read saved API key: {}", e);
                None
            }
        };
        let credential = match stored {
            Some(key) => {
                info!("Using saved API key");
                Some(key)
            }
            None => {
                let fallback = non_empty(fallback);
                if fallback.is_some() {
                    info!("No saved API key; using the configured one for this session");
                } else {
                    info!("No API key configured; the chat will ask for one");
                }
                fallback
            }
        };

        let (state, _) = watch::channel(ConversationState {
            credential,
            ..Default::default()
        });
        Self { state, storage }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ConversationState {
        self.state.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().is_open
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.borrow().messages.clone()
    }

    pub fn credential(&self) -> Option<String> {
        self.state.borrow().credential.clone()
    }

    /// Flips the panel and returns the new value.
    pub fn toggle_open(&self) -> bool {
        let mut now_open = false;
        self.state.send_modify(|s| {
            s.is_open = !s.is_open;
            now_open = s.is_open;
        });
        now_open
    }

    pub fn add_message(&self, role: Role, content: impl Into<String>) -> Message {
        let message = Message::new(role, content);
        self.state.send_modify(|s| s.messages.push(message.clone()));
        debug!("Appended {} message {}", message.role, message.id);
        message
    }

    pub fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.is_loading != loading;
            s.is_loading = loading;
            changed
        });
    }

    /// Marks a request in flight unless one already is. The returned guard
    /// clears the flag when dropped.
    pub fn begin_request(&self) -> Option<LoadingGuard<'_>> {
        let mut acquired = false;
        self.state.send_if_modified(|s| {
            if s.is_loading {
                return false;
            }
            s.is_loading = true;
            acquired = true;
            true
        });
        // Built only on success: dropping a guard clears the flag.
        acquired.then(|| LoadingGuard { store: self })
    }

    /// Updates the in-memory credential, then persists it. An empty or
    /// whitespace-only value clears the credential for this session.
    pub fn set_credential(&self, value: &str) -> Result<(), StorageError> {
        let credential = non_empty(Some(value.to_string()));
        self.state.send_modify(|s| {
            s.credential = credential;
        });
        self.storage.set(CREDENTIAL_KEY, value)?;
        info!("API key saved");
        Ok(())
    }
}

pub struct LoadingGuard<'a> {
    store: &'a ConversationStore,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.store.set_loading(false);
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
