pub mod agent;
pub mod cli;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod models;
pub mod panel;
pub mod storage;

use agent::ChatAgent;
use cli::Args;
use conversation::ConversationStore;
use llm::CompletionConfig;
use llm::chat::new_client as new_chat_client;
use llm::rate_limit::RateLimiter;
use log::info;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = CompletionConfig::from_args(&args)?;

    info!("--- Core Configuration ---");
    info!("Completion Endpoint: {}", config.endpoint);
    info!("Model: {}", config.model);
    info!("Temperature: {}", config.temperature);
    info!("Max Tokens: {}", config.max_tokens);
    info!("Request Timeout: {}s", config.request_timeout.as_secs());
    info!("Rate Limit: {} per {}s", args.rate_limit_max, args.rate_limit_window_secs);
    info!("Credential Store: {}", args.credential_store);
    info!("API Key From Environment: {}", args.api_key.is_some());
    info!("-------------------------");

    if args.rate_limit_max == 0 || args.rate_limit_window_secs == 0 {
        return Err("Rate limit quota and window must both be positive".into());
    }
    let limiter = Arc::new(
        RateLimiter::new(args.rate_limit_max, Duration::from_secs(args.rate_limit_window_secs))
    );
    let chat_client = new_chat_client(&config, limiter)?;

    let storage = storage::create_store(&args)?;
    let store = Arc::new(ConversationStore::with_fallback_credential(storage, args.api_key.clone()));
    let agent = ChatAgent::new(store.clone(), chat_client).with_request_timeout(config.request_timeout);

    store.toggle_open();
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    panel::run_panel(&agent, stdin, tokio::io::stdout()).await?;

    Ok(())
}
