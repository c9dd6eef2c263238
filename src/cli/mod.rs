use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Completion Provider Args ---
    /// Chat completion endpoint (OpenAI-compatible, e.g. https://api.deepseek.com/v1/chat/completions)
    #[arg(long, env = "CHAT_ENDPOINT", default_value = "https://api.deepseek.com/v1/chat/completions")]
    pub endpoint: String,

    /// Model identifier sent with every completion request
    #[arg(long, env = "CHAT_MODEL", default_value = "deepseek-chat")]
    pub model: String,

    /// API key used when none has been saved yet. Never written to the credential store.
    #[arg(long, env = "CHAT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Sampling temperature
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.7")]
    pub temperature: f32,

    /// Maximum number of output tokens per completion
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "1000")]
    pub max_tokens: u32,

    /// Seconds to wait for a completion before giving up
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    // --- Rate Limit Args ---
    /// Maximum completion requests within one rate-limit window
    #[arg(long, env = "RATE_LIMIT_MAX", default_value = "10")]
    pub rate_limit_max: usize,

    /// Length of the sliding rate-limit window in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value = "60")]
    pub rate_limit_window_secs: u64,

    // --- Credential Store Args ---
    /// Where the API key is persisted (file, memory)
    #[arg(long, env = "CREDENTIAL_STORE", default_value = "file")]
    pub credential_store: String,

    /// Path of the credential file. Defaults to <config dir>/vetclinic-assistant/credentials.json
    #[arg(long, env = "CREDENTIAL_PATH")]
    pub credential_path: Option<PathBuf>,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
