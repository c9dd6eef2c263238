pub mod file;
pub mod memory;

use crate::cli::Args;
use crate::error::{ ConfigError, StorageError };
use log::info;
use std::error::Error;
use std::sync::Arc;

/// Key under which the chat API key is persisted.
pub const CREDENTIAL_KEY: &str = "chat-api-key";

/// Small durable key-value port. Backends decide where values live.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

pub fn create_store(args: &Args) -> Result<Arc<dyn KeyValueStore>, Box<dyn Error + Send + Sync>> {
    match args.credential_store.to_lowercase().as_str() {
        "file" => {
            let store = match &args.credential_path {
                Some(path) => file::FileStore::new(path.clone()),
                None => file::FileStore::in_config_dir()?,
            };
            info!("API key will be stored in: {}", store.path().display());
            Ok(Arc::new(store))
        }
        "memory" => {
            info!("API key will be kept in memory for this session only");
            Ok(Arc::new(memory::MemoryStore::new()))
        }
        other => Err(Box::new(ConfigError::UnsupportedStore(other.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_create_memory_store() {
        let args = Args::parse_from(["vetclinic-assistant", "--credential-store", "memory"]);
        let store = create_store(&args).unwrap();
        assert_eq!(store.get(CREDENTIAL_KEY).unwrap(), None);
    }

    #[test]
    fn test_create_file_store_at_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        let args = Args::parse_from([
            "vetclinic-assistant",
            "--credential-store",
            "FILE",
            "--credential-path",
            path.to_str().unwrap(),
        ]);
        let store = create_store(&args).unwrap();
        store.set(CREDENTIAL_KEY, "sk-file").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unknown_store_type() {
        let args = Args::parse_from(["vetclinic-assistant", "--credential-store", "redis"]);
        let err = create_store(&args).err().unwrap();
        assert!(err.to_string().contains("redis"));
    }
}
