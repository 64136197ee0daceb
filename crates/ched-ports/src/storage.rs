use crate::config::ChedConfig;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serde(String),
    #[error("incompatible file: {0}")]
    Incompatible(String),
}

pub trait StoragePort: Send + Sync {
    fn load_config(&self) -> Result<ChedConfig, StorageError>;
    fn save_config(&self, config: &ChedConfig) -> Result<(), StorageError>;
}
