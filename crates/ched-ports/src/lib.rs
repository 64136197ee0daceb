pub mod config;
pub mod storage;
pub mod types;

pub use config::*;
pub use storage::*;
pub use types::*;
