use ched_domain_score::ScoreBook;
use ched_ports::config::ChedConfig;
use ched_ports::storage::{StorageError, StoragePort};
use ched_ports::types::FileVersion;
use std::fs;
use std::path::{Path, PathBuf};

pub struct FsStorage {
    config_path: PathBuf,
}

impl FsStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self::from_config_path(base_dir.join("config.json"))
    }

    pub fn from_config_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn default_base_dir() -> Result<PathBuf, StorageError> {
        let base = dirs_next::config_dir()
            .ok_or_else(|| StorageError::Io("config dir not found".to_string()))?;
        Ok(base.join("Ched"))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Reads a book and upgrades it to the current layout. Books written by a
    /// newer major version are refused before their body is interpreted.
    pub fn load_score_book(path: &Path) -> Result<ScoreBook, StorageError> {
        let value: serde_json::Value = Self::read_json(path)?;
        let version = match value.get("version") {
            Some(raw) => serde_json::from_value::<FileVersion>(raw.clone())
                .map_err(|e| StorageError::Serde(e.to_string()))?,
            None => FileVersion::default(),
        };
        if !ScoreBook::is_compatible(version) {
            return Err(StorageError::Incompatible(format!(
                "{} was written by version {version}",
                path.display()
            )));
        }

        let mut book: ScoreBook =
            serde_json::from_value(value).map_err(|e| StorageError::Serde(e.to_string()))?;
        let migrations = book.migrate();
        log::info!(
            "loaded score book {} ({} migrations)",
            path.display(),
            migrations.len()
        );
        Ok(book)
    }

    pub fn save_score_book(path: &Path, book: &ScoreBook) -> Result<(), StorageError> {
        Self::write_json(path, book)?;
        log::info!("saved score book {}", path.display());
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
        let data = fs::read(path).map_err(|e| StorageError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_slice(&data).map_err(|e| StorageError::Serde(e.to_string()))
    }

    fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        let data =
            serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serde(e.to_string()))?;
        fs::write(path, data).map_err(|e| StorageError::Io(format!("{}: {e}", path.display())))
    }
}

impl Default for FsStorage {
    fn default() -> Self {
        let base_dir = Self::default_base_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(base_dir)
    }
}

impl StoragePort for FsStorage {
    fn load_config(&self) -> Result<ChedConfig, StorageError> {
        let path = self.config_path();
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(ChedConfig::default());
        }
        Self::read_json(path)
    }

    fn save_config(&self, config: &ChedConfig) -> Result<(), StorageError> {
        Self::write_json(self.config_path(), config)
    }
}
