//! Devnet state persistence
//!
//! State is written as pretty JSON through a temporary file and an atomic
//! rename, keeping a rotating set of backups of the previous versions.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub state_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".quorum_data"),
            state_file: "state.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// JSON state store rooted at a data directory
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn state_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.state_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.state_file, index))
    }

    /// Persist `state`, backing up the previous version first
    pub fn save<T: Serialize>(&self, state: &T) -> Result<(), StorageError> {
        let path = self.state_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.state_file));
        let writer = BufWriter::new(fs::File::create(&temp_path)?);
        serde_json::to_writer_pretty(writer, state)?;

        fs::rename(&temp_path, &path)?;
        log::debug!("Saved state to {:?}", path);
        Ok(())
    }

    pub fn load<T: DeserializeOwned>(&self) -> Result<T, StorageError> {
        let path = self.state_path();
        if !path.exists() {
            return Err(StorageError::InvalidData("State file not found".to_string()));
        }
        read_json(&path)
    }

    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    pub fn delete(&self) -> Result<(), StorageError> {
        let path = self.state_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn rotate_backups(&self) -> Result<(), StorageError> {
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }
        Ok(())
    }

    /// Load a previous version; 0 is the most recent backup
    pub fn restore_backup<T: DeserializeOwned>(&self, index: usize) -> Result<T, StorageError> {
        let path = self.backup_path(index);
        if !path.exists() {
            return Err(StorageError::InvalidData(format!("Backup {} not found", index)));
        }
        read_json(&path)
    }

    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let reader = BufReader::new(fs::File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Host, LocalChain};
    use crate::multisig::Identity;

    fn storage(temp_dir: &tempfile::TempDir, max_backups: usize) -> Storage {
        Storage::new(StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            max_backups,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_save_load_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 5);
        assert!(!storage.exists());

        let mut chain = LocalChain::new(7);
        chain.mint(&Identity::new([1; 20]), 99).unwrap();
        storage.save(&chain).unwrap();
        assert!(storage.exists());

        let loaded: LocalChain = storage.load().unwrap();
        assert_eq!(loaded.chain_id(), 7);
        assert_eq!(loaded.balance_of(&Identity::new([1; 20])), 99);
    }

    #[test]
    fn test_missing_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 5);
        assert!(matches!(
            storage.load::<LocalChain>(),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 3);

        for version in 0..5u64 {
            storage.save(&version).unwrap();
        }

        assert_eq!(storage.list_backups(), vec![0, 1, 2]);
        assert_eq!(storage.load::<u64>().unwrap(), 4);
        assert_eq!(storage.restore_backup::<u64>(0).unwrap(), 3);
        assert_eq!(storage.restore_backup::<u64>(2).unwrap(), 1);
        assert!(storage.restore_backup::<u64>(3).is_err());
    }

    #[test]
    fn test_delete() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 0);
        storage.save(&1u8).unwrap();
        storage.delete().unwrap();
        assert!(!storage.exists());
        assert!(storage.list_backups().is_empty());
    }
}
