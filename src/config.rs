//! Last-used destination folder, stored as a one-key JSON file in the home directory

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;

/// File name of the record inside the home directory
pub const CONFIG_FILE_NAME: &str = ".yt_dlp_gui_config.json";

/// The whole persisted state
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LastFolderConfig {
    pub last_folder: Option<PathBuf>,
}

/// Reads and writes [`LastFolderConfig`] at a fixed path
#[derive(Clone, Debug)]
pub struct FolderStore {
    path: PathBuf,
}

impl FolderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.yt_dlp_gui_config.json`, or in the working directory when there is no home
    pub fn in_home() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the saved folder if it still exists. Never fails: a missing or
    /// malformed file just means there is no prior folder.
    pub fn load(&self) -> Option<PathBuf> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), "no saved folder: {e}");
                return None;
            }
        };

        let config: LastFolderConfig = match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring malformed config: {e}");
                return None;
            }
        };

        config.last_folder.filter(|folder| folder.is_dir())
    }

    /// Overwrites the record with `folder`
    pub fn save(&self, folder: &Path) -> Result<(), ConfigError> {
        let config = LastFolderConfig {
            last_folder: Some(folder.to_path_buf()),
        };
        let content = serde_json::to_string_pretty(&config)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Folder pre-filled in the destination field on startup
pub fn default_destination(store: &FolderStore) -> PathBuf {
    if let Some(folder) = store.load() {
        return folder;
    }
    match dirs::home_dir() {
        Some(home) => fallback_destination(&home),
        None => PathBuf::from("."),
    }
}

/// `~/Videos`, then `~/Vídeos`, then the home directory itself
fn fallback_destination(home: &Path) -> PathBuf {
    ["Videos", "Vídeos"]
        .iter()
        .map(|name| home.join(name))
        .find(|dir| dir.is_dir())
        .unwrap_or_else(|| home.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> FolderStore {
        FolderStore::new(dir.path().join(CONFIG_FILE_NAME))
    }

    #[test]
    fn absent_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store_in(&dir).load(), None);
    }

    #[test]
    fn malformed_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load(), None);

        fs::write(store.path(), r#"{"last_folder": 42}"#).unwrap();
        assert_eq!(store.load(), None);

        fs::write(store.path(), "null").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn save_then_load_returns_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let target = dir.path().join("downloads");
        fs::create_dir(&target).unwrap();

        store.save(&target).unwrap();
        assert_eq!(store.load(), Some(target));
    }

    #[test]
    fn save_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"last_folder": "/old", "extra": true}"#).unwrap();

        store.save(dir.path()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let object = raw.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(
            object["last_folder"].as_str().unwrap(),
            dir.path().to_str().unwrap()
        );
    }

    #[test]
    fn vanished_folder_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&dir.path().join("gone")).unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn default_destination_prefers_saved_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(dir.path()).unwrap();
        assert_eq!(default_destination(&store), dir.path());
    }

    #[test]
    fn default_destination_survives_broken_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "garbage").unwrap();
        assert!(!default_destination(&store).as_os_str().is_empty());
    }

    #[test]
    fn fallback_picks_videos_folder_when_present() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(fallback_destination(home.path()), home.path());

        fs::create_dir(home.path().join("Vídeos")).unwrap();
        assert_eq!(fallback_destination(home.path()), home.path().join("Vídeos"));

        fs::create_dir(home.path().join("Videos")).unwrap();
        assert_eq!(fallback_destination(home.path()), home.path().join("Videos"));
    }
}
