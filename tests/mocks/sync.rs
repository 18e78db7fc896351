//! Mock qBittorrent sync manager

use async_trait::async_trait;
use reseed_core::{
    CategoryInfo, ClientPreferences, ClientTorrent, ClientTorrentFile, Result, SyncManager,
    TorrentAction, TorrentFilter, TorrentProperties,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Record of one AddTorrent call
#[derive(Debug, Clone)]
pub struct AddedTorrent {
    pub instance_id: i32,
    pub bytes: Vec<u8>,
    pub options: HashMap<String, String>,
}

/// Mock qBittorrent instance backed by in-memory state
#[derive(Clone, Default)]
pub struct MockSyncManager {
    /// Torrents visible to enumeration and duplicate checks
    pub torrents: Arc<Mutex<Vec<ClientTorrent>>>,
    /// File listings per hash
    pub files: Arc<Mutex<HashMap<String, Vec<ClientTorrentFile>>>>,
    /// Every AddTorrent call made
    pub added: Arc<Mutex<Vec<AddedTorrent>>>,
    /// Every bulk action made
    pub actions: Arc<Mutex<Vec<(Vec<String>, TorrentAction)>>>,
    /// Folder renames, (old, new)
    pub renamed_folders: Arc<Mutex<Vec<(String, String)>>>,
    /// File renames, (old, new)
    pub renamed_files: Arc<Mutex<Vec<(String, String)>>>,
    /// Display renames, (hash, name)
    pub renamed_torrents: Arc<Mutex<Vec<(String, String)>>>,
    /// Known categories
    pub categories: Arc<Mutex<HashMap<String, CategoryInfo>>>,
    /// Scripted recheck observations, popped per properties call
    pub properties_script: Arc<Mutex<Vec<TorrentProperties>>>,
}

impl MockSyncManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_torrent(self, torrent: ClientTorrent) -> Self {
        self.torrents.lock().unwrap().push(torrent);
        self
    }

    pub fn add_calls(&self) -> Vec<AddedTorrent> {
        self.added.lock().unwrap().clone()
    }

    pub fn resume_count(&self) -> usize {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, action)| *action == TorrentAction::Resume)
            .count()
    }

    pub fn recheck_count(&self) -> usize {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, action)| *action == TorrentAction::Recheck)
            .count()
    }
}

#[async_trait]
impl SyncManager for MockSyncManager {
    async fn get_torrents(
        &self,
        _instance_id: i32,
        _filter: &TorrentFilter,
    ) -> Result<Vec<ClientTorrent>> {
        Ok(self.torrents.lock().unwrap().clone())
    }

    async fn get_torrent_files_batch(
        &self,
        _instance_id: i32,
        hashes: &[String],
    ) -> Result<HashMap<String, Vec<ClientTorrentFile>>> {
        let files = self.files.lock().unwrap();
        Ok(hashes
            .iter()
            .filter_map(|h| files.get(h).map(|f| (h.clone(), f.clone())))
            .collect())
    }

    async fn has_torrent_by_any_hash(
        &self,
        _instance_id: i32,
        hashes: &[String],
    ) -> Result<Option<ClientTorrent>> {
        let torrents = self.torrents.lock().unwrap();
        Ok(torrents
            .iter()
            .find(|t| hashes.contains(&t.hash))
            .cloned())
    }

    async fn get_torrent_properties(
        &self,
        _instance_id: i32,
        _hash: &str,
    ) -> Result<TorrentProperties> {
        let mut script = self.properties_script.lock().unwrap();
        if script.is_empty() {
            Ok(TorrentProperties {
                progress: 1.0,
                state: "pausedUP".to_string(),
                ..Default::default()
            })
        } else {
            Ok(script.remove(0))
        }
    }

    async fn get_app_preferences(&self, _instance_id: i32) -> Result<ClientPreferences> {
        Ok(ClientPreferences::default())
    }

    async fn add_torrent(
        &self,
        instance_id: i32,
        torrent: &[u8],
        options: &HashMap<String, String>,
    ) -> Result<()> {
        self.added.lock().unwrap().push(AddedTorrent {
            instance_id,
            bytes: torrent.to_vec(),
            options: options.clone(),
        });
        Ok(())
    }

    async fn bulk_action(
        &self,
        _instance_id: i32,
        hashes: &[String],
        action: TorrentAction,
    ) -> Result<()> {
        self.actions.lock().unwrap().push((hashes.to_vec(), action));
        Ok(())
    }

    async fn set_tags(&self, _instance_id: i32, _hashes: &[String], _tags: &[String]) -> Result<()> {
        Ok(())
    }

    async fn rename_torrent(&self, _instance_id: i32, hash: &str, name: &str) -> Result<()> {
        self.renamed_torrents
            .lock()
            .unwrap()
            .push((hash.to_string(), name.to_string()));
        Ok(())
    }

    async fn rename_torrent_file(
        &self,
        _instance_id: i32,
        _hash: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<()> {
        self.renamed_files
            .lock()
            .unwrap()
            .push((old_path.to_string(), new_path.to_string()));
        Ok(())
    }

    async fn rename_torrent_folder(
        &self,
        _instance_id: i32,
        _hash: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<()> {
        self.renamed_folders
            .lock()
            .unwrap()
            .push((old_path.to_string(), new_path.to_string()));
        Ok(())
    }

    async fn get_categories(&self, _instance_id: i32) -> Result<HashMap<String, CategoryInfo>> {
        Ok(self.categories.lock().unwrap().clone())
    }

    async fn create_category(&self, _instance_id: i32, name: &str, save_path: &str) -> Result<()> {
        self.categories.lock().unwrap().insert(
            name.to_string(),
            CategoryInfo {
                name: name.to_string(),
                save_path: save_path.to_string(),
            },
        );
        Ok(())
    }
}
