//! Mock Torznab search service

use async_trait::async_trait;
use reseed_core::{
    FeedItem, ReseedError, Result, SearchResult, SearchService, TorznabQuery,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock search layer with canned responses
#[derive(Clone, Default)]
pub struct MockSearchService {
    /// Results returned for any search
    pub results: Arc<Mutex<Vec<SearchResult>>>,
    /// Feed items per indexer
    pub feeds: Arc<Mutex<HashMap<i32, Vec<FeedItem>>>>,
    /// Torrent bytes per download URL
    pub torrents: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    /// When set, every search fails with a rate limit for this indexer
    pub rate_limited_indexer: Arc<Mutex<Option<i32>>>,
    /// Queries observed, for assertions
    pub queries: Arc<Mutex<Vec<TorznabQuery>>>,
}

impl MockSearchService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(self, result: SearchResult) -> Self {
        self.results.lock().unwrap().push(result);
        self
    }

    pub fn with_torrent(self, url: &str, bytes: Vec<u8>) -> Self {
        self.torrents.lock().unwrap().insert(url.to_string(), bytes);
        self
    }
}

#[async_trait]
impl SearchService for MockSearchService {
    async fn search(
        &self,
        _indexer_ids: &[i32],
        query: &TorznabQuery,
        _categories: &[i32],
    ) -> Result<Vec<SearchResult>> {
        if let Some(indexer_id) = *self.rate_limited_indexer.lock().unwrap() {
            return Err(ReseedError::RateLimited {
                indexer_id,
                retry_after_secs: 600,
            });
        }
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.results.lock().unwrap().clone())
    }

    async fn feed(&self, indexer_id: i32) -> Result<Vec<FeedItem>> {
        Ok(self
            .feeds
            .lock()
            .unwrap()
            .get(&indexer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_torrent(&self, _indexer_id: i32, download_url: &str) -> Result<Vec<u8>> {
        self.torrents
            .lock()
            .unwrap()
            .get(download_url)
            .cloned()
            .ok_or_else(|| ReseedError::ExternalServiceError {
                service: "search".to_string(),
                error: format!("no torrent registered for {}", download_url),
            })
    }
}
