// Offline cache worker
// Pre-caches the app shell, answers fetches cache-first and handles push notifications

use crate::error::{AppError, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use std::collections::HashMap;

pub const CACHE_NAME: &str = "ai-todo-pwa-v1";
pub const PRECACHE_PATHS: [&str; 4] = ["/", "/manifest.json", "/icon-192x192.png", "/icon-512x512.png"];
pub const NOTIFICATION_ICON: &str = "/icon-192x192.png";

/// Mirrors the response types a browser distinguishes; only same-origin ("basic") responses get cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Basic,
    Cors,
    Opaque,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub kind: ResponseKind,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<CachedResponse>;
}

/// Named caches, each mapping a request path to a stored response.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: HashMap<String, HashMap<String, CachedResponse>>,
}

impl CacheStorage {
    pub fn open(&mut self, name: &str) -> &mut HashMap<String, CachedResponse> {
        self.caches.entry(name.to_string()).or_default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn delete(&mut self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    /// Looks through every cache, like `caches.match`.
    pub fn match_any(&self, path: &str) -> Option<&CachedResponse> {
        self.caches.values().find_map(|cache| cache.get(path))
    }
}

pub struct CacheWorker<N> {
    network: N,
    storage: CacheStorage,
    cache_name: String,
}

impl<N: Network> CacheWorker<N> {
    pub fn new(network: N) -> Self {
        Self::with_storage(network, CacheStorage::default())
    }

    pub fn with_storage(network: N, storage: CacheStorage) -> Self {
        Self {
            network,
            storage,
            cache_name: CACHE_NAME.to_string(),
        }
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Fetches the whole allow-list; nothing is stored unless every fetch succeeds.
    pub async fn install(&mut self) -> Result<()> {
        let network = &self.network;
        let responses = try_join_all(PRECACHE_PATHS.iter().map(|path| async move {
            let response = network.fetch(path).await?;
            if !(200..300).contains(&response.status) {
                return Err(AppError::Upstream {
                    status: response.status,
                    message: format!("failed to pre-cache {}", path),
                });
            }
            Ok::<_, AppError>((path.to_string(), response))
        }))
        .await?;

        let cache = self.storage.open(&self.cache_name);
        cache.extend(responses);
        tracing::info!("Pre-cached {} assets into {}", PRECACHE_PATHS.len(), self.cache_name);
        Ok(())
    }

    /// Drops every cache left over from an older version. Returns the names removed.
    pub fn activate(&mut self) -> Vec<String> {
        let stale: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|name| *name != self.cache_name)
            .collect();
        for name in &stale {
            self.storage.delete(name);
            tracing::info!("Deleted stale cache {}", name);
        }
        stale
    }

    pub async fn fetch(&mut self, path: &str) -> Result<CachedResponse> {
        if let Some(hit) = self.storage.match_any(path) {
            return Ok(hit.clone());
        }

        let response = self.network.fetch(path).await?;
        if response.status == 200 && response.kind == ResponseKind::Basic {
            self.storage
                .open(&self.cache_name)
                .insert(path.to_string(), response.clone());
        }
        Ok(response)
    }
}

#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub url: String,
}

impl PushNotification {
    /// Builds the notification shown for a push message. An empty payload uses the defaults.
    pub fn from_payload(raw: &str) -> Result<Self> {
        let payload: PushPayload = if raw.trim().is_empty() {
            PushPayload::default()
        } else {
            serde_json::from_str(raw)?
        };

        Ok(Self {
            title: payload.title.unwrap_or_else(|| "Notification".to_string()),
            body: payload.body.unwrap_or_else(|| "New notification".to_string()),
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_ICON.to_string(),
            url: payload.url.unwrap_or_else(|| "/".to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientWindow {
    pub id: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowAction {
    Focus(u32),
    Open(String),
}

/// Focus a tab already showing the notification's URL, else open one.
pub fn notification_click(notification: &PushNotification, windows: &[ClientWindow]) -> WindowAction {
    windows
        .iter()
        .find(|window| window.url == notification.url)
        .map(|window| WindowAction::Focus(window.id))
        .unwrap_or_else(|| WindowAction::Open(notification.url.clone()))
}

/// Fetches app-shell assets from the server over HTTP.
pub struct HttpNetwork {
    client: reqwest::Client,
    origin: String,
}

impl HttpNetwork {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            origin: origin.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, path: &str) -> Result<CachedResponse> {
        let response = self.client.get(format!("{}{}", self.origin, path)).send().await?;

        let final_url = response.url();
        let same_origin = final_url.origin().ascii_serialization() == self.origin;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(CachedResponse {
            status,
            kind: if same_origin { ResponseKind::Basic } else { ResponseKind::Cors },
            content_type,
            body,
        })
    }
}
