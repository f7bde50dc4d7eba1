use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub mod fallback;
pub mod local;
pub mod remote;
pub mod types;

pub use fallback::FallbackStore;
pub use local::LocalStore;
pub use remote::RemoteStore;

use types::{ChatMessage, DocumentRecord, ScheduleEvent, UserProfile};

/// Entity persistence surface. Two implementations (remote row store, local
/// embedded store) share this contract; callers never branch on the backend.
#[async_trait]
pub trait Store: Send + Sync {
    async fn profile(&self, session_token: &str) -> Result<Option<UserProfile>>;

    async fn documents(&self, owner_id: &str) -> Result<Vec<DocumentRecord>>;
    async fn save_document(&self, doc: &DocumentRecord) -> Result<()>;
    async fn delete_document(&self, owner_id: &str, id: &str) -> Result<()>;

    async fn events(&self, owner_id: &str) -> Result<Vec<ScheduleEvent>>;
    async fn save_event(&self, event: &ScheduleEvent) -> Result<()>;
    async fn delete_event(&self, owner_id: &str, id: &str) -> Result<()>;

    async fn transcript(&self, owner_id: &str) -> Result<Vec<ChatMessage>>;
    async fn save_transcript(&self, owner_id: &str, messages: &[ChatMessage]) -> Result<()>;

    async fn system_instruction(&self) -> Result<Option<String>>;
    async fn set_system_instruction(&self, text: &str) -> Result<()>;
}

pub struct Backing {
    pub store: Arc<dyn Store>,
    pub remote: bool,
}

const PLACEHOLDER_MARKERS: &[&str] = &["your-project", "your_", "your-", "changeme", "example.com"];

fn looks_placeholder(value: &str) -> bool {
    let lowered = value.to_ascii_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|m| lowered.contains(m))
}

fn remote_configured(url: &str, key: &str) -> bool {
    if url.is_empty() || key.is_empty() {
        return false;
    }
    if looks_placeholder(url) || looks_placeholder(key) {
        return false;
    }
    match reqwest::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Decide the backing store once at startup. A missing or malformed remote
/// configuration permanently selects the local store for the process
/// lifetime; there is no runtime re-probe.
pub fn select(config: &Config) -> Result<Backing> {
    let local = LocalStore::open(&config.data_dir)?;

    if remote_configured(&config.remote_url, &config.remote_key) {
        info!("Remote backing store configured: {}", config.remote_url);
        let remote = RemoteStore::new(&config.remote_url, &config.remote_key);
        Ok(Backing {
            store: Arc::new(FallbackStore::new(remote, local)),
            remote: true,
        })
    } else {
        info!("No usable remote store configuration, running on the local store");
        Ok(Backing {
            store: Arc::new(local),
            remote: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_configured_accepts_valid_config() {
        assert!(remote_configured("https://db.chalkbox.app", "service-key-123"));
        assert!(remote_configured("http://localhost:54321", "local-anon-key"));
    }

    #[test]
    fn test_remote_configured_rejects_empty_values() {
        assert!(!remote_configured("", "key"));
        assert!(!remote_configured("https://db.chalkbox.app", ""));
        assert!(!remote_configured("", ""));
    }

    #[test]
    fn test_remote_configured_rejects_placeholders() {
        assert!(!remote_configured("https://YOUR-PROJECT.example.com", "key"));
        assert!(!remote_configured("https://db.chalkbox.app", "YOUR_API_KEY"));
        assert!(!remote_configured("https://changeme.io", "key"));
    }

    #[test]
    fn test_remote_configured_rejects_malformed_urls() {
        assert!(!remote_configured("not a url", "key"));
        assert!(!remote_configured("ftp://db.chalkbox.app", "key"));
    }
}
