use super::Store;
use super::types::{ChatMessage, DocumentRecord, ScheduleEvent, UserProfile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::info;

const KV: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

// Persisted key layout. Load-bearing: changing a prefix orphans existing
// on-device data.
const DOC_PREFIX: &str = "docs:";
const EVENT_PREFIX: &str = "events:";
const CHAT_PREFIX: &str = "chat:";
const PROFILE_KEY: &str = "profile";
const INSTRUCTION_KEY: &str = "system_instruction";

pub const GUEST_ID: &str = "local";

/// Embedded on-device store: one key-value table, `serde_json` values.
pub struct LocalStore {
    db: Database,
}

impl LocalStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;
        let path = data_dir.join("chalkbox.redb");

        let db = Database::create(&path)
            .with_context(|| format!("Failed to open local store at {}", path.display()))?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(KV)?;
        }
        write_txn.commit()?;

        info!("Local store ready at {}", path.display());
        Ok(Self { db })
    }

    fn read_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KV)?;
        match table.get(key)? {
            Some(raw) => {
                let value = serde_json::from_slice(raw.value())
                    .with_context(|| format!("Corrupt local record at key {}", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn write_value<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_vec(value)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV)?;
            table.insert(key, raw.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn read_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        Ok(self.read_value(key)?.unwrap_or_default())
    }

    fn doc_key(owner_id: &str) -> String {
        format!("{}{}", DOC_PREFIX, owner_id)
    }

    fn event_key(owner_id: &str) -> String {
        format!("{}{}", EVENT_PREFIX, owner_id)
    }

    fn chat_key(owner_id: &str) -> String {
        format!("{}{}", CHAT_PREFIX, owner_id)
    }
}

#[async_trait]
impl Store for LocalStore {
    async fn profile(&self, _session_token: &str) -> Result<Option<UserProfile>> {
        let stored: Option<UserProfile> = self.read_value(PROFILE_KEY)?;
        Ok(Some(stored.unwrap_or_else(|| {
            UserProfile::default_for(GUEST_ID, "Educator")
        })))
    }

    async fn documents(&self, owner_id: &str) -> Result<Vec<DocumentRecord>> {
        self.read_list(&Self::doc_key(owner_id))
    }

    async fn save_document(&self, doc: &DocumentRecord) -> Result<()> {
        let key = Self::doc_key(&doc.owner_id);
        let mut docs: Vec<DocumentRecord> = self.read_list(&key)?;
        docs.retain(|d| d.id != doc.id);
        docs.push(doc.clone());
        self.write_value(&key, &docs)
    }

    async fn delete_document(&self, owner_id: &str, id: &str) -> Result<()> {
        let key = Self::doc_key(owner_id);
        let mut docs: Vec<DocumentRecord> = self.read_list(&key)?;
        docs.retain(|d| d.id != id);
        self.write_value(&key, &docs)
    }

    async fn events(&self, owner_id: &str) -> Result<Vec<ScheduleEvent>> {
        self.read_list(&Self::event_key(owner_id))
    }

    async fn save_event(&self, event: &ScheduleEvent) -> Result<()> {
        let key = Self::event_key(&event.owner_id);
        let mut events: Vec<ScheduleEvent> = self.read_list(&key)?;
        events.retain(|e| e.id != event.id);
        events.push(event.clone());
        self.write_value(&key, &events)
    }

    async fn delete_event(&self, owner_id: &str, id: &str) -> Result<()> {
        let key = Self::event_key(owner_id);
        let mut events: Vec<ScheduleEvent> = self.read_list(&key)?;
        events.retain(|e| e.id != id);
        self.write_value(&key, &events)
    }

    async fn transcript(&self, owner_id: &str) -> Result<Vec<ChatMessage>> {
        self.read_list(&Self::chat_key(owner_id))
    }

    async fn save_transcript(&self, owner_id: &str, messages: &[ChatMessage]) -> Result<()> {
        self.write_value(&Self::chat_key(owner_id), &messages)
    }

    async fn system_instruction(&self) -> Result<Option<String>> {
        self.read_value(INSTRUCTION_KEY)
    }

    async fn set_system_instruction(&self, text: &str) -> Result<()> {
        self.write_value(INSTRUCTION_KEY, &text)
    }
}

#[cfg(test)]
pub(crate) fn temp_store() -> LocalStore {
    let dir = std::env::temp_dir().join(format!("chalkbox-test-{}", uuid::Uuid::new_v4()));
    LocalStore::open(&dir).expect("temp store")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{PlanTier, Role, SourceKind};

    #[tokio::test]
    async fn test_transcript_round_trip_preserves_order_and_content() {
        let store = temp_store();
        let messages = vec![
            ChatMessage::user("What is photosynthesis?"),
            ChatMessage::assistant("Photosynthesis converts light into chemical energy."),
            ChatMessage::user("Make that simpler."),
        ];

        store.save_transcript("owner-1", &messages).await.unwrap();
        let loaded = store.transcript("owner-1").await.unwrap();

        assert_eq!(loaded.len(), messages.len());
        for (saved, read) in messages.iter().zip(loaded.iter()) {
            assert_eq!(saved.id, read.id);
            assert_eq!(saved.role, read.role);
            assert_eq!(saved.text, read.text);
        }
    }

    #[tokio::test]
    async fn test_transcript_save_is_full_replace() {
        let store = temp_store();
        store
            .save_transcript("owner-1", &[ChatMessage::user("one"), ChatMessage::user("two")])
            .await
            .unwrap();
        store
            .save_transcript("owner-1", &[ChatMessage::user("only")])
            .await
            .unwrap();

        let loaded = store.transcript("owner-1").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].text, "only");
    }

    #[tokio::test]
    async fn test_documents_are_scoped_by_owner() {
        let store = temp_store();
        let doc_a = DocumentRecord::new("alice", "syllabus.txt", SourceKind::Txt, "a".into(), 1);
        let doc_b = DocumentRecord::new("bob", "notes.txt", SourceKind::Txt, "b".into(), 1);
        store.save_document(&doc_a).await.unwrap();
        store.save_document(&doc_b).await.unwrap();

        let alice_docs = store.documents("alice").await.unwrap();
        assert_eq!(alice_docs.len(), 1);
        assert_eq!(alice_docs[0].name, "syllabus.txt");
    }

    #[tokio::test]
    async fn test_delete_document_removes_only_the_target() {
        let store = temp_store();
        let doc_a = DocumentRecord::new("alice", "a.txt", SourceKind::Txt, "a".into(), 1);
        let doc_b = DocumentRecord::new("alice", "b.txt", SourceKind::Txt, "b".into(), 1);
        store.save_document(&doc_a).await.unwrap();
        store.save_document(&doc_b).await.unwrap();

        store.delete_document("alice", &doc_a.id).await.unwrap();
        let remaining = store.documents("alice").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, doc_b.id);
    }

    #[tokio::test]
    async fn test_profile_defaults_to_guest() {
        let store = temp_store();
        let profile = store.profile("").await.unwrap().unwrap();
        assert_eq!(profile.id, GUEST_ID);
        assert_eq!(profile.role, Role::User);
        assert_eq!(profile.plan, PlanTier::Free);
    }

    #[tokio::test]
    async fn test_system_instruction_round_trip() {
        let store = temp_store();
        assert!(store.system_instruction().await.unwrap().is_none());

        store
            .set_system_instruction("Answer like a patient teacher.")
            .await
            .unwrap();
        assert_eq!(
            store.system_instruction().await.unwrap().as_deref(),
            Some("Answer like a patient teacher.")
        );
    }
}
