use super::Store;
use super::types::{ChatMessage, DocumentRecord, ScheduleEvent, UserProfile};
use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

/// Decorator over a (remote, local) pair. A failing remote call degrades to
/// the local store for that single operation only, so one missing table does
/// not disable the whole remote path. Reads fall back to local reads; failed
/// remote writes are duplicated into the local store so no write is lost.
/// Callers never observe a remote failure.
pub struct FallbackStore<R, L> {
    remote: R,
    local: L,
}

impl<R: Store, L: Store> FallbackStore<R, L> {
    pub fn new(remote: R, local: L) -> Self {
        Self { remote, local }
    }

    async fn write_with_fallback(
        &self,
        what: &str,
        remote_result: Result<()>,
        local_write: impl Future<Output = Result<()>>,
    ) -> Result<()> {
        match remote_result {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Remote {} write failed, keeping it locally: {}", what, e);
                local_write.await
            }
        }
    }
}

#[async_trait]
impl<R: Store, L: Store> Store for FallbackStore<R, L> {
    async fn profile(&self, session_token: &str) -> Result<Option<UserProfile>> {
        match self.remote.profile(session_token).await {
            Ok(profile) => Ok(profile),
            Err(e) => {
                warn!("Remote profile lookup failed, using local: {}", e);
                self.local.profile(session_token).await
            }
        }
    }

    async fn documents(&self, owner_id: &str) -> Result<Vec<DocumentRecord>> {
        match self.remote.documents(owner_id).await {
            Ok(docs) => Ok(docs),
            Err(e) => {
                warn!("Remote document list failed, using local: {}", e);
                self.local.documents(owner_id).await
            }
        }
    }

    async fn save_document(&self, doc: &DocumentRecord) -> Result<()> {
        let remote = self.remote.save_document(doc).await;
        self.write_with_fallback("document", remote, self.local.save_document(doc))
            .await
    }

    async fn delete_document(&self, owner_id: &str, id: &str) -> Result<()> {
        let remote = self.remote.delete_document(owner_id, id).await;
        self.write_with_fallback("document delete", remote, self.local.delete_document(owner_id, id))
            .await
    }

    async fn events(&self, owner_id: &str) -> Result<Vec<ScheduleEvent>> {
        match self.remote.events(owner_id).await {
            Ok(events) => Ok(events),
            Err(e) => {
                warn!("Remote event list failed, using local: {}", e);
                self.local.events(owner_id).await
            }
        }
    }

    async fn save_event(&self, event: &ScheduleEvent) -> Result<()> {
        let remote = self.remote.save_event(event).await;
        self.write_with_fallback("event", remote, self.local.save_event(event))
            .await
    }

    async fn delete_event(&self, owner_id: &str, id: &str) -> Result<()> {
        let remote = self.remote.delete_event(owner_id, id).await;
        self.write_with_fallback("event delete", remote, self.local.delete_event(owner_id, id))
            .await
    }

    async fn transcript(&self, owner_id: &str) -> Result<Vec<ChatMessage>> {
        match self.remote.transcript(owner_id).await {
            Ok(messages) => Ok(messages),
            Err(e) => {
                warn!("Remote transcript read failed, using local: {}", e);
                self.local.transcript(owner_id).await
            }
        }
    }

    async fn save_transcript(&self, owner_id: &str, messages: &[ChatMessage]) -> Result<()> {
        let remote = self.remote.save_transcript(owner_id, messages).await;
        self.write_with_fallback(
            "transcript",
            remote,
            self.local.save_transcript(owner_id, messages),
        )
        .await
    }

    async fn system_instruction(&self) -> Result<Option<String>> {
        match self.remote.system_instruction().await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!("Remote instruction read failed, using local: {}", e);
                self.local.system_instruction().await
            }
        }
    }

    async fn set_system_instruction(&self, text: &str) -> Result<()> {
        let remote = self.remote.set_system_instruction(text).await;
        self.write_with_fallback(
            "instruction",
            remote,
            self.local.set_system_instruction(text),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::local::temp_store;
    use anyhow::anyhow;

    /// Remote stand-in whose every call fails, as with a missing table or a
    /// revoked key.
    struct DeadRemote;

    #[async_trait]
    impl Store for DeadRemote {
        async fn profile(&self, _session_token: &str) -> Result<Option<UserProfile>> {
            Err(anyhow!("relation does not exist"))
        }
        async fn documents(&self, _owner_id: &str) -> Result<Vec<DocumentRecord>> {
            Err(anyhow!("relation does not exist"))
        }
        async fn save_document(&self, _doc: &DocumentRecord) -> Result<()> {
            Err(anyhow!("relation does not exist"))
        }
        async fn delete_document(&self, _owner_id: &str, _id: &str) -> Result<()> {
            Err(anyhow!("relation does not exist"))
        }
        async fn events(&self, _owner_id: &str) -> Result<Vec<ScheduleEvent>> {
            Err(anyhow!("relation does not exist"))
        }
        async fn save_event(&self, _event: &ScheduleEvent) -> Result<()> {
            Err(anyhow!("relation does not exist"))
        }
        async fn delete_event(&self, _owner_id: &str, _id: &str) -> Result<()> {
            Err(anyhow!("relation does not exist"))
        }
        async fn transcript(&self, _owner_id: &str) -> Result<Vec<ChatMessage>> {
            Err(anyhow!("relation does not exist"))
        }
        async fn save_transcript(&self, _owner_id: &str, _messages: &[ChatMessage]) -> Result<()> {
            Err(anyhow!("relation does not exist"))
        }
        async fn system_instruction(&self) -> Result<Option<String>> {
            Err(anyhow!("relation does not exist"))
        }
        async fn set_system_instruction(&self, _text: &str) -> Result<()> {
            Err(anyhow!("relation does not exist"))
        }
    }

    #[tokio::test]
    async fn test_event_reads_and_writes_survive_a_dead_remote() {
        let store = FallbackStore::new(DeadRemote, temp_store());

        // Read with nothing stored: empty list, never an error.
        let events = store.events("owner-1").await.unwrap();
        assert!(events.is_empty());

        let event = ScheduleEvent::new("owner-1", "Parent-teacher night", "2026-09-10", "meeting");
        store.save_event(&event).await.unwrap();

        let events = store.events("owner-1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Parent-teacher night");
    }

    #[tokio::test]
    async fn test_transcript_write_is_not_lost_on_remote_failure() {
        let store = FallbackStore::new(DeadRemote, temp_store());
        let messages = vec![ChatMessage::user("hello"), ChatMessage::assistant("hi")];

        store.save_transcript("owner-1", &messages).await.unwrap();
        let loaded = store.transcript("owner-1").await.unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].text, "hello");
        assert_eq!(loaded[1].text, "hi");
    }

    #[tokio::test]
    async fn test_profile_falls_back_to_local_default() {
        let store = FallbackStore::new(DeadRemote, temp_store());
        let profile = store.profile("some-token").await.unwrap().unwrap();
        assert_eq!(profile.plan, crate::store::types::PlanTier::Free);
        assert_eq!(profile.role, crate::store::types::Role::User);
    }

    #[tokio::test]
    async fn test_instruction_survives_a_dead_remote() {
        let store = FallbackStore::new(DeadRemote, temp_store());
        store.set_system_instruction("Be brief.").await.unwrap();
        assert_eq!(
            store.system_instruction().await.unwrap().as_deref(),
            Some("Be brief.")
        );
    }
}
