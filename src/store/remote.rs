use super::Store;
use super::types::{ChatMessage, DocumentRecord, ScheduleEvent, UserProfile};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

const INSTRUCTION_SETTING: &str = "system_instruction";

/// Row-oriented remote store client. Rows are addressed by table name and
/// filtered by owner; saves are upserts. One shared HTTP client, constructed
/// once at selection time.
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TranscriptRow {
    owner_id: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SettingRow {
    key: String,
    value: String,
}

impl RemoteStore {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn select_by<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Vec<T>> {
        let filter = format!("eq.{}", value);
        let response = self
            .client
            .get(self.rest_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "*"), (column, filter.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("remote select from {} failed: {}", table, status));
        }
        Ok(response.json().await?)
    }

    async fn upsert<T: Serialize + Sync>(&self, table: &str, row: &T) -> Result<()> {
        let response = self
            .client
            .post(self.rest_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates")
            .json(row)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("remote upsert into {} failed: {}", table, status));
        }
        Ok(())
    }

    async fn delete_row(&self, table: &str, owner_id: &str, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.rest_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[
                ("id", &format!("eq.{}", id)),
                ("owner_id", &format!("eq.{}", owner_id)),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("remote delete from {} failed: {}", table, status));
        }
        Ok(())
    }

    async fn session_user(&self, session_token: &str) -> Result<Option<SessionUser>> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(session_token)
            .send()
            .await?;

        let status = response.status();
        // An invalid or expired session is "not signed in", not a failure.
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(anyhow!("session lookup failed: {}", status));
        }
        Ok(Some(response.json().await?))
    }

    fn display_name_for(user: &SessionUser) -> String {
        user.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .unwrap_or("Educator")
            .to_string()
    }
}

#[async_trait]
impl Store for RemoteStore {
    async fn profile(&self, session_token: &str) -> Result<Option<UserProfile>> {
        if session_token.is_empty() {
            return Ok(None);
        }
        let Some(user) = self.session_user(session_token).await? else {
            return Ok(None);
        };

        // A failed profile-row read after a valid session degrades to a
        // default profile instead of an error.
        let fallback = UserProfile::default_for(&user.id, &Self::display_name_for(&user));
        match self.select_by::<UserProfile>("profiles", "id", &user.id).await {
            Ok(rows) => Ok(Some(rows.into_iter().next().unwrap_or(fallback))),
            Err(e) => {
                warn!("Profile lookup failed for authenticated user: {}", e);
                Ok(Some(fallback))
            }
        }
    }

    async fn documents(&self, owner_id: &str) -> Result<Vec<DocumentRecord>> {
        let mut docs: Vec<DocumentRecord> =
            self.select_by("documents", "owner_id", owner_id).await?;
        docs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(docs)
    }

    async fn save_document(&self, doc: &DocumentRecord) -> Result<()> {
        self.upsert("documents", doc).await
    }

    async fn delete_document(&self, owner_id: &str, id: &str) -> Result<()> {
        self.delete_row("documents", owner_id, id).await
    }

    async fn events(&self, owner_id: &str) -> Result<Vec<ScheduleEvent>> {
        let mut events: Vec<ScheduleEvent> = self.select_by("events", "owner_id", owner_id).await?;
        events.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(events)
    }

    async fn save_event(&self, event: &ScheduleEvent) -> Result<()> {
        self.upsert("events", event).await
    }

    async fn delete_event(&self, owner_id: &str, id: &str) -> Result<()> {
        self.delete_row("events", owner_id, id).await
    }

    async fn transcript(&self, owner_id: &str) -> Result<Vec<ChatMessage>> {
        let rows: Vec<TranscriptRow> = self
            .select_by("transcripts", "owner_id", owner_id)
            .await?;
        Ok(rows.into_iter().next().map(|row| row.messages).unwrap_or_default())
    }

    async fn save_transcript(&self, owner_id: &str, messages: &[ChatMessage]) -> Result<()> {
        let row = TranscriptRow {
            owner_id: owner_id.to_string(),
            messages: messages.to_vec(),
        };
        self.upsert("transcripts", &row).await
    }

    async fn system_instruction(&self) -> Result<Option<String>> {
        let rows: Vec<SettingRow> = self
            .select_by("app_settings", "key", INSTRUCTION_SETTING)
            .await?;
        Ok(rows.into_iter().next().map(|row| row.value))
    }

    async fn set_system_instruction(&self, text: &str) -> Result<()> {
        let row = SettingRow {
            key: INSTRUCTION_SETTING.to_string(),
            value: text.to_string(),
        };
        self.upsert("app_settings", &row).await
    }
}
