use crate::classify;
use crate::classify::Intent;
use crate::completion::{CompletionBackend, StreamEvent};
use crate::context::{AssembleRequest, DEFAULT_INSTRUCTION, assemble};
use crate::extract::{ExtractError, TextExtractor};
use crate::quota::{self, QuotaDenial, UploadCheck};
use crate::store::Store;
use crate::store::types::{ChatMessage, DocumentRecord, UserProfile};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{RwLock, mpsc};
use tracing::{info, warn};

/// Fixed reply shown when a completion stream fails. The partial streamed
/// text is discarded; only this message is persisted, flagged as an error.
pub const STREAM_ERROR_REPLY: &str =
    "Something went wrong while generating a response. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingQuotaCheck,
    AssemblingContext,
    Streaming,
    Finalizing,
    Errored,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("No completion API key is configured. Add one to config.toml to start chatting.")]
    SetupRequired,
    #[error(transparent)]
    Quota(#[from] QuotaDenial),
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    #[error("Only admins can change the system instruction.")]
    AdminOnly,
    #[error("Unknown document: {0}")]
    UnknownDocument(String),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub document_id: Option<String>,
    pub include_document: Option<bool>,
    pub format_directive: Option<String>,
    pub intent: Option<Intent>,
}

/// In-flight assistant message. Every chunk sets the message text to the
/// accumulated total, so observers receive whole-message updates and
/// replaying a chunk sequence against a fresh placeholder is idempotent.
pub struct LiveReply {
    message: ChatMessage,
    accumulated: String,
}

impl LiveReply {
    pub fn new() -> Self {
        Self {
            message: ChatMessage::placeholder(),
            accumulated: String::new(),
        }
    }

    pub fn apply_chunk(&mut self, delta: &str) -> &ChatMessage {
        self.accumulated.push_str(delta);
        self.message.text = self.accumulated.clone();
        &self.message
    }

    pub fn message(&self) -> &ChatMessage {
        &self.message
    }
}

impl Default for LiveReply {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrates a conversation turn: context assembly, streaming, suggestion
/// attachment, and transcript persistence. One active turn per session; the
/// front end does not send while a stream is in flight.
pub struct ChatEngine {
    store: Arc<dyn Store>,
    backend: Arc<dyn CompletionBackend>,
    extractor: Arc<dyn TextExtractor>,
    api_key_present: bool,
    phase: RwLock<Phase>,
}

impl ChatEngine {
    pub fn new(
        store: Arc<dyn Store>,
        backend: Arc<dyn CompletionBackend>,
        extractor: Arc<dyn TextExtractor>,
        api_key_present: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            backend,
            extractor,
            api_key_present,
            phase: RwLock::new(Phase::Idle),
        })
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub async fn phase(&self) -> Phase {
        *self.phase.read().await
    }

    async fn set_phase(&self, phase: Phase) {
        *self.phase.write().await = phase;
    }

    pub async fn send_message(
        &self,
        owner_id: &str,
        text: &str,
        opts: SendOptions,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<ChatMessage, ChatError> {
        if !self.api_key_present {
            self.set_phase(Phase::Errored).await;
            self.set_phase(Phase::Idle).await;
            return Err(ChatError::SetupRequired);
        }

        self.set_phase(Phase::AssemblingContext).await;
        let result = self.run_turn(owner_id, text, opts, tx).await;
        if result.is_err() {
            self.set_phase(Phase::Errored).await;
        }
        self.set_phase(Phase::Idle).await;
        result
    }

    async fn run_turn(
        &self,
        owner_id: &str,
        text: &str,
        opts: SendOptions,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<ChatMessage, ChatError> {
        let history = self.store.transcript(owner_id).await?;

        // The user turn is saved before the stream starts and stays
        // persisted even if the stream fails.
        let mut transcript = history.clone();
        transcript.push(ChatMessage::user(text));
        self.store.save_transcript(owner_id, &transcript).await?;

        let document = match &opts.document_id {
            Some(id) => {
                let docs = self.store.documents(owner_id).await?;
                let doc = docs
                    .into_iter()
                    .find(|d| &d.id == id)
                    .ok_or_else(|| ChatError::UnknownDocument(id.clone()))?;
                Some(doc)
            }
            None => None,
        };

        let base_instruction = self
            .store
            .system_instruction()
            .await?
            .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string());

        let parts = assemble(&AssembleRequest {
            base_instruction: &base_instruction,
            document: document.as_ref(),
            include_document: opts.include_document.unwrap_or(true),
            format_directive: opts.format_directive.as_deref(),
            history: &history,
            user_text: text,
        });

        self.set_phase(Phase::Streaming).await;
        let outcome = self
            .backend
            .stream_reply(&parts.instruction, &parts.user_turn, tx)
            .await;

        if outcome.is_err() {
            self.set_phase(Phase::Errored).await;
        }
        self.set_phase(Phase::Finalizing).await;

        let assistant = match outcome {
            Ok(reply) => {
                let mut message = ChatMessage::assistant(&reply);
                let intent = classify::classify(opts.intent, text);
                message.suggestions = classify::suggestions_for(intent);
                message
            }
            Err(e) => {
                warn!("Completion stream failed: {}", e);
                ChatMessage::error_reply(STREAM_ERROR_REPLY)
            }
        };

        transcript.push(assistant.clone());
        self.store.save_transcript(owner_id, &transcript).await?;

        Ok(assistant)
    }

    pub async fn upload_document(
        &self,
        profile: &UserProfile,
        filename: &str,
        bytes: &[u8],
    ) -> Result<DocumentRecord, ChatError> {
        self.set_phase(Phase::AwaitingQuotaCheck).await;
        let result = self.run_upload(profile, filename, bytes).await;
        if result.is_err() {
            self.set_phase(Phase::Errored).await;
        }
        self.set_phase(Phase::Idle).await;
        result
    }

    async fn run_upload(
        &self,
        profile: &UserProfile,
        filename: &str,
        bytes: &[u8],
    ) -> Result<DocumentRecord, ChatError> {
        let existing = self.store.documents(&profile.id).await?;
        match quota::check_document_upload(profile.plan, existing.len(), bytes.len() as u64) {
            UploadCheck::Allow => {}
            UploadCheck::Deny(denial) => return Err(ChatError::Quota(denial)),
        }

        let extracted = self.extractor.extract(filename, bytes)?;
        let doc = DocumentRecord::new(
            &profile.id,
            filename,
            extracted.kind,
            extracted.text,
            bytes.len() as u64,
        );
        self.store.save_document(&doc).await?;
        info!("Stored document {} ({} bytes)", doc.name, doc.size_bytes);
        Ok(doc)
    }

    pub async fn set_system_instruction(
        &self,
        profile: &UserProfile,
        text: &str,
    ) -> Result<(), ChatError> {
        if !profile.is_admin() {
            return Err(ChatError::AdminOnly);
        }
        self.store.set_system_instruction(text).await?;
        Ok(())
    }
}
