use crate::config::Config;
use anyhow::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use rig::{
    agent::MultiTurnStreamItem,
    client::CompletionClient,
    completion::{CompletionModel, GetTokenUsage},
    providers::{anthropic, gemini, openai},
    streaming::{StreamedAssistantContent, StreamingPrompt},
};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Delta(String),
    Done,
    Error(String),
}

/// A single completion attempt: finite chunk sequence, no retry, not
/// restartable. Every text delta is republished on `tx` before being folded
/// into the returned reply.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn stream_reply(
        &self,
        instruction: &str,
        user_turn: &str,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<String>;
}

pub struct RigBackend<C: CompletionClient> {
    model: String,
    disable_reasoning: bool,
    client: C,
}

impl<C: CompletionClient> RigBackend<C> {
    fn new(model: &str, disable_reasoning: bool, client: C) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            disable_reasoning,
            client,
        })
    }

    async fn run_stream<M, R, A>(
        agent: A,
        prompt: &str,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<String>
    where
        M: CompletionModel + 'static,
        R: Clone + Unpin + GetTokenUsage,
        A: StreamingPrompt<M, R>,
        <A as StreamingPrompt<M, R>>::Hook: 'static,
    {
        let mut stream = agent.stream_prompt(prompt).await;
        let mut reply = String::new();

        while let Some(item) = stream.next().await {
            match item {
                Ok(MultiTurnStreamItem::StreamAssistantItem(StreamedAssistantContent::Text(
                    text,
                ))) => {
                    let _ = tx.send(StreamEvent::Delta(text.text.clone())).await;
                    reply.push_str(&text.text);
                }
                Ok(MultiTurnStreamItem::FinalResponse(res)) => {
                    if reply.is_empty() {
                        reply = res.response().to_string();
                    }
                }
                Err(e) => {
                    let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                    return Err(anyhow::anyhow!("{}", e));
                }
                _ => {}
            }
        }

        let _ = tx.send(StreamEvent::Done).await;
        Ok(reply)
    }
}

#[async_trait]
impl<C> CompletionBackend for RigBackend<C>
where
    C: CompletionClient + Send + Sync,
    C::CompletionModel: 'static,
{
    async fn stream_reply(
        &self,
        instruction: &str,
        user_turn: &str,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<String> {
        let mut builder = self
            .client
            .agent(&self.model)
            .preamble(instruction)
            .max_tokens(4096);

        if self.disable_reasoning {
            let mut extra = serde_json::Map::new();
            extra.insert("thinking".into(), serde_json::json!({"type": "disabled"}));
            builder = builder.additional_params(serde_json::Value::Object(extra));
        }

        Self::run_stream(builder.build(), user_turn, tx).await
    }
}

pub fn create_backend(config: &Config) -> Result<Arc<dyn CompletionBackend>> {
    match config.api_provider.as_str() {
        "openai" => {
            let mut builder = openai::CompletionsClient::builder().api_key(&config.api_key);
            if !config.api_url.is_empty() {
                builder = builder.base_url(&config.api_url);
            }
            let client: openai::CompletionsClient = builder.build()?;
            Ok(RigBackend::new(&config.model, config.disable_reasoning, client)
                as Arc<dyn CompletionBackend>)
        }
        "gemini" => {
            let client = gemini::Client::new(&config.api_key)?;
            Ok(RigBackend::new(&config.model, config.disable_reasoning, client)
                as Arc<dyn CompletionBackend>)
        }
        _ => {
            let mut builder = anthropic::Client::builder().api_key(&config.api_key);
            if !config.api_url.is_empty() {
                builder = builder.base_url(&config.api_url);
            }
            let client: anthropic::Client = builder.build()?;
            Ok(RigBackend::new(&config.model, config.disable_reasoning, client)
                as Arc<dyn CompletionBackend>)
        }
    }
}
