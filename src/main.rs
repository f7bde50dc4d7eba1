mod chat;
mod classify;
mod completion;
mod config;
mod context;
mod extract;
mod quota;
mod repl;
mod store;
mod templates;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::store::types::UserProfile;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::load()?;

    let backing = store::select(&config)?;
    if backing.remote {
        info!("Using the remote backing store with per-operation local fallback");
    } else {
        info!("Using the local store only");
    }

    let backend = completion::create_backend(&config)?;
    let extractor = Arc::new(extract::FileExtractor);
    let engine = chat::ChatEngine::new(
        backing.store.clone(),
        backend,
        extractor,
        !config.api_key.is_empty(),
    );

    let profile = backing
        .store
        .profile(&config.session_token)
        .await?
        .unwrap_or_else(|| UserProfile::default_for(store::local::GUEST_ID, "Educator"));

    tokio::select! {
        result = repl::run(engine, profile) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    info!("Shutdown complete");
    Ok(())
}
