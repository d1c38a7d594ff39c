//! photobot - Telegram front-end for a hosted image model
//!
//! Collects an optional reference photo and a text prompt through a short
//! conversation, runs the model on Replicate and sends the images back.

pub mod chat;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod images;
pub mod prompt;
pub mod replicate;
pub mod session;
pub mod telegram;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub use config::Config;
use conversation::Conversation;
use dispatch::Dispatcher;
use images::{OutputStore, ReferenceStore};
use replicate::ReplicateClient;
use session::SessionStore;
use telegram::TelegramClient;

/// Per-user workers exit after this long without messages
const WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// The photobot instance
pub struct Bot {
    config: Config,
    telegram: Arc<TelegramClient>,
    sessions: Arc<SessionStore>,
    conversation: Arc<Conversation<TelegramClient, ReplicateClient>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Bot {
    /// Create the data directories and API clients
    pub async fn new(config: Config) -> Result<Self> {
        tokio::fs::create_dir_all(config.references_dir()).await?;
        tokio::fs::create_dir_all(config.generated_dir()).await?;

        let telegram = Arc::new(TelegramClient::new(
            &config.telegram_api_url,
            &config.bot_token,
            config.poll_timeout(),
        )?);
        let replicate = Arc::new(ReplicateClient::new(&config)?);
        let sessions = Arc::new(SessionStore::new());

        let conversation = Arc::new(Conversation::new(
            telegram.clone(),
            replicate,
            sessions.clone(),
            ReferenceStore::new(config.references_dir()),
            OutputStore::new(config.generated_dir()),
            config.max_concurrent_generations,
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            telegram,
            sessions,
            conversation,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Get the session store
    pub fn sessions(&self) -> Arc<SessionStore> {
        self.sessions.clone()
    }

    /// Poll Telegram until shutdown
    pub async fn run(&self) -> Result<()> {
        info!(
            "photobot polling for updates, model {}",
            self.config.model_ref()
        );

        let mut dispatcher = Dispatcher::new(self.conversation.clone(), WORKER_IDLE_TIMEOUT);
        let mut shutdown_rx = self.shutdown_rx.clone();
        let mut offset = 0;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let result = tokio::select! {
                _ = shutdown_rx.changed() => break,
                result = self.telegram.get_updates(offset) => result,
            };

            match result {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        match update.into_inbound() {
                            Some(inbound) => dispatcher.dispatch(inbound),
                            None => debug!("Skipping update without a user message"),
                        }
                    }
                }
                Err(e) => {
                    warn!("Polling Telegram failed: {}", e);
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = tokio::time::sleep(self.config.poll_retry_delay()) => {}
                    }
                }
            }

            dispatcher.prune();
            let evicted = self.sessions.evict_idle(self.config.session_ttl()).await;
            if evicted > 0 {
                info!("Dropped {} abandoned conversations", evicted);
            }
        }

        info!("photobot shutdown complete");
        Ok(())
    }

    /// Signal the bot to stop polling
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
