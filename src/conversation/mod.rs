//! Conversation flow
//!
//! `/start` -> yes/no gate -> optional reference photo -> prompt -> images.
//! `/cancel` leaves the flow from any step. Each step reads the user's
//! session to decide which handler applies and returns the resulting
//! [`Step`].

pub mod replies;
#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::chat::{
    ChatId, ChatTransport, Command, Inbound, InboundKind, PhotoVariant, ReplyKeyboard, UserId,
};
use crate::error::BotError;
use crate::images::{generate_images, ImageGenerator, OutputStore, ReferenceStore};
use crate::prompt::GenerationRequest;
pub use crate::session::ConversationState;
use crate::session::SessionStore;
use replies::*;

/// Outcome of handling one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Moved into a new state
    Entered(ConversationState),
    /// Re-prompted, state unchanged
    Stayed(ConversationState),
    /// Conversation finished or was cancelled
    Ended,
    /// No handler for this message in the current state
    Ignored,
}

/// Drives every user's conversation
pub struct Conversation<T, G> {
    transport: Arc<T>,
    generator: Arc<G>,
    sessions: Arc<SessionStore>,
    references: ReferenceStore,
    outputs: OutputStore,
    limiter: Semaphore,
}

impl<T: ChatTransport, G: ImageGenerator> Conversation<T, G> {
    pub fn new(
        transport: Arc<T>,
        generator: Arc<G>,
        sessions: Arc<SessionStore>,
        references: ReferenceStore,
        outputs: OutputStore,
        max_concurrent_generations: usize,
    ) -> Self {
        Self {
            transport,
            generator,
            sessions,
            references,
            outputs,
            limiter: Semaphore::new(max_concurrent_generations.max(1)),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one message from a user
    pub async fn handle(&self, inbound: Inbound) -> Result<Step, BotError> {
        let Inbound {
            user_id,
            chat_id,
            kind,
        } = inbound;
        let session = self.sessions.get(user_id).await;
        let state = session.as_ref().map(|s| s.state);

        match (state, kind) {
            (None, InboundKind::Command(Command::Start)) => self.start(user_id, chat_id).await,
            (Some(_), InboundKind::Command(Command::Cancel)) => {
                self.cancel(user_id, chat_id).await
            }
            (Some(ConversationState::AskReference), InboundKind::Text(text)) => {
                self.ask_reference(user_id, chat_id, &text).await
            }
            (Some(ConversationState::ReceiveReference), InboundKind::Photo(variants)) => {
                self.receive_reference(user_id, chat_id, &variants).await
            }
            (
                Some(ConversationState::ReceiveReference),
                InboundKind::Text(_) | InboundKind::Other,
            ) => {
                self.sessions.touch(user_id).await;
                self.transport.send_text(chat_id, ASK_IMAGE, None).await?;
                Ok(Step::Stayed(ConversationState::ReceiveReference))
            }
            (Some(ConversationState::ReceivePrompt), InboundKind::Text(text)) => {
                let reference = session.and_then(|s| s.reference_path);
                self.receive_prompt(user_id, chat_id, &text, reference).await
            }
            (state, _) => {
                debug!("Ignoring message from user {} in state {:?}", user_id, state);
                Ok(Step::Ignored)
            }
        }
    }

    async fn start(&self, user_id: UserId, chat_id: ChatId) -> Result<Step, BotError> {
        let keyboard = ReplyKeyboard::single_row(&[YES, NO]);
        self.sessions.get_or_create(user_id).await;
        self.transport
            .send_text(chat_id, GREETING, Some(&keyboard))
            .await?;

        info!("User {} started a conversation", user_id);
        Ok(Step::Entered(ConversationState::AskReference))
    }

    async fn ask_reference(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        answer: &str,
    ) -> Result<Step, BotError> {
        self.sessions.clear_reference(user_id).await;
        let answer = answer.to_lowercase();

        let (reply, next) = if answer == YES.to_lowercase() {
            (ASK_IMAGE, ConversationState::ReceiveReference)
        } else if answer == NO.to_lowercase() {
            (ASK_PROMPT, ConversationState::ReceivePrompt)
        } else {
            self.transport.send_text(chat_id, CHOOSE_YES_NO, None).await?;
            return Ok(Step::Stayed(ConversationState::AskReference));
        };

        self.sessions.set_state(user_id, next).await;
        self.transport.send_text(chat_id, reply, None).await?;
        debug!("User {} -> {:?}", user_id, next);
        Ok(Step::Entered(next))
    }

    async fn receive_reference(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        variants: &[PhotoVariant],
    ) -> Result<Step, BotError> {
        let path = self
            .references
            .save(self.transport.as_ref(), user_id, variants)
            .await?;

        self.sessions.set_reference(user_id, path).await;
        self.sessions
            .set_state(user_id, ConversationState::ReceivePrompt)
            .await;
        self.transport
            .send_text(chat_id, REFERENCE_RECEIVED, None)
            .await?;
        Ok(Step::Entered(ConversationState::ReceivePrompt))
    }

    async fn receive_prompt(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        text: &str,
        reference: Option<PathBuf>,
    ) -> Result<Step, BotError> {
        self.transport.send_text(chat_id, GENERATING, None).await?;

        let request = GenerationRequest::compose(text, reference.as_deref());
        let result = generate_images(
            self.transport.as_ref(),
            self.generator.as_ref(),
            &self.outputs,
            &self.limiter,
            chat_id,
            request,
        )
        .await;

        self.sessions.remove(user_id).await;

        match result {
            Ok(generated) => {
                self.transport.send_text(chat_id, DONE, None).await?;
                info!(
                    "User {} received {} images (tag {})",
                    user_id,
                    generated.paths.len(),
                    generated.tag
                );
                Ok(Step::Ended)
            }
            Err(e) => {
                if let Err(notify_err) = self.transport.send_text(chat_id, FAILED, None).await {
                    warn!("Could not tell user {} about the failure: {}", user_id, notify_err);
                }
                Err(e)
            }
        }
    }

    async fn cancel(&self, user_id: UserId, chat_id: ChatId) -> Result<Step, BotError> {
        self.sessions.remove(user_id).await;
        self.transport.send_text(chat_id, CANCELLED, None).await?;
        info!("User {} cancelled", user_id);
        Ok(Step::Ended)
    }
}
