use async_trait::async_trait;

use crate::{
    domain::ChatId,
    messaging::types::{Action, ChatAction, InlineKeyboard},
    Result,
};

/// Outbound messenger port.
///
/// The router produces `Action`s; a transport adapter executes them through this
/// trait.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<InlineKeyboard>,
    ) -> Result<()>;

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()>;

    /// Execute a router action. `callback_id` is required for callback answers.
    async fn execute(
        &self,
        chat_id: ChatId,
        callback_id: Option<&str>,
        action: Action,
    ) -> Result<()> {
        match action {
            Action::SendText { text, keyboard } => self.send_text(chat_id, &text, keyboard).await,
            Action::AnswerCallback { text } => match callback_id {
                Some(id) => self.answer_callback_query(id, text.as_deref()).await,
                None => {
                    tracing::warn!("callback answer without a callback id; dropped");
                    Ok(())
                }
            },
        }
    }
}
