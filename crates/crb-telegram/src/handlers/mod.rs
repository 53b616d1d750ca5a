//! Telegram update handlers.
//!
//! Each handler maps a Telegram update onto a core `InboundEvent`, lets the core
//! router decide, then executes the resulting actions. Handlers never fail the
//! dispatcher: transport errors are logged and swallowed.

use std::sync::Arc;

use teloxide::{
    prelude::*,
    types::{CallbackQuery, Message},
};

use crb_core::{
    domain::{ChatId, UserId},
    messaging::types::{Action, Origin},
};

use crate::router::AppState;

mod callback;
mod message;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    callback::handle_callback(bot, q, state).await
}

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    message::handle_message(bot, msg, state).await
}

fn origin(
    chat_id: i64,
    user_id: u64,
    username: Option<String>,
    callback_id: Option<String>,
) -> Origin {
    Origin {
        chat_id: ChatId(chat_id),
        user_id: UserId(user_id as i64),
        username,
        callback_id,
    }
}

async fn execute_all(state: &AppState, origin: &Origin, actions: Vec<Action>) {
    for action in actions {
        if let Err(e) = state
            .messenger
            .execute(origin.chat_id, origin.callback_id.as_deref(), action)
            .await
        {
            tracing::warn!(
                user = %origin.user_id,
                username = origin.username.as_deref().unwrap_or("unknown"),
                "failed to deliver reply: {e}"
            );
        }
    }
}
