use std::sync::Arc;

use teloxide::prelude::*;

use crb_core::messaging::types::{Action, InboundEvent};

use crate::router::AppState;

use super::{execute_all, origin};

pub async fn handle_callback(
    _bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    // Inline buttons live in private chats, where chat id == user id.
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat.id.0)
        .unwrap_or(q.from.id.0 as i64);
    let origin = origin(
        chat_id,
        q.from.id.0,
        q.from.username.clone(),
        Some(q.id.clone()),
    );

    let payload = q.data.clone().unwrap_or_default();
    tracing::debug!(user = %origin.user_id, %payload, "callback query");

    let actions = state
        .router
        .dispatch(origin.user_id, InboundEvent::Callback { payload })
        .await;

    // Always answer the query so the client stops its spinner.
    let answered = actions
        .iter()
        .any(|a| matches!(a, Action::AnswerCallback { .. }));
    execute_all(&state, &origin, actions).await;
    if !answered {
        execute_all(&state, &origin, vec![Action::AnswerCallback { text: None }]).await;
    }

    Ok(())
}
