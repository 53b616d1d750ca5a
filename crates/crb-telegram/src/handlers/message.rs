use std::{sync::Arc, time::Duration};

use teloxide::prelude::*;

use crb_core::messaging::{
    port::MessagingPort,
    types::{ChatAction, InboundEvent},
};

use crate::router::AppState;

use super::{execute_all, origin};

const TYPING_INTERVAL: Duration = Duration::from_secs(4);

pub async fn handle_message(_bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        tracing::debug!(chat = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    let origin = origin(msg.chat.id.0, user.id.0, user.username.clone(), None);
    let event = InboundEvent::from_message_text(text);

    let actions = if matches!(event, InboundEvent::Text(_)) {
        // Typing loop (best-effort) while the completion runs.
        let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel::<()>();
        let messenger: Arc<dyn MessagingPort> = state.messenger.clone();
        let chat_id = origin.chat_id;
        let typing_task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(TYPING_INTERVAL);
            loop {
                tokio::select! {
                  _ = tick.tick() => {
                    let _ = messenger.send_chat_action(chat_id, ChatAction::Typing).await;
                  }
                  _ = &mut stop_rx => break,
                }
            }
        });

        let actions = state.router.dispatch(origin.user_id, event).await;

        let _ = stop_tx.send(());
        let _ = typing_task.await;
        actions
    } else {
        state.router.dispatch(origin.user_id, event).await
    };

    execute_all(&state, &origin, actions).await;
    Ok(())
}
