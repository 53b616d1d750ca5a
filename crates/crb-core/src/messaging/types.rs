use crate::domain::{ChatId, UserId};

/// Messenger-agnostic inbound event.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundEvent {
    Start,
    Command { name: String },
    Text(String),
    Callback { payload: String },
}

impl InboundEvent {
    /// Classify a raw message text: `/start`, another `/command`, or plain text.
    pub fn from_message_text(text: &str) -> Self {
        if !text.starts_with('/') {
            return InboundEvent::Text(text.to_string());
        }

        // Telegram may send `/cmd@botname arg1 ...`; arguments are ignored.
        let first = text.split_whitespace().next().unwrap_or("");

        let name = first
            .trim_start_matches('/')
            .split('@')
            .next()
            .unwrap_or("")
            .to_lowercase();

        if name == "start" {
            InboundEvent::Start
        } else {
            InboundEvent::Command { name }
        }
    }
}

/// Who sent an inbound event and where to answer.
#[derive(Clone, Debug)]
pub struct Origin {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: Option<String>,
    pub callback_id: Option<String>,
}

/// Outbound action produced by the router.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    SendText {
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    /// Ephemeral notice attached to a button press.
    AnswerCallback { text: Option<String> },
}

impl Action {
    pub fn text_with_keyboard(text: impl Into<String>, keyboard: InlineKeyboard) -> Self {
        Action::SendText {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Action::AnswerCallback {
            text: Some(text.into()),
        }
    }
}

/// Outgoing "chat action" (typing indicator).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
}

/// Inline keyboard (rows of callback buttons).
#[derive(Clone, Debug, PartialEq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }

    /// Split `buttons` into rows of at most `per_row`.
    pub fn grid(buttons: Vec<InlineButton>, per_row: usize) -> Self {
        let per_row = per_row.max(1);
        let mut rows = Vec::new();
        let mut row = Vec::new();
        for b in buttons {
            row.push(b);
            if row.len() == per_row {
                rows.push(std::mem::take(&mut row));
            }
        }
        if !row.is_empty() {
            rows.push(row);
        }
        Self { rows }
    }

    pub fn payloads(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .map(|b| b.callback_data.as_str())
            .collect()
    }
}
