//! Inbound event dispatch.
//!
//! Every event ends in at least one outbound `Action`; nothing here returns an
//! error to the transport.

use std::sync::Arc;

use crate::{
    conversation::Conversation,
    domain::UserId,
    messaging::types::{Action, InboundEvent, InlineButton, InlineKeyboard},
    replies,
};

const RESET_PAYLOAD: &str = "reset";
const TEMPERATURE_PAYLOAD: &str = "temperature";
const SET_TEMPERATURE_PREFIX: &str = "temperature_";

/// Inline-button payloads understood by the bot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callback {
    Reset,
    TemperatureMenu,
    /// `temperature_<i>` sets the temperature to `i / 10`, for `i` in `0..=9`.
    SetTemperature(u8),
    Unknown(String),
}

impl Callback {
    pub fn parse(payload: &str) -> Self {
        match payload {
            RESET_PAYLOAD => Callback::Reset,
            TEMPERATURE_PAYLOAD => Callback::TemperatureMenu,
            other => match other.strip_prefix(SET_TEMPERATURE_PREFIX) {
                Some(d) if d.len() == 1 && d.as_bytes()[0].is_ascii_digit() => {
                    Callback::SetTemperature(d.as_bytes()[0] - b'0')
                }
                _ => Callback::Unknown(other.to_string()),
            },
        }
    }

    pub fn payload(&self) -> String {
        match self {
            Callback::Reset => RESET_PAYLOAD.to_string(),
            Callback::TemperatureMenu => TEMPERATURE_PAYLOAD.to_string(),
            Callback::SetTemperature(i) => format!("{SET_TEMPERATURE_PREFIX}{i}"),
            Callback::Unknown(raw) => raw.clone(),
        }
    }
}

pub struct Router {
    conversation: Arc<Conversation>,
    show_temperature_button: bool,
}

impl Router {
    pub fn new(conversation: Arc<Conversation>, show_temperature_button: bool) -> Self {
        Self {
            conversation,
            show_temperature_button,
        }
    }

    pub async fn dispatch(&self, user: UserId, event: InboundEvent) -> Vec<Action> {
        match event {
            InboundEvent::Start => {
                self.conversation.registry().ensure_user(user).await;
                vec![self.reply(replies::GREETING)]
            }
            InboundEvent::Command { name } => match name.as_str() {
                "reset" => {
                    self.reset(user).await;
                    vec![self.reply(replies::HISTORY_CLEARED)]
                }
                _ => vec![self.reply(replies::HELP)],
            },
            InboundEvent::Text(text) => {
                let outcome = self.conversation.handle_message(user, &text).await;
                vec![self.reply(outcome.reply_text())]
            }
            InboundEvent::Callback { payload } => self.on_callback(user, &payload).await,
        }
    }

    async fn on_callback(&self, user: UserId, payload: &str) -> Vec<Action> {
        match Callback::parse(payload) {
            Callback::Reset => {
                self.reset(user).await;
                vec![Action::answer(replies::HISTORY_CLEARED)]
            }
            Callback::TemperatureMenu => vec![
                Action::AnswerCallback { text: None },
                Action::text_with_keyboard(replies::TEMPERATURE_PROMPT, temperature_keyboard()),
            ],
            Callback::SetTemperature(i) => {
                let requested = f64::from(i) / 10.0;
                let registry = self.conversation.registry();
                let value = match registry.set_temperature(user, requested).await {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::error!(%user, "failed to persist temperature: {e}");
                        registry.temperature(user).await
                    }
                };
                vec![Action::answer(replies::temperature_set(value))]
            }
            Callback::Unknown(raw) => {
                tracing::debug!(%user, payload = %raw, "unknown callback payload");
                vec![Action::answer(replies::INVALID_OPTION)]
            }
        }
    }

    async fn reset(&self, user: UserId) {
        if let Err(e) = self.conversation.registry().reset(user).await {
            tracing::error!(%user, "failed to persist history reset: {e}");
        }
    }

    fn reply(&self, text: &str) -> Action {
        Action::text_with_keyboard(text, self.main_keyboard())
    }

    /// Keyboard attached to every regular reply.
    pub fn main_keyboard(&self) -> InlineKeyboard {
        let mut row = vec![InlineButton::new(
            replies::NEW_TOPIC_BUTTON,
            Callback::Reset.payload(),
        )];
        if self.show_temperature_button {
            row.push(InlineButton::new(
                replies::TEMPERATURE_BUTTON,
                Callback::TemperatureMenu.payload(),
            ));
        }
        InlineKeyboard::new(vec![row])
    }
}

/// Ten buttons, one per accepted `temperature_<i>` payload, labelled with the
/// value that will be stored.
pub fn temperature_keyboard() -> InlineKeyboard {
    let buttons = (0..=9u8)
        .map(|i| {
            InlineButton::new(
                format!("{:.1}", f64::from(i) / 10.0),
                Callback::SetTemperature(i).payload(),
            )
        })
        .collect();
    InlineKeyboard::grid(buttons, 5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::tests::FakeCompletion;
    use crate::conversation::{HistoryPolicy, TemperatureSource, FIXED_GENERATION_TEMPERATURE};
    use crate::registry::{UserStateRegistry, DEFAULT_TEMPERATURE};
    use crate::store::{FileStore, Table};

    fn router(dir: &std::path::Path, fake: Arc<FakeCompletion>, show_temp: bool) -> Router {
        let registry = Arc::new(UserStateRegistry::open(FileStore::new(dir)).unwrap());
        let conversation = Arc::new(Conversation::new(
            registry,
            fake,
            HistoryPolicy::KeepAll,
            TemperatureSource::Fixed(FIXED_GENERATION_TEMPERATURE),
        ));
        Router::new(conversation, show_temp)
    }

    fn answer_text(actions: &[Action]) -> Option<String> {
        actions.iter().find_map(|a| match a {
            Action::AnswerCallback { text } => text.clone(),
            _ => None,
        })
    }

    #[test]
    fn parses_known_payloads() {
        assert_eq!(Callback::parse("reset"), Callback::Reset);
        assert_eq!(Callback::parse("temperature"), Callback::TemperatureMenu);
        assert_eq!(Callback::parse("temperature_0"), Callback::SetTemperature(0));
        assert_eq!(Callback::parse("temperature_9"), Callback::SetTemperature(9));
    }

    #[test]
    fn unrecognized_payloads_are_unknown() {
        for raw in [
            "",
            "RESET",
            "temperature_",
            "temperature_10",
            "temperature_x",
            "temperature_-1",
        ] {
            assert_eq!(Callback::parse(raw), Callback::Unknown(raw.to_string()));
        }
    }

    #[test]
    fn payloads_round_trip_through_parse() {
        for cb in [
            Callback::Reset,
            Callback::TemperatureMenu,
            Callback::SetTemperature(3),
        ] {
            assert_eq!(Callback::parse(&cb.payload()), cb);
        }
    }

    #[test]
    fn temperature_keyboard_offers_ten_values() {
        let kb = temperature_keyboard();
        let payloads = kb.payloads();
        assert_eq!(payloads.len(), 10);
        assert_eq!(payloads[0], "temperature_0");
        assert_eq!(payloads[9], "temperature_9");
        assert_eq!(kb.rows[1][2].label, "0.7");
        assert_eq!(kb.rows.len(), 2);
    }

    #[tokio::test]
    async fn start_greets_with_new_topic_button_only() {
        let dir = tempfile::tempdir().unwrap();
        let r = router(dir.path(), Arc::new(FakeCompletion::default()), false);

        let actions = r.dispatch(UserId(1), InboundEvent::Start).await;
        match &actions[..] {
            [Action::SendText {
                text,
                keyboard: Some(kb),
            }] => {
                assert_eq!(text, replies::GREETING);
                assert_eq!(kb.payloads(), vec!["reset"]);
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[tokio::test]
    async fn temperature_button_can_be_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let r = router(dir.path(), Arc::new(FakeCompletion::default()), true);
        assert_eq!(r.main_keyboard().payloads(), vec!["reset", "temperature"]);
    }

    #[tokio::test]
    async fn set_temperature_button_updates_state() {
        let dir = tempfile::tempdir().unwrap();
        let r = router(dir.path(), Arc::new(FakeCompletion::default()), false);

        let actions = r
            .dispatch(
                UserId(9),
                InboundEvent::Callback {
                    payload: "temperature_7".to_string(),
                },
            )
            .await;
        let ack = answer_text(&actions).unwrap();
        assert!(ack.contains("0.7"), "{ack}");
        assert_eq!(r.conversation.registry().temperature(UserId(9)).await, 0.7);
    }

    #[tokio::test]
    async fn temperature_menu_answers_and_sends_keyboard() {
        let dir = tempfile::tempdir().unwrap();
        let r = router(dir.path(), Arc::new(FakeCompletion::default()), false);

        let actions = r
            .dispatch(
                UserId(1),
                InboundEvent::Callback {
                    payload: "temperature".to_string(),
                },
            )
            .await;
        assert_eq!(actions[0], Action::AnswerCallback { text: None });
        assert_eq!(
            actions[1],
            Action::text_with_keyboard(replies::TEMPERATURE_PROMPT, temperature_keyboard())
        );
    }

    #[tokio::test]
    async fn reset_button_clears_history_only() {
        let dir = tempfile::tempdir().unwrap();
        let r = router(dir.path(), Arc::new(FakeCompletion::default()), false);
        let registry = r.conversation.registry().clone();
        let u = UserId(2);
        registry
            .append_turns(u, ["q".to_string(), "a".to_string()])
            .await
            .unwrap();
        registry.set_temperature(u, 0.2).await.unwrap();

        let actions = r
            .dispatch(
                u,
                InboundEvent::Callback {
                    payload: "reset".to_string(),
                },
            )
            .await;
        assert_eq!(answer_text(&actions).as_deref(), Some(replies::HISTORY_CLEARED));
        assert!(registry.history(u).await.is_empty());
        assert_eq!(registry.temperature(u).await, 0.2);
    }

    #[tokio::test]
    async fn unknown_payload_hits_invalid_branch() {
        let dir = tempfile::tempdir().unwrap();
        let r = router(dir.path(), Arc::new(FakeCompletion::default()), false);

        for payload in ["bogus", "", "temperature_42"] {
            let actions = r
                .dispatch(
                    UserId(3),
                    InboundEvent::Callback {
                        payload: payload.to_string(),
                    },
                )
                .await;
            assert_eq!(actions, vec![Action::answer(replies::INVALID_OPTION)]);
        }
        assert_eq!(
            r.conversation.registry().temperature(UserId(3)).await,
            DEFAULT_TEMPERATURE
        );
    }

    #[tokio::test]
    async fn text_goes_through_the_orchestrator() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeCompletion::scripted(vec![Ok("Hi there!".to_string())]));
        let r = router(dir.path(), fake.clone(), false);

        let actions = r
            .dispatch(UserId(42), InboundEvent::Text("Hello".to_string()))
            .await;
        assert_eq!(
            actions,
            vec![Action::text_with_keyboard("Hi there!", r.main_keyboard())]
        );
        assert_eq!(fake.requests().len(), 1);
    }

    #[tokio::test]
    async fn commands_are_not_forwarded_to_the_backend() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeCompletion::default());
        let r = router(dir.path(), fake.clone(), false);

        let actions = r
            .dispatch(
                UserId(1),
                InboundEvent::Command {
                    name: "whatever".to_string(),
                },
            )
            .await;
        assert_eq!(actions, vec![r.reply(replies::HELP)]);

        let actions = r
            .dispatch(
                UserId(1),
                InboundEvent::Command {
                    name: "reset".to_string(),
                },
            )
            .await;
        assert_eq!(actions, vec![r.reply(replies::HISTORY_CLEARED)]);
        assert!(fake.requests().is_empty());
    }

    fn make_unwritable(dir: &std::path::Path, table: Table) {
        let path = FileStore::new(dir).path(table);
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
    }

    #[tokio::test]
    async fn temperature_is_acknowledged_when_save_fails() {
        let dir = tempfile::tempdir().unwrap();
        let r = router(dir.path(), Arc::new(FakeCompletion::default()), false);
        make_unwritable(dir.path(), Table::Temperature);

        let actions = r
            .dispatch(
                UserId(9),
                InboundEvent::Callback {
                    payload: "temperature_7".to_string(),
                },
            )
            .await;
        assert_eq!(
            actions,
            vec![Action::answer(replies::temperature_set(0.7))]
        );
        assert!(answer_text(&actions).unwrap().contains("0.7"));
        assert_eq!(r.conversation.registry().temperature(UserId(9)).await, 0.7);
    }

    #[tokio::test]
    async fn reset_is_acknowledged_when_save_fails() {
        let dir = tempfile::tempdir().unwrap();
        let r = router(dir.path(), Arc::new(FakeCompletion::default()), false);
        let registry = r.conversation.registry().clone();
        let u = UserId(2);
        registry
            .append_turns(u, ["q".to_string(), "a".to_string()])
            .await
            .unwrap();
        make_unwritable(dir.path(), Table::ConversationHistory);

        let actions = r
            .dispatch(
                u,
                InboundEvent::Callback {
                    payload: "reset".to_string(),
                },
            )
            .await;
        assert_eq!(answer_text(&actions).as_deref(), Some(replies::HISTORY_CLEARED));
        assert!(registry.history(u).await.is_empty());
    }
}
