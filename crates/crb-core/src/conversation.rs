//! Conversation orchestration: prompt assembly, completion, history update.

use std::sync::Arc;

use crate::{
    domain::UserId,
    model::{CompletionClient, CompletionError},
    registry::UserStateRegistry,
    replies,
};

/// Temperature actually sent to the backend unless `TemperatureSource::PerUser`
/// is configured.
pub const FIXED_GENERATION_TEMPERATURE: f64 = 0.5;

/// Which prior turns are resent with each new message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryPolicy {
    /// Resend the whole history every turn (cost grows without bound).
    KeepAll,
    /// Resend only the most recent `n` turns.
    LastTurns(usize),
}

impl HistoryPolicy {
    pub fn window<'a>(&self, turns: &'a [String]) -> &'a [String] {
        match *self {
            HistoryPolicy::KeepAll => turns,
            HistoryPolicy::LastTurns(n) => &turns[turns.len().saturating_sub(n)..],
        }
    }
}

/// Where the generation temperature comes from.
///
/// NOTE: users can pick a temperature from the keyboard, and it is persisted,
/// but generation has always used the fixed value. `Fixed` stays the default
/// until product intent is clarified; `PerUser` is opt-in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TemperatureSource {
    Fixed(f64),
    PerUser,
}

/// Result of handling one user message.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    Answered(String),
    Empty,
    TooLong,
    Failed,
}

impl TurnOutcome {
    pub fn reply_text(&self) -> &str {
        match self {
            TurnOutcome::Answered(text) => text,
            TurnOutcome::Empty => replies::EMPTY_COMPLETION,
            TurnOutcome::TooLong => replies::PROMPT_TOO_LONG,
            TurnOutcome::Failed => replies::COMPLETION_FAILED,
        }
    }
}

pub struct Conversation {
    registry: Arc<UserStateRegistry>,
    client: Arc<dyn CompletionClient>,
    history_policy: HistoryPolicy,
    temperature_source: TemperatureSource,
}

impl Conversation {
    pub fn new(
        registry: Arc<UserStateRegistry>,
        client: Arc<dyn CompletionClient>,
        history_policy: HistoryPolicy,
        temperature_source: TemperatureSource,
    ) -> Self {
        Self {
            registry,
            client,
            history_policy,
            temperature_source,
        }
    }

    pub fn registry(&self) -> &Arc<UserStateRegistry> {
        &self.registry
    }

    /// Newline-join prior turns and the new message.
    pub fn build_prompt(turns: &[String], message: &str) -> String {
        let mut parts: Vec<&str> = turns.iter().map(String::as_str).collect();
        parts.push(message);
        parts.join("\n")
    }

    /// Answer `message` from `user`, appending the exchange to history on success.
    ///
    /// Messages from the same user are serialized for the whole exchange; other
    /// users are not blocked.
    pub async fn handle_message(&self, user: UserId, message: &str) -> TurnOutcome {
        let _guard = self.registry.lock_user(user).await;

        let topic = self.registry.topic(user).await;
        let history = self.registry.history(user).await;
        let prompt = Self::build_prompt(self.history_policy.window(&history), message);
        let temperature = match self.temperature_source {
            TemperatureSource::Fixed(t) => t,
            TemperatureSource::PerUser => self.registry.temperature(user).await,
        };

        tracing::debug!(
            %user,
            turns = history.len(),
            prompt_chars = prompt.chars().count(),
            temperature,
            "requesting completion"
        );

        let text = match self.client.complete(&prompt, temperature).await {
            Ok(text) => text,
            Err(CompletionError::TooLong(detail)) => {
                tracing::info!(%user, "prompt too long: {detail}");
                return TurnOutcome::TooLong;
            }
            Err(e) => {
                tracing::error!(%user, "completion failed: {e}");
                return TurnOutcome::Failed;
            }
        };

        // NOTE: only a truly empty completion counts as empty. Whitespace-only
        // text is answered and stored; Telegram rejects sending it, which the
        // transport logs.
        if text.is_empty() {
            tracing::warn!(%user, "empty completion; history left unchanged");
            return TurnOutcome::Empty;
        }

        match self
            .registry
            .append_turns_in_topic(user, topic, [message.to_string(), text.clone()])
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::info!(%user, "history reset mid-request; exchange not stored"),
            Err(e) => tracing::error!(%user, "failed to persist conversation history: {e}"),
        }

        TurnOutcome::Answered(text)
    }
}
