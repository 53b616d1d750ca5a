//! Fixed user-facing texts.

pub const GREETING: &str = "Hi! I'm a chat assistant. Ask me anything. \
Press \"New topic\" whenever you want to start a fresh conversation, so I know the previous one is finished.";

pub const HELP: &str = "Send me a message and I'll answer it, keeping our conversation as context.\n\
/start - show the welcome message and buttons\n\
/reset - forget our conversation and start a new topic";

pub const NEW_TOPIC_BUTTON: &str = "New topic";
pub const TEMPERATURE_BUTTON: &str = "Set temperature";

pub const HISTORY_CLEARED: &str = "Your chat history has been cleared.";
pub const TEMPERATURE_PROMPT: &str = "Please select a temperature:";
pub const INVALID_OPTION: &str = "Invalid option.";

pub const EMPTY_COMPLETION: &str = "Sorry, I don't know about that one. Maybe ask me something else?";
pub const PROMPT_TOO_LONG: &str =
    "The answer would be too long. Try asking me something more specific.";
pub const COMPLETION_FAILED: &str = "Sorry, something went wrong while answering. Please try again.";

pub fn temperature_set(value: f64) -> String {
    format!("Temperature set to {value}.")
}
