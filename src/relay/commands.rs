//! Trigger → reply table and the relay that executes it.

use serde::Deserialize;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

use crate::relay::format::{format_for_display, Button};
use crate::relay::selector::CandidateSource;
use crate::relay::store::Filter;
use crate::relay::telegram::ChatTransport;

/// Bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "say hello.")]
    Start,
    #[command(description = "display this text.")]
    Help,
    #[command(description = "get a random well-rated movie.")]
    Random,
    #[command(description = "get the link to watch online.")]
    Watch,
}

/// Anything the bot can be asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Command(Command),
    /// Free text that is not a command.
    Text,
}

/// Static reply texts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Replies {
    pub welcome: String,
    pub fallback: String,
    /// Sent whenever `/random` cannot deliver a movie.
    pub failure: String,
    pub watch_text: String,
    pub watch_label: String,
    pub watch_url: String,
}

impl Default for Replies {
    fn default() -> Self {
        Self {
            welcome: "Welcome!".to_string(),
            fallback: "How can I help?".to_string(),
            failure: "An error occurred while processing your request.".to_string(),
            watch_text: "Watch movies online:".to_string(),
            watch_label: "Watch".to_string(),
            watch_url: String::new(),
        }
    }
}

/// What a trigger resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Buttons { text: String, buttons: Vec<Button> },
    RandomMovie,
}

impl Replies {
    /// The dispatch table.
    pub fn resolve(&self, trigger: &Trigger) -> Reply {
        match trigger {
            Trigger::Command(Command::Start) => Reply::Text(self.welcome.clone()),
            Trigger::Command(Command::Help) => Reply::Text(Command::descriptions().to_string()),
            Trigger::Command(Command::Random) => Reply::RandomMovie,
            Trigger::Command(Command::Watch) => Reply::Buttons {
                text: self.watch_text.clone(),
                buttons: vec![Button::new(self.watch_label.clone(), self.watch_url.clone())],
            },
            Trigger::Text => Reply::Text(self.fallback.clone()),
        }
    }
}

/// Everything a handler needs: where candidates come from, how to reply,
/// and what to say.
pub struct Relay<C, T> {
    source: C,
    transport: T,
    replies: Replies,
}

impl<C: CandidateSource, T: ChatTransport> Relay<C, T> {
    pub fn new(source: C, transport: T, replies: Replies) -> Self {
        Self { source, transport, replies }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Handle one trigger for a chat. Errors are transport faults only;
    /// they are already logged.
    pub async fn dispatch(&self, chat_id: i64, trigger: Trigger) -> Result<(), String> {
        let result = match self.replies.resolve(&trigger) {
            Reply::Text(text) => self.transport.send_text(chat_id, &text).await.map(|_| ()),
            Reply::Buttons { text, buttons } => self
                .transport
                .send_button_message(chat_id, &text, &buttons)
                .await
                .map(|_| ()),
            Reply::RandomMovie => {
                let filter = self.source.default_filter();
                self.send_random_movie(chat_id, &filter).await
            }
        };

        if let Err(ref e) = result {
            error!("Reply to {:?} in chat {} failed: {}", trigger, chat_id, e);
        }
        result
    }

    /// Select, format and send one movie. Any failure ends in the fixed
    /// apology; the cause only goes to the log.
    pub async fn send_random_movie(&self, chat_id: i64, filter: &Filter) -> Result<(), String> {
        let movie = match self.source.random_candidate(filter).await {
            Ok(Some(movie)) => movie,
            Ok(None) => {
                info!(
                    "No movie for rating>={} year>={}, chat {}",
                    filter.min_rating, filter.min_year, chat_id
                );
                return self.send_failure(chat_id).await;
            }
            Err(e) => {
                error!("Candidate selection failed for chat {}: {}", chat_id, e);
                return self.send_failure(chat_id).await;
            }
        };

        let display = format_for_display(&movie);
        info!("🎬 Sending '{}' to chat {}", movie.title, chat_id);
        match self
            .transport
            .send_photo(chat_id, &display.image_ref, &display.caption, &display.buttons)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Failed to deliver '{}' to chat {}: {}", movie.title, chat_id, e);
                self.send_failure(chat_id).await
            }
        }
    }

    async fn send_failure(&self, chat_id: i64) -> Result<(), String> {
        self.transport.send_text(chat_id, &self.replies.failure).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/random", "moviebot").unwrap(), Command::Random);
        assert_eq!(Command::parse("/start", "moviebot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/watch@moviebot", "moviebot").unwrap(), Command::Watch);
        assert!(Command::parse("/unknown", "moviebot").is_err());
        assert!(Command::parse("hello", "moviebot").is_err());
    }

    #[test]
    fn test_table_defaults() {
        let replies = Replies::default();
        assert_eq!(replies.resolve(&Trigger::Command(Command::Start)), Reply::Text("Welcome!".into()));
        assert_eq!(replies.resolve(&Trigger::Text), Reply::Text("How can I help?".into()));
        assert_eq!(replies.resolve(&Trigger::Command(Command::Random)), Reply::RandomMovie);
    }

    #[test]
    fn test_help_lists_every_command() {
        let Reply::Text(help) = Replies::default().resolve(&Trigger::Command(Command::Help)) else {
            panic!("help should be text");
        };
        for cmd in ["/start", "/help", "/random", "/watch"] {
            assert!(help.contains(cmd), "help is missing {cmd}: {help}");
        }
    }

    #[test]
    fn test_watch_is_single_button() {
        let replies = Replies {
            watch_url: "https://watch.example".to_string(),
            ..Replies::default()
        };
        match replies.resolve(&Trigger::Command(Command::Watch)) {
            Reply::Buttons { text, buttons } => {
                assert_eq!(text, "Watch movies online:");
                assert_eq!(buttons, vec![Button::new("Watch", "https://watch.example")]);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }
}
