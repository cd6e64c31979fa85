//! Random movie relay: store → selector → formatter → chat.

pub mod commands;
pub mod format;
pub mod movie;
pub mod selector;
pub mod store;
pub mod telegram;


pub use commands::{Command, Relay, Replies, Reply, Trigger};
pub use format::{format_for_display, Button, Display};
pub use movie::{Actor, DownloadOption, MovieRecord, MovieSummary};
pub use selector::{CandidateSource, RemoteSource, SelectError, Selector};
pub use store::{Filter, MovieStore, RatingOrder, SqliteStore, StoreError};
pub use telegram::{ChatTransport, TelegramClient};
