use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::relay::{Filter, RatingOrder, Replies};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// Directory for state files (logs, database). Defaults to current directory.
    data_dir: Option<String>,
    /// SQLite file holding the movies. Defaults to `<data_dir>/movies.db`.
    database_path: Option<String>,
    #[serde(default = "default_http_addr")]
    http_addr: String,
    #[serde(default = "default_true")]
    serve_http: bool,
    /// Full URL of another instance's `/randommovie`. When set, the bot asks
    /// that endpoint instead of the local database.
    selector_url: Option<String>,
    #[serde(default = "default_min_rating")]
    min_rating: String,
    #[serde(default = "default_min_year")]
    min_year: String,
    #[serde(default)]
    rating_order: RatingOrder,
    #[serde(default)]
    replies: Replies,
}

fn default_http_addr() -> String {
    "0.0.0.0:6782".to_string()
}

fn default_true() -> bool {
    true
}

fn default_min_rating() -> String {
    "7".to_string()
}

fn default_min_year() -> String {
    "2005".to_string()
}

pub struct Config {
    pub telegram_bot_token: String,
    /// Directory for state files (logs, database).
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub http_addr: SocketAddr,
    /// Whether this process serves `GET /randommovie`.
    pub serve_http: bool,
    pub selector_url: Option<String>,
    /// Default candidate filter for both the endpoint and `/random`.
    pub filter: Filter,
    pub replies: Replies,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }

        let http_addr: SocketAddr = file.http_addr.parse().map_err(|_| {
            ConfigError::Validation(format!("http_addr '{}' is not a socket address", file.http_addr))
        })?;

        if file.min_rating.trim().is_empty() || file.min_year.trim().is_empty() {
            return Err(ConfigError::Validation("min_rating and min_year must not be empty".into()));
        }
        if file.rating_order == RatingOrder::Numeric
            && (file.min_rating.parse::<f64>().is_err() || file.min_year.parse::<f64>().is_err())
        {
            return Err(ConfigError::Validation(
                "numeric rating_order needs numeric min_rating and min_year".into()
            ));
        }

        if file.replies.watch_url.is_empty() {
            return Err(ConfigError::Validation("replies.watch_url is required".into()));
        }
        if !file.replies.watch_url.starts_with("http://") && !file.replies.watch_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "replies.watch_url '{}' must be an http(s) url",
                file.replies.watch_url
            )));
        }

        if let Some(ref url) = file.selector_url
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!("selector_url '{}' must be an http(s) url", url)));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let database_path = file
            .database_path
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("movies.db"));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            data_dir,
            database_path,
            http_addr,
            serve_http: file.serve_http,
            selector_url: file.selector_url,
            filter: Filter::new(file.min_rating, file.min_year).with_order(file.rating_order),
            replies: file.replies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let file = write_config(r#"{
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz",
            "replies": {"watch_url": "https://watch.example"}
        }"#);
        let config = Config::load(file.path()).expect("should load valid config");
        assert_eq!(config.http_addr, "0.0.0.0:6782".parse::<SocketAddr>().unwrap());
        assert!(config.serve_http);
        assert!(config.selector_url.is_none());
        assert_eq!(config.filter, Filter::new("7", "2005"));
        assert_eq!(config.database_path, PathBuf::from("./movies.db"));
        assert_eq!(config.replies.welcome, "Welcome!");
        assert_eq!(config.replies.fallback, "How can I help?");
    }

    #[test]
    fn test_overrides() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:x",
            "data_dir": "/var/lib/moviebot",
            "http_addr": "127.0.0.1:8080",
            "serve_http": false,
            "selector_url": "http://10.0.0.2:6782/randommovie",
            "min_rating": "8",
            "min_year": "2015",
            "rating_order": "numeric",
            "replies": {"welcome": "Hi there", "watch_url": "https://watch.example"}
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/var/lib/moviebot/movies.db"));
        assert!(!config.serve_http);
        assert_eq!(config.filter, Filter::new("8", "2015").with_order(RatingOrder::Numeric));
        assert_eq!(config.replies.welcome, "Hi there");
        assert_eq!(config.replies.failure, Replies::default().failure);
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{
            "telegram_bot_token": "",
            "replies": {"watch_url": "https://watch.example"}
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format() {
        for token in ["no_colon", "notanumber:ABC", "123456789:"] {
            let file = write_config(&format!(
                r#"{{"telegram_bot_token": "{token}", "replies": {{"watch_url": "https://w.example"}}}}"#
            ));
            let err = assert_err(Config::load(file.path()));
            assert!(matches!(err, ConfigError::Validation(_)), "token {token}");
        }
    }

    #[test]
    fn test_missing_watch_url() {
        let file = write_config(r#"{"telegram_bot_token": "1:x"}"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("watch_url"));
    }

    #[test]
    fn test_bad_http_addr() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:x",
            "http_addr": "localhost",
            "replies": {"watch_url": "https://watch.example"}
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("http_addr"));
    }

    #[test]
    fn test_numeric_order_needs_numbers() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:x",
            "min_rating": "seven",
            "rating_order": "numeric",
            "replies": {"watch_url": "https://watch.example"}
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_unknown_rating_order() {
        let file = write_config(r#"{
            "telegram_bot_token": "1:x",
            "rating_order": "random",
            "replies": {"watch_url": "https://watch.example"}
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
