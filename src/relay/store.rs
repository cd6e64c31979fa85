//! SQLite-backed movie store.

use std::fmt;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, Row, params};
use serde::Deserialize;
use tracing::{debug, info};

use crate::relay::movie::{Actor, DownloadOption, MovieRecord};

/// How `rating` and `year` are compared against the filter bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingOrder {
    /// Plain string comparison, the way the stored documents were always
    /// queried. "10" sorts below "9".
    #[default]
    Lexicographic,
    /// Compare as numbers.
    Numeric,
}

impl RatingOrder {
    fn where_clause(self) -> &'static str {
        match self {
            RatingOrder::Lexicographic => "rating >= ?1 AND year >= ?2",
            RatingOrder::Numeric => {
                "CAST(rating AS REAL) >= CAST(?1 AS REAL) AND CAST(year AS REAL) >= CAST(?2 AS REAL)"
            }
        }
    }
}

/// Candidate filter: both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub min_rating: String,
    pub min_year: String,
    pub order: RatingOrder,
}

impl Filter {
    pub fn new(min_rating: impl Into<String>, min_year: impl Into<String>) -> Self {
        Self {
            min_rating: min_rating.into(),
            min_year: min_year.into(),
            order: RatingOrder::default(),
        }
    }

    pub fn with_order(mut self, order: RatingOrder) -> Self {
        self.order = order;
        self
    }
}

/// Errors from the store.
#[derive(Debug)]
pub enum StoreError {
    /// SQLite failed.
    Sqlite(rusqlite::Error),
    /// A stored list column held invalid JSON.
    Decode { column: &'static str, source: serde_json::Error },
    /// The connection lock was poisoned by a panicking holder.
    Poisoned,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(e) => write!(f, "database error: {}", e),
            Self::Decode { column, source } => {
                write!(f, "corrupt '{}' column: {}", column, source)
            }
            Self::Poisoned => write!(f, "database connection lock poisoned"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            Self::Decode { source, .. } => Some(source),
            Self::Poisoned => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

/// Read capability the selector needs from a document store.
pub trait MovieStore: Send + Sync {
    /// Every record matching the filter, in insertion order.
    fn query(&self, filter: &Filter) -> Result<Vec<MovieRecord>, StoreError>;

    /// One record drawn uniformly from those matching the filter.
    fn sample_one(&self, filter: &Filter) -> Result<Option<MovieRecord>, StoreError>;
}

const COLUMNS: &str =
    "title, summary, rating, year, genres, image_url, download, url, trailer_link, directors, actors";

/// Column values before the JSON list columns are decoded.
struct RawMovie {
    title: String,
    summary: String,
    rating: String,
    year: String,
    genres: String,
    image_url: String,
    download: String,
    url: String,
    trailer_link: String,
    directors: String,
    actors: String,
}

impl RawMovie {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            title: row.get(0)?,
            summary: row.get(1)?,
            rating: row.get(2)?,
            year: row.get(3)?,
            genres: row.get(4)?,
            image_url: row.get(5)?,
            download: row.get(6)?,
            url: row.get(7)?,
            trailer_link: row.get(8)?,
            directors: row.get(9)?,
            actors: row.get(10)?,
        })
    }

    fn decode(self) -> Result<MovieRecord, StoreError> {
        let genres: Vec<String> = decode_list("genres", &self.genres)?;
        let download: Vec<DownloadOption> = decode_list("download", &self.download)?;
        let directors: Vec<String> = decode_list("directors", &self.directors)?;
        let actors: Vec<Actor> = decode_list("actors", &self.actors)?;

        Ok(MovieRecord {
            title: self.title,
            summary: self.summary,
            rating: self.rating,
            year: self.year,
            genres,
            image_url: self.image_url,
            download,
            url: self.url,
            trailer_link: self.trailer_link,
            directors,
            actors,
        })
    }
}

fn decode_list<T: for<'de> Deserialize<'de>>(
    column: &'static str,
    text: &str,
) -> Result<Vec<T>, StoreError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(text).map_err(|source| StoreError::Decode { column, source })
}

fn encode_list<T: serde::Serialize>(items: &[T]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

/// Movie store on a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create an empty in-memory store.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let store = Self::from_connection(Connection::open(path)?)?;
        info!("Opened movie store at {:?} ({} movies)", path, store.count()?);
        Ok(store)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS movies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                rating TEXT NOT NULL DEFAULT '',
                year TEXT NOT NULL DEFAULT '',
                genres TEXT NOT NULL DEFAULT '[]',
                image_url TEXT NOT NULL DEFAULT '',
                download TEXT NOT NULL DEFAULT '[]',
                url TEXT NOT NULL DEFAULT '',
                trailer_link TEXT NOT NULL DEFAULT '',
                directors TEXT NOT NULL DEFAULT '[]',
                actors TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_movies_rating_year ON movies(rating, year);
        "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Insert one movie, returning its row id.
    pub fn insert(&self, movie: &MovieRecord) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        insert_row(&conn, movie)?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert many movies in one transaction.
    pub fn insert_all(&self, movies: &[MovieRecord]) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for movie in movies {
            insert_row(&tx, movie)?;
        }
        tx.commit()?;
        Ok(movies.len())
    }

    /// Remove every movie.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM movies", [])?)
    }
}

fn insert_row(conn: &Connection, movie: &MovieRecord) -> Result<(), StoreError> {
    conn.execute(
        &format!("INSERT INTO movies ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
        params![
            movie.title,
            movie.summary,
            movie.rating,
            movie.year,
            encode_list(&movie.genres),
            movie.image_url,
            encode_list(&movie.download),
            movie.url,
            movie.trailer_link,
            encode_list(&movie.directors),
            encode_list(&movie.actors),
        ],
    )?;
    Ok(())
}

impl MovieStore for SqliteStore {
    fn query(&self, filter: &Filter) -> Result<Vec<MovieRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {COLUMNS} FROM movies WHERE {} ORDER BY id",
            filter.order.where_clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![filter.min_rating, filter.min_year], RawMovie::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawMovie::decode).collect()
    }

    fn sample_one(&self, filter: &Filter) -> Result<Option<MovieRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {COLUMNS} FROM movies WHERE {} ORDER BY RANDOM() LIMIT 1",
            filter.order.where_clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![filter.min_rating, filter.min_year])?;
        match rows.next()? {
            Some(row) => {
                let raw = RawMovie::from_row(row)?;
                debug!("Sampled '{}' ({}, {})", raw.title, raw.rating, raw.year);
                raw.decode().map(Some)
            }
            None => Ok(None),
        }
    }
}
