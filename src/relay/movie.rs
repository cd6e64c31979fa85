//! Movie documents as they live in the store.

use serde::{Deserialize, Serialize};

/// One download link for a movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOption {
    pub quality: String,
    pub link: String,
}

/// Cast entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub name: String,
}

/// A movie record.
///
/// `rating` and `year` are numbers encoded as strings, exactly as the
/// documents were scraped. Field names follow the stored JSON documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub download: Vec<DownloadOption>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub trailer_link: String,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub actors: Vec<Actor>,
}

/// The public projection served by `GET /randommovie`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSummary {
    pub title: String,
    pub summary: String,
    pub rating: String,
    pub year: String,
    pub genres: Vec<String>,
    pub download: Vec<DownloadOption>,
    pub image_url: String,
}

impl From<MovieRecord> for MovieSummary {
    fn from(m: MovieRecord) -> Self {
        Self {
            title: m.title,
            summary: m.summary,
            rating: m.rating,
            year: m.year,
            genres: m.genres,
            download: m.download,
            image_url: m.image_url,
        }
    }
}

impl From<MovieSummary> for MovieRecord {
    fn from(s: MovieSummary) -> Self {
        Self {
            title: s.title,
            summary: s.summary,
            rating: s.rating,
            year: s.year,
            genres: s.genres,
            image_url: s.image_url,
            download: s.download,
            url: String::new(),
            trailer_link: String::new(),
            directors: Vec::new(),
            actors: Vec::new(),
        }
    }
}

/// Parse an export of movie documents: a JSON array, or one document per
/// line. Documents without a title are dropped; returns them as a count.
pub fn parse_documents(text: &str) -> Result<(Vec<MovieRecord>, usize), String> {
    let all: Vec<MovieRecord> = if text.trim_start().starts_with('[') {
        serde_json::from_str(text).map_err(|e| format!("Invalid JSON array: {e}"))?
    } else {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| format!("Invalid document on line {}: {e}", i + 1))
            })
            .collect::<Result<_, _>>()?
    };

    let total = all.len();
    let movies: Vec<MovieRecord> = all.into_iter().filter(|m| !m.title.trim().is_empty()).collect();
    let skipped = total - movies.len();
    Ok((movies, skipped))
}
