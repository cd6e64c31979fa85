//! Random candidate selection.
//!
//! [`Selector`] runs against a local [`MovieStore`]; [`RemoteSource`] asks
//! another instance's `/randommovie` endpoint. Both are [`CandidateSource`]s,
//! so the chat side does not care which one it got.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::relay::movie::{MovieRecord, MovieSummary};
use crate::relay::store::{Filter, MovieStore, RatingOrder, StoreError};

/// Why no candidate could be produced. "Nothing matched" is not an error.
#[derive(Debug)]
pub enum SelectError {
    /// The local store failed.
    StoreUnavailable(String),
    /// The remote endpoint failed or answered with garbage.
    Remote(String),
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreUnavailable(e) => write!(f, "{e}"),
            Self::Remote(e) => write!(f, "remote selector error: {e}"),
        }
    }
}

impl std::error::Error for SelectError {}

impl From<StoreError> for SelectError {
    fn from(e: StoreError) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

/// Anything that can hand out one random movie for a filter.
pub trait CandidateSource: Send + Sync {
    /// The filter applied when a caller has no overrides.
    fn default_filter(&self) -> Filter;

    fn random_candidate(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = Result<Option<MovieRecord>, SelectError>> + Send;
}

impl<C: CandidateSource> CandidateSource for Arc<C> {
    fn default_filter(&self) -> Filter {
        (**self).default_filter()
    }

    async fn random_candidate(&self, filter: &Filter) -> Result<Option<MovieRecord>, SelectError> {
        (**self).random_candidate(filter).await
    }
}

/// In-process selector over a movie store.
pub struct Selector<S> {
    store: S,
    defaults: Filter,
}

impl<S: MovieStore> Selector<S> {
    pub fn new(store: S, defaults: Filter) -> Self {
        Self { store, defaults }
    }

    /// Pick one movie with `rating >= min_rating` and `year >= min_year`.
    pub fn select_random_candidate(
        &self,
        min_rating: &str,
        min_year: &str,
    ) -> Result<Option<MovieRecord>, SelectError> {
        let filter = Filter::new(min_rating, min_year).with_order(self.defaults.order);
        self.select(&filter)
    }

    /// Pick one movie for an explicit filter.
    pub fn select(&self, filter: &Filter) -> Result<Option<MovieRecord>, SelectError> {
        let picked = self.store.sample_one(filter)?;
        match &picked {
            Some(m) => debug!("Selected '{}' for rating>={} year>={}", m.title, filter.min_rating, filter.min_year),
            None => info!("No candidates for rating>={} year>={}", filter.min_rating, filter.min_year),
        }
        Ok(picked)
    }
}

impl<S: MovieStore> CandidateSource for Selector<S> {
    fn default_filter(&self) -> Filter {
        self.defaults.clone()
    }

    async fn random_candidate(&self, filter: &Filter) -> Result<Option<MovieRecord>, SelectError> {
        self.select(filter)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Candidate source that calls a `/randommovie` endpoint over HTTP.
pub struct RemoteSource {
    endpoint: String,
    defaults: Filter,
    client: reqwest::Client,
}

impl RemoteSource {
    /// `endpoint` is the full URL, e.g. "http://localhost:6782/randommovie".
    pub fn new(endpoint: String, defaults: Filter) -> Self {
        Self {
            endpoint,
            defaults,
            client: reqwest::Client::new(),
        }
    }
}

impl CandidateSource for RemoteSource {
    fn default_filter(&self) -> Filter {
        self.defaults.clone()
    }

    async fn random_candidate(&self, filter: &Filter) -> Result<Option<MovieRecord>, SelectError> {
        let mut query = vec![
            ("min_rating", filter.min_rating.as_str()),
            ("min_year", filter.min_year.as_str()),
        ];
        if filter.order == RatingOrder::Numeric {
            query.push(("order", "numeric"));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| SelectError::Remote(format!("request failed: {e}")))?;

        let status = response.status();
        // A missing route is also a 404; only the endpoint's own reply means "no match".
        if status == reqwest::StatusCode::NOT_FOUND {
            return match response.json::<ErrorBody>().await {
                Ok(_) => Ok(None),
                Err(_) => Err(SelectError::Remote(format!("{status}: no movie endpoint at {}", self.endpoint))),
            };
        }
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => String::from("no error message"),
            };
            return Err(SelectError::Remote(format!("{status}: {message}")));
        }

        let summary: MovieSummary = response
            .json()
            .await
            .map_err(|e| SelectError::Remote(format!("bad response body: {e}")))?;
        Ok(Some(summary.into()))
    }
}
