//! HTTP read endpoint: `GET /randommovie`.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use warp::Filter;
use warp::http::StatusCode;
use warp::reply::{Reply, Response};

use crate::relay::movie::MovieSummary;
use crate::relay::selector::{CandidateSource, Selector};
use crate::relay::store::{Filter as MovieFilter, MovieStore, RatingOrder};

pub const NOT_FOUND_MESSAGE: &str = "No movies found matching the criteria.";

/// Optional per-request overrides of the configured filter.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub min_rating: Option<String>,
    pub min_year: Option<String>,
    pub order: Option<RatingOrder>,
}

impl FilterQuery {
    fn apply(self, mut filter: MovieFilter) -> MovieFilter {
        if let Some(r) = self.min_rating {
            filter.min_rating = r;
        }
        if let Some(y) = self.min_year {
            filter.min_year = y;
        }
        if let Some(o) = self.order {
            filter.order = o;
        }
        filter
    }
}

#[derive(Serialize)]
struct MessageBody {
    message: String,
}

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    warp::reply::with_status(warp::reply::json(&MessageBody { message: text.into() }), status)
        .into_response()
}

fn with_selector<S: MovieStore + 'static>(
    selector: Arc<Selector<S>>,
) -> impl Filter<Extract = (Arc<Selector<S>>,), Error = Infallible> + Clone {
    warp::any().map(move || selector.clone())
}

async fn random_movie<S: MovieStore>(
    query: FilterQuery,
    selector: Arc<Selector<S>>,
) -> Result<Response, Infallible> {
    let filter = query.apply(selector.default_filter());

    let response = match selector.select(&filter) {
        Ok(Some(movie)) => warp::reply::json(&MovieSummary::from(movie)).into_response(),
        Ok(None) => message(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
        Err(e) => {
            error!("GET /randommovie failed: {e}");
            message(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    };
    Ok(response)
}

/// All routes, with CORS open to any origin.
pub fn routes<S: MovieStore + 'static>(
    selector: Arc<Selector<S>>,
) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
    let cors = warp::cors().allow_any_origin().allow_methods(vec!["GET"]);

    warp::get()
        .and(warp::path("randommovie"))
        .and(warp::path::end())
        .and(warp::query::<FilterQuery>())
        .and(with_selector(selector))
        .and_then(random_movie::<S>)
        .with(cors)
        .with(warp::trace::request())
}

/// Serve until `shutdown` resolves.
pub async fn serve<S: MovieStore + 'static>(
    addr: SocketAddr,
    selector: Arc<Selector<S>>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), String> {
    let (bound, server) = warp::serve(routes(selector))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|e| format!("Failed to bind {addr}: {e}"))?;

    info!("🌐 HTTP server listening on http://{bound}");
    server.await;
    info!("HTTP server stopped");
    Ok(())
}
