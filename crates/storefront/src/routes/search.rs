//! Search route handler.
//!
//! Matching is a case-insensitive substring test on product name, brand and
//! category, run against the cached catalog.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{NavView, ProductCardView, cards};
use crate::error::Result;
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Search results page template.
#[derive(Template, WebTemplate)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub nav: NavView,
    pub query: String,
    pub products: Vec<ProductCardView>,
}

/// Display search results.
#[instrument(skip(state, session))]
pub async fn search(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let term = query.q.trim().to_string();
    let products = if term.is_empty() {
        Vec::new()
    } else {
        state.backend().search_products(&term).await?
    };

    Ok(SearchTemplate {
        nav: NavView::for_session(&session).await,
        query: term,
        products: cards(&products),
    })
}
