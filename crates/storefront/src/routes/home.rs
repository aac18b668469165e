//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use ironic_gym_core::ProductCategory;
use tower_sessions::Session;
use tracing::instrument;

use super::{NavView, ProductCardView, cards};
use crate::state::AppState;

/// One category row on the home page.
#[derive(Clone)]
pub struct CategoryRowView {
    pub title: String,
    pub href: String,
    pub products: Vec<ProductCardView>,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: NavView,
    pub best_sellers: Vec<ProductCardView>,
    pub rows: Vec<CategoryRowView>,
    pub error: Option<String>,
}

/// Display the home page.
///
/// Shows best sellers followed by one row per featured category. Empty rows
/// are skipped. If the catalog cannot be loaded the page still renders.
#[instrument(skip(state, session))]
pub async fn home(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let nav = NavView::for_session(&session).await;

    let products = match state.backend().list_products().await {
        Ok(products) => products,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load catalog for home page");
            return HomeTemplate {
                nav,
                best_sellers: Vec::new(),
                rows: Vec::new(),
                error: Some(e.user_message()),
            };
        }
    };

    let best_sellers: Vec<_> = products
        .iter()
        .filter(|p| p.is_best_seller)
        .cloned()
        .collect();

    let rows = ProductCategory::HOME_ROWS
        .iter()
        .filter_map(|category| {
            let in_category: Vec<_> = products
                .iter()
                .filter(|p| &p.category == category)
                .cloned()
                .collect();
            (!in_category.is_empty()).then(|| CategoryRowView {
                title: row_title(category),
                href: format!("/products?category={category}"),
                products: cards(&in_category),
            })
        })
        .collect();

    HomeTemplate {
        nav,
        best_sellers: cards(&best_sellers),
        rows,
        error: None,
    }
}

/// Heading for a category row ("Hoodies", "Accessories").
fn row_title(category: &ProductCategory) -> String {
    match category {
        ProductCategory::Accessory => "Accessories".to_string(),
        ProductCategory::Shorts => "Shorts".to_string(),
        other => format!("{other}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_titles() {
        assert_eq!(row_title(&ProductCategory::Hoodie), "Hoodies");
        assert_eq!(row_title(&ProductCategory::Shorts), "Shorts");
        assert_eq!(row_title(&ProductCategory::Accessory), "Accessories");
    }
}
