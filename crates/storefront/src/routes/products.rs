//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use ironic_gym_core::{Product, ProductCategory, ProductId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::{NavView, ProductCardView, cards};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Product detail display data.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub price: String,
    pub images: Vec<String>,
    pub in_stock: bool,
    pub stock_label: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        let images = [&product.main_image_url, &product.cart_image_url]
            .into_iter()
            .filter(|url| !url.is_empty())
            .cloned()
            .collect();

        let stock_label = match product.quantity {
            0 => "Out of stock".to_string(),
            1..=5 => format!("Only {} left", product.quantity),
            _ => "In stock".to_string(),
        };

        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.to_string(),
            description: product.description.clone(),
            price: product.price_cents.to_string(),
            images,
            in_stock: product.in_stock(),
            stock_label,
        }
    }
}

/// Category filter tab.
#[derive(Clone)]
pub struct CategoryTabView {
    pub label: String,
    pub href: String,
    pub active: bool,
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub nav: NavView,
    pub heading: String,
    pub tabs: Vec<CategoryTabView>,
    pub products: Vec<ProductCardView>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub nav: NavView,
    pub product: ProductView,
}

fn category_tabs(selected: Option<&ProductCategory>) -> Vec<CategoryTabView> {
    let mut tabs = vec![CategoryTabView {
        label: "All".to_string(),
        href: "/products".to_string(),
        active: selected.is_none(),
    }];
    tabs.extend(ProductCategory::HOME_ROWS.iter().map(|category| CategoryTabView {
        label: category.to_string(),
        href: format!("/products?category={category}"),
        active: selected == Some(category),
    }));
    tabs
}

/// Display the product listing, optionally filtered to one category.
#[instrument(skip(state, session))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse> {
    let category = query
        .category
        .filter(|c| !c.trim().is_empty())
        .map(ProductCategory::from);

    let products = match &category {
        Some(category) => state.backend().products_by_category(category).await?,
        None => state.backend().list_products().await?.to_vec(),
    };

    Ok(ProductsIndexTemplate {
        nav: NavView::for_session(&session).await,
        heading: category
            .as_ref()
            .map_or_else(|| "All products".to_string(), ToString::to_string),
        tabs: category_tabs(category.as_ref()),
        products: cards(&products),
    })
}

/// Display a single product.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let product = state
        .backend()
        .find_product(&ProductId::new(id.as_str()))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    crate::error::add_breadcrumb("navigation", "Viewed product", &[("product_id", id.as_str())]);

    Ok(ProductShowTemplate {
        nav: NavView::for_session(&session).await,
        product: ProductView::from(&product),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironic_gym_core::Cents;

    fn product(quantity: u32) -> Product {
        Product {
            id: ProductId::new("p1"),
            name: "Tee".to_string(),
            price_cents: Cents::new(2500),
            brand: "Ironic".to_string(),
            category: ProductCategory::Tee,
            description: String::new(),
            main_image_url: "main.jpg".to_string(),
            cart_image_url: String::new(),
            quantity,
            is_best_seller: false,
        }
    }

    #[test]
    fn test_product_view_formats_price_and_stock() {
        let view = ProductView::from(&product(3));
        assert_eq!(view.price, "$25.00 CAD");
        assert_eq!(view.stock_label, "Only 3 left");
        assert_eq!(view.images, vec!["main.jpg".to_string()]);

        assert!(!ProductView::from(&product(0)).in_stock);
    }

    #[test]
    fn test_category_tabs_mark_selection() {
        let tabs = category_tabs(Some(&ProductCategory::Shorts));
        assert!(!tabs[0].active);
        assert!(tabs.iter().any(|t| t.label == "Shorts" && t.active));
    }
}
