use crate::handlers::common::{map_service_error, success_response};
use crate::{
    entities::commerce::ProductCategory,
    errors::ApiError,
    services::commerce::ProductView,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

/// Creates the router for the public catalog
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/featured", get(featured_products))
        .route("/:id", get(get_product))
}

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub category: Option<String>,
}

/// Parses an optional category filter; blank means no filter.
pub(crate) fn parse_category(raw: Option<&str>) -> Result<Option<ProductCategory>, ApiError> {
    match raw.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(None),
        Some(raw) => ProductCategory::from_str(raw)
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("Unknown category '{}'", raw))),
    }
}

/// List products ordered by name
async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let category = parse_category(query.category.as_deref())?;
    let products = state
        .services
        .product_catalog
        .list_products(category)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(
        products.into_iter().map(ProductView::from).collect::<Vec<_>>(),
    ))
}

async fn featured_products(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .product_catalog
        .featured_products()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(
        products.into_iter().map(ProductView::from).collect::<Vec<_>>(),
    ))
}

/// Get product by ID
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .product_catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ProductView::from(product)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_filter_is_optional_and_case_insensitive() {
        assert_eq!(parse_category(None).unwrap(), None);
        assert_eq!(parse_category(Some(" ")).unwrap(), None);
        assert_eq!(
            parse_category(Some("Watch")).unwrap(),
            Some(ProductCategory::Watch)
        );
        assert!(parse_category(Some("shoes")).is_err());
    }
}
