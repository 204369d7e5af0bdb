use crate::{
    entities::commerce::{cart_item, product, ProductCategory, ProductModel},
    entities::order_item,
    errors::{is_unique_violation, ServiceError},
    money,
    services::commerce::sku::{SkuAllocator, MAX_SKU_ATTEMPTS},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Number of products on the storefront landing page.
pub const FEATURED_LIMIT: u64 = 8;

/// Directory every stored product image must live under.
pub const PRODUCT_IMAGE_PREFIX: &str = "uploads/products/";

/// Product catalog service: storefront reads and admin writes.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All products ordered by name, optionally restricted to one category
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        category: Option<ProductCategory>,
    ) -> Result<Vec<ProductModel>, ServiceError> {
        let mut query = product::Entity::find();
        if let Some(category) = category {
            query = query.filter(product::Column::Category.eq(category));
        }
        Ok(query
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Landing-page selection
    #[instrument(skip(self))]
    pub async fn featured_products(&self) -> Result<Vec<ProductModel>, ServiceError> {
        Ok(product::Entity::find()
            .order_by_asc(product::Column::CreatedAt)
            .limit(FEATURED_LIMIT)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    pub async fn count_products(&self) -> Result<u64, ServiceError> {
        Ok(product::Entity::find().count(&*self.db).await?)
    }

    /// Create a product with a generated `{category}_{n}` SKU
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        let price_cents = validate_price(input.price)?;
        let image_url = normalize_optional_image(input.image_url.as_deref())?;
        let description = non_empty(input.description);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let txn = self.db.begin().await?;
            let mut skus = SkuAllocator::start(&txn).await?;
            let sku = skus.allocate(&txn, input.category).await?;

            let now = Utc::now();
            let model = product::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(input.name.trim().to_string()),
                sku: Set(sku.clone()),
                description: Set(description.clone()),
                price_cents: Set(price_cents),
                stock_level: Set(input.stock_level),
                category: Set(input.category),
                image_url: Set(image_url.clone()),
                created_at: Set(now),
                updated_at: Set(Some(now)),
            };

            let inserted = match model.insert(&txn).await {
                Ok(inserted) => inserted,
                Err(err) if is_unique_violation(&err) && attempt < MAX_SKU_ATTEMPTS => {
                    warn!(sku = %sku, attempt, "SKU claimed concurrently, retrying");
                    txn.rollback().await?;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            txn.commit().await?;

            info!(product_id = %inserted.id, sku = %inserted.sku, "Created product");
            return Ok(inserted);
        }
    }

    /// Update any field except the SKU
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        let product = self.get_product(product_id).await?;
        let mut active: product::ActiveModel = product.into();

        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(price) = input.price {
            active.price_cents = Set(validate_price(price)?);
        }
        if let Some(stock_level) = input.stock_level {
            active.stock_level = Set(stock_level);
        }
        if let Some(description) = input.description {
            active.description = Set(non_empty(Some(description)));
        }
        if let Some(image_url) = input.image_url {
            active.image_url = Set(normalize_optional_image(Some(&image_url))?);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;
        info!(product_id = %product_id, "Updated product");
        Ok(updated)
    }

    /// Delete a product that no order references; removes it from every cart.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let referenced = order_item::Entity::find()
            .filter(order_item::Column::ProductId.eq(product_id))
            .count(&txn)
            .await?;
        if referenced > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product {} appears on {} order line(s) and cannot be deleted",
                product_id, referenced
            )));
        }

        cart_item::Entity::delete_many()
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        product::Entity::delete_by_id(product_id).exec(&txn).await?;
        txn.commit().await?;

        info!(product_id = %product_id, "Deleted product");
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_price(price: Decimal) -> Result<i64, ServiceError> {
    let cents = money::to_cents(price)?;
    if cents < 1 {
        return Err(ServiceError::ValidationError(
            "Price must be at least 0.01".to_string(),
        ));
    }
    Ok(cents)
}

fn normalize_optional_image(raw: Option<&str>) -> Result<Option<String>, ServiceError> {
    match raw {
        None => Ok(None),
        Some(raw) => normalize_image_path(raw).map_err(|_| {
            ServiceError::ValidationError(format!(
                "image_url must be in {}",
                PRODUCT_IMAGE_PREFIX
            ))
        }),
    }
}

/// The image reference lies outside the product upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePathOutsideUploads;

/// Normalizes a stored image reference.
///
/// Strips one leading `/` and a leading `static/`, then requires the
/// `uploads/products/` prefix. Blank input means "no image".
pub fn normalize_image_path(raw: &str) -> Result<Option<String>, ImagePathOutsideUploads> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let path = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let path = path.strip_prefix("static/").unwrap_or(path);
    if path.starts_with(PRODUCT_IMAGE_PREFIX) {
        Ok(Some(path.to_string()))
    } else {
        Err(ImagePathOutsideUploads)
    }
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category: ProductCategory,
    pub price: Decimal,
    #[validate(range(min = 0))]
    pub stock_level: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Input for editing a product; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub category: Option<ProductCategory>,
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock_level: Option<i32>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

/// Product as shown to shoppers and admins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: ProductCategory,
    pub price: Decimal,
    pub stock_level: i32,
    pub in_stock: bool,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ProductModel> for ProductView {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            price: model.price(),
            in_stock: model.in_stock(),
            name: model.name,
            sku: model.sku,
            category: model.category,
            stock_level: model.stock_level,
            description: model.description,
            image_url: model.image_url,
            created_at: model.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn image_paths_are_normalized() {
        assert_eq!(
            normalize_image_path("/static/uploads/products/a.png"),
            Ok(Some("uploads/products/a.png".to_string()))
        );
        assert_eq!(
            normalize_image_path("uploads/products/b.jpg"),
            Ok(Some("uploads/products/b.jpg".to_string()))
        );
        assert_eq!(normalize_image_path("  "), Ok(None));
    }

    #[test]
    fn image_paths_outside_uploads_are_rejected() {
        assert!(normalize_image_path("/etc/passwd").is_err());
        assert!(normalize_image_path("static/img/logo.png").is_err());
        assert!(normalize_image_path("//uploads/products/x.png").is_err());
    }

    #[test]
    fn prices_below_one_cent_are_rejected() {
        assert!(validate_price(dec!(0.00)).is_err());
        assert!(validate_price(dec!(-1)).is_err());
        assert_eq!(validate_price(dec!(0.01)).unwrap(), 1);
    }
}
