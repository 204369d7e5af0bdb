use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product entity for the catalog system
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub sku: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_level: i32,
    pub category: ProductCategory,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn price(&self) -> Decimal {
        crate::money::from_cents(self.price_cents)
    }

    pub fn in_stock(&self) -> bool {
        self.stock_level > 0
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
    #[sea_orm(has_many = "crate::entities::order_item::Entity")]
    OrderItems,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<crate::entities::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Closed set of catalog categories
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProductCategory {
    #[sea_orm(string_value = "handbag")]
    Handbag,
    #[sea_orm(string_value = "watch")]
    Watch,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handbag => "handbag",
            Self::Watch => "watch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn category_parsing_ignores_case() {
        assert_eq!(
            ProductCategory::from_str("HandBag").unwrap(),
            ProductCategory::Handbag
        );
        assert_eq!(ProductCategory::from_str("watch").unwrap(), ProductCategory::Watch);
        assert!(ProductCategory::from_str("bag").is_err());
    }

    #[test]
    fn category_display_matches_storage_value() {
        assert_eq!(ProductCategory::Watch.to_string(), "watch");
        assert_eq!(ProductCategory::Handbag.as_str(), "handbag");
    }
}
