use crate::entities::commerce::{product, ProductCategory};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter};

/// Attempts made when a concurrent writer claims a generated SKU first.
pub const MAX_SKU_ATTEMPTS: usize = 3;

/// Hands out `{category}_{n}` SKUs starting after the current product count.
///
/// The counter only moves forward, so one allocator never issues the same
/// SKU twice; candidates already stored are skipped. The unique index on
/// `products.sku` still guards against a concurrent allocator.
#[derive(Debug)]
pub struct SkuAllocator {
    next: u64,
}

impl SkuAllocator {
    pub async fn start<C: ConnectionTrait>(conn: &C) -> Result<Self, DbErr> {
        let existing = product::Entity::find().count(conn).await?;
        Ok(Self { next: existing + 1 })
    }

    pub async fn allocate<C: ConnectionTrait>(
        &mut self,
        conn: &C,
        category: ProductCategory,
    ) -> Result<String, DbErr> {
        loop {
            let candidate = format!("{}_{}", category.as_str(), self.next);
            self.next += 1;

            let taken = product::Entity::find()
                .filter(product::Column::Sku.eq(candidate.as_str()))
                .count(conn)
                .await?
                > 0;
            if !taken {
                return Ok(candidate);
            }
        }
    }
}
