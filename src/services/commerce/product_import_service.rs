use crate::{
    entities::commerce::{product, ProductCategory},
    errors::{is_unique_violation, ServiceError},
    money,
    services::commerce::{
        product_catalog_service::{normalize_image_path, PRODUCT_IMAGE_PREFIX},
        sku::{SkuAllocator, MAX_SKU_ATTEMPTS},
    },
};
use chrono::Utc;
use csv::{ReaderBuilder, StringRecord, Trim};
use sea_orm::{DatabaseConnection, EntityTrait, Set, TransactionTrait};
use serde::Serialize;
use std::{str::FromStr, sync::Arc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Errors quoted in the report summary before it is abbreviated.
pub const SUMMARY_ERROR_LIMIT: usize = 5;

const REQUIRED_COLUMNS: [&str; 4] = ["name", "category", "price", "stock_level"];

/// Bulk product creation from CSV with per-row validation.
///
/// Bad rows are reported and skipped; the good ones are inserted together
/// in one transaction or not at all.
#[derive(Clone)]
pub struct ProductImportService {
    db: Arc<DatabaseConnection>,
}

impl ProductImportService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Stages every row, then stores the valid ones in one transaction.
    ///
    /// A failed write returns [`ServiceError::ImportFailed`] with the row
    /// errors found while staging and nothing imported.
    #[instrument(skip(self, csv_text), fields(bytes = csv_text.len()))]
    pub async fn import_csv(&self, csv_text: &str) -> Result<ImportReport, ServiceError> {
        let StagedBatch { rows, errors } = stage_rows(csv_text)?;

        if rows.is_empty() {
            info!(errors = errors.len(), "Import produced no valid rows");
            return Ok(ImportReport::new(0, errors));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.insert_batch(&rows).await {
                Ok(()) => break,
                Err(err) if is_unique_violation(&err) && attempt < MAX_SKU_ATTEMPTS => {
                    warn!(attempt, "SKU collision during import, restaging batch");
                }
                Err(err) => {
                    error!(error = %err, rows = rows.len(), "Import batch rolled back");
                    return Err(ServiceError::ImportFailed(Box::new(ImportReport::new(
                        0, errors,
                    ))));
                }
            }
        }

        info!(imported = rows.len(), errors = errors.len(), "Imported products");
        Ok(ImportReport::new(rows.len(), errors))
    }

    async fn insert_batch(&self, rows: &[StagedProduct]) -> Result<(), sea_orm::DbErr> {
        let txn = self.db.begin().await?;
        let mut skus = SkuAllocator::start(&txn).await?;
        let now = Utc::now();

        let mut models = Vec::with_capacity(rows.len());
        for row in rows {
            models.push(product::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(row.name.clone()),
                sku: Set(skus.allocate(&txn, row.category).await?),
                description: Set(row.description.clone()),
                price_cents: Set(row.price_cents),
                stock_level: Set(row.stock_level),
                category: Set(row.category),
                image_url: Set(row.image_url.clone()),
                created_at: Set(now),
                updated_at: Set(Some(now)),
            });
        }

        product::Entity::insert_many(models)
            .exec_without_returning(&txn)
            .await?;
        txn.commit().await
    }
}

/// Outcome of one import request
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
}

impl ImportReport {
    fn new(imported: usize, errors: Vec<String>) -> Self {
        let message = if imported == 0 {
            "No products imported.".to_string()
        } else {
            format!("Successfully imported {} product(s).", imported)
        };
        Self {
            imported,
            error_summary: summarize(&errors),
            errors,
            message,
        }
    }
}

fn summarize(errors: &[String]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    let mut summary = errors
        .iter()
        .take(SUMMARY_ERROR_LIMIT)
        .cloned()
        .collect::<Vec<_>>()
        .join(" | ");
    if errors.len() > SUMMARY_ERROR_LIMIT {
        summary.push_str(&format!(" (+{} more)", errors.len() - SUMMARY_ERROR_LIMIT));
    }
    Some(summary)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StagedProduct {
    name: String,
    category: ProductCategory,
    price_cents: i64,
    stock_level: i32,
    description: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Default)]
struct StagedBatch {
    rows: Vec<StagedProduct>,
    errors: Vec<String>,
}

/// Column positions resolved from the header row.
struct Columns {
    name: usize,
    category: usize,
    price: usize,
    stock_level: usize,
    description: Option<usize>,
    image_url: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, ServiceError> {
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(column))
        };
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| find(c).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "CSV header is missing column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            name: find("name").unwrap_or_default(),
            category: find("category").unwrap_or_default(),
            price: find("price").unwrap_or_default(),
            stock_level: find("stock_level").unwrap_or_default(),
            description: find("description"),
            image_url: find("image_url"),
        })
    }
}

fn stage_rows(csv_text: &str) -> Result<StagedBatch, ServiceError> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(csv_text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ServiceError::ValidationError(format!("Unreadable CSV header: {}", e)))?
        .clone();
    let columns = Columns::from_headers(&headers)?;

    let mut batch = StagedBatch::default();
    for (index, record) in reader.records().enumerate() {
        let row = index + 2;
        match record {
            Ok(record) => match stage_row(row, &record, &columns, &mut batch.errors) {
                Ok(staged) => batch.rows.push(staged),
                Err(message) => batch.errors.push(message),
            },
            Err(err) => batch.errors.push(format!("Row {}: {}", row, err)),
        }
    }
    Ok(batch)
}

/// Validates one record; image problems are recorded but do not reject the row.
fn stage_row(
    row: usize,
    record: &StringRecord,
    columns: &Columns,
    errors: &mut Vec<String>,
) -> Result<StagedProduct, String> {
    let field = |i: usize| record.get(i).map(str::trim).unwrap_or("");
    let optional = |i: Option<usize>| i.map(field).unwrap_or("");

    let (name, category, price, stock) = (
        field(columns.name),
        field(columns.category),
        field(columns.price),
        field(columns.stock_level),
    );
    if name.is_empty() || category.is_empty() || price.is_empty() || stock.is_empty() {
        return Err(format!("Row {}: Missing required fields", row));
    }

    let category = ProductCategory::from_str(&category.to_lowercase())
        .map_err(|_| format!("Row {}: Invalid category '{}'", row, category))?;
    let price_cents = money::parse_cents(price)
        .filter(|cents| *cents >= 1)
        .ok_or_else(|| format!("Row {}: Invalid price '{}'", row, price))?;
    let stock_level = stock
        .parse::<i32>()
        .ok()
        .filter(|s| *s >= 0)
        .ok_or_else(|| format!("Row {}: Invalid stock '{}'", row, stock))?;

    let image_url = match normalize_image_path(optional(columns.image_url)) {
        Ok(path) => path,
        Err(_) => {
            errors.push(format!(
                "Row {}: image_url must be in {}",
                row, PRODUCT_IMAGE_PREFIX
            ));
            None
        }
    };
    let description = Some(optional(columns.description))
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    Ok(StagedProduct {
        name: name.to_string(),
        category,
        price_cents,
        stock_level,
        description,
        image_url,
    })
}
