use crate::{
    entities::{cart_item, order, order_item, user},
    errors::ServiceError,
};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Account administration for the back-office and the operator CLI.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Every account, newest first
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserView>, ServiceError> {
        let users = user::Entity::find()
            .order_by_desc(user::Column::DateJoined)
            .all(&*self.db)
            .await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&*self.db)
            .await?)
    }

    pub async fn count_users(&self) -> Result<u64, ServiceError> {
        Ok(user::Entity::find().count(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<UserStats, ServiceError> {
        let since = start_of_month(Utc::now());
        Ok(UserStats {
            total: self.count_users().await?,
            admins: user::Entity::find()
                .filter(user::Column::IsAdmin.eq(true))
                .count(&*self.db)
                .await?,
            active: user::Entity::find()
                .filter(user::Column::IsActive.eq(true))
                .count(&*self.db)
                .await?,
            new_this_month: user::Entity::find()
                .filter(user::Column::DateJoined.gte(since))
                .count(&*self.db)
                .await?,
        })
    }

    /// Grants back-office access to the account with this email.
    #[instrument(skip(self))]
    pub async fn make_admin(&self, email: &str) -> Result<user::Model, ServiceError> {
        let account = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No user with email {}", email)))?;
        if account.is_admin {
            return Ok(account);
        }

        let mut active: user::ActiveModel = account.into();
        active.is_admin = Set(true);
        let updated = active.update(&*self.db).await?;
        info!(user_id = %updated.id, "Granted admin role");
        Ok(updated)
    }

    /// Removes an account together with its cart, orders and order lines.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, actor_id: Uuid, target_id: Uuid) -> Result<(), ServiceError> {
        if actor_id == target_id {
            return Err(ServiceError::InvalidOperation(
                "You cannot delete your own account.".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        user::Entity::find_by_id(target_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", target_id)))?;

        let order_ids: Vec<Uuid> = order::Entity::find()
            .select_only()
            .column(order::Column::Id)
            .filter(order::Column::UserId.eq(target_id))
            .into_tuple()
            .all(&txn)
            .await?;

        cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(target_id))
            .exec(&txn)
            .await?;
        if !order_ids.is_empty() {
            order_item::Entity::delete_many()
                .filter(order_item::Column::OrderId.is_in(order_ids.clone()))
                .exec(&txn)
                .await?;
        }
        order::Entity::delete_many()
            .filter(order::Column::UserId.eq(target_id))
            .exec(&txn)
            .await?;
        user::Entity::delete_by_id(target_id).exec(&txn).await?;
        txn.commit().await?;

        info!(
            user_id = %target_id,
            deleted_by = %actor_id,
            orders = order_ids.len(),
            "Deleted user"
        );
        Ok(())
    }
}

fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Account as shown to admins; never includes the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub wallet_balance: Decimal,
    pub is_admin: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl From<user::Model> for UserView {
    fn from(model: user::Model) -> Self {
        Self {
            wallet_balance: model.wallet_balance(),
            id: model.id,
            name: model.name,
            email: model.email,
            is_admin: model.is_admin,
            is_active: model.is_active,
            date_joined: model.date_joined,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
    pub total: u64,
    pub admins: u64,
    pub active: u64,
    pub new_this_month: u64,
}
