use crate::{
    db::DbPool,
    entities::item,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 120, message = "Item name is required"))]
    pub name: String,
    pub selling_price: Decimal,
    #[serde(default)]
    pub inventory_qty: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 120, message = "Item name is required"))]
    pub name: Option<String>,
    pub selling_price: Option<Decimal>,
    /// Absolute restatement of on-hand stock (e.g. after a count).
    pub inventory_qty: Option<i32>,
}

#[derive(Clone)]
pub struct ItemService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ItemService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send item event");
            }
        }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        organization_id: Uuid,
        request: CreateItemRequest,
    ) -> Result<item::Model, ServiceError> {
        request.validate()?;
        if request.selling_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "selling_price must not be negative".to_string(),
            ));
        }
        if request.inventory_qty < 0 {
            return Err(ServiceError::ValidationError(
                "inventory_qty must not be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let created = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            selling_price: Set(request.selling_price),
            inventory_qty: Set(request.inventory_qty),
            organization_id: Set(organization_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(item_id = %created.id, "item created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list(&self, organization_id: Uuid) -> Result<Vec<item::Model>, ServiceError> {
        Ok(item::Entity::find()
            .filter(item::Column::OrganizationId.eq(organization_id))
            .order_by_asc(item::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        organization_id: Uuid,
        item_id: Uuid,
    ) -> Result<item::Model, ServiceError> {
        item::Entity::find_by_id(item_id)
            .filter(item::Column::OrganizationId.eq(organization_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not found".to_string()))
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        organization_id: Uuid,
        item_id: Uuid,
        request: UpdateItemRequest,
    ) -> Result<item::Model, ServiceError> {
        request.validate()?;
        if matches!(request.selling_price, Some(price) if price < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "selling_price must not be negative".to_string(),
            ));
        }
        if matches!(request.inventory_qty, Some(qty) if qty < 0) {
            return Err(ServiceError::ValidationError(
                "inventory_qty must not be negative".to_string(),
            ));
        }

        let existing = self.get(organization_id, item_id).await?;
        let old_qty = existing.inventory_qty;

        let mut active: item::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(price) = request.selling_price {
            active.selling_price = Set(price);
        }
        if let Some(qty) = request.inventory_qty {
            active.inventory_qty = Set(qty);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db_pool).await?;

        if updated.inventory_qty != old_qty {
            self.emit(Event::InventoryAdjusted {
                item_id: updated.id,
                old_quantity: old_qty,
                new_quantity: updated.inventory_qty,
                reason: "restatement".to_string(),
            })
            .await;
        }

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, organization_id: Uuid, item_id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get(organization_id, item_id).await?;
        item::Entity::delete_by_id(existing.id)
            .exec(&*self.db_pool)
            .await?;

        info!(item_id = %item_id, "item deleted");
        Ok(())
    }

    /// Applies a signed stock delta, refusing to take the on-hand count
    /// below zero. Used by the manual add/reduce endpoints.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        organization_id: Uuid,
        item_id: Uuid,
        delta: i32,
        reason: &str,
    ) -> Result<item::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let existing = item::Entity::find_by_id(item_id)
            .filter(item::Column::OrganizationId.eq(organization_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Item not found".to_string()))?;

        let old_qty = existing.inventory_qty;
        let new_qty = old_qty + delta;
        if new_qty < 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "item '{}' has {} on hand, cannot remove {}",
                existing.name, old_qty, -delta
            )));
        }

        let mut active: item::ActiveModel = existing.into();
        active.inventory_qty = Set(new_qty);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        self.emit(Event::InventoryAdjusted {
            item_id: updated.id,
            old_quantity: old_qty,
            new_quantity: new_qty,
            reason: reason.to_string(),
        })
        .await;

        Ok(updated)
    }
}
