use crate::{
    db::DbPool,
    entities::{item, order, order_item},
    errors::ServiceError,
    events::{Event, EventSender},
    models::OrderStatus,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// One requested order line.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OrderLineRequest {
    pub item_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 50, message = "Order number is required"))]
    pub order_number: String,
    #[validate(length(min = 1, message = "An order needs at least one line"))]
    pub lines: Vec<OrderLineRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct UpdateOrderLinesRequest {
    #[validate(length(min = 1, message = "An order needs at least one line"))]
    pub lines: Vec<OrderLineRequest>,
}

/// Paged listing result.
#[derive(Debug)]
pub struct OrderPage {
    pub orders: Vec<order::Model>,
    pub total: u64,
}

fn validate_lines(lines: &[OrderLineRequest]) -> Result<(), ServiceError> {
    let mut seen = BTreeSet::new();
    for line in lines {
        if line.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "line quantity must be at least 1".to_string(),
            ));
        }
        if line.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "line price must not be negative".to_string(),
            ));
        }
        if !seen.insert(line.item_id) {
            return Err(ServiceError::ValidationError(format!(
                "item {} appears more than once",
                line.item_id
            )));
        }
    }
    Ok(())
}

/// The order's total is always derived from its lines.
fn compute_total(lines: &[OrderLineRequest]) -> Decimal {
    lines
        .iter()
        .map(|line| line.price * Decimal::from(line.quantity))
        .sum()
}

#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send order event");
            }
        }
    }

    /// Applies a signed quantity delta to one item's stock inside `txn`,
    /// failing if the item is missing from the organization or the
    /// result would be negative.
    async fn apply_stock_delta(
        txn: &DatabaseTransaction,
        organization_id: Uuid,
        item_id: Uuid,
        delta: i32,
    ) -> Result<(), ServiceError> {
        if delta == 0 {
            return Ok(());
        }

        let found = item::Entity::find_by_id(item_id)
            .filter(item::Column::OrganizationId.eq(organization_id))
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Item {item_id} not found"))
            })?;

        let new_qty = found.inventory_qty - delta;
        if new_qty < 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "item '{}' has {} on hand, requested {}",
                found.name, found.inventory_qty, delta
            )));
        }

        let mut active: item::ActiveModel = found.into();
        active.inventory_qty = Set(new_qty);
        active.updated_at = Set(Utc::now());
        active.update(txn).await?;

        Ok(())
    }

    async fn insert_lines(
        txn: &DatabaseTransaction,
        order_id: Uuid,
        lines: &[OrderLineRequest],
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        for line in lines {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                item_id: Set(line.item_id),
                quantity: Set(line.quantity),
                price: Set(line.price),
                created_at: Set(now),
            }
            .insert(txn)
            .await?;
        }
        Ok(())
    }

    fn parse_status(order: &order::Model) -> Result<OrderStatus, ServiceError> {
        order
            .status
            .parse()
            .map_err(|_| ServiceError::InternalError(format!("corrupt order status: {}", order.status)))
    }

    /// Places an order: decrements stock per line and writes the order
    /// and its lines in one transaction. Any failure rolls the whole
    /// placement back.
    #[instrument(skip(self, request), fields(order_number = %request.order_number))]
    pub async fn create(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
        request.validate()?;
        validate_lines(&request.lines)?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let duplicate = order::Entity::find()
            .filter(order::Column::OrganizationId.eq(organization_id))
            .filter(order::Column::OrderNumber.eq(request.order_number.clone()))
            .one(&txn)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Order number '{}' already exists",
                request.order_number
            )));
        }

        for line in &request.lines {
            Self::apply_stock_delta(&txn, organization_id, line.item_id, line.quantity).await?;
        }

        let now = Utc::now();
        let created = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(request.order_number.clone()),
            status: Set(OrderStatus::Pending.to_string()),
            total_amount: Set(compute_total(&request.lines)),
            user_id: Set(user_id),
            organization_id: Set(organization_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        Self::insert_lines(&txn, created.id, &request.lines).await?;

        txn.commit().await?;

        info!(order_id = %created.id, total = %created.total_amount, "order placed");
        self.emit(Event::OrderCreated(created.id)).await;

        let lines = self.lines_for(created.id).await?;
        Ok((created, lines))
    }

    async fn lines_for(&self, order_id: Uuid) -> Result<Vec<order_item::Model>, ServiceError> {
        Ok(order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(
        &self,
        organization_id: Uuid,
        order_id: Uuid,
    ) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
        let found = order::Entity::find_by_id(order_id)
            .filter(order::Column::OrganizationId.eq(organization_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let lines = self.lines_for(found.id).await?;
        Ok((found, lines))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        organization_id: Uuid,
        page: u64,
        per_page: u64,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage, ServiceError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let mut query = order::Entity::find()
            .filter(order::Column::OrganizationId.eq(organization_id));
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status.to_string()));
        }

        let paginator = query
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        Ok(OrderPage { orders, total })
    }

    /// Replaces a PENDING order's line set, reconciling stock by the net
    /// per-item difference between the old and new lines.
    #[instrument(skip(self, request))]
    pub async fn update_lines(
        &self,
        organization_id: Uuid,
        order_id: Uuid,
        request: UpdateOrderLinesRequest,
    ) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
        request.validate()?;
        validate_lines(&request.lines)?;

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let existing = order::Entity::find_by_id(order_id)
            .filter(order::Column::OrganizationId.eq(organization_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let status = Self::parse_status(&existing)?;
        if status != OrderStatus::Pending {
            return Err(ServiceError::Conflict(format!(
                "Only PENDING orders can be edited (order is {status})"
            )));
        }

        let old_lines = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        let mut deltas: BTreeMap<Uuid, i32> = BTreeMap::new();
        for line in &request.lines {
            *deltas.entry(line.item_id).or_insert(0) += line.quantity;
        }
        for line in &old_lines {
            *deltas.entry(line.item_id).or_insert(0) -= line.quantity;
        }

        for (item_id, delta) in deltas {
            Self::apply_stock_delta(&txn, organization_id, item_id, delta).await?;
        }

        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        Self::insert_lines(&txn, order_id, &request.lines).await?;

        let mut active: order::ActiveModel = existing.into();
        active.total_amount = Set(compute_total(&request.lines));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, total = %updated.total_amount, "order lines reconciled");
        self.emit(Event::OrderUpdated(order_id)).await;

        let lines = self.lines_for(order_id).await?;
        Ok((updated, lines))
    }

    /// Transitions a PENDING order to COMPLETED or CANCELLED.
    /// Cancellation restores the stock the order was holding.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        organization_id: Uuid,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let existing = order::Entity::find_by_id(order_id)
            .filter(order::Column::OrganizationId.eq(organization_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let current = Self::parse_status(&existing)?;
        if !current.can_transition_to(new_status) {
            return Err(ServiceError::Conflict(format!(
                "Cannot transition order from {current} to {new_status}"
            )));
        }

        if new_status == OrderStatus::Cancelled {
            let lines = order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(order_id))
                .all(&txn)
                .await?;
            for line in &lines {
                Self::apply_stock_delta(&txn, organization_id, line.item_id, -line.quantity)
                    .await?;
            }
        }

        let old_status = existing.status.clone();
        let mut active: order::ActiveModel = existing.into();
        active.status = Set(new_status.to_string());
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, from = %old_status, to = %new_status, "order status changed");
        self.emit(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status: new_status.to_string(),
        })
        .await;

        Ok(updated)
    }

    /// Deletes an order and its lines, restoring stock unless the order
    /// was already CANCELLED (its stock was restored at cancellation).
    #[instrument(skip(self))]
    pub async fn delete(
        &self,
        organization_id: Uuid,
        order_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let existing = order::Entity::find_by_id(order_id)
            .filter(order::Column::OrganizationId.eq(organization_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let status = Self::parse_status(&existing)?;

        let lines = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;

        if status.holds_stock() {
            for line in &lines {
                Self::apply_stock_delta(&txn, organization_id, line.item_id, -line.quantity)
                    .await?;
            }
        }

        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        order::Entity::delete_by_id(order_id).exec(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, "order deleted");
        self.emit(Event::OrderDeleted(order_id)).await;

        Ok(())
    }
}
