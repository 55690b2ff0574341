use crate::{
    db::DbPool,
    entities::{expense, item, order, order_item},
    errors::ServiceError,
    models::{ExpenseNature, OrderStatus},
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Sales performance of one item across COMPLETED orders.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ItemCostRow {
    pub item_id: Uuid,
    pub name: String,
    pub selling_price: Decimal,
    pub inventory_qty: i32,
    pub total_quantity_sold: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ItemCostPrice {
    pub item_id: Uuid,
    pub name: String,
    /// Average cost per unit including the item's share of overhead.
    pub avg_cost_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AverageCostPriceResponse {
    pub items: Vec<ItemCostPrice>,
    /// Mean of `avg_cost_price` over items that have units.
    pub organization_avg_cost_price: Decimal,
}

/// Distributes an indirect-cost pool over items proportionally to their
/// direct costs. When nothing carries a direct cost the pool is split
/// evenly instead of being dropped.
pub fn allocate_indirect(direct_costs: &[Decimal], indirect_total: Decimal) -> Vec<Decimal> {
    if direct_costs.is_empty() {
        return Vec::new();
    }

    let direct_sum: Decimal = direct_costs.iter().copied().sum();
    if direct_sum > Decimal::ZERO {
        direct_costs
            .iter()
            .map(|d| indirect_total * d / direct_sum)
            .collect()
    } else {
        let share = indirect_total / Decimal::from(direct_costs.len() as u64);
        vec![share; direct_costs.len()]
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    db_pool: Arc<DbPool>,
}

struct SoldTotals {
    quantity: i64,
    revenue: Decimal,
}

impl AnalyticsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lines belonging to the organization's COMPLETED orders, summed
    /// per item.
    async fn sold_totals(
        &self,
        organization_id: Uuid,
    ) -> Result<HashMap<Uuid, SoldTotals>, ServiceError> {
        let db = &*self.db_pool;

        let completed_ids: Vec<Uuid> = order::Entity::find()
            .filter(order::Column::OrganizationId.eq(organization_id))
            .filter(order::Column::Status.eq(OrderStatus::Completed.to_string()))
            .select_only()
            .column(order::Column::Id)
            .into_tuple()
            .all(db)
            .await?;

        let mut totals: HashMap<Uuid, SoldTotals> = HashMap::new();
        if completed_ids.is_empty() {
            return Ok(totals);
        }

        let lines = order_item::Entity::find()
            .filter(order_item::Column::OrderId.is_in(completed_ids))
            .all(db)
            .await?;

        for line in lines {
            let entry = totals.entry(line.item_id).or_insert(SoldTotals {
                quantity: 0,
                revenue: Decimal::ZERO,
            });
            entry.quantity += i64::from(line.quantity);
            entry.revenue += line.price * Decimal::from(line.quantity);
        }

        Ok(totals)
    }

    /// Per-item sold quantity and revenue, name-sorted, zeros included.
    #[instrument(skip(self))]
    pub async fn item_cost(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<ItemCostRow>, ServiceError> {
        let items = item::Entity::find()
            .filter(item::Column::OrganizationId.eq(organization_id))
            .order_by_asc(item::Column::Name)
            .all(&*self.db_pool)
            .await?;

        let sold = self.sold_totals(organization_id).await?;

        Ok(items
            .into_iter()
            .map(|i| {
                let totals = sold.get(&i.id);
                ItemCostRow {
                    item_id: i.id,
                    name: i.name,
                    selling_price: i.selling_price,
                    inventory_qty: i.inventory_qty,
                    total_quantity_sold: totals.map_or(0, |t| t.quantity),
                    total_revenue: totals.map_or(Decimal::ZERO, |t| t.revenue),
                }
            })
            .collect())
    }

    /// Average cost price per unit for every item, with the INDIRECT
    /// expense pool allocated proportionally to each item's DIRECT
    /// costs. Units are `sold + on hand`; items without units report
    /// zero and stay out of the organization mean.
    #[instrument(skip(self))]
    pub async fn average_cost_price(
        &self,
        organization_id: Uuid,
    ) -> Result<AverageCostPriceResponse, ServiceError> {
        let items = item::Entity::find()
            .filter(item::Column::OrganizationId.eq(organization_id))
            .order_by_asc(item::Column::Name)
            .all(&*self.db_pool)
            .await?;

        let expenses = expense::Entity::find()
            .filter(expense::Column::OrganizationId.eq(organization_id))
            .all(&*self.db_pool)
            .await?;

        let direct_tag = ExpenseNature::Direct.to_string();
        let indirect_tag = ExpenseNature::Indirect.to_string();

        let mut direct_by_item: HashMap<Uuid, Decimal> = HashMap::new();
        let mut indirect_total = Decimal::ZERO;
        for e in &expenses {
            if e.nature == indirect_tag {
                indirect_total += e.amount;
            } else if e.nature == direct_tag {
                if let Some(item_id) = e.item_id {
                    *direct_by_item.entry(item_id).or_insert(Decimal::ZERO) += e.amount;
                }
            }
        }

        let sold = self.sold_totals(organization_id).await?;

        let direct_costs: Vec<Decimal> = items
            .iter()
            .map(|i| direct_by_item.get(&i.id).copied().unwrap_or(Decimal::ZERO))
            .collect();
        let indirect_shares = allocate_indirect(&direct_costs, indirect_total);

        let mut rows = Vec::with_capacity(items.len());
        let mut mean_sum = Decimal::ZERO;
        let mut mean_count: u64 = 0;

        for (idx, i) in items.iter().enumerate() {
            let units = sold.get(&i.id).map_or(0, |t| t.quantity) + i64::from(i.inventory_qty);
            let avg = if units > 0 {
                let total_cost = direct_costs[idx] + indirect_shares[idx];
                (total_cost / Decimal::from(units)).round_dp(2)
            } else {
                Decimal::ZERO
            };

            if units > 0 {
                mean_sum += avg;
                mean_count += 1;
            }

            rows.push(ItemCostPrice {
                item_id: i.id,
                name: i.name.clone(),
                avg_cost_price: avg,
            });
        }

        let organization_avg_cost_price = if mean_count > 0 {
            (mean_sum / Decimal::from(mean_count)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        Ok(AverageCostPriceResponse {
            items: rows,
            organization_avg_cost_price,
        })
    }
}
