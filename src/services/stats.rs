use crate::{
    db::DbPool,
    entities::{expense, item, order},
    errors::ServiceError,
    models::OrderStatus,
};
use chrono::{DateTime, Datelike, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::instrument;
use uuid::Uuid;

/// Aggregates for one time window.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct WindowStats {
    pub orders: u64,
    pub sales: Decimal,
    pub expenses: Decimal,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub order_number: String,
    pub status: String,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ItemSummary {
    pub id: Uuid,
    pub name: String,
    pub selling_price: Decimal,
    pub inventory_qty: i32,
}

/// Everything the dashboard renders in one payload.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DashboardStats {
    pub total_orders: u64,
    /// Sum of COMPLETED order totals.
    pub total_sales: Decimal,
    pub pending_orders: u64,
    pub total_expenses: Decimal,
    pub total_items: u64,
    pub avg_item_price: Decimal,
    /// Five newest orders.
    pub recent_orders: Vec<OrderSummary>,
    /// Five priciest items.
    pub top_items: Vec<ItemSummary>,
    /// Trailing seven days.
    pub weekly: WindowStats,
    /// Calendar month to date.
    pub monthly: WindowStats,
    /// Calendar year to date.
    pub yearly: WindowStats,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, utoipa::ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChartRange {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChartPoint {
    pub key: String,
    pub total: Decimal,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChartData {
    pub range: ChartRange,
    pub sales: Vec<ChartPoint>,
    pub expenses: Vec<ChartPoint>,
}

/// Bucket key for a timestamp at the requested granularity:
/// day `YYYY-MM-DD`, ISO week `YYYY-Www`, month `YYYY-MM`, year `YYYY`.
pub fn bucket_key(at: DateTime<Utc>, range: ChartRange) -> String {
    match range {
        ChartRange::Daily => at.format("%Y-%m-%d").to_string(),
        ChartRange::Weekly => {
            let week = at.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        ChartRange::Monthly => at.format("%Y-%m").to_string(),
        ChartRange::Yearly => at.format("%Y").to_string(),
    }
}

fn bucket_series(points: impl Iterator<Item = (DateTime<Utc>, Decimal)>, range: ChartRange) -> Vec<ChartPoint> {
    let mut grouped: BTreeMap<String, Decimal> = BTreeMap::new();
    for (at, amount) in points {
        *grouped.entry(bucket_key(at, range)).or_insert(Decimal::ZERO) += amount;
    }
    grouped
        .into_iter()
        .map(|(key, total)| ChartPoint { key, total })
        .collect()
}

#[derive(Clone)]
pub struct StatsService {
    db_pool: Arc<DbPool>,
}

impl StatsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self, organization_id: Uuid) -> Result<DashboardStats, ServiceError> {
        let db = &*self.db_pool;

        let orders = order::Entity::find()
            .filter(order::Column::OrganizationId.eq(organization_id))
            .all(db)
            .await?;
        let expenses = expense::Entity::find()
            .filter(expense::Column::OrganizationId.eq(organization_id))
            .all(db)
            .await?;
        let items = item::Entity::find()
            .filter(item::Column::OrganizationId.eq(organization_id))
            .all(db)
            .await?;

        let completed = OrderStatus::Completed.to_string();
        let pending = OrderStatus::Pending.to_string();

        let total_orders = orders.len() as u64;
        let total_sales: Decimal = orders
            .iter()
            .filter(|o| o.status == completed)
            .map(|o| o.total_amount)
            .sum();
        let pending_orders = orders.iter().filter(|o| o.status == pending).count() as u64;
        let total_expenses: Decimal = expenses.iter().map(|e| e.amount).sum();

        let total_items = items.len() as u64;
        let avg_item_price = if items.is_empty() {
            Decimal::ZERO
        } else {
            let sum: Decimal = items.iter().map(|i| i.selling_price).sum();
            sum / Decimal::from(items.len() as u64)
        };

        let mut recent = orders.clone();
        recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let recent_orders = recent
            .iter()
            .take(5)
            .map(|o| OrderSummary {
                id: o.id,
                order_number: o.order_number.clone(),
                status: o.status.clone(),
                total_amount: o.total_amount,
                created_at: o.created_at,
            })
            .collect();

        let mut priciest = items.clone();
        priciest.sort_by(|a, b| b.selling_price.cmp(&a.selling_price));
        let top_items = priciest
            .iter()
            .take(5)
            .map(|i| ItemSummary {
                id: i.id,
                name: i.name.clone(),
                selling_price: i.selling_price,
                inventory_qty: i.inventory_qty,
            })
            .collect();

        let now = Utc::now();
        let midnight = NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is a valid time");
        let week_start = Utc
            .from_utc_datetime(&(now.date_naive() - chrono::Duration::days(6)).and_time(midnight));
        let month_start = Utc.from_utc_datetime(
            &now.date_naive()
                .with_day(1)
                .expect("day 1 exists in every month")
                .and_time(midnight),
        );
        let year_start = Utc.from_utc_datetime(
            &now.date_naive()
                .with_day(1)
                .and_then(|d| d.with_month(1))
                .expect("january 1st exists in every year")
                .and_time(midnight),
        );

        let window = |start: DateTime<Utc>| -> WindowStats {
            let in_window: Vec<_> = orders.iter().filter(|o| o.created_at >= start).collect();
            let sales = in_window
                .iter()
                .filter(|o| o.status == completed)
                .map(|o| o.total_amount)
                .sum();
            let expense_total = expenses
                .iter()
                .filter(|e| e.created_at >= start)
                .map(|e| e.amount)
                .sum();
            WindowStats {
                orders: in_window.len() as u64,
                sales,
                expenses: expense_total,
            }
        };

        Ok(DashboardStats {
            total_orders,
            total_sales,
            pending_orders,
            total_expenses,
            total_items,
            avg_item_price,
            recent_orders,
            top_items,
            weekly: window(week_start),
            monthly: window(month_start),
            yearly: window(year_start),
        })
    }

    /// Sales (COMPLETED orders) and expenses bucketed at the requested
    /// granularity, sorted by bucket key.
    #[instrument(skip(self))]
    pub async fn chart(
        &self,
        organization_id: Uuid,
        range: ChartRange,
    ) -> Result<ChartData, ServiceError> {
        let db = &*self.db_pool;

        let orders = order::Entity::find()
            .filter(order::Column::OrganizationId.eq(organization_id))
            .filter(order::Column::Status.eq(OrderStatus::Completed.to_string()))
            .all(db)
            .await?;
        let expenses = expense::Entity::find()
            .filter(expense::Column::OrganizationId.eq(organization_id))
            .all(db)
            .await?;

        Ok(ChartData {
            range,
            sales: bucket_series(
                orders.iter().map(|o| (o.created_at, o.total_amount)),
                range,
            ),
            expenses: bucket_series(
                expenses.iter().map(|e| (e.created_at, e.amount)),
                range,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[rstest]
    #[case("2026-03-05T10:00:00Z", ChartRange::Daily, "2026-03-05")]
    #[case("2026-03-05T10:00:00Z", ChartRange::Monthly, "2026-03")]
    #[case("2026-03-05T10:00:00Z", ChartRange::Yearly, "2026")]
    #[case("2026-01-01T00:00:00Z", ChartRange::Weekly, "2026-W01")]
    // Dec 29th 2025 falls into ISO week 1 of 2026.
    #[case("2025-12-29T12:00:00Z", ChartRange::Weekly, "2026-W01")]
    fn bucket_keys(#[case] ts: &str, #[case] range: ChartRange, #[case] expected: &str) {
        assert_eq!(bucket_key(at(ts), range), expected);
    }

    #[test]
    fn series_groups_and_sorts() {
        let points = vec![
            (at("2026-02-01T09:00:00Z"), dec!(10)),
            (at("2026-01-15T09:00:00Z"), dec!(5)),
            (at("2026-02-20T09:00:00Z"), dec!(2.50)),
        ];
        let series = bucket_series(points.into_iter(), ChartRange::Monthly);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].key, "2026-01");
        assert_eq!(series[0].total, dec!(5));
        assert_eq!(series[1].key, "2026-02");
        assert_eq!(series[1].total, dec!(12.50));
    }

    #[test]
    fn chart_range_parses_query_values() {
        assert_eq!("daily".parse::<ChartRange>().unwrap(), ChartRange::Daily);
        assert_eq!("yearly".parse::<ChartRange>().unwrap(), ChartRange::Yearly);
        assert!("hourly".parse::<ChartRange>().is_err());
    }
}
