use std::sync::Arc;

use crate::{
    db::DbPool,
    events::EventSender,
    services::{
        analytics::AnalyticsService, expenses::ExpenseService, items::ItemService,
        orders::OrderService, organizations::OrganizationService, stats::StatsService,
        users::UserService,
    },
};

pub mod analytics;
pub mod auth;
pub mod expenses;
pub mod items;
pub mod orders;
pub mod organizations;
pub mod stats;
pub mod users;

/// The services shared by every HTTP handler.
#[derive(Clone)]
pub struct AppServices {
    pub organizations: Arc<OrganizationService>,
    pub users: Arc<UserService>,
    pub items: Arc<ItemService>,
    pub expenses: Arc<ExpenseService>,
    pub orders: Arc<OrderService>,
    pub stats: Arc<StatsService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            organizations: Arc::new(OrganizationService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            users: Arc::new(UserService::new(db.clone(), Some(event_sender.clone()))),
            items: Arc::new(ItemService::new(db.clone(), Some(event_sender.clone()))),
            expenses: Arc::new(ExpenseService::new(db.clone(), Some(event_sender.clone()))),
            orders: Arc::new(OrderService::new(db.clone(), Some(event_sender))),
            stats: Arc::new(StatsService::new(db.clone())),
            analytics: Arc::new(AnalyticsService::new(db)),
        }
    }
}
