pub mod analytics;
pub mod expenses;
pub mod items;
pub mod orders;
pub mod organizations;
pub mod stats;
pub mod users;
