//! Dashboard aggregates, chart bucketing and cost-allocation analytics.

mod common;

use axum::http::Method;
use common::{money, response_json, TestApp};
use serde_json::{json, Value};

/// Seeds a tenant with two items, one completed and one pending order,
/// and a mix of direct/indirect expenses.
///
/// Stock: latte 10 -> 7 (3 sold), muffin 20 -> 18 (2 pending).
/// Completed sales: 3 x 4.00 = 12.00. Pending: 2 x 2.50 = 5.00.
/// Direct: 100 on latte. Indirect: 400 rent.
async fn seed_world(app: &TestApp, token: &str) -> (String, String) {
    let latte = app.seed_item(token, "Latte", 4.00, 10).await;
    let muffin = app.seed_item(token, "Muffin", 2.50, 20).await;

    let sold = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(token),
            Some(json!({
                "order_number": "S-001",
                "lines": [{ "item_id": latte, "quantity": 3, "price": 4.00 }],
            })),
        )
        .await;
    let order_id = response_json(sold).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();
    let completed = app
        .request(
            Method::PUT,
            &format!("/api/v1/orders/{order_id}/status"),
            Some(token),
            Some(json!({ "status": "COMPLETED" })),
        )
        .await;
    assert_eq!(completed.status(), 200);

    let pending = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(token),
            Some(json!({
                "order_number": "S-002",
                "lines": [{ "item_id": muffin, "quantity": 2, "price": 2.50 }],
            })),
        )
        .await;
    assert_eq!(pending.status(), 201);

    for payload in [
        json!({ "description": "Milk", "amount": 100.0, "item_id": latte }),
        json!({ "description": "Rent", "amount": 400.0, "expense_type": "RENT" }),
    ] {
        let response = app
            .request(Method::POST, "/api/v1/expenses", Some(token), Some(payload))
            .await;
        assert_eq!(response.status(), 201);
    }

    (latte, muffin)
}

#[tokio::test]
async fn dashboard_aggregates_the_tenant() {
    let app = TestApp::new().await;
    let (_org, _owner, token) = app.bootstrap_org("Stats Cafe", "stats@example.com").await;
    seed_world(&app, &token).await;

    let response = app
        .request(Method::GET, "/api/v1/stats/dashboard", Some(&token), None)
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let data = &body["data"];

    assert_eq!(data["total_orders"].as_u64().unwrap(), 2);
    assert_eq!(data["pending_orders"].as_u64().unwrap(), 1);
    // Only the COMPLETED order counts as sales.
    assert_eq!(money(&data["total_sales"]), 12.0);
    assert_eq!(money(&data["total_expenses"]), 500.0);
    assert_eq!(data["total_items"].as_u64().unwrap(), 2);
    // (4.00 + 2.50) / 2
    assert_eq!(money(&data["avg_item_price"]), 3.25);

    let recent = data["recent_orders"].as_array().unwrap();
    assert_eq!(recent.len(), 2);

    let top = data["top_items"].as_array().unwrap();
    assert_eq!(top[0]["name"], "Latte");

    // Everything was created just now, so all windows agree.
    for window in ["weekly", "monthly", "yearly"] {
        assert_eq!(
            data[window]["orders"].as_u64().unwrap(),
            2,
            "window {window}"
        );
        assert_eq!(money(&data[window]["sales"]), 12.0, "window {window}");
        assert_eq!(money(&data[window]["expenses"]), 500.0, "window {window}");
    }
}

#[tokio::test]
async fn dashboard_is_empty_for_a_fresh_tenant() {
    let app = TestApp::new().await;
    let (_org, _owner, token) = app.bootstrap_org("Empty Cafe", "empty@example.com").await;

    let response = app
        .request(Method::GET, "/api/v1/stats/dashboard", Some(&token), None)
        .await;
    let body = response_json(response).await;
    let data = &body["data"];

    assert_eq!(data["total_orders"].as_u64().unwrap(), 0);
    assert_eq!(money(&data["total_sales"]), 0.0);
    assert_eq!(money(&data["avg_item_price"]), 0.0);
    assert!(data["recent_orders"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn chart_requires_a_valid_range() {
    let app = TestApp::new().await;
    let (_org, _owner, token) = app.bootstrap_org("Chart Cafe", "chart@example.com").await;

    let missing = app
        .request(Method::GET, "/api/v1/stats/chart", Some(&token), None)
        .await;
    assert_eq!(missing.status(), 400);

    let invalid = app
        .request(
            Method::GET,
            "/api/v1/stats/chart?range=hourly",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(invalid.status(), 400);
}

#[tokio::test]
async fn chart_buckets_sales_and_expenses() {
    let app = TestApp::new().await;
    let (_org, _owner, token) = app.bootstrap_org("Bucket Cafe", "bucket@example.com").await;
    seed_world(&app, &token).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/stats/chart?range=daily",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let data = &body["data"];

    assert_eq!(data["range"], "daily");

    // All seeded today: one sales bucket (completed order only) and one
    // expenses bucket.
    let sales = data["sales"].as_array().unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(money(&sales[0]["total"]), 12.0);

    let expenses = data["expenses"].as_array().unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(money(&expenses[0]["total"]), 500.0);

    // Yearly range groups into the current year key.
    let yearly = app
        .request(
            Method::GET,
            "/api/v1/stats/chart?range=yearly",
            Some(&token),
            None,
        )
        .await;
    let body = response_json(yearly).await;
    let key = body["data"]["sales"][0]["key"].as_str().unwrap();
    assert_eq!(key.len(), 4);
}

#[tokio::test]
async fn item_cost_analytics_counts_only_completed_orders() {
    let app = TestApp::new().await;
    let (_org, _owner, token) = app
        .bootstrap_org("Analytics Cafe", "analytics@example.com")
        .await;
    let (latte, muffin) = seed_world(&app, &token).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/analytics/item-cost",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);

    let find = |id: &str| -> &Value {
        rows.iter()
            .find(|r| r["item_id"].as_str() == Some(id))
            .expect("row for item")
    };

    let latte_row = find(&latte);
    assert_eq!(latte_row["total_quantity_sold"].as_i64().unwrap(), 3);
    assert_eq!(money(&latte_row["total_revenue"]), 12.0);

    // The muffin order is still PENDING, so it has sold nothing.
    let muffin_row = find(&muffin);
    assert_eq!(muffin_row["total_quantity_sold"].as_i64().unwrap(), 0);
    assert_eq!(money(&muffin_row["total_revenue"]), 0.0);
}

#[tokio::test]
async fn average_cost_price_allocates_overhead_proportionally() {
    let app = TestApp::new().await;
    let (_org, _owner, token) = app.bootstrap_org("Alloc Cafe", "alloc@example.com").await;
    let (latte, muffin) = seed_world(&app, &token).await;

    // Latte: direct 100, all the indirect 400 (only item with direct
    // cost), units = 3 sold + 7 on hand = 10 -> avg 50.00.
    // Muffin: no direct cost -> share 0, units = 0 sold + 18 on hand
    // (2 are held by the pending order) -> avg 0.00.
    let response = app
        .request(
            Method::GET,
            "/api/v1/items/average-cost-price",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    let data = &body["data"];

    let items = data["items"].as_array().unwrap();
    let find = |id: &str| -> &Value {
        items
            .iter()
            .find(|r| r["item_id"].as_str() == Some(id))
            .expect("row for item")
    };

    assert_eq!(money(&find(&latte)["avg_cost_price"]), 50.0);
    assert_eq!(money(&find(&muffin)["avg_cost_price"]), 0.0);

    // Mean over items with units: (50 + 0) / 2 = 25.
    assert_eq!(money(&data["organization_avg_cost_price"]), 25.0);
}

#[tokio::test]
async fn even_split_applies_when_no_direct_costs_exist() {
    let app = TestApp::new().await;
    let (_org, _owner, token) = app.bootstrap_org("Even Cafe", "even@example.com").await;

    let tea = app.seed_item(&token, "Tea", 2.0, 10).await;
    let scone = app.seed_item(&token, "Scone", 3.0, 5).await;

    let rent = app
        .request(
            Method::POST,
            "/api/v1/expenses",
            Some(&token),
            Some(json!({ "description": "Rent", "amount": 300.0, "expense_type": "RENT" })),
        )
        .await;
    assert_eq!(rent.status(), 201);

    let response = app
        .request(
            Method::GET,
            "/api/v1/items/average-cost-price",
            Some(&token),
            None,
        )
        .await;
    let body = response_json(response).await;
    let items = body["data"]["items"].as_array().unwrap();

    let find = |id: &str| -> f64 {
        money(
            &items
                .iter()
                .find(|r| r["item_id"].as_str() == Some(id))
                .expect("row")["avg_cost_price"],
        )
    };

    // 300 split evenly: 150 each. Tea: 150/10 = 15. Scone: 150/5 = 30.
    assert_eq!(find(&tea), 15.0);
    assert_eq!(find(&scone), 30.0);
    assert_eq!(money(&body["data"]["organization_avg_cost_price"]), 22.5);
}

#[tokio::test]
async fn manual_stock_endpoints_move_inventory() {
    let app = TestApp::new().await;
    let (_org, _owner, token) = app.bootstrap_org("Stock Cafe", "stock@example.com").await;
    let item = app.seed_item(&token, "Beans", 9.0, 10).await;

    let add = app
        .request(
            Method::POST,
            &format!("/api/v1/items/{item}/add-stock"),
            Some(&token),
            Some(json!({ "qty": 5 })),
        )
        .await;
    assert_eq!(add.status(), 200);
    assert_eq!(app.stock_of(&token, &item).await, 15);

    let reduce = app
        .request(
            Method::POST,
            &format!("/api/v1/items/{item}/reduce-stock"),
            Some(&token),
            Some(json!({ "qty": 4 })),
        )
        .await;
    assert_eq!(reduce.status(), 200);
    assert_eq!(app.stock_of(&token, &item).await, 11);

    // Cannot reduce below zero.
    let too_much = app
        .request(
            Method::POST,
            &format!("/api/v1/items/{item}/reduce-stock"),
            Some(&token),
            Some(json!({ "qty": 99 })),
        )
        .await;
    assert_eq!(too_much.status(), 422);
    assert_eq!(app.stock_of(&token, &item).await, 11);

    // Zero and negative movements are invalid.
    let zero = app
        .request(
            Method::POST,
            &format!("/api/v1/items/{item}/add-stock"),
            Some(&token),
            Some(json!({ "qty": 0 })),
        )
        .await;
    assert_eq!(zero.status(), 400);
}
