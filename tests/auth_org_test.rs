//! Bootstrap, login and tenant-boundary behavior.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn bootstrap_requires_master_key() {
    let app = TestApp::new().await;

    let payload = json!({
        "organization_name": "Keyless Cafe",
        "owner_name": "Owner",
        "owner_email": "keyless@example.com",
        "owner_password": "hunter2secret",
    });

    // No key at all.
    let response = app
        .request(
            Method::POST,
            "/api/v1/organizations/create-with-owner",
            None,
            Some(payload.clone()),
        )
        .await;
    assert_eq!(response.status(), 403);

    // Wrong key.
    let response = app
        .router
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/api/v1/organizations/create-with-owner")
                .header("content-type", "application/json")
                .header("x-master-key", "not-the-key")
                .body(axum::body::Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn bootstrap_creates_org_and_owner() {
    let app = TestApp::new().await;
    let (org_id, _owner_id, token) = app.bootstrap_org("Corner Deli", "deli@example.com").await;

    let response = app
        .request(Method::GET, "/api/v1/organizations", Some(&token), None)
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert_eq!(body["data"]["id"].as_str().unwrap(), org_id);
    assert_eq!(body["data"]["name"].as_str().unwrap(), "Corner Deli");
}

#[tokio::test]
async fn bootstrap_response_never_leaks_password_material() {
    let app = TestApp::new().await;

    let response = app
        .router
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/api/v1/organizations/create-with-owner")
                .header("content-type", "application/json")
                .header("x-master-key", common::MASTER_KEY)
                .body(axum::body::Body::from(
                    json!({
                        "organization_name": "Hash Cafe",
                        "owner_name": "Owner",
                        "owner_email": "hash@example.com",
                        "owner_password": "hunter2secret",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let raw = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(raw.to_vec()).unwrap();
    assert!(!text.contains("password"));
    assert!(!text.contains("argon2"));
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&text).unwrap()["data"]["owner"]["role"],
        "OWNER"
    );
}

#[tokio::test]
async fn duplicate_organization_name_conflicts() {
    let app = TestApp::new().await;
    app.bootstrap_org("Twin Bakery", "twin1@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri("/api/v1/organizations/create-with-owner")
                .header("content-type", "application/json")
                .header("x-master-key", common::MASTER_KEY)
                .body(axum::body::Body::from(
                    json!({
                        "organization_name": "Twin Bakery",
                        "owner_name": "Owner",
                        "owner_email": "twin2@example.com",
                        "owner_password": "hunter2secret",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn login_rejects_bad_credentials_uniformly() {
    let app = TestApp::new().await;
    app.bootstrap_org("Login Cafe", "login@example.com").await;

    let wrong_password = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "login@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(wrong_password.status(), 401);
    let wrong_password_body = response_json(wrong_password).await;

    let unknown_email = app
        .request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(unknown_email.status(), 401);
    let unknown_email_body = response_json(unknown_email).await;

    // Identical messages: the endpoint must not reveal which part failed.
    assert_eq!(wrong_password_body["message"], unknown_email_body["message"]);
}

#[tokio::test]
async fn requests_without_token_are_unauthorized() {
    let app = TestApp::new().await;

    for uri in [
        "/api/v1/items",
        "/api/v1/orders",
        "/api/v1/expenses",
        "/api/v1/users",
        "/api/v1/stats/dashboard",
    ] {
        let response = app.request(Method::GET, uri, None, None).await;
        assert_eq!(response.status(), 401, "expected 401 for {uri}");
    }
}

#[tokio::test]
async fn cashiers_cannot_reach_management_surfaces() {
    let app = TestApp::new().await;
    let (_org, _owner, owner_token) =
        app.bootstrap_org("Role Cafe", "roles@example.com").await;

    app.seed_user(&owner_token, "cashier@example.com", "CASHIER")
        .await;
    let cashier_token = app.login("cashier@example.com", "hunter2secret").await;

    // Reads that cashiers do have.
    let ok = app
        .request(Method::GET, "/api/v1/items", Some(&cashier_token), None)
        .await;
    assert_eq!(ok.status(), 200);

    // Management surfaces they do not.
    let forbidden_user_list = app
        .request(Method::GET, "/api/v1/users", Some(&cashier_token), None)
        .await;
    assert_eq!(forbidden_user_list.status(), 403);

    let forbidden_item_create = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(&cashier_token),
            Some(json!({ "name": "Contraband", "selling_price": 1.0 })),
        )
        .await;
    assert_eq!(forbidden_item_create.status(), 403);

    let forbidden_stats = app
        .request(
            Method::GET,
            "/api/v1/stats/dashboard",
            Some(&cashier_token),
            None,
        )
        .await;
    assert_eq!(forbidden_stats.status(), 403);
}

#[tokio::test]
async fn tenants_cannot_see_each_other() {
    let app = TestApp::new().await;
    let (org_a, _owner_a, token_a) = app.bootstrap_org("Org A", "a@example.com").await;
    let (org_b, _owner_b, token_b) = app.bootstrap_org("Org B", "b@example.com").await;

    let item_a = app.seed_item(&token_a, "A-only Widget", 5.0, 10).await;

    // Org B cannot read, mutate or order org A's item.
    let read = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{item_a}"),
            Some(&token_b),
            None,
        )
        .await;
    assert_eq!(read.status(), 404);

    let update = app
        .request(
            Method::PUT,
            &format!("/api/v1/items/{item_a}"),
            Some(&token_b),
            Some(json!({ "name": "Stolen" })),
        )
        .await;
    assert_eq!(update.status(), 404);

    let order = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token_b),
            Some(json!({
                "order_number": "B-001",
                "lines": [{ "item_id": item_a, "quantity": 1, "price": 5.0 }],
            })),
        )
        .await;
    assert_eq!(order.status(), 404);

    // And neither tenant can read the other's organization record.
    let cross_org = app
        .request(
            Method::GET,
            &format!("/api/v1/organizations/{org_a}"),
            Some(&token_b),
            None,
        )
        .await;
    assert_eq!(cross_org.status(), 404);
    let cross_org = app
        .request(
            Method::GET,
            &format!("/api/v1/organizations/{org_b}"),
            Some(&token_a),
            None,
        )
        .await;
    assert_eq!(cross_org.status(), 404);
}

#[tokio::test]
async fn user_listing_is_org_scoped_and_hash_free() {
    let app = TestApp::new().await;
    let (_org_a, _owner_a, token_a) = app.bootstrap_org("Staff A", "staffa@example.com").await;
    app.bootstrap_org("Staff B", "staffb@example.com").await;

    app.seed_user(&token_a, "manager.a@example.com", "MANAGER")
        .await;

    let response = app
        .request(Method::GET, "/api/v1/users", Some(&token_a), None)
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 2); // owner + manager, not org B's owner

    for user in users {
        assert!(user.get("password_hash").is_none());
        assert!(user.get("password").is_none());
    }
}

#[tokio::test]
async fn owners_cannot_delete_themselves() {
    let app = TestApp::new().await;
    let (_org, owner_id, token) = app.bootstrap_org("Solo Cafe", "solo@example.com").await;

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/users/{owner_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn health_and_status_are_public() {
    let app = TestApp::new().await;

    let health = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(health.status(), 200);
    let body = response_json(health).await;
    assert_eq!(body["data"]["checks"]["database"], "healthy");

    let status = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(status.status(), 200);
}
