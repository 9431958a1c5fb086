mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use fashion_storefront_api::routes::create_app;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use common::{bearer, lazy_state};

async fn send(request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = create_app(lazy_state()).oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn health_route_answers() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, headers, body) = send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn incoming_request_id_is_propagated() {
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(request).await;
    assert_eq!(headers["x-request-id"], "req-123");
}

#[tokio::test]
async fn unknown_route_is_404_with_path() {
    let request = Request::builder()
        .uri("/api/nothing-here")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/api/nothing-here");
}

#[tokio::test]
async fn cart_requires_a_token() {
    let request = Request::builder().uri("/api/cart").body(Body::empty()).unwrap();
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["data"]["error"], "Missing Authorization header");
}

#[tokio::test]
async fn non_bearer_scheme_is_rejected() {
    let request = Request::builder()
        .uri("/api/orders")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_token_is_rejected() {
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["data"]["error"], "Invalid or expired token");
}

#[tokio::test]
async fn shoppers_cannot_create_products() {
    let auth = bearer(Uuid::new_v4(), "user");
    let request = json_request(
        "POST",
        "/api/products",
        Some(&auth),
        json!({
            "name": "Formal Blazer",
            "description": "",
            "price": 19999,
            "category": "Blazers",
            "image_url": "https://example.com/blazer.jpg",
            "stock_quantity": 6
        }),
    );
    let (status, _, _) = send(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_validates_before_touching_the_database() {
    let request = json_request(
        "POST",
        "/api/auth/register",
        None,
        json!({
            "email": "ada@example.com",
            "password": "short",
            "first_name": "Ada",
            "last_name": "Lovelace"
        }),
    );
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["error"].as_str().unwrap().contains("password"));

    let request = json_request(
        "POST",
        "/api/auth/register",
        None,
        json!({
            "email": "not-an-email",
            "password": "long enough",
            "first_name": "Ada",
            "last_name": "Lovelace"
        }),
    );
    let (status, _, _) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_order_status_is_rejected() {
    let auth = bearer(Uuid::new_v4(), "admin");
    let uri = format!("/api/admin/orders/{}/status", Uuid::new_v4());
    let request = json_request("PATCH", &uri, Some(&auth), json!({ "status": "refunded" }));
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Unprocessable Entity");
    assert!(body["data"]["error"].as_str().unwrap().contains("refunded"));
}

#[tokio::test]
async fn malformed_id_gets_the_error_envelope() {
    let request = Request::builder()
        .uri("/api/products/not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Bad Request");
    assert!(body["data"]["error"].is_string());
}

#[tokio::test]
async fn malformed_json_gets_the_error_envelope() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["error"].is_string());

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["data"]["error"].is_string());
}

#[tokio::test]
async fn order_without_items_is_rejected() {
    let auth = bearer(Uuid::new_v4(), "user");
    let request = json_request(
        "POST",
        "/api/orders",
        Some(&auth),
        json!({
            "shipping_address": "1 Main St",
            "billing_address": "1 Main St",
            "items": []
        }),
    );
    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["error"], "Order must contain at least one item");
}

#[tokio::test]
async fn checkout_requires_payment_method() {
    let auth = bearer(Uuid::new_v4(), "user");
    let request = json_request(
        "POST",
        "/api/orders/checkout",
        Some(&auth),
        json!({
            "shipping_address": "1 Main St",
            "billing_address": "1 Main St",
            "payment_method": "  "
        }),
    );
    let (status, _, _) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn docs_are_served() {
    let request = Request::builder().uri("/docs").body(Body::empty()).unwrap();
    let response = create_app(lazy_state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
