//! API integration tests
//!
//! These run against a live server and database:
//! start the server, then `cargo test -- --ignored`.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api";

/// Unique suffix so repeated runs don't collide on emails
fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

async fn create_author(client: &Client, body: Value) -> Value {
    let response = client
        .post(format!("{}/authors", BASE_URL))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    response.json().await.expect("Failed to parse response")
}

async fn delete(client: &Client, path: &str) -> u16 {
    client
        .delete(format!("{}{}", BASE_URL, path))
        .send()
        .await
        .expect("Failed to send request")
        .status()
        .as_u16()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_author_then_book_scenario() {
    let client = Client::new();
    let email = format!("{}@example.com", unique("ada"));

    let author = create_author(&client, json!({"name": "Ada Lovelace", "email": email})).await;
    let author_id = author["id"].as_i64().expect("No author ID");
    assert_eq!(author["name"], "Ada Lovelace");
    assert_eq!(author["email"], email.as_str());
    assert!(author["bio"].is_null());

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({"author_id": author_id, "title": "Notes", "published_at": "1843-10-05"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let book: Value = response.json().await.expect("Failed to parse response");
    let book_id = book["id"].as_i64().expect("No book ID");
    assert_eq!(book["author"]["id"], author_id);
    assert_eq!(book["author"]["email"], email.as_str());
    assert_eq!(book["published_at"], "1843-10-05");

    let response = client
        .get(format!("{}/authors/{}", BASE_URL, author_id))
        .send()
        .await
        .expect("Failed to send request");
    let detail: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(detail["books"][0]["id"], book_id);

    assert_eq!(delete(&client, &format!("/books/{}", book_id)).await, 204);
    assert_eq!(delete(&client, &format!("/authors/{}", author_id)).await, 204);
}

#[tokio::test]
#[ignore]
async fn test_duplicate_email_is_rejected() {
    let client = Client::new();
    let email = format!("{}@example.com", unique("dup"));

    let first = create_author(&client, json!({"name": "First", "email": email})).await;

    let response = client
        .post(format!("{}/authors", BASE_URL))
        .json(&json!({"name": "Second", "email": email}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["errors"]["email"][0], "The email has already been taken.");

    // Authors without email never collide
    let a = create_author(&client, json!({"name": "No Email A"})).await;
    let b = create_author(&client, json!({"name": "No Email B"})).await;

    // Keeping one's own email is not a collision
    let response = client
        .patch(format!("{}/authors/{}", BASE_URL, first["id"]))
        .json(&json!({"email": email, "bio": "unchanged email"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);

    for author in [&first, &a, &b] {
        assert_eq!(delete(&client, &format!("/authors/{}", author["id"])).await, 204);
    }
}

#[tokio::test]
#[ignore]
async fn test_book_with_unknown_author_is_rejected() {
    let client = Client::new();

    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({"author_id": i64::MAX, "title": "Orphan"}))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["errors"]["author_id"][0], "The selected author id is invalid.");
}

#[tokio::test]
#[ignore]
async fn test_wrong_json_types_are_field_errors() {
    let client = Client::new();

    let response = client
        .post(format!("{}/authors", BASE_URL))
        .json(&json!({"name": 123, "email": 42}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["errors"]["name"][0], "The name field must be a string.");
    assert_eq!(body["errors"]["email"][0], "The email field must be a string.");

    let response = client
        .post(format!("{}/authors", BASE_URL))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_list_authors_is_paginated() {
    let client = Client::new();

    let response = client
        .get(format!("{}/authors?page=1", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let items = body["items"].as_array().expect("No items");
    assert!(items.len() <= 10);
    assert_eq!(body["per_page"], 10);
    assert!(body["total"].is_number());
    assert!(body["last_page"].is_number());

    let page_two = client
        .get(format!("{}/authors?page=2", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    let page_two: Value = page_two.json().await.expect("Failed to parse response");
    let total = body["total"].as_i64().expect("No total");
    let expected = (total - 10).clamp(0, 10) as usize;
    assert_eq!(page_two["items"].as_array().expect("No items").len(), expected);
}

#[tokio::test]
#[ignore]
async fn test_list_books_newest_first() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    let ids: Vec<i64> = body["items"]
        .as_array()
        .expect("No items")
        .iter()
        .filter_map(|b| b["id"].as_i64())
        .collect();
    assert!(ids.windows(2).all(|w| w[0] > w[1]));
}

#[tokio::test]
#[ignore]
async fn test_delete_missing_records_is_404() {
    let client = Client::new();
    assert_eq!(delete(&client, &format!("/authors/{}", i64::MAX)).await, 404);
    assert_eq!(delete(&client, &format!("/books/{}", i64::MAX)).await, 404);
}
