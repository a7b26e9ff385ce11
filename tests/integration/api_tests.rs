//! API integration tests
//!
//! Require a running server with its database and Redis.
//! Run with: cargo test -- --ignored

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:8080";

struct Member {
    id: i64,
    token: String,
}

/// Sign up a fresh account and log it in
async fn sign_up(client: &Client, game_owner: bool) -> Member {
    let email = format!("member-{}@example.com", Uuid::new_v4());
    let password = "correct-horse-battery";

    let response = client
        .post(format!("{}/api/account", BASE_URL))
        .json(&json!({
            "name": "Test Member",
            "email": email,
            "password": password,
            "game_owner": game_owner
        }))
        .send()
        .await
        .expect("Failed to send sign-up request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse login response");
    Member {
        id: body["account"]["id"].as_i64().expect("No account id in response"),
        token: body["token"].as_str().expect("No token in response").to_string(),
    }
}

async fn create_game(client: &Client, owner: &Member) -> i64 {
    let response = client
        .post(format!("{}/api/games", BASE_URL))
        .bearer_auth(&owner.token)
        .json(&json!({
            "name": "Carcassonne",
            "min_players": 2,
            "max_players": 5,
            "category": "Tile placement"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No game id")
}

async fn request_borrow(client: &Client, borrower: &Member, game_id: i64, from_day: i64, to_day: i64) -> reqwest::Response {
    let now = Utc::now();
    client
        .post(format!("{}/api/borrowrequests", BASE_URL))
        .bearer_auth(&borrower.token)
        .json(&json!({
            "game_id": game_id,
            "start_date": now + Duration::days(from_day),
            "end_date": now + Duration::days(to_day)
        }))
        .send()
        .await
        .expect("Failed to send request")
}

async fn answer_request(client: &Client, owner: &Member, request_id: i64, status: &str) -> reqwest::Response {
    client
        .put(format!("{}/api/borrowrequests/{}", BASE_URL, request_id))
        .bearer_auth(&owner.token)
        .json(&json!({ "status": status }))
        .send()
        .await
        .expect("Failed to send request")
}

async fn json_body(response: reqwest::Response) -> Value {
    response.json().await.expect("Failed to parse response")
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_responses_are_gzip_compressed_on_request() {
    let client = Client::new();

    let response = client
        .get(format!("{}/api-docs/openapi.json", BASE_URL))
        .header(reqwest::header::ACCEPT_ENCODING, "gzip")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(reqwest::header::CONTENT_ENCODING).and_then(|v| v.to_str().ok()),
        Some("gzip")
    );
}

#[tokio::test]
#[ignore]
async fn test_protected_route_requires_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "email": "nobody@example.com",
            "password": "wrong-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_logout_revokes_token() {
    let client = Client::new();
    let member = sign_up(&client, false).await;

    let response = client
        .post(format!("{}/auth/logout", BASE_URL))
        .bearer_auth(&member.token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&member.token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_full_lending_cycle() {
    let client = Client::new();
    let owner = sign_up(&client, true).await;
    let borrower = sign_up(&client, false).await;
    let game_id = create_game(&client, &owner).await;

    let response = request_borrow(&client, &borrower, game_id, 1, 8).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let request = json_body(response).await;
    assert_eq!(request["status"], "PENDING");
    let request_id = request["id"].as_i64().expect("No request id");

    let response = answer_request(&client, &owner, request_id, "APPROVED").await;
    assert_eq!(response.status(), StatusCode::OK);
    let approved = json_body(response).await;
    assert_eq!(approved["status"], "APPROVED");
    let record_id = approved["lending_record_id"].as_i64().expect("No lending record");

    let record = json_body(
        client
            .get(format!("{}/api/lending-records/{}", BASE_URL, record_id))
            .bearer_auth(&owner.token)
            .send()
            .await
            .expect("Failed to send request"),
    )
    .await;
    assert_eq!(record["status"], "ACTIVE");
    assert_eq!(record["borrower_id"].as_i64(), Some(borrower.id));

    let response = client
        .post(format!("{}/api/lending-records/{}/mark-returned", BASE_URL, record_id))
        .bearer_auth(&borrower.token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "PENDING_RETURN");

    let response = client
        .post(format!("{}/api/lending-records/{}/confirm-return", BASE_URL, record_id))
        .bearer_auth(&owner.token)
        .json(&json!({ "is_damaged": false }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let closed = json_body(response).await;
    assert_eq!(closed["status"], "CLOSED");
    assert_eq!(closed["is_damaged"], false);
    assert_eq!(closed["duration_in_days"], 7);

    // Closed records cannot be reopened
    let response = client
        .put(format!("{}/api/lending-records/{}/status", BASE_URL, record_id))
        .bearer_auth(&owner.token)
        .json(&json!({ "status": "OVERDUE", "reason": "late" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_overlapping_request_rejected() {
    let client = Client::new();
    let owner = sign_up(&client, true).await;
    let borrower = sign_up(&client, false).await;
    let game_id = create_game(&client, &owner).await;

    let request = json_body(request_borrow(&client, &borrower, game_id, 1, 8).await).await;
    let request_id = request["id"].as_i64().expect("No request id");
    let response = answer_request(&client, &owner, request_id, "APPROVED").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = request_borrow(&client, &borrower, game_id, 5, 12).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Back-to-back ranges do not overlap
    let response = request_borrow(&client, &borrower, game_id, 8, 10).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
#[ignore]
async fn test_review_requires_closed_lending() {
    let client = Client::new();
    let owner = sign_up(&client, true).await;
    let borrower = sign_up(&client, false).await;
    let game_id = create_game(&client, &owner).await;

    let review = json!({ "game_id": game_id, "rating": 4, "comment": "Great with three" });

    let response = client
        .post(format!("{}/api/reviews", BASE_URL))
        .bearer_auth(&borrower.token)
        .json(&review)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = json_body(request_borrow(&client, &borrower, game_id, 1, 3).await).await;
    let approved = json_body(
        answer_request(&client, &owner, request["id"].as_i64().expect("No request id"), "APPROVED").await,
    )
    .await;
    let record_id = approved["lending_record_id"].as_i64().expect("No lending record");

    let response = client
        .post(format!("{}/api/lending-records/{}/confirm-return", BASE_URL, record_id))
        .bearer_auth(&owner.token)
        .json(&json!({ "is_damaged": true, "damage_notes": "Box corner torn", "damage_severity": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .post(format!("{}/api/reviews", BASE_URL))
        .bearer_auth(&borrower.token)
        .json(&review)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let rating = json_body(
        client
            .get(format!("{}/api/games/{}/rating", BASE_URL, game_id))
            .send()
            .await
            .expect("Failed to send request"),
    )
    .await;
    assert_eq!(rating["count"], 1);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_approvals_never_overlap() {
    let client = Client::new();
    let owner = sign_up(&client, true).await;
    let first = sign_up(&client, false).await;
    let second = sign_up(&client, false).await;
    let game_id = create_game(&client, &owner).await;

    let a = json_body(request_borrow(&client, &first, game_id, 2, 9).await).await;
    let b = json_body(request_borrow(&client, &second, game_id, 4, 11).await).await;
    let a_id = a["id"].as_i64().expect("No request id");
    let b_id = b["id"].as_i64().expect("No request id");

    let (ra, rb) = tokio::join!(
        answer_request(&client, &owner, a_id, "APPROVED"),
        answer_request(&client, &owner, b_id, "APPROVED"),
    );

    let statuses = [ra.status(), rb.status()];
    let approved = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let rejected = statuses
        .iter()
        .filter(|s| **s == StatusCode::BAD_REQUEST)
        .count();
    assert_eq!(approved, 1);
    assert_eq!(rejected, 1);
}

#[tokio::test]
#[ignore]
async fn test_event_capacity() {
    let client = Client::new();
    let host = sign_up(&client, true).await;
    let guest = sign_up(&client, false).await;
    let late = sign_up(&client, false).await;
    let game_id = create_game(&client, &host).await;

    let response = client
        .post(format!("{}/api/events", BASE_URL))
        .bearer_auth(&host.token)
        .json(&json!({
            "title": "Friday game night",
            "date_time": Utc::now() + Duration::days(3),
            "location": "Community hall",
            "max_participants": 1,
            "featured_game_id": game_id
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let event_id = json_body(response).await["id"]
        .as_str()
        .expect("No event id")
        .to_string();

    let register = |member: &Member| {
        client
            .post(format!("{}/api/registrations", BASE_URL))
            .bearer_auth(&member.token)
            .json(&json!({ "event_id": event_id }))
            .send()
    };

    let response = register(&guest).await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = register(&guest).await.expect("Failed to send request");
    assert!(
        response.status() == StatusCode::CONFLICT || response.status() == StatusCode::BAD_REQUEST
    );

    let response = register(&late).await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_end_date_change_cannot_overlap_next_lending() {
    let client = Client::new();
    let owner = sign_up(&client, true).await;
    let first = sign_up(&client, false).await;
    let second = sign_up(&client, false).await;
    let game_id = create_game(&client, &owner).await;

    let a = json_body(request_borrow(&client, &first, game_id, 1, 8).await).await;
    let approved = json_body(
        answer_request(&client, &owner, a["id"].as_i64().expect("No request id"), "APPROVED").await,
    )
    .await;
    let record_id = approved["lending_record_id"].as_i64().expect("No lending record");
    let start = approved["start_date"].as_str().expect("No start date").to_string();

    let b = json_body(request_borrow(&client, &second, game_id, 8, 10).await).await;
    let response = answer_request(&client, &owner, b["id"].as_i64().expect("No request id"), "APPROVED").await;
    assert_eq!(response.status(), StatusCode::OK);

    let start: chrono::DateTime<Utc> = start.parse().expect("Invalid start date");
    let extend = |days: i64| {
        client
            .put(format!("{}/api/lending-records/{}/end-date", BASE_URL, record_id))
            .bearer_auth(&owner.token)
            .json(&json!({ "end_date": start + Duration::days(days), "reason": "Asked for more time" }))
            .send()
    };

    let response = extend(11).await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Shortening never collides
    let response = extend(5).await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let record = json_body(response).await;
    assert_eq!(record["duration_in_days"], 5);
}

#[tokio::test]
#[ignore]
async fn test_delete_game_cascades_reviews() {
    let client = Client::new();
    let owner = sign_up(&client, true).await;
    let borrower = sign_up(&client, false).await;
    let game_id = create_game(&client, &owner).await;

    let request = json_body(request_borrow(&client, &borrower, game_id, 1, 3).await).await;
    let approved = json_body(
        answer_request(&client, &owner, request["id"].as_i64().expect("No request id"), "APPROVED").await,
    )
    .await;
    let record_id = approved["lending_record_id"].as_i64().expect("No lending record");

    let delete_game = || {
        client
            .delete(format!("{}/api/games/{}", BASE_URL, game_id))
            .bearer_auth(&owner.token)
            .send()
    };

    // Record is ACTIVE
    let response = delete_game().await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/api/lending-records/{}/confirm-return", BASE_URL, record_id))
        .bearer_auth(&owner.token)
        .json(&json!({ "is_damaged": false }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .post(format!("{}/api/reviews", BASE_URL))
        .bearer_auth(&borrower.token)
        .json(&json!({ "game_id": game_id, "rating": 5 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let review_id = json_body(response).await["id"].as_i64().expect("No review id");

    let response = delete_game().await.expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{}/api/reviews/{}", BASE_URL, review_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
