//! Wire-level checks of the reference ledger service: status codes, error codes and the
//! shape of verification responses.

use file_integrity_registry::transport::http::{create_router, AppState};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn spawn_server(initial_credits: u32) -> (String, AppState) {
    let state = AppState::new(initial_credits);
    let router = create_router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

async fn token_for(client: &reqwest::Client, base: &str, email: &str) -> String {
    client
        .post(format!("{}/auth/register", base))
        .json(&json!({ "email": email, "password": "p" }))
        .send()
        .await
        .unwrap();
    let body: Value = client
        .post(format!("{}/auth/login", base))
        .form(&[("username", email), ("password", "p")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["access_token"].as_str().unwrap().to_string()
}

fn file_form(name: &str, bytes: &[u8]) -> Form {
    Form::new().part("file", Part::bytes(bytes.to_vec()).file_name(name.to_string()))
}

#[tokio::test]
async fn health_reports_chain_height() {
    let (base, _) = spawn_server(1).await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["chain_height"], 0);
}

#[tokio::test]
async fn signup_and_login_errors_carry_codes() {
    let (base, _) = spawn_server(1).await;
    let client = reqwest::Client::new();

    let created = client
        .post(format!("{}/auth/register", base))
        .json(&json!({ "email": "a@x.com", "password": "p" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let user: Value = created.json().await.unwrap();
    assert_eq!(user["credits"], 1);

    let dup = client
        .post(format!("{}/auth/register", base))
        .json(&json!({ "email": "a@x.com", "password": "p" }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), StatusCode::BAD_REQUEST);
    let body: Value = dup.json().await.unwrap();
    assert_eq!(body["code"], "duplicate_account");
    assert_eq!(body["detail"], "Email already registered.");

    let bad = client
        .post(format!("{}/auth/login", base))
        .form(&[("username", "a@x.com"), ("password", "nope")])
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(bad.json::<Value>().await.unwrap()["code"], "invalid_credentials");
}

#[tokio::test]
async fn authenticated_routes_require_bearer() {
    let (base, _) = spawn_server(1).await;
    let resp = reqwest::get(format!("{}/me", base)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.headers().get("www-authenticate").unwrap().to_str().unwrap(),
        "Bearer"
    );
    assert_eq!(resp.json::<Value>().await.unwrap()["code"], "unauthorized");
}

#[tokio::test]
async fn register_without_credits_is_payment_required() {
    let (base, state) = spawn_server(1).await;
    let client = reqwest::Client::new();
    let token = token_for(&client, &base, "a@x.com").await;

    let ok = client
        .post(format!("{}/files/register", base))
        .bearer_auth(&token)
        .multipart(file_form("a.txt", b"a").text("metadata", "note"))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let record: Value = ok.json().await.unwrap();
    assert_eq!(record["metadata"], "note");
    assert_eq!(record["block_number"], 1);

    let refused = client
        .post(format!("{}/files/register", base))
        .bearer_auth(&token)
        .multipart(file_form("b.txt", b"b"))
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(
        refused.json::<Value>().await.unwrap()["code"],
        "insufficient_credits"
    );
    assert_eq!(state.chain.height().await, 1);
}

#[tokio::test]
async fn missing_file_part_is_a_validation_error() {
    let (base, _) = spawn_server(1).await;
    let client = reqwest::Client::new();
    let token = token_for(&client, &base, "a@x.com").await;

    let resp = client
        .post(format!("{}/files/register", base))
        .bearer_auth(&token)
        .multipart(Form::new().text("metadata", "only metadata"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.json::<Value>().await.unwrap()["code"], "validation_error");
}

#[tokio::test]
async fn not_found_verification_omits_match_and_record() {
    let (base, _) = spawn_server(1).await;
    let client = reqwest::Client::new();
    let token = token_for(&client, &base, "a@x.com").await;

    let body: Value = client
        .post(format!("{}/files/verify", base))
        .bearer_auth(&token)
        .multipart(file_form("x.bin", b"unknown"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["on_chain"], false);
    assert!(body.get("match").is_none());
    assert!(body.get("record").is_none());
}

#[tokio::test]
async fn chain_outage_is_a_ledger_error() {
    let (base, state) = spawn_server(2).await;
    let client = reqwest::Client::new();
    let token = token_for(&client, &base, "a@x.com").await;
    state.chain.set_online(false);

    let resp = client
        .post(format!("{}/files/register", base))
        .bearer_auth(&token)
        .multipart(file_form("a.txt", b"a"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "ledger_error");

    let me: Value = client
        .get(format!("{}/me", base))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["credits"], 2);
}
