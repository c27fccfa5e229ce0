use fire_api::config::Config;
use reqwest::StatusCode;
use serde_json::{json, Value};

const PASSWORD: &str = "pass";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod: in-memory store, demo data, static credentials.
        let app = fire_api::app::build_app(&Config::for_tests())
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn get_as(client: &reqwest::Client, srv: &TestServer, user: &str, path: &str) -> (StatusCode, Value) {
    let res = client
        .get(srv.url(path))
        .basic_auth(user, Some(PASSWORD))
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn post_as(
    client: &reqwest::Client,
    srv: &TestServer,
    user: &str,
    path: &str,
    body: Value,
) -> (StatusCode, Value) {
    let res = client
        .post(srv.url(path))
        .basic_auth(user, Some(PASSWORD))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/users/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"status": "error", "message": "Unauthorized access"}));

    let res = client
        .get(srv.url("/currentUser"))
        .basic_auth("joel", Some("wrong"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/currentUser"))
        .header("Authorization", "Bearer something")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_routes_are_404_without_auth() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/thisEndPointDoesNotExist")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"status": "error", "message": "The requested URL was not found on the server"})
    );

    let (status, _) = get_as(&client, &srv, "joel", "/users/abc").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn current_user_carries_sip_host() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_as(&client, &srv, "marilyn", "/currentUser").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["username"], "marilyn");
    assert_eq!(body["data"]["admin"], false);
    assert_eq!(body["data"]["phoneNumber"], "3");
    assert_eq!(body["data"]["sip"]["host"], "localhost:5060");
}

#[tokio::test]
async fn users_are_admin_or_owner_scoped() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_as(&client, &srv, "joel", "/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, _) = get_as(&client, &srv, "marilyn", "/users").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get_as(&client, &srv, "marilyn", "/users/1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get_as(&client, &srv, "marilyn", "/users/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Marilyn Whirlwind");

    let (status, body) = get_as(&client, &srv, "joel", "/users/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Object not found: users[id=99]");
}

#[tokio::test]
async fn accepting_a_request_creates_an_active_user() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // chris has only asked for an account so far.
    let (status, _) = get_as(&client, &srv, "chris", "/currentUser").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_as(&client, &srv, "joel", "/newUserRequests/3/acceptation", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "accepted");
    assert_eq!(body["data"]["adminUser"]["id"], 1);
    assert_eq!(body["data"]["user"]["username"], "chris");
    assert_eq!(body["data"]["user"]["state"], "active");
    let chris_id = body["data"]["user"]["id"].as_i64().unwrap();

    let (status, body) = get_as(&client, &srv, "chris", &format!("/users/{chris_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "active");
    assert_eq!(body["data"]["admin"], false);

    // Repeating the decision changes nothing.
    let (status, body) = post_as(&client, &srv, "maggie", "/newUserRequests/3/acceptation", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["adminUser"]["id"], 1);
    assert_eq!(body["data"]["user"]["id"], chris_id);

    let (status, body) = post_as(&client, &srv, "joel", "/newUserRequests/3/rejection", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot reject newUserRequest");

    let (_, body) = get_as(&client, &srv, "joel", "/users").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn rejected_request_cannot_be_accepted() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = post_as(&client, &srv, "joel", "/newUserRequests/4/acceptation", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot accept newUserRequest");

    let (status, _) = post_as(&client, &srv, "marilyn", "/newUserRequests/3/rejection", json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_as(&client, &srv, "joel", "/newUserRequests/42/rejection", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Object not found: new_user_requests[id=42]");
}

#[tokio::test]
async fn concurrent_accepts_create_one_user() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut tasks = Vec::new();
    for admin in ["joel", "maggie", "joel", "maggie", "joel", "maggie", "joel", "maggie"] {
        let client = client.clone();
        let url = srv.url("/newUserRequests/3/acceptation");
        tasks.push(tokio::spawn(async move {
            client
                .post(url)
                .basic_auth(admin, Some(PASSWORD))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    let (_, body) = get_as(&client, &srv, "joel", "/users").await;
    let chrises = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|u| u["username"] == "chris")
        .count();
    assert_eq!(chrises, 1);

    let (_, body) = get_as(&client, &srv, "joel", "/notifications").await;
    let accepted = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["type"] == "newUserAccepted")
        .count();
    // one seeded (marilyn) plus exactly one for chris
    assert_eq!(accepted, 2);
}

#[tokio::test]
async fn public_signup_is_validated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/newUserRequests"))
        .json(&json!({"user": {"name": "Ed Chigliak", "username": "ed", "password": "films"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["state"], "pending");
    assert_eq!(body["data"]["user"]["username"], "ed");
    assert_eq!(body["data"]["adminUser"], Value::Null);
    assert!(body["data"]["user"].get("password").is_none());

    let cases = [
        (json!({}), "Missing field: user"),
        (json!({"user": {"name": "No Name"}}), "Missing field: username"),
        (json!({"user": {"username": "joel"}}), "User joel already exist"),
        (
            json!({"user": {"username": "chris"}}),
            "There is a request for user chris already pending",
        ),
        (
            json!({"user": {"username": "ed"}}),
            "There is a request for user ed already pending",
        ),
    ];
    for (payload, message) in cases {
        let res = client
            .post(srv.url("/newUserRequests"))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{payload}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], message);
    }

    // The list itself is admin only.
    let (status, body) = get_as(&client, &srv, "joel", "/newUserRequests").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    let (status, _) = get_as(&client, &srv, "marilyn", "/newUserRequests").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn phone_numbers_cannot_be_shared() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // joel's registrar account is his phone number, "1".
    let res = client
        .post(srv.url("/newUserRequests"))
        .json(&json!({"user": {"username": "eve", "phoneNumber": "1", "password": "pwned"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "SIP account 1 already in use");

    let res = client
        .patch(srv.url("/users/3"))
        .basic_auth("marilyn", Some(PASSWORD))
        .json(&json!({"phoneNumber": "2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let (status, body) = get_as(&client, &srv, "joel", "/currentUser").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["admin"], true);
    let res = client
        .get(srv.url("/currentUser"))
        .basic_auth("joel", Some("pwned"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn vouchers_redeem_exactly_once() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = post_as(&client, &srv, "marilyn", "/users/3/vouchers", json!({"code": "voucher3"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["state"], "active");
    assert_eq!(body["data"]["user"]["id"], 3);
    assert_eq!(body["data"]["creditRemaining"], 70);

    let (status, body) = post_as(&client, &srv, "marilyn", "/users/3/vouchers", json!({"code": "voucher3"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Object not found: Voucher with code voucher3");

    let (status, _) = post_as(&client, &srv, "marilyn", "/users/3/vouchers", json!({"code": "voucher1"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get_as(&client, &srv, "marilyn", "/users/3/vouchers").await;
    assert_eq!(status, StatusCode::OK);
    let codes: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["voucher2", "voucher3"]);

    let (status, _) = get_as(&client, &srv, "marilyn", "/users/1/vouchers").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admins_message_users() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = post_as(&client, &srv, "joel", "/users/3/messages", json!({"text": "Hello there!"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["text"], "Hello there!");
    assert_eq!(body["data"]["fromUser"]["id"], 1);
    assert_eq!(body["data"]["toUser"]["id"], 3);

    let (status, body) = get_as(&client, &srv, "marilyn", "/users/3/messages").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, _) = post_as(&client, &srv, "marilyn", "/users/1/messages", json!({"text": "hi"})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post_as(&client, &srv, "joel", "/users/3/messages", json!({"text": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing field: text");
}

#[tokio::test]
async fn notifications_are_paginated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_as(&client, &srv, "joel", "/notifications").await;
    assert_eq!(status, StatusCode::OK);
    let feed = body["data"].as_array().unwrap();
    assert_eq!(feed.len(), 7);
    assert_eq!(feed[0]["type"], "newUserRequest");
    assert_eq!(feed[0]["newUserRequest"]["user"]["username"], "chris");
    assert!(feed[0].get("message").is_none());

    for i in 0..50 {
        let (status, _) = post_as(&client, &srv, "maggie", "/users/3/messages", json!({"text": format!("note {i}")})).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, page1) = get_as(&client, &srv, "joel", "/notifications?page=1").await;
    let (_, page2) = get_as(&client, &srv, "joel", "/notifications?page=2").await;
    let (_, page3) = get_as(&client, &srv, "joel", "/notifications?page=3").await;
    assert_eq!(page1["data"].as_array().unwrap().len(), 50);
    assert_eq!(page2["data"].as_array().unwrap().len(), 7);
    assert_eq!(page3["data"].as_array().unwrap().len(), 0);
    assert_eq!(page2["data"][6]["type"], "messageSent");

    let (status, _) = get_as(&client, &srv, "marilyn", "/notifications").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn owners_edit_profile_but_not_privileges() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .patch(srv.url("/users/3"))
        .basic_auth("marilyn", Some(PASSWORD))
        .json(&json!({"address": "Ruby's place"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["address"], "Ruby's place");

    let res = client
        .patch(srv.url("/users/3"))
        .basic_auth("marilyn", Some(PASSWORD))
        .json(&json!({"admin": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .patch(srv.url("/users/3"))
        .basic_auth("joel", Some(PASSWORD))
        .json(&json!({"email": "maggie.oconnell@mail.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Email maggie.oconnell@mail.com already in use");

    let (_, body) = get_as(&client, &srv, "joel", "/notifications").await;
    let updates = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["type"] == "profileUpdated")
        .count();
    assert_eq!(updates, 2);
}

#[tokio::test]
async fn deleted_users_lose_access() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .delete(srv.url("/users/3"))
        .basic_auth("marilyn", Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .delete(srv.url("/users/3"))
        .basic_auth("joel", Some(PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"status": "success"}));

    let (status, _) = get_as(&client, &srv, "marilyn", "/currentUser").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get_as(&client, &srv, "joel", "/users/3").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The feed still renders once the user's messages are gone.
    let (status, _) = get_as(&client, &srv, "joel", "/notifications").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn pricing_tables() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_as(&client, &srv, "joel", "/pricing").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["localMobile"], 1.5);

    let (status, _) = get_as(&client, &srv, "marilyn", "/pricing").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get_as(&client, &srv, "marilyn", "/callPricing/123-123-123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"gsm": 1.5, "voip": 0.01}));
}
