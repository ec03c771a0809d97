use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn register_creates_user_and_returns_tokens() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&serde_json::json!({
            "email": "alice@test.com",
            "username": "alice",
            "display_name": "Alice",
            "password": "Password123!",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 201);

    let json: Value = resp.json().await.unwrap();
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["user"]["email"], "alice@test.com");
    assert_eq!(json["user"]["username"], "alice");
    assert_eq!(json["user"]["display_name"], "Alice");
}

#[tokio::test]
async fn register_with_workspace_creates_workspace() {
    let app = TestApp::spawn().await;

    let user = app
        .register_user(
            "bob@test.com",
            "bob",
            "Bob",
            "Password123!",
            Some("Bob's Crew"),
        )
        .await;

    let resp = app
        .auth_get("/api/workspace", &user.access_token)
        .send()
        .await
        .unwrap();
    let workspaces: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(workspaces.len(), 1);
    assert_eq!(workspaces[0]["name"], "Bob's Crew");
    assert_eq!(workspaces[0]["owner_id"], user.id);
    assert!(workspaces[0]["invite_code"].is_string());
}

#[tokio::test]
async fn register_duplicate_email_fails() {
    let app = TestApp::spawn().await;

    let body = serde_json::json!({
        "email": "dup@test.com",
        "username": "user1",
        "display_name": "User 1",
        "password": "Password123!",
    });

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    // Same email, different username
    let body2 = serde_json::json!({
        "email": "dup@test.com",
        "username": "user2",
        "display_name": "User 2",
        "password": "Password123!",
    });

    let resp = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&body2)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 409);
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let app = TestApp::spawn().await;

    app.register_user("carol@test.com", "carol", "Carol", "Password123!", None)
        .await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({
            "email": "carol@test.com",
            "password": "wrong-password",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn login_by_username_works() {
    let app = TestApp::spawn().await;

    app.register_user("dave@test.com", "dave", "Dave", "Password123!", None)
        .await;

    let resp = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&serde_json::json!({
            "username": "dave",
            "password": "Password123!",
        }))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["user"]["email"], "dave@test.com");
}

#[tokio::test]
async fn refresh_returns_new_token_pair() {
    let app = TestApp::spawn().await;

    let user = app
        .register_user("erin@test.com", "erin", "Erin", "Password123!", None)
        .await;

    let resp = app
        .client
        .post(app.url("/api/auth/refresh"))
        .json(&serde_json::json!({ "refresh_token": user.refresh_token }))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    let json: Value = resp.json().await.unwrap();
    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let app = TestApp::spawn().await;

    let user = app
        .register_user("frank@test.com", "frank", "Frank", "Password123!", None)
        .await;

    let resp = app
        .client
        .post(app.url("/api/auth/refresh"))
        .json(&serde_json::json!({ "refresh_token": user.access_token }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn me_requires_authentication() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .get(app.url("/api/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn me_returns_profile_and_update_persists() {
    let app = TestApp::spawn().await;

    let user = app
        .register_user("grace@test.com", "grace", "Grace", "Password123!", None)
        .await;

    let resp = app
        .auth_get("/api/auth/me", &user.access_token)
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["username"], "grace");

    let resp = app
        .auth_put("/api/auth/me", &user.access_token)
        .json(&serde_json::json!({ "display_name": "Grace H." }))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    let resp = app
        .auth_get("/api/auth/me", &user.access_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["display_name"], "Grace H.");
}
