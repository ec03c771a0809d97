use chrono::{Duration, Utc};
use serde_json::Value;

use crate::fixtures::seed::SeededWorkspace;
use crate::fixtures::test_app::TestApp;

fn day(offset_days: i64) -> String {
    (Utc::now().date_naive() - Duration::days(offset_days))
        .format("%Y-%m-%d")
        .to_string()
}

async fn mark(
    app: &TestApp,
    seeded: &SeededWorkspace,
    token: &str,
    date: &str,
    entries: Vec<(&str, &str)>,
) -> reqwest::Response {
    let entries: Vec<Value> = entries
        .into_iter()
        .map(|(user_id, status)| serde_json::json!({ "user_id": user_id, "status": status }))
        .collect();
    app.auth_post(
        &format!("/api/workspace/{}/attendance/mark", seeded.workspace_id),
        token,
    )
    .json(&serde_json::json!({ "date": date, "entries": entries }))
    .send()
    .await
    .expect("Mark request failed")
}

async fn remaining_attempts(app: &TestApp, seeded: &SeededWorkspace, token: &str) -> i64 {
    let resp = app
        .auth_get(
            &format!(
                "/api/workspace/{}/attendance/attempts",
                seeded.workspace_id
            ),
            token,
        )
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    json["remaining_attempts"].as_i64().unwrap()
}

#[tokio::test]
async fn manager_marks_today_without_consuming_attempts() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att1").await;

    let resp = mark(
        &app,
        &seeded,
        &seeded.manager.access_token,
        &day(0),
        vec![(&seeded.member.id, "present")],
    )
    .await;

    assert!(resp.status().is_success());
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["applied"], 1);
    assert_eq!(json["rectifications"], 0);
    assert_eq!(json["remaining_attempts"], 3);
}

#[tokio::test]
async fn member_cannot_mark_attendance() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att2").await;

    let resp = mark(
        &app,
        &seeded,
        &seeded.member.access_token,
        &day(0),
        vec![(&seeded.member.id, "present")],
    )
    .await;

    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn remarking_same_status_is_idempotent() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att3").await;
    let token = &seeded.manager.access_token;

    let resp = mark(&app, &seeded, token, &day(1), vec![(&seeded.member.id, "present")]).await;
    assert!(resp.status().is_success());
    let first: Value = resp.json().await.unwrap();
    assert_eq!(first["rectifications"], 1);

    // Same date, same status: no new rectification
    let resp = mark(&app, &seeded, token, &day(1), vec![(&seeded.member.id, "present")]).await;
    assert!(resp.status().is_success());
    let second: Value = resp.json().await.unwrap();
    assert_eq!(second["applied"], 1);
    assert_eq!(second["rectifications"], 0);
    assert_eq!(second["remaining_attempts"], 2);
}

#[tokio::test]
async fn changing_todays_mark_is_free() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att4").await;
    let token = &seeded.manager.access_token;

    let resp = mark(&app, &seeded, token, &day(0), vec![(&seeded.member.id, "present")]).await;
    assert!(resp.status().is_success());

    let resp = mark(&app, &seeded, token, &day(0), vec![(&seeded.member.id, "leave")]).await;
    assert!(resp.status().is_success());
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["rectifications"], 0);
    assert_eq!(json["remaining_attempts"], 3);
}

#[tokio::test]
async fn marking_past_absent_is_not_a_rectification() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att5").await;

    // Absent is the implied default for unmarked days
    let resp = mark(
        &app,
        &seeded,
        &seeded.manager.access_token,
        &day(2),
        vec![(&seeded.member.id, "absent")],
    )
    .await;

    assert!(resp.status().is_success());
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["applied"], 1);
    assert_eq!(json["rectifications"], 0);
    assert_eq!(json["remaining_attempts"], 3);
}

#[tokio::test]
async fn attempts_endpoint_tracks_consumption() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att6").await;
    let token = &seeded.manager.access_token;

    assert_eq!(remaining_attempts(&app, &seeded, token).await, 3);

    let resp = mark(&app, &seeded, token, &day(1), vec![(&seeded.member.id, "present")]).await;
    assert!(resp.status().is_success());

    assert_eq!(remaining_attempts(&app, &seeded, token).await, 2);

    let resp = app
        .auth_get(
            &format!(
                "/api/workspace/{}/attendance/attempts",
                seeded.workspace_id
            ),
            token,
        )
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["monthly_limit"], 3);
}

#[tokio::test]
async fn fourth_rectification_in_a_month_is_rejected() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att7").await;
    let token = &seeded.manager.access_token;

    for offset in 1..=3 {
        let resp = mark(
            &app,
            &seeded,
            token,
            &day(offset),
            vec![(&seeded.member.id, "present")],
        )
        .await;
        assert!(resp.status().is_success());
    }

    let resp = mark(&app, &seeded, token, &day(4), vec![(&seeded.member.id, "present")]).await;
    assert_eq!(resp.status().as_u16(), 429);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "rectification_limit_exceeded");
    assert_eq!(json["remaining"], 0);
}

#[tokio::test]
async fn concurrent_first_marks_share_the_ledger() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("attrace").await;
    let token = &seeded.manager.access_token;

    // Both batches race to materialize this month's ledger entry
    let day1 = day(1);
    let day2 = day(2);
    let (first, second) = tokio::join!(
        mark(
            &app,
            &seeded,
            token,
            &day1,
            vec![(&seeded.member.id, "present")]
        ),
        mark(
            &app,
            &seeded,
            token,
            &day2,
            vec![(&seeded.admin.id, "present")]
        ),
    );
    assert!(first.status().is_success());
    assert!(second.status().is_success());

    assert_eq!(remaining_attempts(&app, &seeded, token).await, 1);
}

#[tokio::test]
async fn past_batch_reserves_all_rectifications_at_once() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att7b").await;
    let token = &seeded.manager.access_token;

    // Two unrecorded non-absent entries on a past day are two rectifications
    let resp = mark(
        &app,
        &seeded,
        token,
        &day(1),
        vec![
            (&seeded.member.id, "present"),
            (&seeded.admin.id, "leave"),
        ],
    )
    .await;
    assert!(resp.status().is_success());
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["applied"], 2);
    assert_eq!(json["rectifications"], 2);
    assert_eq!(json["remaining_attempts"], 1);

    // Both records landed
    for (user, status) in [(&seeded.member.id, "present"), (&seeded.admin.id, "leave")] {
        let resp = app
            .auth_get(
                &format!(
                    "/api/workspace/{}/attendance?user_id={}&from={}&to={}",
                    seeded.workspace_id,
                    user,
                    day(1),
                    day(1)
                ),
                token,
            )
            .send()
            .await
            .unwrap();
        let records: Vec<Value> = resp.json().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["status"], status);
    }

    assert_eq!(remaining_attempts(&app, &seeded, token).await, 1);
}

#[tokio::test]
async fn over_budget_batch_applies_nothing() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att8").await;
    let token = &seeded.manager.access_token;

    // Burn two of the three attempts
    for offset in 1..=2 {
        let resp = mark(
            &app,
            &seeded,
            token,
            &day(offset),
            vec![(&seeded.member.id, "present")],
        )
        .await;
        assert!(resp.status().is_success());
    }

    // A batch needing two rectifications with only one left is rejected whole
    let resp = mark(
        &app,
        &seeded,
        token,
        &day(3),
        vec![
            (&seeded.member.id, "present"),
            (&seeded.admin.id, "present"),
        ],
    )
    .await;
    assert_eq!(resp.status().as_u16(), 429);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["remaining"], 1);

    // Neither record was written
    let resp = app
        .auth_get(
            &format!(
                "/api/workspace/{}/attendance?user_id={}&from={}&to={}",
                seeded.workspace_id,
                seeded.member.id,
                day(3),
                day(3)
            ),
            token,
        )
        .send()
        .await
        .unwrap();
    let records: Vec<Value> = resp.json().await.unwrap();
    assert!(records.is_empty());

    // And the last attempt is still available
    assert_eq!(remaining_attempts(&app, &seeded, token).await, 1);
}

#[tokio::test]
async fn batch_marks_multiple_users() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att9").await;

    let resp = mark(
        &app,
        &seeded,
        &seeded.admin.access_token,
        &day(0),
        vec![
            (&seeded.member.id, "present"),
            (&seeded.manager.id, "leave"),
            (&seeded.admin.id, "present"),
        ],
    )
    .await;

    assert!(resp.status().is_success());
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["applied"], 3);
    assert_eq!(json["rectifications"], 0);
}

#[tokio::test]
async fn invalid_status_rejects_whole_batch() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att10").await;
    let token = &seeded.manager.access_token;

    let resp = mark(
        &app,
        &seeded,
        token,
        &day(0),
        vec![
            (&seeded.member.id, "present"),
            (&seeded.admin.id, "vacationing"),
        ],
    )
    .await;
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app
        .auth_get(
            &format!(
                "/api/workspace/{}/attendance?user_id={}&from={}&to={}",
                seeded.workspace_id,
                seeded.member.id,
                day(0),
                day(0)
            ),
            token,
        )
        .send()
        .await
        .unwrap();
    let records: Vec<Value> = resp.json().await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn malformed_date_is_a_validation_error() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att10b").await;

    let resp = mark(
        &app,
        &seeded,
        &seeded.manager.access_token,
        "2025-13-40",
        vec![(&seeded.member.id, "present")],
    )
    .await;
    assert_eq!(resp.status().as_u16(), 422);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "validation");
}

#[tokio::test]
async fn members_read_their_own_history_only() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_workspace("att11").await;

    let resp = mark(
        &app,
        &seeded,
        &seeded.manager.access_token,
        &day(0),
        vec![(&seeded.member.id, "present")],
    )
    .await;
    assert!(resp.status().is_success());

    // Own history is readable
    let resp = app
        .auth_get(
            &format!("/api/workspace/{}/attendance", seeded.workspace_id),
            &seeded.member.access_token,
        )
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    let records: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["status"], "present");
    assert_eq!(records[0]["marked_by"], seeded.manager.id);

    // Another member's history is not
    let resp = app
        .auth_get(
            &format!(
                "/api/workspace/{}/attendance?user_id={}",
                seeded.workspace_id, seeded.manager.id
            ),
            &seeded.member.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // Managers may read anyone's
    let resp = app
        .auth_get(
            &format!(
                "/api/workspace/{}/attendance?user_id={}",
                seeded.workspace_id, seeded.member.id
            ),
            &seeded.manager.access_token,
        )
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
}

#[tokio::test]
async fn rectification_budgets_are_per_workspace() {
    let app = TestApp::spawn().await;
    let first = app.seed_workspace("wsa").await;

    // Exhaust the manager's budget in the first workspace
    for offset in 1..=3 {
        let resp = mark(
            &app,
            &first,
            &first.manager.access_token,
            &day(offset),
            vec![(&first.member.id, "present")],
        )
        .await;
        assert!(resp.status().is_success());
    }
    assert_eq!(
        remaining_attempts(&app, &first, &first.manager.access_token).await,
        0
    );

    // The same user carries a fresh budget in a workspace they own
    let resp = app
        .auth_post("/api/workspace", &first.manager.access_token)
        .json(&serde_json::json!({ "name": "Side Project" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let workspace: Value = resp.json().await.unwrap();
    let other_id = workspace["id"].as_str().unwrap();

    let resp = app
        .auth_get(
            &format!("/api/workspace/{}/attendance/attempts", other_id),
            &first.manager.access_token,
        )
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["remaining_attempts"], 3);
}
