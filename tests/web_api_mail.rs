//! Web API Mail Tests
//!
//! Integration tests for the check/receive/delete/send endpoints.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::{address, create_test_server, parse_lines, register_device};
use mailgate::mail::{Direction, MailRepository, MailState, NewMailItem};
use mailgate::web::AppState;
use mailgate::DeviceId;

const ALICE: &str = "1111111111111111";
const BOB: &str = "2222222222222222";

async fn deliver(state: &AppState, to: &str, body: &str) -> i64 {
    let device = DeviceId::parse(to).unwrap();
    MailRepository::new(state.db.pool())
        .insert(&NewMailItem::inbound(
            device,
            "friend@example.org",
            address(to),
            body,
        ))
        .await
        .unwrap()
        .id
}

async fn check(server: &TestServer, id: &str, passwd: &str) -> axum_test::TestResponse {
    server
        .get("/cgi-bin/check.cgi")
        .add_query_param("mlid", format!("w{id}"))
        .add_query_param("passwd", passwd)
        .await
}

async fn receive(server: &TestServer, id: &str, passwd: &str) -> String {
    let response = server
        .post("/cgi-bin/receive.cgi")
        .form(&[("mlid", format!("w{id}")), ("passwd", passwd.to_string())])
        .await;
    response.assert_status_ok();
    response.text()
}

#[tokio::test]
async fn test_check_reports_pending_and_interval() {
    let (server, state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;
    deliver(&state, ALICE, "one").await;
    deliver(&state, ALICE, "two").await;

    let response = check(&server, ALICE, "a").await;
    response.assert_status_ok();
    let lines = parse_lines(&response.text());
    assert_eq!(lines["cd"], "100");
    assert_eq!(lines["mailnum"], "2");
    assert_eq!(lines["interval"], "300");

    let hinted = server
        .get("/cgi-bin/check.cgi")
        .add_query_param("mlid", format!("w{ALICE}"))
        .add_query_param("passwd", "a")
        .add_query_param("interval", "1200")
        .await;
    assert_eq!(parse_lines(&hinted.text())["interval"], "1200");
}

#[tokio::test]
async fn test_check_unknown_device() {
    let (server, _state) = create_test_server().await;

    let response = check(&server, "9999999999999999", "x").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(parse_lines(&response.text())["cd"], "230");
}

#[tokio::test]
async fn test_check_bad_interval() {
    let (server, _state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;

    let response = server
        .get("/cgi-bin/check.cgi")
        .add_query_param("mlid", format!("w{ALICE}"))
        .add_query_param("passwd", "a")
        .add_query_param("interval", "soon")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(parse_lines(&response.text())["cd"], "220");
}

#[tokio::test]
async fn test_receive_hands_out_each_mail_once() {
    let (server, state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;
    let first = deliver(&state, ALICE, "hello there").await;
    let second = deliver(&state, ALICE, "second mail").await;

    let response = server
        .post("/cgi-bin/receive.cgi")
        .form(&[("mlid", format!("w{ALICE}")), ("passwd", "a".to_string())])
        .await;
    response.assert_status_ok();
    let content_type = response.header("content-type");
    assert!(content_type
        .to_str()
        .unwrap()
        .starts_with("multipart/mixed; boundary="));

    let body = response.text();
    assert!(body.contains("mailnum=2"));
    assert!(body.contains(&format!("X-Mail-Id: {first}")));
    assert!(body.contains(&format!("X-Mail-Id: {second}")));
    assert!(body.contains("hello there"));
    assert!(body.find("hello there") < body.find("second mail"));

    let again = receive(&server, ALICE, "a").await;
    assert!(again.contains("mailnum=0"));
    assert!(!again.contains("X-Mail-Id"));
}

#[tokio::test]
async fn test_receive_respects_limit() {
    let (server, state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;
    for i in 0..3 {
        deliver(&state, ALICE, &format!("mail {i}")).await;
    }

    let response = server
        .post("/cgi-bin/receive.cgi")
        .form(&[
            ("mlid", format!("w{ALICE}")),
            ("passwd", "a".to_string()),
            ("limit", "2".to_string()),
        ])
        .await;
    assert!(response.text().contains("mailnum=2"));

    let rest = receive(&server, ALICE, "a").await;
    assert!(rest.contains("mailnum=1"));
}

#[tokio::test]
async fn test_receive_wrong_credential() {
    let (server, state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;
    deliver(&state, ALICE, "private").await;

    let response = server
        .post("/cgi-bin/receive.cgi")
        .form(&[("mlid", format!("w{ALICE}")), ("passwd", "b".to_string())])
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(parse_lines(&response.text())["cd"], "240");

    // Nothing was handed out.
    let lines = parse_lines(&check(&server, ALICE, "a").await.text());
    assert_eq!(lines["mailnum"], "1");
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (server, state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;
    let id = deliver(&state, ALICE, "read me").await;
    receive(&server, ALICE, "a").await;

    for expected in ["1", "0"] {
        let response = server
            .post("/cgi-bin/delete.cgi")
            .form(&[
                ("mlid", format!("w{ALICE}")),
                ("passwd", "a".to_string()),
                ("ids", id.to_string()),
            ])
            .await;
        response.assert_status_ok();
        assert_eq!(parse_lines(&response.text())["deletenum"], expected);
    }

    let mail = MailRepository::new(state.db.pool())
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mail.state, MailState::Deleted);
}

#[tokio::test]
async fn test_delete_cannot_touch_other_devices_mail() {
    let (server, state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;
    register_device(&server, BOB, "b").await;
    let id = deliver(&state, ALICE, "alice only").await;
    receive(&server, ALICE, "a").await;

    let response = server
        .post("/cgi-bin/delete.cgi")
        .form(&[
            ("mlid", format!("w{BOB}")),
            ("passwd", "b".to_string()),
            ("ids", id.to_string()),
        ])
        .await;
    response.assert_status_ok();
    assert_eq!(parse_lines(&response.text())["deletenum"], "0");

    let mail = MailRepository::new(state.db.pool())
        .get_by_id(id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mail.state, MailState::Delivered);
}

#[tokio::test]
async fn test_delete_malformed_ids() {
    let (server, _state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;

    let response = server
        .post("/cgi-bin/delete.cgi")
        .form(&[
            ("mlid", format!("w{ALICE}")),
            ("passwd", "a".to_string()),
            ("ids", "1,two".to_string()),
        ])
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(parse_lines(&response.text())["cd"], "220");
}

#[tokio::test]
async fn test_send_external_never_returns_to_sender() {
    let (server, state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;

    let response = server
        .post("/cgi-bin/send.cgi")
        .form(&[
            ("mlid", format!("w{ALICE}")),
            ("passwd", "a".to_string()),
            ("to", "friend@example.org".to_string()),
            ("subject", "Greetings".to_string()),
            ("body", "Hello from the console".to_string()),
        ])
        .await;
    response.assert_status_ok();
    let mail_id: i64 = parse_lines(&response.text())["mailid"].parse().unwrap();

    let repo = MailRepository::new(state.db.pool());
    let mail = repo.get_by_id(mail_id).await.unwrap().unwrap();
    assert_eq!(mail.direction, Direction::Outbound);
    assert_eq!(mail.state, MailState::Pending);
    assert_eq!(mail.sender, address(ALICE));
    assert_eq!(mail.subject.as_deref(), Some("Greetings"));

    // The relay picks it up and marks it delivered.
    let queue = repo.list_outbound_pending(10).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(repo.mark_relayed(&[mail_id]).await.unwrap(), 1);

    let body = receive(&server, ALICE, "a").await;
    assert!(body.contains("mailnum=0"));
}

#[tokio::test]
async fn test_send_between_devices() {
    let (server, _state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;
    register_device(&server, BOB, "b").await;

    let response = server
        .post("/cgi-bin/send.cgi")
        .form(&[
            ("mlid", format!("w{ALICE}")),
            ("passwd", "a".to_string()),
            ("to", address(BOB)),
            ("body", "hi bob".to_string()),
        ])
        .await;
    response.assert_status_ok();

    let lines = parse_lines(&check(&server, BOB, "b").await.text());
    assert_eq!(lines["mailnum"], "1");

    let body = receive(&server, BOB, "b").await;
    assert!(body.contains("hi bob"));
    assert!(body.contains(&format!("From: {}", address(ALICE))));
}

#[tokio::test]
async fn test_send_invalid_recipient() {
    let (server, _state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;

    let unregistered = address("9999999999999999");
    for to in ["nobody", "w123@mail.example.com", unregistered.as_str()] {
        let response = server
            .post("/cgi-bin/send.cgi")
            .form(&[
                ("mlid", format!("w{ALICE}")),
                ("passwd", "a".to_string()),
                ("to", to.to_string()),
                ("body", "x".to_string()),
            ])
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(parse_lines(&response.text())["cd"], "250", "to {to:?}");
    }
}

#[tokio::test]
async fn test_send_empty_body() {
    let (server, _state) = create_test_server().await;
    register_device(&server, ALICE, "a").await;

    let response = server
        .post("/cgi-bin/send.cgi")
        .form(&[
            ("mlid", format!("w{ALICE}")),
            ("passwd", "a".to_string()),
            ("to", "friend@example.org".to_string()),
        ])
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(parse_lines(&response.text())["cd"], "220");
}

#[tokio::test]
async fn test_send_while_store_is_locked() {
    let dir = tempfile::tempdir().unwrap();
    let db_config = mailgate::config::DatabaseConfig {
        path: dir.path().join("gateway.db").to_string_lossy().into_owned(),
        max_connections: 2,
        min_connections: 1,
        acquire_timeout_secs: 5,
        busy_timeout_secs: 0,
    };
    let db = mailgate::Database::open(&db_config).await.unwrap();
    let (server, state) =
        common::create_test_server_with(std::sync::Arc::new(db), common::create_test_config());
    register_device(&server, ALICE, "a").await;

    let mut holder = state.db.pool().acquire().await.unwrap();
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut *holder)
        .await
        .unwrap();

    let response = server
        .post("/cgi-bin/send.cgi")
        .form(&[
            ("mlid", format!("w{ALICE}")),
            ("passwd", "a".to_string()),
            ("to", "friend@example.org".to_string()),
            ("body", "try again later".to_string()),
        ])
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(parse_lines(&response.text())["cd"], "350");

    sqlx::query("ROLLBACK").execute(&mut *holder).await.unwrap();
}
