//! Integration tests for the remote D1 client against a mock HTTP server.
//!
//! Run with:
//! ```bash
//! cargo test --test remote_session
//! ```

use d1kit::{
    Backend, D1Session, DatabaseSettings, Error, RemoteConfig, RemoteSession, ReplicationMode,
    Value, find_database,
};
use httpmock::{Method::DELETE, Method::GET, Method::PATCH, Method::POST, MockServer};
use serde_json::json;
use uuid::Uuid;

const ACCOUNT: &str = "acc-123";
const TOKEN: &str = "secret-token";

fn session(server: &MockServer) -> RemoteSession {
    let mut config = RemoteConfig::new(ACCOUNT, TOKEN);
    config.base_url = server.base_url();
    RemoteSession::from_config(&config).unwrap()
}

fn databases_path() -> String {
    format!("/accounts/{ACCOUNT}/d1/database")
}

fn database_path(id: Uuid) -> String {
    format!("/accounts/{ACCOUNT}/d1/database/{id}")
}

fn record_json(id: Uuid, name: &str, mode: &str) -> serde_json::Value {
    json!({
        "created_at": "2025-01-02T03:04:05.678Z",
        "file_size": 12288,
        "name": name,
        "num_tables": 2,
        "read_replication": {"mode": mode},
        "uuid": id,
        "version": "production"
    })
}

fn ok(result: serde_json::Value) -> serde_json::Value {
    json!({"result": result, "success": true, "errors": [], "messages": []})
}

#[test]
fn test_new_requires_credentials() {
    assert!(matches!(RemoteSession::new("", TOKEN), Err(Error::Config(_))));
    assert!(matches!(RemoteSession::new(ACCOUNT, ""), Err(Error::Config(_))));
    let session = RemoteSession::new(ACCOUNT, TOKEN).unwrap();
    assert_eq!(session.backend(), Backend::Remote);
}

#[test]
fn test_create_sends_name_and_registers_id() {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(databases_path())
            .header("Authorization", format!("Bearer {TOKEN}"))
            .json_body(json!({"name": "t1"}));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(ok(record_json(id, "t1", "disabled")));
    });

    let session = session(&server);
    let created = session.create_database("t1").unwrap();

    mock.assert();
    assert!(created.success);
    assert_eq!(created.result.name, "t1");
    assert_eq!(created.result.uuid, id);
    assert_eq!(created.result.num_tables, 2);
    assert_eq!(session.resolve("t1").unwrap(), id);
    assert_eq!(session.registry().len(), 1);
}

#[test]
fn test_failed_create_does_not_register() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(databases_path());
        then.status(400).json_body(json!({
            "result": null,
            "success": false,
            "errors": [{"code": 7502, "message": "database already exists"}],
            "messages": []
        }));
    });

    let session = session(&server);
    let created = session.create_database("dup").unwrap();

    assert!(!created.success);
    assert_eq!(created.errors.len(), 1);
    assert_eq!(created.errors[0].code, 7502);
    assert!(session.resolve("dup").unwrap_err().is_not_found());
}

#[test]
fn test_get_and_list() {
    let server = MockServer::start();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let get = server.mock(|when, then| {
        when.method(GET).path(database_path(a));
        then.status(200).json_body(ok(record_json(a, "a", "auto")));
    });
    let list = server.mock(|when, then| {
        when.method(GET).path(databases_path());
        then.status(200).json_body(ok(json!([
            record_json(a, "a", "auto"),
            record_json(b, "b", "disabled")
        ])));
    });

    let session = session(&server);
    let fetched = session.get_database(a).unwrap();
    assert_eq!(fetched.result.read_replication.mode, ReplicationMode::Auto);
    assert_eq!(fetched.result.file_size, 12288);

    let listed = session.list_databases().unwrap();
    assert_eq!(listed.result.len(), 2);
    assert_eq!(listed.result[1].uuid, b);

    // Falls back to the listing for names this session never created.
    assert_eq!(find_database(&session, "b").unwrap(), b);

    get.assert();
    assert_eq!(list.calls(), 2);
}

#[test]
fn test_update_sends_replication_mode() {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    let mock = server.mock(|when, then| {
        when.method(PATCH)
            .path(database_path(id))
            .json_body(json!({"read_replication": {"mode": "auto"}}));
        then.status(200).json_body(ok(record_json(id, "t1", "auto")));
    });

    let session = session(&server);
    let updated = session
        .update_database(
            id,
            DatabaseSettings {
                replication: ReplicationMode::Auto,
            },
        )
        .unwrap();

    mock.assert();
    assert!(updated.success);
    assert_eq!(updated.result.read_replication.mode, ReplicationMode::Auto);
}

#[test]
fn test_delete_accepts_null_result() {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    let mock = server.mock(|when, then| {
        when.method(DELETE).path(database_path(id));
        then.status(200)
            .json_body(json!({"result": null, "success": true, "errors": [], "messages": []}));
    });

    let session = session(&server);
    let deleted = session.delete_database(id).unwrap();

    mock.assert();
    assert!(deleted.success);
}

#[test]
fn test_query_posts_sql_and_params() {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/query", database_path(id)))
            .json_body(json!({"sql": "SELECT * FROM t WHERE id = ? AND name = ?", "params": [1, "alice"]}));
        then.status(200).json_body(ok(json!([{
            "meta": {
                "changed_db": false,
                "changes": 0,
                "duration": 0.2,
                "last_row_id": 0,
                "rows_read": 1,
                "rows_written": 0,
                "served_by_primary": true,
                "served_by_region": "WEUR",
                "size_after": 16384,
                "timings": {"sql_duration_ms": 0.2}
            },
            "results": [{"id": 1, "name": "alice"}],
            "success": true
        }])));
    });

    let session = session(&server);
    let out = session
        .execute_query(
            id,
            "SELECT * FROM t WHERE id = ? AND name = ?",
            &[Value::from(1), Value::from("alice")],
        )
        .unwrap();

    mock.assert();
    assert!(out.success);
    assert_eq!(out.result.len(), 1);
    assert_eq!(out.result[0].meta.served_by_region, "WEUR");
    assert_eq!(out.result[0].rows()[0]["name"], json!("alice"));
}

#[test]
fn test_raw_uses_raw_endpoint_and_keeps_columnar_shape() {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    let columnar = json!({"columns": ["id", "name"], "rows": [[1, "alice"]]});
    let mock = server.mock(|when, then| {
        when.method(POST).path(format!("{}/raw", database_path(id)));
        then.status(200).json_body(ok(json!([{
            "meta": {"rows_read": 1},
            "results": columnar.clone(),
            "success": true
        }])));
    });

    let session = session(&server);
    let out = session.execute_query_raw(id, "SELECT * FROM t", &[]).unwrap();

    mock.assert();
    assert_eq!(out.result[0].results, columnar);
    assert!(out.result[0].rows().is_empty());
    assert!(session.backend().distinguishes_raw());
}

#[test]
fn test_sql_failure_is_envelope_not_error() {
    let server = MockServer::start();
    let id = Uuid::new_v4();
    server.mock(|when, then| {
        when.method(POST).path(format!("{}/query", database_path(id)));
        then.status(400).json_body(json!({
            "result": [],
            "success": false,
            "errors": [{"code": 7500, "message": "no such column: foo"}],
            "messages": []
        }));
    });

    let session = session(&server);
    let out = session.execute_query(id, "SELECT foo FROM t", &[]).unwrap();

    assert!(!out.success);
    assert_eq!(out.errors[0].code, 7500);
    assert!(out.result.is_empty());
}

#[test]
fn test_non_envelope_body_is_malformed_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(databases_path());
        then.status(502).body("<html>Bad Gateway</html>");
    });

    let session = session(&server);
    let err = session.list_databases().unwrap_err();
    assert!(matches!(err, Error::MalformedResponse { status: 502, .. }));
}

#[test]
fn test_unreachable_server_is_transport_error() {
    let mut config = RemoteConfig::new(ACCOUNT, TOKEN);
    // Port 9 (discard) on localhost is not expected to accept HTTP.
    config.base_url = "http://127.0.0.1:9".to_string();
    config.connect_timeout_secs = 1;
    config.timeout_secs = 2;
    let session = RemoteSession::from_config(&config).unwrap();

    let err = session.list_databases().unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
}
