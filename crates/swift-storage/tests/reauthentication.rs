mod common;

use common::Fixture;
use swift_auth::{AuthError, AuthState};
use swift_simulator::FaultKind;
use swift_storage::{ListObjectsParams, StorageError};
use swift_transport::{Headers, Method};

#[tokio::test]
async fn test_first_call_waits_for_login_and_is_sent_once() {
    let fixture = Fixture::new();
    fixture.simulator.create_container("cont");

    let (containers, form) = tokio::join!(fixture.client.list_containers(), fixture.answer_prompt());

    assert_eq!(containers.unwrap().len(), 1);
    assert_eq!(form.pending_requests, 1);
    assert_eq!(form.auth_url, "http://127.0.0.1:8080/auth/v1.0");
    // Nothing is sent before the login; the replay is the only storage call.
    assert_eq!(
        fixture.simulator.storage_log(),
        vec!["GET /v1/AUTH_test?format=json"]
    );
    assert_eq!(fixture.coordinator.state(), AuthState::Authenticated);
}

#[tokio::test]
async fn test_concurrent_calls_share_one_prompt_and_one_login() {
    let fixture = Fixture::new();
    fixture.simulator.put_object("cont", "a.txt", "a", "text/plain");

    let params = ListObjectsParams::default();
    let (containers, objects, metadata, _) = tokio::join!(
        fixture.client.list_containers(),
        fixture.client.list_objects("cont", &params),
        fixture.client.head_object("cont", "a.txt"),
        fixture.answer_prompt(),
    );

    assert!(containers.is_ok());
    assert_eq!(objects.unwrap().len(), 1);
    assert_eq!(metadata.unwrap().content_length(), Some(1));
    assert_eq!(fixture.login_count(), 1);
    assert_eq!(fixture.unanswered_prompts().await, 0);
    // Replayed oldest first, each exactly once.
    assert_eq!(
        fixture.simulator.storage_log(),
        vec![
            "GET /v1/AUTH_test?format=json",
            "GET /v1/AUTH_test/cont?format=json&prefix=",
            "HEAD /v1/AUTH_test/cont/a.txt",
        ]
    );
}

#[tokio::test]
async fn test_expired_token_triggers_login_and_replay() {
    let fixture = Fixture::logged_in().await;
    fixture.simulator.create_container("cont");
    let old_token = fixture.coordinator.session().unwrap().token().map(str::to_string);

    fixture.simulator.revoke_tokens();
    let (containers, _) = tokio::join!(fixture.client.list_containers(), fixture.answer_prompt());

    assert_eq!(containers.unwrap().len(), 1);
    assert_eq!(fixture.simulator.tokens_issued(), 2);

    let sent = fixture.transport.matching(Method::Get, "/v1/AUTH_test");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].headers.get("x-auth-token"), old_token.as_deref());
    let new_token = fixture.coordinator.session().unwrap().token().map(str::to_string);
    assert_ne!(new_token, old_token);
    assert_eq!(sent[1].headers.get("x-auth-token"), new_token.as_deref());
}

#[tokio::test]
async fn test_replay_overrides_stale_caller_token_and_keeps_other_headers() {
    let fixture = Fixture::new();
    fixture.simulator.create_container("cont");
    let headers: Headers = [
        ("X-Auth-Token", "AUTH_tk_stale"),
        ("Content-Type", "text/plain"),
        ("X-Object-Meta-Origin", "test"),
    ]
    .into_iter()
    .collect();

    let (uploaded, _) = tokio::join!(
        fixture
            .client
            .upload_object("cont", "note.txt", b"hi".to_vec(), &headers),
        fixture.answer_prompt(),
    );
    uploaded.unwrap();

    let sent = fixture.transport.matching(Method::Put, "/cont/note.txt");
    assert_eq!(sent.len(), 1);
    let session = fixture.coordinator.session().unwrap();
    assert_eq!(sent[0].headers.get("x-auth-token"), session.token());
    assert_eq!(sent[0].headers.get("content-type"), Some("text/plain"));
    assert_eq!(sent[0].headers.get("x-object-meta-origin"), Some("test"));
    assert_eq!(sent[0].body.as_deref(), Some(&b"hi"[..]));
}

#[tokio::test]
async fn test_failed_login_keeps_queued_request_for_retry() {
    let fixture = Fixture::new();
    fixture.simulator.create_container("cont");

    let login = async {
        let form = fixture.next_prompt().await;
        let err = fixture
            .coordinator
            .authenticate(&fixture.credentials_with_key("wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(fixture.coordinator.state(), AuthState::AuthPending);
        assert_eq!(fixture.coordinator.pending_requests(), 1);

        fixture
            .coordinator
            .authenticate(&fixture.credentials())
            .await
            .unwrap();
        form
    };
    let (containers, _) = tokio::join!(fixture.client.list_containers(), login);

    assert_eq!(containers.unwrap().len(), 1);
    assert_eq!(fixture.login_count(), 2);
    assert_eq!(fixture.unanswered_prompts().await, 0);
    assert_eq!(fixture.simulator.storage_log().len(), 1);
}

#[tokio::test]
async fn test_abandoned_prompt_rejects_waiting_calls() {
    let fixture = Fixture::new();

    let dismiss = async {
        fixture.next_prompt().await;
        fixture.coordinator.abandon().unwrap()
    };
    let params = ListObjectsParams::default();
    let (containers, objects, rejected) = tokio::join!(
        fixture.client.list_containers(),
        fixture.client.list_objects("cont", &params),
        dismiss,
    );

    assert_eq!(rejected, 2);
    assert!(matches!(containers, Err(StorageError::Auth(AuthError::Abandoned))));
    assert!(matches!(objects, Err(StorageError::Auth(AuthError::Abandoned))));
    assert!(fixture.simulator.storage_log().is_empty());
    assert_eq!(fixture.coordinator.state(), AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_rejected_replay_surfaces_as_auth_error() {
    let fixture = Fixture::logged_in().await;
    fixture
        .simulator
        .fail_next(Method::Get, "/v1/AUTH_test", FaultKind::Status(401), 2);

    let (containers, _) = tokio::join!(fixture.client.list_containers(), fixture.answer_prompt());

    let err = containers.unwrap_err();
    assert!(matches!(
        err,
        StorageError::Auth(AuthError::Unauthorized { status: 401, .. })
    ));
    assert_eq!(fixture.simulator.storage_log().len(), 2);
}

#[tokio::test]
async fn test_keystone_login_drives_storage_calls() {
    let fixture = Fixture::new();
    fixture.simulator.create_container("cont");

    let login = async {
        fixture.next_prompt().await;
        fixture
            .coordinator
            .authenticate(&fixture.keystone_credentials())
            .await
            .unwrap()
    };
    let (containers, headers) = tokio::join!(fixture.client.list_containers(), login);

    assert_eq!(containers.unwrap().len(), 1);
    assert!(headers.get("x-auth-token").unwrap().starts_with("AUTH_tk"));
    assert!(fixture
        .simulator
        .request_log()
        .contains(&"POST /v2.0/tokens".to_string()));
}

#[tokio::test]
async fn test_logout_makes_next_call_prompt_again() {
    let fixture = Fixture::logged_in().await;
    fixture.coordinator.logout().unwrap();

    let (containers, _) = tokio::join!(fixture.client.list_containers(), fixture.answer_prompt());

    assert!(containers.is_ok());
    assert_eq!(fixture.simulator.tokens_issued(), 2);
}
