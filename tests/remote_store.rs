//! Contract tests for the remote-document-backed task repository, driven
//! through the in-process document client.

mod common;

use common::signed_in_session;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use taskloop::{
    AppError, AuthBackend, AuthSession, DocumentClient, MemoryDocumentClient, OwnerId,
    RemoteTaskRepository, TaskId, TaskInput, TaskRepository,
};

fn remote_repo(email: &str) -> (RemoteTaskRepository, MemoryDocumentClient, OwnerId) {
    let (session, _backend) = signed_in_session(email);
    let owner = session.identity().expect("session is signed in").owner_id;
    let client = MemoryDocumentClient::new();
    let repo = RemoteTaskRepository::new(Arc::new(client.clone()), session);
    (repo, client, owner)
}

async fn snapshot(repo: &RemoteTaskRepository) -> Vec<taskloop::Task> {
    repo.observe_all()
        .next()
        .await
        .expect("stream must emit an initial snapshot")
        .expect("snapshot must not fail")
}

#[test_log::test(tokio::test)]
async fn insert_assigns_a_server_id() {
    let (repo, _client, _owner) = remote_repo("alice@example.com");

    repo.insert(TaskInput::new("Buy milk", None), None)
        .await
        .unwrap();

    let tasks = snapshot(&repo).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Buy milk");
    assert!(!tasks[0].completed);
    assert!(!tasks[0].id.as_str().is_empty());

    let found = repo.get_by_id(&tasks[0].id).await.unwrap();
    assert_eq!(found, Some(tasks[0].clone()));
}

#[test_log::test(tokio::test)]
async fn blank_title_is_rejected_before_the_store() {
    let (repo, _client, _owner) = remote_repo("alice@example.com");

    let result = repo.insert(TaskInput::new("", None), None).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let result = repo.insert(TaskInput::new("   ", None), None).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(snapshot(&repo).await.is_empty());
}

#[test_log::test(tokio::test)]
async fn replace_keeps_the_completed_flag() {
    let (repo, _client, _owner) = remote_repo("alice@example.com");
    repo.insert(TaskInput::new("Draft report", None), None)
        .await
        .unwrap();
    let id = snapshot(&repo).await[0].id.clone();
    repo.update_completed(&id, true).await.unwrap();

    repo.insert(TaskInput::new("Draft quarterly report", None), Some(id.clone()))
        .await
        .unwrap();

    let task = repo.get_by_id(&id).await.unwrap().unwrap();
    assert_eq!(task.title, "Draft quarterly report");
    assert!(task.completed, "full replace must not un-complete the task");
}

#[test_log::test(tokio::test)]
async fn replace_of_a_vanished_id_creates_at_that_path() {
    let (repo, _client, _owner) = remote_repo("alice@example.com");

    repo.insert(TaskInput::new("Orphan edit", None), Some(TaskId::new("ghost-1")))
        .await
        .unwrap();

    let task = repo.get_by_id(&TaskId::new("ghost-1")).await.unwrap().unwrap();
    assert_eq!(task.title, "Orphan edit");
    assert!(!task.completed);
}

#[test_log::test(tokio::test)]
async fn update_and_delete_of_missing_ids_are_noops() {
    let (repo, _client, _owner) = remote_repo("alice@example.com");

    repo.update_completed(&TaskId::new("ghost"), true)
        .await
        .unwrap();
    repo.delete(&TaskId::new("ghost")).await.unwrap();
    assert_eq!(repo.get_by_id(&TaskId::new("ghost")).await.unwrap(), None);
}

#[test_log::test(tokio::test)]
async fn missing_title_decodes_to_empty_lossily() {
    let (repo, client, owner) = remote_repo("alice@example.com");

    // A document written by some other client, missing the mandatory field.
    client
        .set(&owner, "legacy-1", serde_json::json!({ "isChecked": true }))
        .await
        .unwrap();

    let task = repo.get_by_id(&TaskId::new("legacy-1")).await.unwrap().unwrap();
    assert_eq!(task.title, "");
    assert!(task.completed);
}

#[test_log::test(tokio::test)]
async fn transport_failure_terminates_the_stream_with_an_error() {
    let (repo, client, owner) = remote_repo("alice@example.com");
    repo.insert(TaskInput::new("Buy milk", None), None)
        .await
        .unwrap();

    let mut stream = repo.observe_all();
    assert_eq!(stream.next().await.unwrap().unwrap().len(), 1);

    client.fail_listeners(&owner, AppError::Store("permission revoked".into()));

    // The failure arrives as a stream error, never as an empty list.
    assert!(matches!(stream.next().await, Some(Err(AppError::Store(_)))));
    assert!(stream.next().await.is_none());
}

#[test_log::test(tokio::test)]
async fn dropping_the_stream_releases_the_listen_channel() {
    let (repo, client, owner) = remote_repo("alice@example.com");
    assert_eq!(client.listener_count(&owner), 0);

    let mut stream = repo.observe_all();
    stream.next().await.unwrap().unwrap();
    assert_eq!(client.listener_count(&owner), 1);

    drop(stream);
    assert_eq!(client.listener_count(&owner), 0);
}

#[test_log::test(tokio::test)]
async fn operations_without_a_session_fail_with_auth_errors() {
    let backend = Arc::new(common::FakeAuthBackend::new());
    let session = Arc::new(AuthSession::new(backend as Arc<dyn AuthBackend>));
    let repo = RemoteTaskRepository::new(Arc::new(MemoryDocumentClient::new()), session);

    let result = repo.insert(TaskInput::new("Buy milk", None), None).await;
    assert!(matches!(result, Err(AppError::Auth(_))));

    let mut stream = repo.observe_all();
    assert!(matches!(stream.next().await, Some(Err(AppError::Auth(_)))));
    assert!(stream.next().await.is_none());
}

#[test_log::test(tokio::test)]
async fn owners_never_see_each_others_tasks() {
    let client = MemoryDocumentClient::new();

    let (alice_session, _) = signed_in_session("alice@example.com");
    let (bob_session, _) = signed_in_session("bob@example.com");
    let alice = RemoteTaskRepository::new(Arc::new(client.clone()), alice_session);
    let bob = RemoteTaskRepository::new(Arc::new(client.clone()), bob_session);

    alice
        .insert(TaskInput::new("Alice's secret", None), None)
        .await
        .unwrap();

    assert_eq!(snapshot(&alice).await.len(), 1);
    assert!(snapshot(&bob).await.is_empty());
}
