//! Database tests

use super::*;
use crate::error::AppError;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

async fn insert_test_user(db: &Database, username: &str) -> User {
    let user = User::new(
        username.to_string(),
        format!("{username}@example.com"),
        "not-a-real-hash".to_string(),
    );
    db.insert_user(&user).await.unwrap();
    user
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
    // Connection and migrations successful if we get here without panicking
}

#[tokio::test]
async fn test_reconnect_runs_migrations_idempotently() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("test.db");

    let db = Database::connect(&db_path).await.unwrap();
    insert_test_user(&db, "alice1").await;
    drop(db);

    let db = Database::connect(&db_path).await.unwrap();
    assert!(db.username_exists("alice1").await.unwrap());
}

#[tokio::test]
async fn test_user_insert_and_lookup() {
    let (db, _temp_dir) = create_test_db().await;

    assert!(!db.username_exists("alice1").await.unwrap());
    let user = insert_test_user(&db, "alice1").await;
    assert!(db.username_exists("alice1").await.unwrap());

    let by_name = db.get_user_by_username("alice1").await.unwrap().unwrap();
    assert_eq!(by_name.id, user.id);
    assert_eq!(by_name.email, "alice1@example.com");

    let by_id = db.get_user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, "alice1");

    assert!(db.get_user_by_username("bob123").await.unwrap().is_none());
    assert!(db.get_user_by_id("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_username_is_validation_error() {
    let (db, _temp_dir) = create_test_db().await;
    insert_test_user(&db, "alice1").await;

    let duplicate = User::new(
        "alice1".to_string(),
        "other@example.com".to_string(),
        "hash".to_string(),
    );
    let error = db.insert_user(&duplicate).await.unwrap_err();
    assert!(matches!(error, AppError::Validation(message) if message == "username already in use"));
}

#[tokio::test]
async fn test_session_lookup_requires_both_hashes() {
    let (db, _temp_dir) = create_test_db().await;
    let user = insert_test_user(&db, "alice1").await;

    db.insert_session(&user.id, "session-hash", "csrf-hash")
        .await
        .unwrap();

    let session = db
        .get_session("session-hash", "csrf-hash")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.user_id, user.id);

    assert!(db.get_session("session-hash", "other").await.unwrap().is_none());
    assert!(db.get_session("other", "csrf-hash").await.unwrap().is_none());
    // Swapped values must not match either
    assert!(db.get_session("csrf-hash", "session-hash").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_session_rows_are_not_found() {
    let (db, _temp_dir) = create_test_db().await;
    let user = insert_test_user(&db, "alice1").await;

    db.insert_session(&user.id, "session-hash", "csrf-hash")
        .await
        .unwrap();
    db.insert_session(&user.id, "session-hash", "csrf-hash")
        .await
        .unwrap();

    assert!(db.get_session("session-hash", "csrf-hash").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_sessions_for_user_only_touches_that_user() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = insert_test_user(&db, "alice1").await;
    let bob = insert_test_user(&db, "bob123").await;

    db.insert_session(&alice.id, "a1", "c1").await.unwrap();
    db.insert_session(&alice.id, "a2", "c2").await.unwrap();
    db.insert_session(&bob.id, "b1", "d1").await.unwrap();

    assert_eq!(db.delete_sessions_for_user(&alice.id).await.unwrap(), 2);

    assert!(db.get_session("a1", "c1").await.unwrap().is_none());
    assert!(db.get_session("a2", "c2").await.unwrap().is_none());
    assert!(db.get_session("b1", "d1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_deleting_user_cascades() {
    let (db, _temp_dir) = create_test_db().await;
    let user = insert_test_user(&db, "alice1").await;

    db.insert_session(&user.id, "s", "c").await.unwrap();
    let post = Post::new(user.id.clone(), "Title".to_string(), "Body".to_string());
    db.insert_post(&post).await.unwrap();

    assert!(db.delete_user(&user.id).await.unwrap());

    assert!(db.get_session("s", "c").await.unwrap().is_none());
    assert!(db.get_post(&post.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_post_crud() {
    let (db, _temp_dir) = create_test_db().await;
    let user = insert_test_user(&db, "alice1").await;

    assert!(db.get_post_summaries().await.unwrap().is_empty());

    let post = Post::new(
        user.id.clone(),
        "Hello".to_string(),
        "<p>Hello, world!</p>".to_string(),
    );
    db.insert_post(&post).await.unwrap();

    let summaries = db.get_post_summaries().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, post.id);
    assert_eq!(summaries[0].title, "Hello");

    let retrieved = db.get_post(&post.id).await.unwrap().unwrap();
    assert_eq!(retrieved.content, "<p>Hello, world!</p>");
    assert_eq!(retrieved.user_id, user.id);

    assert!(db.get_post(&EntityId::new().0).await.unwrap().is_none());
}

#[tokio::test]
async fn test_post_requires_existing_user() {
    let (db, _temp_dir) = create_test_db().await;

    let orphan = Post::new(
        EntityId::new().0,
        "Title".to_string(),
        "Body".to_string(),
    );
    assert!(db.insert_post(&orphan).await.is_err());
}

#[tokio::test]
async fn test_message_operations() {
    let (db, _temp_dir) = create_test_db().await;

    assert!(db.get_messages().await.unwrap().is_empty());

    db.insert_message(&Message::new("first".to_string()))
        .await
        .unwrap();
    db.insert_message(&Message::new("second".to_string()))
        .await
        .unwrap();

    let messages = db.get_messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().any(|m| m.msg == "first"));
    assert!(messages.iter().any(|m| m.msg == "second"));
}
