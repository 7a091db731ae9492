//! Session Lifecycle Integration Tests

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokengate::session::{
    token_key, user_token_key, MemorySessionStore, SessionStore, TokenCodec, SESSION_LIFETIME,
};
use tokengate::{AuthError, SessionManager};

const SECRET: &[u8] = b"lifecycle-test-secret-0123456789ab";

fn setup() -> (SessionManager, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    let manager = SessionManager::new(
        store.clone(),
        Arc::new(TokenCodec::new(SECRET)),
        Duration::from_secs(2),
    );
    (manager, store)
}

fn is_invalid_token(result: Result<String, AuthError>) -> bool {
    matches!(result, Err(AuthError::InvalidToken))
}

#[tokio::test]
async fn test_issue_then_verify_round_trip() {
    let (manager, _store) = setup();

    for username in ["alice", "bob", "carol.d", "user@example.com"] {
        let token = manager.issue(username).await.unwrap();
        assert_eq!(manager.verify(&token).await.unwrap(), username);
    }
}

#[tokio::test]
async fn test_second_issue_invalidates_first_token() {
    let (manager, _store) = setup();

    let first = manager.issue("alice").await.unwrap();
    let second = manager.issue("alice").await.unwrap();

    assert!(is_invalid_token(manager.verify(&first).await));
    assert_eq!(manager.verify(&second).await.unwrap(), "alice");
}

#[tokio::test]
async fn test_sessions_of_different_users_are_independent() {
    let (manager, _store) = setup();

    let alice = manager.issue("alice").await.unwrap();
    let bob = manager.issue("bob").await.unwrap();
    manager.issue("bob").await.unwrap();

    assert_eq!(manager.verify(&alice).await.unwrap(), "alice");
    assert!(is_invalid_token(manager.verify(&bob).await));
}

#[tokio::test]
async fn test_revoke_is_complete() {
    let (manager, store) = setup();

    let token = manager.issue("alice").await.unwrap();
    manager.revoke(&token, "alice").await.unwrap();

    assert!(is_invalid_token(manager.verify(&token).await));
    assert_eq!(store.get(&token_key(&token)).await.unwrap(), None);
    assert_eq!(store.get(&user_token_key("alice")).await.unwrap(), None);

    let fresh = manager.issue("alice").await.unwrap();
    assert_ne!(fresh, token);
    assert_eq!(manager.verify(&fresh).await.unwrap(), "alice");
    assert!(is_invalid_token(manager.verify(&token).await));
}

#[tokio::test]
async fn test_revoke_is_idempotent() {
    let (manager, _store) = setup();

    let token = manager.issue("alice").await.unwrap();
    manager.revoke(&token, "alice").await.unwrap();
    manager.revoke(&token, "alice").await.unwrap();

    // Never issued at all
    manager.revoke("never-issued", "nobody").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_store_expiry_beats_valid_claim() {
    let (manager, _store) = setup();

    let token = manager.issue("alice").await.unwrap();

    // The store clock runs past the TTL while the signed expiry claim,
    // based on wall-clock time, is still in the future.
    tokio::time::advance(SESSION_LIFETIME + Duration::from_secs(1)).await;

    assert!(TokenCodec::new(SECRET).decode(&token).is_ok());
    assert!(is_invalid_token(manager.verify(&token).await));
}

#[tokio::test(start_paused = true)]
async fn test_session_is_live_until_ttl() {
    let (manager, _store) = setup();

    let token = manager.issue("alice").await.unwrap();
    tokio::time::advance(SESSION_LIFETIME - Duration::from_secs(1)).await;

    assert_eq!(manager.verify(&token).await.unwrap(), "alice");
}

#[tokio::test]
async fn test_alice_scenario() {
    let (manager, _store) = setup();

    let t1 = manager.issue("alice").await.unwrap();
    assert_eq!(manager.verify(&t1).await.unwrap(), "alice");

    let t2 = manager.issue("alice").await.unwrap();
    assert_ne!(t1, t2);
    assert_eq!(manager.verify(&t2).await.unwrap(), "alice");
    assert!(is_invalid_token(manager.verify(&t1).await));

    manager.revoke(&t2, "alice").await.unwrap();
    assert!(is_invalid_token(manager.verify(&t2).await));

    let t3 = manager.issue("alice").await.unwrap();
    assert_eq!(manager.verify(&t3).await.unwrap(), "alice");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issue_race_is_bounded() {
    let (manager, store) = setup();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.issue("alice").await })
        })
        .collect();

    let mut tokens = Vec::new();
    for handle in handles {
        tokens.push(handle.await.unwrap().unwrap());
    }
    assert_eq!(tokens.iter().collect::<HashSet<_>>().len(), tokens.len());

    // Last writer of the forward key wins, and its reverse entry points back
    let winner = store.get(&user_token_key("alice")).await.unwrap().unwrap();
    assert!(tokens.contains(&winner));
    assert_eq!(manager.verify(&winner).await.unwrap(), "alice");

    // Losers may still verify until their TTL runs out, but every token
    // that verifies belongs to alice.
    let mut live = 0;
    for token in &tokens {
        if let Ok(username) = manager.verify(token).await {
            assert_eq!(username, "alice");
            live += 1;
        }
    }
    assert!(live >= 1);

    // A serialized login afterwards collapses back to a single session
    let settled = manager.issue("alice").await.unwrap();
    assert_eq!(manager.verify(&settled).await.unwrap(), "alice");
    assert!(is_invalid_token(manager.verify(&winner).await));
}

#[tokio::test]
async fn test_tokens_from_another_secret_are_rejected() {
    let (manager, _store) = setup();
    let foreign = TokenCodec::new(b"some-other-service-secret-abcdefg")
        .encode("alice", SESSION_LIFETIME)
        .unwrap();

    assert!(is_invalid_token(manager.verify(&foreign).await));
}
