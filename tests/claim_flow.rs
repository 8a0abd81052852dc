//! Claim protocol tests over the in-memory entity store
//!
//! Covers the single-winner guarantee, the NotFound/AlreadyClaimed
//! distinction, the no-op release acknowledgment, and the
//! provider-iff-assigned invariant.

use std::sync::Arc;

use bson::oid::ObjectId;
use wayside::auth::{Principal, Role};
use wayside::db::schemas::{AccountDoc, Location, RequestStatus, ServiceRequestDoc};
use wayside::dispatch::ClaimCoordinator;
use wayside::logging::AuditLogger;
use wayside::store::EntityStore;
use wayside::types::WaysideError;

async fn seed_account(store: &EntityStore, identifier: &str, role: Role) -> ObjectId {
    store
        .accounts
        .insert(AccountDoc::new(
            identifier.to_string(),
            identifier.split('@').next().unwrap().to_string(),
            "555-0100".to_string(),
            "$argon2id$unused-in-these-tests".to_string(),
            role,
        ))
        .await
        .unwrap()
        ._id
        .unwrap()
}

async fn seed_request(store: &EntityStore, requester_id: ObjectId) -> ObjectId {
    store
        .requests
        .insert(ServiceRequestDoc::new(
            requester_id,
            "flat-tyre".to_string(),
            "rear left, no spare".to_string(),
            Location {
                latitude: 52.52,
                longitude: 13.405,
                address: Some("A100 shoulder, km 12".to_string()),
            },
        ))
        .await
        .unwrap()
        ._id
        .unwrap()
}

fn coordinator(store: &EntityStore) -> ClaimCoordinator {
    ClaimCoordinator::new(store, AuditLogger::new("test-node".into()))
}

#[tokio::test]
async fn first_claim_wins_second_sees_already_claimed() {
    let store = EntityStore::in_memory();
    let requester = seed_account(&store, "r1@wayside.test", Role::Requester).await;
    let p1 = seed_account(&store, "p1@wayside.test", Role::Provider).await;
    let p2 = seed_account(&store, "p2@wayside.test", Role::Provider).await;
    let request_id = seed_request(&store, requester).await;

    let coordinator = coordinator(&store);

    let claimed = coordinator.claim(request_id, p1).await.unwrap();
    assert_eq!(claimed.status, RequestStatus::ASSIGNED);
    assert_eq!(claimed.provider_id, Some(p1));

    // The loser gets AlreadyClaimed, not NotFound, and nothing changes
    let result = coordinator.claim(request_id, p2).await;
    assert!(matches!(result, Err(WaysideError::AlreadyClaimed)));

    let current = store.requests.find_by_id(request_id).await.unwrap().unwrap();
    assert_eq!(current.status, RequestStatus::ASSIGNED);
    assert_eq!(current.provider_id, Some(p1));
}

#[tokio::test]
async fn concurrent_claims_have_exactly_one_winner() {
    let store = EntityStore::in_memory();
    let requester = seed_account(&store, "r1@wayside.test", Role::Requester).await;
    let request_id = seed_request(&store, requester).await;

    let mut providers = Vec::new();
    for i in 0..12 {
        providers.push(seed_account(&store, &format!("p{}@wayside.test", i), Role::Provider).await);
    }

    let coordinator = Arc::new(coordinator(&store));

    let mut handles = Vec::new();
    for provider_id in providers {
        let coordinator = Arc::clone(&coordinator);
        handles.push(tokio::spawn(async move {
            coordinator.claim(request_id, provider_id).await
        }));
    }

    let mut winners = Vec::new();
    let mut losers = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(request) => winners.push(request),
            Err(WaysideError::AlreadyClaimed) => losers += 1,
            Err(other) => panic!("unexpected claim error: {other}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(losers, 11);

    // The persisted provider is the single winner's
    let current = store.requests.find_by_id(request_id).await.unwrap().unwrap();
    assert_eq!(current.provider_id, winners[0].provider_id);
    assert_eq!(current.status, RequestStatus::ASSIGNED);
}

#[tokio::test]
async fn claim_on_missing_request_is_not_found() {
    let store = EntityStore::in_memory();
    let provider = seed_account(&store, "p1@wayside.test", Role::Provider).await;

    let result = coordinator(&store).claim(ObjectId::new(), provider).await;
    assert!(matches!(result, Err(WaysideError::NotFound(_))));
}

#[tokio::test]
async fn claim_requires_provider_role() {
    let store = EntityStore::in_memory();
    let requester = seed_account(&store, "r1@wayside.test", Role::Requester).await;
    let request_id = seed_request(&store, requester).await;

    // A requester account cannot claim, even its own request
    let result = coordinator(&store).claim(request_id, requester).await;
    assert!(matches!(result, Err(WaysideError::Forbidden(_))));

    let current = store.requests.find_by_id(request_id).await.unwrap().unwrap();
    assert_eq!(current.status, RequestStatus::PENDING);
    assert_eq!(current.provider_id, None);
}

#[tokio::test]
async fn release_acknowledges_without_state_change() {
    let store = EntityStore::in_memory();
    let requester = seed_account(&store, "r1@wayside.test", Role::Requester).await;
    let provider = seed_account(&store, "p1@wayside.test", Role::Provider).await;
    let request_id = seed_request(&store, requester).await;

    let coordinator = coordinator(&store);
    coordinator.claim(request_id, provider).await.unwrap();

    let actor = Principal {
        account_id: provider,
        identifier: "p1@wayside.test".into(),
        role: Role::Provider,
    };

    // Release is accepted but the request keeps status and provider
    let released = coordinator.release(request_id, &actor).await.unwrap();
    assert_eq!(released.status, RequestStatus::ASSIGNED);
    assert_eq!(released.provider_id, Some(provider));

    let current = store.requests.find_by_id(request_id).await.unwrap().unwrap();
    assert_eq!(current.status, RequestStatus::ASSIGNED);
    assert_eq!(current.provider_id, Some(provider));

    // Releasing a Pending request does not revert or mutate it either
    let other = seed_request(&store, requester).await;
    let released = coordinator.release(other, &actor).await.unwrap();
    assert_eq!(released.status, RequestStatus::PENDING);

    // Missing request still reports NotFound
    let result = coordinator.release(ObjectId::new(), &actor).await;
    assert!(matches!(result, Err(WaysideError::NotFound(_))));
}

#[tokio::test]
async fn provider_is_set_iff_assigned() {
    let store = EntityStore::in_memory();
    let requester = seed_account(&store, "r1@wayside.test", Role::Requester).await;
    let provider = seed_account(&store, "p1@wayside.test", Role::Provider).await;
    let request_id = seed_request(&store, requester).await;

    let pending = store.requests.find_by_id(request_id).await.unwrap().unwrap();
    assert_eq!(pending.status, RequestStatus::PENDING);
    assert!(pending.provider_id.is_none());

    coordinator(&store).claim(request_id, provider).await.unwrap();

    let assigned = store.requests.find_by_id(request_id).await.unwrap().unwrap();
    assert_eq!(assigned.status, RequestStatus::ASSIGNED);
    assert!(assigned.provider_id.is_some());
}
