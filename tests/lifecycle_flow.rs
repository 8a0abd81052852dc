//! Lifecycle and query-surface tests over the in-memory entity store

use bson::oid::ObjectId;
use wayside::auth::Role;
use wayside::db::schemas::{AccountDoc, Location, RequestStatus};
use wayside::dispatch::{ClaimCoordinator, NewRequest, RequestLifecycle};
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

fn new_request(problem: &str) -> NewRequest {
    NewRequest {
        problem_type: problem.to_string(),
        description: format!("{} on the hard shoulder", problem),
        location: Location {
            latitude: 48.1351,
            longitude: 11.582,
            address: None,
        },
    }
}

#[tokio::test]
async fn create_validates_and_files_pending() {
    let store = EntityStore::in_memory();
    let lifecycle = RequestLifecycle::new(&store, AuditLogger::new("test-node".into()));
    let requester = seed_account(&store, "r1@wayside.test", Role::Requester).await;

    let request = lifecycle
        .create(requester, new_request("flat-tyre"))
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::PENDING);
    assert_eq!(request.requester_id, requester);
    assert!(request.provider_id.is_none());
    assert!(request.metadata.created_at.is_some());

    let blank = lifecycle
        .create(
            requester,
            NewRequest {
                problem_type: "  ".to_string(),
                description: "something".to_string(),
                location: Location::default(),
            },
        )
        .await;
    assert!(matches!(blank, Err(WaysideError::Validation(_))));

    let no_description = lifecycle
        .create(
            requester,
            NewRequest {
                problem_type: "tow".to_string(),
                description: String::new(),
                location: Location::default(),
            },
        )
        .await;
    assert!(matches!(no_description, Err(WaysideError::Validation(_))));
}

#[tokio::test]
async fn listings_are_scoped_and_newest_first() {
    let store = EntityStore::in_memory();
    let audit = AuditLogger::new("test-node".into());
    let lifecycle = RequestLifecycle::new(&store, audit.clone());
    let coordinator = ClaimCoordinator::new(&store, audit);

    let r1 = seed_account(&store, "r1@wayside.test", Role::Requester).await;
    let r2 = seed_account(&store, "r2@wayside.test", Role::Requester).await;
    let provider = seed_account(&store, "p1@wayside.test", Role::Provider).await;

    let a = lifecycle.create(r1, new_request("flat-tyre")).await.unwrap();
    let b = lifecycle.create(r1, new_request("battery")).await.unwrap();
    let c = lifecycle.create(r2, new_request("tow")).await.unwrap();

    let mine = lifecycle.list_for_requester(r1).await.unwrap();
    assert_eq!(
        mine.iter().map(|r| r._id).collect::<Vec<_>>(),
        vec![b._id, a._id]
    );

    // Claim board shows every Pending request until someone claims it
    let board = lifecycle.list_pending().await.unwrap();
    assert_eq!(board.len(), 3);

    coordinator.claim(b._id.unwrap(), provider).await.unwrap();

    let board = lifecycle.list_pending().await.unwrap();
    assert_eq!(board.len(), 2);
    assert!(board.iter().all(|r| r.status == RequestStatus::PENDING));

    let assigned = lifecycle.list_for_provider(provider).await.unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0]._id, b._id);

    let all = lifecycle.list_all().await.unwrap();
    assert_eq!(
        all.iter().map(|r| r._id).collect::<Vec<_>>(),
        vec![c._id, b._id, a._id]
    );
}

#[tokio::test]
async fn get_resolved_attaches_contact_cards() {
    let store = EntityStore::in_memory();
    let audit = AuditLogger::new("test-node".into());
    let lifecycle = RequestLifecycle::new(&store, audit.clone());
    let coordinator = ClaimCoordinator::new(&store, audit);

    let requester = seed_account(&store, "r1@wayside.test", Role::Requester).await;
    let provider = seed_account(&store, "p1@wayside.test", Role::Provider).await;

    let request = lifecycle.create(requester, new_request("tow")).await.unwrap();
    let request_id = request._id.unwrap();

    let resolved = lifecycle.get_resolved(request_id).await.unwrap();
    assert_eq!(
        resolved.requester.as_ref().map(|a| a.identifier.as_str()),
        Some("r1@wayside.test")
    );
    assert!(resolved.provider.is_none());

    coordinator.claim(request_id, provider).await.unwrap();

    let resolved = lifecycle.get_resolved(request_id).await.unwrap();
    assert_eq!(
        resolved.provider.as_ref().map(|a| a.identifier.as_str()),
        Some("p1@wayside.test")
    );

    let missing = lifecycle.get_resolved(ObjectId::new()).await;
    assert!(matches!(missing, Err(WaysideError::NotFound(_))));
}

#[tokio::test]
async fn history_lists_only_settled_requests() {
    let store = EntityStore::in_memory();
    let lifecycle = RequestLifecycle::new(&store, AuditLogger::new("test-node".into()));
    let requester = seed_account(&store, "r1@wayside.test", Role::Requester).await;

    let open = lifecycle.create(requester, new_request("battery")).await.unwrap();
    let done = lifecycle.create(requester, new_request("tow")).await.unwrap();

    // Settle one directly through the store
    store
        .requests
        .mark_settled(done._id.unwrap(), ObjectId::new())
        .await
        .unwrap()
        .unwrap();

    let history = lifecycle.history(requester).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]._id, done._id);
    assert_eq!(history[0].status, RequestStatus::SETTLED);

    let open_now = store.requests.find_by_id(open._id.unwrap()).await.unwrap().unwrap();
    assert_eq!(open_now.status, RequestStatus::PENDING);
}
