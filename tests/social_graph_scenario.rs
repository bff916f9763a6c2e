use std::sync::Arc;

use social_backend::{
    api::error::SocialError,
    modules::{
        friend::{
            model::RelationshipKey,
            schema::FriendshipStatusCode,
            service::{EngineConfig, FriendService},
        },
        graph::{model::PageRequest, service::GraphService},
        group::service::GroupService,
    },
    store::memory::MemoryStore,
};
use uuid::Uuid;

struct SocialGraph {
    store: Arc<MemoryStore>,
    friends: FriendService<MemoryStore, MemoryStore>,
    groups: GroupService<MemoryStore, MemoryStore>,
    graph: GraphService<MemoryStore, MemoryStore, MemoryStore>,
}

fn social_graph() -> SocialGraph {
    let store = Arc::new(MemoryStore::default());
    let config = EngineConfig::default();
    SocialGraph {
        friends: FriendService::with_dependencies(store.clone(), store.clone(), config),
        groups: GroupService::with_dependencies(store.clone(), store.clone(), config),
        graph: GraphService::with_dependencies(store.clone(), store.clone(), store.clone()),
        store,
    }
}

#[tokio::test]
async fn close_friends_and_a_block() {
    let sg = social_graph();
    let a = sg.store.add_user(Uuid::new_v4());
    let b = sg.store.add_user(Uuid::new_v4());
    let c = sg.store.add_user(Uuid::new_v4());
    let page = PageRequest::new(0, 20);

    sg.friends.send_request(a, b).await.unwrap();
    assert_eq!(
        sg.friends.current_status(b, a).await.unwrap().status,
        FriendshipStatusCode::Pending
    );
    sg.friends.respond(a, b, true, b).await.unwrap();

    let close = sg.groups.create_group(a, "Close Friends").await.unwrap();
    sg.groups.assign_to_group(a, RelationshipKey::new(a, b).unwrap(), close.id).await.unwrap();

    sg.friends.send_request(c, a).await.unwrap();
    sg.friends.block(a, c).await.unwrap();

    assert_eq!(sg.graph.friends_of(a, page).await.unwrap().items, vec![b]);
    assert_eq!(sg.graph.friends_of_group(close.id, page).await.unwrap().items, vec![b]);
    assert_eq!(sg.graph.blocked_by(a, page).await.unwrap().items, vec![c]);
    assert!(sg.graph.blocked_by(c, page).await.unwrap().items.is_empty());

    // c cannot reach a while the block holds
    let err = sg.friends.send_request(c, a).await.unwrap_err();
    assert_eq!(err.social(), Some(SocialError::BlockedUser));
    assert!(sg.graph.requests_to(a, page).await.unwrap().items.is_empty());
}

#[tokio::test]
async fn blocking_a_grouped_friend_removes_them_everywhere() {
    let sg = social_graph();
    let a = sg.store.add_user(Uuid::new_v4());
    let b = sg.store.add_user(Uuid::new_v4());
    let page = PageRequest::new(0, 20);

    sg.friends.send_request(b, a).await.unwrap();
    sg.friends.respond(b, a, true, a).await.unwrap();
    let group = sg.groups.create_group(a, "Close Friends").await.unwrap();
    sg.groups.assign_to_group(a, RelationshipKey::new(a, b).unwrap(), group.id).await.unwrap();

    sg.friends.block(a, b).await.unwrap();

    assert_eq!(
        sg.friends.current_status(a, b).await.unwrap().status,
        FriendshipStatusCode::Blocked
    );
    assert!(sg.groups.group_of(RelationshipKey::new(b, a).unwrap()).await.unwrap().is_none());
    assert!(sg.graph.friends_of(a, page).await.unwrap().items.is_empty());
    assert!(sg.graph.friends_of_group(group.id, page).await.unwrap().items.is_empty());

    let err = sg.friends.send_request(b, a).await.unwrap_err();
    assert_eq!(err.social(), Some(SocialError::BlockedUser));

    // lifting the block returns the pair to baseline, not to friendship
    sg.friends.unblock(a, b).await.unwrap();
    assert!(sg.graph.friends_of(a, page).await.unwrap().items.is_empty());
    sg.friends.send_request(b, a).await.unwrap();

    let history = sg.friends.history(a, b).await.unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history.first().map(|e| e.specifier_id), Some(b));
}

#[tokio::test]
async fn paging_through_many_friends_visits_each_once() {
    let sg = social_graph();
    let me = sg.store.add_user(Uuid::new_v4());
    let mut expected = Vec::new();
    for _ in 0..7 {
        let other = sg.store.add_user(Uuid::new_v4());
        sg.friends.send_request(me, other).await.unwrap();
        sg.friends.respond(me, other, true, other).await.unwrap();
        expected.push(other);
    }
    expected.sort();

    let mut seen = Vec::new();
    let mut page_number = 0;
    loop {
        let slice = sg.graph.friends_of(me, PageRequest::new(page_number, 3)).await.unwrap();
        let profiles = sg.graph.resolve_profiles(slice.clone()).await.unwrap();
        assert_eq!(profiles.items.len(), slice.items.len());
        seen.extend(slice.items);
        if !slice.has_more_items {
            break;
        }
        page_number += 1;
    }

    assert_eq!(page_number, 2);
    assert_eq!(seen, expected);
}
