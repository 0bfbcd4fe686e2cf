//! Merged listing tests against the fake store.

mod common;

use std::sync::Arc;

use serde_json::json;
use wallog_core::{Owner, ShardSet, ShardView, Stage};
use wallog_engine::{EngineError, ListCriteria, ListOptions, Lister};

use common::FakeStore;

fn shards() -> ShardSet {
    ShardSet::new(vec![
        ShardView::new("alpha", "alphacases", "alphacaseid"),
        ShardView::new("beta", "betacases", "betacaseid"),
    ])
}

fn owners() -> Vec<Owner> {
    vec![Owner::new("SI", "Integrator").with_stages(vec![Stage::GrSi])]
}

fn seed_interleaved(store: &FakeStore) {
    store.seed(
        "alphacases",
        "alphacaseid",
        vec![
            json!({"alphacaseid": "a1", "notificationid": "N-a1",
                   "createdon": "2025-06-02T10:00:50Z", "versionnumber": 1}),
            json!({"alphacaseid": "a2", "notificationid": "N-a2",
                   "createdon": "2025-06-02T10:00:30Z", "versionnumber": 5}),
            json!({"alphacaseid": "a3", "notificationid": "N-a3",
                   "createdon": "2025-06-02T10:00:10Z", "versionnumber": 2}),
        ],
    );
    store.seed(
        "betacases",
        "betacaseid",
        vec![
            json!({"betacaseid": "b1", "notificationid": "N-b1",
                   "createdon": "2025-06-02T10:00:40Z", "versionnumber": 9}),
            json!({"betacaseid": "b2", "notificationid": "N-b2",
                   "createdon": "2025-06-02T10:00:30Z", "versionnumber": 7}),
        ],
    );
}

fn ids(page: &[wallog_engine::ListItem]) -> Vec<String> {
    page.iter()
        .map(|i| i.record.get_str("notificationid").unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_pages_walk_the_merged_order() {
    let store = Arc::new(FakeStore::new());
    seed_interleaved(&store);
    let lister = Lister::new(store, shards(), owners());

    let mut options = ListOptions {
        page_size: 2,
        ..ListOptions::default()
    };

    let page1 = lister.page(&options).await.unwrap();
    assert_eq!(ids(&page1.items), vec!["N-a1", "N-b1"]);
    assert!(page1.next_cursor.is_some());

    options.cursor = page1.next_cursor;
    let page2 = lister.page(&options).await.unwrap();
    // Same instant (…:30) across shards: version desc wins.
    assert_eq!(ids(&page2.items), vec!["N-b2", "N-a2"]);

    options.cursor = page2.next_cursor;
    let page3 = lister.page(&options).await.unwrap();
    assert_eq!(ids(&page3.items), vec!["N-a3"]);
    // Short page: stream exhausted.
    assert!(page3.next_cursor.is_none());
}

#[tokio::test]
async fn test_same_cursor_same_page() {
    let store = Arc::new(FakeStore::new());
    seed_interleaved(&store);
    let lister = Lister::new(store, shards(), owners());

    let first = lister
        .page(&ListOptions {
            page_size: 2,
            ..ListOptions::default()
        })
        .await
        .unwrap();
    let token = first.next_cursor.clone().unwrap();

    let options = ListOptions {
        page_size: 2,
        cursor: Some(token),
        ..ListOptions::default()
    };

    let once = lister.page(&options).await.unwrap();
    let again = lister.page(&options).await.unwrap();

    assert_eq!(ids(&once.items), ids(&again.items));
    assert_eq!(once.next_cursor, again.next_cursor);
}

#[tokio::test]
async fn test_dump_returns_everything_in_order() {
    let store = Arc::new(FakeStore::new());
    seed_interleaved(&store);
    let lister = Lister::new(store, shards(), owners());

    let all = lister.dump(&ListOptions::default()).await.unwrap();
    assert_eq!(ids(&all), vec!["N-a1", "N-b1", "N-b2", "N-a2", "N-a3"]);
}

#[tokio::test]
async fn test_count_sums_shard_counts() {
    let store = Arc::new(FakeStore::new());
    seed_interleaved(&store);
    let lister = Lister::new(store, shards(), owners());

    let page = lister
        .page(&ListOptions {
            page_size: 2,
            include_count: true,
            ..ListOptions::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total_count, Some(5));
}

#[tokio::test]
async fn test_shard_restriction_and_validation() {
    let store = Arc::new(FakeStore::new());
    seed_interleaved(&store);
    let lister = Lister::new(store, shards(), owners());

    let page = lister
        .page(&ListOptions {
            shard: Some("beta".to_string()),
            page_size: 10,
            ..ListOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(ids(&page.items), vec!["N-b1", "N-b2"]);

    let err = lister
        .page(&ListOptions {
            shard: Some("gamma".to_string()),
            page_size: 10,
            ..ListOptions::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));
}

#[tokio::test]
async fn test_unknown_owner_is_rejected() {
    let store = Arc::new(FakeStore::new());
    seed_interleaved(&store);
    let lister = Lister::new(store, shards(), owners());

    let err = lister
        .page(&ListOptions {
            owner: Some("nobody".to_string()),
            page_size: 10,
            ..ListOptions::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));
}

#[tokio::test]
async fn test_owner_routing_filters_records() {
    let store = Arc::new(FakeStore::new());
    store.seed(
        "alphacases",
        "alphacaseid",
        vec![
            json!({"alphacaseid": "a1", "notificationid": "N-si", "stage": "gr-si",
                   "createdon": "2025-06-02T10:00:50Z", "versionnumber": 1}),
            json!({"alphacaseid": "a2", "notificationid": "N-other", "stage": "gr-dc",
                   "createdon": "2025-06-02T10:00:40Z", "versionnumber": 1}),
            // Reviewed: stage routing no longer applies.
            json!({"alphacaseid": "a3", "notificationid": "N-reviewed", "stage": "gr-si",
                   "reviewstatus": "Reviewed",
                   "createdon": "2025-06-02T10:00:30Z", "versionnumber": 1}),
        ],
    );
    store.seed("betacases", "betacaseid", vec![]);
    let lister = Lister::new(store, shards(), owners());

    let page = lister
        .page(&ListOptions {
            owner: Some("si".to_string()),
            page_size: 10,
            ..ListOptions::default()
        })
        .await
        .unwrap();

    assert_eq!(ids(&page.items), vec!["N-si"]);
}

#[tokio::test]
async fn test_search_criteria_narrow_the_scan() {
    let store = Arc::new(FakeStore::new());
    seed_interleaved(&store);
    let lister = Lister::new(store, shards(), owners());

    let page = lister
        .page(&ListOptions {
            criteria: ListCriteria {
                search: Some("N-b".to_string()),
                ..ListCriteria::default()
            },
            page_size: 10,
            ..ListOptions::default()
        })
        .await
        .unwrap();

    assert_eq!(ids(&page.items), vec!["N-b1", "N-b2"]);
}

#[tokio::test]
async fn test_undecodable_cursor_is_rejected() {
    let store = Arc::new(FakeStore::new());
    seed_interleaved(&store);
    let lister = Lister::new(store, shards(), owners());

    let err = lister
        .page(&ListOptions {
            cursor: Some("corrupt token".to_string()),
            page_size: 2,
            ..ListOptions::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { .. }));
}
