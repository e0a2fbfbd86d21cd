//! PostgreSQL repository tests. Require `DATABASE_URL`; run with `--ignored`.

use sqlx::PgPool;
use std::sync::Arc;

use codeshort::domain::entities::{HistoryQuery, HistorySort, NewResource, ResourceKind, SortOrder};
use codeshort::domain::repositories::ResourceRepository;
use codeshort::error::AppError;
use codeshort::infrastructure::persistence::PgResourceRepository;

fn new_resource(kind: ResourceKind, code: &str) -> NewResource {
    NewResource {
        kind,
        code: code.to_string(),
        target_url: "https://example.com/".to_string(),
        title: Some("Example Domain".to_string()),
        owner_id: Some(7),
    }
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_create_and_get(pool: PgPool) {
    let repo = PgResourceRepository::new(Arc::new(pool));

    let created = repo
        .create_resource(new_resource(ResourceKind::QrCode, "abc1234"))
        .await
        .unwrap();
    assert_eq!(created.kind, ResourceKind::QrCode);
    assert_eq!(created.hits, 0);

    let found = repo
        .get_resource(ResourceKind::QrCode, "abc1234")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.title.as_deref(), Some("Example Domain"));
    assert_eq!(found.owner_id, Some(7));
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_get_missing(pool: PgPool) {
    let repo = PgResourceRepository::new(Arc::new(pool));

    let found = repo
        .get_resource(ResourceKind::ShortLink, "nothere")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_duplicate_code_within_kind(pool: PgPool) {
    let repo = PgResourceRepository::new(Arc::new(pool));

    repo.create_resource(new_resource(ResourceKind::ShortLink, "dup1234"))
        .await
        .unwrap();

    let err = repo
        .create_resource(new_resource(ResourceKind::ShortLink, "dup1234"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateId { .. }));

    // Same code in another kind is fine.
    repo.create_resource(new_resource(ResourceKind::Barcode, "dup1234"))
        .await
        .unwrap();
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_increment_counter_is_relative(pool: PgPool) {
    let repo = PgResourceRepository::new(Arc::new(pool));
    repo.create_resource(new_resource(ResourceKind::ShortLink, "cnt1234"))
        .await
        .unwrap();

    assert!(repo
        .increment_counter(ResourceKind::ShortLink, "cnt1234", 20)
        .await
        .unwrap());
    assert!(repo
        .increment_counter(ResourceKind::ShortLink, "cnt1234", 3)
        .await
        .unwrap());

    let found = repo
        .get_resource(ResourceKind::ShortLink, "cnt1234")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.hits, 23);
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_increment_missing_returns_false(pool: PgPool) {
    let repo = PgResourceRepository::new(Arc::new(pool));

    let updated = repo
        .increment_counter(ResourceKind::QrCode, "ghost12", 5)
        .await
        .unwrap();
    assert!(!updated);
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_exists_and_ping(pool: PgPool) {
    let repo = PgResourceRepository::new(Arc::new(pool));
    repo.create_resource(new_resource(ResourceKind::Barcode, "ex12345"))
        .await
        .unwrap();

    assert!(repo.exists_id(ResourceKind::Barcode, "ex12345").await.unwrap());
    assert!(!repo.exists_id(ResourceKind::QrCode, "ex12345").await.unwrap());
    repo.ping().await.unwrap();
}

#[sqlx::test]
#[ignore = "requires PostgreSQL"]
async fn test_list_by_owner_orders_and_pages(pool: PgPool) {
    let repo = PgResourceRepository::new(Arc::new(pool));
    for (code, hits) in [("own0001", 4), ("own0002", 40), ("own0003", 9)] {
        repo.create_resource(new_resource(ResourceKind::ShortLink, code))
            .await
            .unwrap();
        repo.increment_counter(ResourceKind::ShortLink, code, hits)
            .await
            .unwrap();
    }
    let mut other = new_resource(ResourceKind::ShortLink, "own0004");
    other.owner_id = Some(8);
    repo.create_resource(other).await.unwrap();

    let query = HistoryQuery {
        owner_id: 7,
        page: 1,
        limit: 2,
        sort: HistorySort::Hits,
        order: SortOrder::Desc,
    };
    let first = repo
        .list_by_owner(ResourceKind::ShortLink, query)
        .await
        .unwrap();
    assert_eq!(first.total, 3);
    let codes: Vec<_> = first.items.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, ["own0002", "own0003"]);

    let second = repo
        .list_by_owner(ResourceKind::ShortLink, HistoryQuery { page: 2, ..query })
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].code, "own0001");

    let qr = repo
        .list_by_owner(ResourceKind::QrCode, query)
        .await
        .unwrap();
    assert_eq!(qr.total, 0);
}
