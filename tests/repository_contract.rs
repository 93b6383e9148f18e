//! Repository Contract Tests
//!
//! Every backend must behave the same for save, get, list, delete and exists.
//! The object store runs against the in-process `InMemory` provider.

use std::sync::Arc;

use contentstore::domain::{ContentId, ContentRecord};
use contentstore::repository::{
    BlobBackend, ContentRepository, FilesystemRepository, InMemoryRepository, ObjectStoreBlobs,
    ObjectStoreRepository, JSON_CONTENT_TYPE,
};
use serde_json::json;
use tempfile::TempDir;

/// A repository plus whatever must outlive it
struct Backend {
    name: &'static str,
    repo: Arc<dyn ContentRepository>,
    _dir: Option<TempDir>,
}

fn backends() -> Vec<Backend> {
    let dir = TempDir::new().unwrap();
    let filesystem = FilesystemRepository::open(dir.path().join("content")).unwrap();

    let blobs: Arc<dyn BlobBackend> = Arc::new(ObjectStoreBlobs::in_memory());
    let object_store = ObjectStoreRepository::new("h5p-content", blobs).unwrap();

    vec![
        Backend {
            name: "memory",
            repo: Arc::new(InMemoryRepository::new()),
            _dir: None,
        },
        Backend {
            name: "filesystem",
            repo: Arc::new(filesystem),
            _dir: Some(dir),
        },
        Backend {
            name: "object store",
            repo: Arc::new(object_store),
            _dir: None,
        },
    ]
}

fn id(value: &str) -> ContentId {
    ContentId::new(value).unwrap()
}

fn record(id_str: &str, title: &str, created_at: &str) -> ContentRecord {
    ContentRecord {
        id: id(id_str),
        title: title.to_string(),
        parameters: json!({ "text": format!("body of {}", id_str) }),
        main_library: "H5P.Text 1.1".to_string(),
        metadata: json!({ "license": "U", "authors": [{ "name": "Teacher" }] }),
        created_at: created_at.to_string(),
        updated_at: created_at.to_string(),
    }
}

#[tokio::test]
async fn test_quiz_scenario() {
    for backend in backends() {
        let repo = &backend.repo;
        let quiz = ContentRecord {
            id: id("x1"),
            title: "Quiz".to_string(),
            parameters: json!({ "q": "2+2?" }),
            main_library: "quiz-v1".to_string(),
            metadata: json!({}),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        };

        repo.save(&quiz.id, &quiz).await.unwrap();
        assert!(repo.exists(&quiz.id).await.unwrap(), "{}", backend.name);
        assert_eq!(
            repo.get(&quiz.id).await.unwrap(),
            Some(quiz.clone()),
            "{}",
            backend.name
        );

        assert_eq!(
            repo.list().await.unwrap(),
            vec![quiz.clone()],
            "{}",
            backend.name
        );

        repo.delete(&quiz.id).await.unwrap();
        assert!(!repo.exists(&quiz.id).await.unwrap(), "{}", backend.name);
        assert_eq!(repo.get(&quiz.id).await.unwrap(), None, "{}", backend.name);
        assert!(repo.list().await.unwrap().is_empty(), "{}", backend.name);
    }
}

#[tokio::test]
async fn test_round_trip_preserves_opaque_payloads() {
    for backend in backends() {
        let mut rec = record("deep", "Nested", "2024-03-01T12:30:00.123Z");
        rec.parameters = json!({
            "questions": [
                { "text": "Ünïcödé?", "answers": [1, 2.5, null, true] },
                { "zeta": 1, "alpha": { "nested": [] } }
            ]
        });

        backend.repo.save(&rec.id, &rec).await.unwrap();
        let loaded = backend.repo.get(&rec.id).await.unwrap().unwrap();

        assert_eq!(loaded, rec, "{}", backend.name);
        // Key order inside payloads survives
        assert_eq!(
            serde_json::to_string(&loaded.parameters).unwrap(),
            serde_json::to_string(&rec.parameters).unwrap(),
            "{}",
            backend.name
        );
    }
}

#[tokio::test]
async fn test_overwrite_replaces_record() {
    for backend in backends() {
        let first = record("same", "First", "2024-01-01T00:00:00Z");
        let mut second = record("same", "Second", "2024-01-01T00:00:00Z");
        second.updated_at = "2024-02-01T00:00:00Z".to_string();

        backend.repo.save(&first.id, &first).await.unwrap();
        backend.repo.save(&second.id, &second).await.unwrap();

        assert_eq!(
            backend.repo.get(&first.id).await.unwrap(),
            Some(second),
            "{}",
            backend.name
        );
        assert_eq!(backend.repo.list().await.unwrap().len(), 1, "{}", backend.name);
    }
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    for backend in backends() {
        let ghost = id("never-saved");
        backend.repo.delete(&ghost).await.unwrap();
        backend.repo.delete(&ghost).await.unwrap();
        assert!(!backend.repo.exists(&ghost).await.unwrap(), "{}", backend.name);
    }
}

#[tokio::test]
async fn test_list_is_complete_and_newest_first() {
    for backend in backends() {
        let a = record("a", "A", "2024-01-01T00:00:00Z");
        let b = record("b", "B", "2024-03-01T00:00:00Z");
        let c = record("c", "C", "2024-02-01T00:00:00Z");
        // Same instant as `a`, different spelling
        let d = record("d", "D", "2024-01-01T01:00:00+01:00");

        for rec in [&a, &b, &c, &d] {
            backend.repo.save(&rec.id, rec).await.unwrap();
        }

        let ids: Vec<String> = backend
            .repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();

        assert_eq!(ids, vec!["b", "c", "a", "d"], "{}", backend.name);
    }
}

#[tokio::test]
async fn test_list_orders_timestamps_without_offset() {
    for backend in backends() {
        let a = record("a", "A", "2024-01-01T00:00:00");
        let b = record("b", "B", "2024-03-01T00:00:00");
        let c = record("c", "C", "2024-02-01T00:00Z");

        for rec in [&a, &b, &c] {
            backend.repo.save(&rec.id, rec).await.unwrap();
        }

        let ids: Vec<String> = backend
            .repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();

        assert_eq!(ids, vec!["b", "c", "a"], "{}", backend.name);
    }
}

#[tokio::test]
async fn test_list_drops_deleted_records() {
    for backend in backends() {
        let keep = record("keep", "Keep", "2024-01-01T00:00:00Z");
        let gone = record("gone", "Drop", "2024-02-01T00:00:00Z");
        backend.repo.save(&keep.id, &keep).await.unwrap();
        backend.repo.save(&gone.id, &gone).await.unwrap();

        backend.repo.delete(&gone.id).await.unwrap();

        assert_eq!(backend.repo.list().await.unwrap(), vec![keep], "{}", backend.name);
    }
}

#[tokio::test]
async fn test_unparseable_created_at_sorts_last() {
    for backend in backends() {
        let odd = record("odd", "Odd", "not a date");
        let dated = record("dated", "Dated", "1999-12-31T23:59:59Z");

        backend.repo.save(&odd.id, &odd).await.unwrap();
        backend.repo.save(&dated.id, &dated).await.unwrap();

        let listed = backend.repo.list().await.unwrap();
        assert_eq!(listed, vec![dated, odd], "{}", backend.name);
    }
}

#[tokio::test]
async fn test_exists_matches_get() {
    for backend in backends() {
        let rec = record("present", "Present", "2024-01-01T00:00:00Z");
        backend.repo.save(&rec.id, &rec).await.unwrap();

        for candidate in ["present", "absent"] {
            let candidate = id(candidate);
            let exists = backend.repo.exists(&candidate).await.unwrap();
            let found = backend.repo.get(&candidate).await.unwrap().is_some();
            assert_eq!(exists, found, "{} / {}", backend.name, candidate);
        }
    }
}

#[tokio::test]
async fn test_concurrent_saves_are_all_listed() {
    for backend in backends() {
        let mut tasks = tokio::task::JoinSet::new();

        for i in 0..20 {
            let repo = Arc::clone(&backend.repo);
            tasks.spawn(async move {
                let rec = record(
                    &format!("item-{}", i),
                    "Concurrent",
                    &format!("2024-01-01T00:00:{:02}Z", i),
                );
                repo.save(&rec.id, &rec).await
            });
        }

        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let listed = backend.repo.list().await.unwrap();
        assert_eq!(listed.len(), 20, "{}", backend.name);
        assert_eq!(listed[0].id.as_str(), "item-19", "{}", backend.name);
    }
}

#[tokio::test]
async fn test_empty_title_is_rejected() {
    for backend in backends() {
        let rec = record("untitled", "  ", "2024-01-01T00:00:00Z");
        assert!(backend.repo.save(&rec.id, &rec).await.is_err(), "{}", backend.name);
        assert!(!backend.repo.exists(&rec.id).await.unwrap(), "{}", backend.name);
    }
}

#[tokio::test]
async fn test_filesystem_skips_malformed_files() {
    let dir = TempDir::new().unwrap();
    let repo = FilesystemRepository::open(dir.path()).unwrap();

    let good = record("good", "Good", "2024-01-01T00:00:00Z");
    repo.save(&good.id, &good).await.unwrap();
    std::fs::write(dir.path().join("truncated.json"), "{\"id\": \"trunc").unwrap();
    std::fs::write(dir.path().join("wrong-shape.json"), "[1, 2, 3]").unwrap();

    assert_eq!(repo.list().await.unwrap(), vec![good]);
    assert!(repo.get(&id("truncated")).await.is_err());
}

#[tokio::test]
async fn test_object_store_skips_malformed_blobs() {
    let blobs = Arc::new(ObjectStoreBlobs::in_memory());
    let repo = ObjectStoreRepository::new("h5p-content", blobs.clone()).unwrap();

    let good = record("good", "Good", "2024-01-01T00:00:00Z");
    repo.save(&good.id, &good).await.unwrap();
    blobs
        .put("truncated.json", b"{\"id\": \"trunc".to_vec(), JSON_CONTENT_TYPE)
        .await
        .unwrap();
    blobs
        .put("nested/deeper.json", b"{}".to_vec(), JSON_CONTENT_TYPE)
        .await
        .unwrap();

    assert_eq!(repo.list().await.unwrap(), vec![good]);
    assert!(repo.get(&id("truncated")).await.is_err());
}

#[tokio::test]
async fn test_filesystem_persists_across_instances() {
    let dir = TempDir::new().unwrap();
    let rec = record("durable", "Durable", "2024-01-01T00:00:00Z");

    FilesystemRepository::open(dir.path())
        .unwrap()
        .save(&rec.id, &rec)
        .await
        .unwrap();

    let reopened = FilesystemRepository::open(dir.path()).unwrap();
    assert_eq!(reopened.get(&rec.id).await.unwrap(), Some(rec));
}
