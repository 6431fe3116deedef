//! End-to-end semantic search tests for embedkit.
//!
//! Notes are chunked by sentence, embedded with the active engine, stored,
//! and searched through the EmbeddingService facade.
//!
//! The ignored test needs the all-MiniLM-L6-v2 model (~90MB download on
//! first run). Run with:
//!   cargo test -p e2e-tests --test semantic_search_test -- --ignored --nocapture

use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{ingest_notes, topic_notes, Note, TestHarness};
use embedkit_embeddings::{EngineConfig, ErrorKind};
use embedkit_search::{EmbeddingService, InMemoryStore, SearchError};
use embedkit_types::{LoaderStrategy, Settings};

#[tokio::test]
async fn test_semantic_search_ranks_matching_note_first() {
    let harness = TestHarness::new();
    harness.start_default().await;
    ingest_notes(&harness, &topic_notes()).await;

    let results = harness
        .service
        .semantic_search("The borrow checker enforces ownership rules", 3, 0.3)
        .await
        .expect("search failed");

    assert!(!results.is_empty());
    assert!(results.len() <= 3);
    assert_eq!(results[0].record.id, "rust-1");
    assert!(results.iter().all(|m| m.similarity >= 0.3));
    assert!(results
        .windows(2)
        .all(|w| w[0].similarity >= w[1].similarity));
}

#[tokio::test]
async fn test_each_record_returned_once() {
    let harness = TestHarness::new();
    harness.start_default().await;
    ingest_notes(&harness, &topic_notes()).await;

    let results = harness
        .service
        .semantic_search("pasta dough eggs", 10, 0.0)
        .await
        .expect("search failed");

    let mut ids: Vec<&str> = results.iter().map(|m| m.record.id.as_str()).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert_eq!(total, topic_notes().len());
}

#[tokio::test]
async fn test_orphaned_vectors_are_skipped() {
    let harness = TestHarness::new();
    harness.start_default().await;
    ingest_notes(&harness, &topic_notes()).await;
    harness.store().remove_record("rust-1").await;

    let results = harness
        .service
        .semantic_search("The borrow checker enforces ownership rules", 5, 0.1)
        .await
        .expect("search failed");

    assert!(results.iter().all(|m| m.record.id != "rust-1"));
}

#[tokio::test]
async fn test_search_similar_finds_exact_chunk() {
    let harness = TestHarness::new();
    harness.start_default().await;
    ingest_notes(&harness, &topic_notes()).await;

    let query = harness
        .service
        .generate_embedding("Knead the dough until smooth")
        .await
        .expect("embed failed");
    let results = harness
        .service
        .search_similar(&query.vector, 3, 0.9)
        .await
        .expect("search failed");

    assert_eq!(results[0].id, "pasta-2#1");
    assert!((results[0].similarity - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_empty_store_returns_nothing() {
    let harness = TestHarness::new();
    harness.start_default().await;

    let results = harness
        .service
        .semantic_search("anything at all", 5, 0.0)
        .await
        .expect("search failed");
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_invalid_arguments_are_validation_errors() {
    let harness = TestHarness::new();
    harness.start_default().await;

    let err = harness
        .service
        .semantic_search("query", 0, 0.5)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = harness
        .service
        .search_similar(&[0.5, f32::NAN], 5, 0.5)
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::NonFiniteValue { index: 1 }));
}

#[tokio::test]
async fn test_search_bootstraps_engine_lazily() {
    let harness = TestHarness::new();
    harness
        .store()
        .insert_record("n", Note::new("n", "Title", "Body."))
        .await;

    // No explicit initialize; the query embedding triggers bootstrap
    let results = harness
        .service
        .semantic_search("lazy query", 5, 0.0)
        .await
        .expect("search failed");
    assert!(results.is_empty());
    assert!(harness.service.current_model().await.is_some());
}

#[tokio::test]
#[ignore = "requires model download (~90MB on first run)"]
async fn test_real_model_semantic_ranking() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.engine.cache_dir = temp.path().to_string_lossy().to_string();
    settings.engine.strategy = LoaderStrategy::FallbackOnly;

    let service: EmbeddingService<InMemoryStore<Note>> =
        EmbeddingService::from_settings(&settings, Arc::new(InMemoryStore::new()));
    service
        .initialize_engine(EngineConfig::for_model("all-minilm-l6-v2"))
        .await
        .expect("Failed to load model");

    for note in topic_notes() {
        let chunks = note.chunks();
        let embeddings = service.manager().generate_batch(&chunks).await.unwrap();
        for (i, e) in embeddings.into_iter().enumerate() {
            service
                .store()
                .add_embedding(embedkit_search::StoredEmbedding::new(
                    format!("{}#{}", note.id, i),
                    note.id.as_str(),
                    e.into_values(),
                ))
                .await;
        }
        service.store().insert_record(note.id.clone(), note).await;
    }

    let results = service
        .semantic_search("How does Rust prevent memory bugs?", 2, 0.0)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|m| m.record.id.starts_with("rust")));
}
