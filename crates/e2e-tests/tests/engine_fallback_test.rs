//! End-to-end engine selection and lifecycle tests.
//!
//! Mock loaders stand in for the native and portable runtimes so each
//! failure mode can be forced.

use pretty_assertions::assert_eq;

use e2e_tests::{ingest_notes, topic_notes, TestHarness};
use embedkit_embeddings::{
    EmbeddingError, EngineConfig, EngineState, ErrorKind, LoaderKind, MockBehavior,
    MockLoaderFactory, DEFAULT_MODEL_ID,
};
use embedkit_search::SearchError;
use embedkit_types::LoaderStrategy;

#[tokio::test]
async fn test_installed_model_runs_on_native_engine() {
    let harness = TestHarness::new();
    harness.install_local_model(DEFAULT_MODEL_ID);
    harness.start_default().await;

    let status = harness.service.status().await;
    assert_eq!(status.state, EngineState::Ready);
    assert_eq!(status.engine, Some(LoaderKind::Native));
    assert_eq!(harness.factory.stats().created(LoaderKind::Portable), 0);
}

#[tokio::test]
async fn test_native_failure_falls_back_and_search_still_works() {
    let harness =
        TestHarness::with_factory(MockLoaderFactory::new().with_native(MockBehavior::failing()));
    harness.install_local_model(DEFAULT_MODEL_ID);
    harness.start_default().await;

    assert_eq!(harness.service.status().await.engine, Some(LoaderKind::Portable));

    ingest_notes(&harness, &topic_notes()).await;
    let results = harness
        .service
        .semantic_search("Neural networks learn patterns through layers", 1, 0.5)
        .await
        .expect("search failed");
    assert_eq!(results[0].record.id, "ml-1");
}

#[tokio::test]
async fn test_no_usable_engine_surfaces_through_search() {
    let harness = TestHarness::with_factory(
        MockLoaderFactory::new()
            .with_native(MockBehavior::unavailable())
            .with_portable(MockBehavior::failing()),
    );

    let err = harness
        .service
        .semantic_search("query text", 5, 0.5)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Engine);
    assert!(matches!(
        err,
        SearchError::Embedding(EmbeddingError::NoUsableEngine { .. })
    ));
    assert_eq!(harness.service.status().await.state, EngineState::Uninitialized);
}

#[tokio::test]
async fn test_primary_only_does_not_fall_back() {
    let harness =
        TestHarness::with_factory(MockLoaderFactory::new().with_native(MockBehavior::unavailable()));
    harness.install_local_model(DEFAULT_MODEL_ID);

    let err = harness
        .service
        .initialize_engine(
            EngineConfig::for_model(DEFAULT_MODEL_ID).with_strategy(LoaderStrategy::PrimaryOnly),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EmbeddingError::EngineUnavailable(LoaderKind::Native)));
    assert_eq!(harness.factory.stats().created(LoaderKind::Portable), 0);
}

#[tokio::test]
async fn test_failed_switch_then_recovery() {
    let harness = TestHarness::with_factory(
        MockLoaderFactory::new().with_portable(MockBehavior::failing_for("bge-large-en-v1.5")),
    );
    harness.start_default().await;

    let err = harness
        .service
        .switch_model("bge-large-en-v1.5")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Engine);
    assert_eq!(harness.service.status().await.state, EngineState::Uninitialized);
    assert!(harness.service.current_model().await.is_none());

    harness
        .service
        .switch_model("bge-small-en-v1.5")
        .await
        .expect("switch failed");
    let out = harness
        .service
        .generate_embedding("back in business")
        .await
        .expect("embed failed");
    assert_eq!(out.dimension, 384);
    assert!(harness.factory.stats().max_live() <= 1);
}

#[tokio::test]
async fn test_switch_changes_output_dimension() {
    let harness = TestHarness::new();
    harness.start_default().await;
    assert_eq!(
        harness.service.generate_embedding("hello").await.unwrap().dimension,
        384
    );

    harness.service.switch_model("bge-large-en-v1.5").await.unwrap();
    assert_eq!(
        harness.service.generate_embedding("hello").await.unwrap().dimension,
        1024
    );
    assert_eq!(harness.factory.stats().live(), 1);
}

#[tokio::test]
async fn test_unknown_model_rejected() {
    let harness = TestHarness::new();
    let err = harness
        .service
        .initialize_engine(EngineConfig::for_model("no-such-model"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(matches!(err, EmbeddingError::UnknownModel(_)));
}

#[tokio::test]
async fn test_dispose_releases_session() {
    let harness = TestHarness::new();
    harness.start_default().await;
    harness.service.dispose().await.unwrap();

    assert_eq!(harness.service.status().await.state, EngineState::Uninitialized);
    assert_eq!(harness.factory.stats().live(), 0);
}
