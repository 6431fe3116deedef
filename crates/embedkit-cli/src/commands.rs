//! Command implementations.
//!
//! Every command prints pretty JSON on stdout; logs go to stderr.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use embedkit_embeddings::{EngineConfig, EngineManager};
use embedkit_search::{cosine_similarity, EmbeddingService, InMemoryStore, RecordMatch, StoredEmbedding};
use embedkit_types::{LoaderStrategy, ModelCategory, Settings};

use crate::cli::{Cli, Commands};

/// One record of a search corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub id: String,
    pub text: String,
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings)?;

    match cli.command {
        Commands::Models { category } => handle_models(&settings, category),
        Commands::Detect => handle_detect(&settings),
        Commands::Recommend { category } => handle_recommend(&settings, category),
        Commands::Embed {
            text,
            model,
            strategy,
        } => handle_embed(&settings, &text, model, strategy).await,
        Commands::Similarity { a, b } => handle_similarity(&a, &b),
        Commands::Search {
            query,
            corpus,
            limit,
            min_similarity,
            model,
            strategy,
        } => {
            handle_search(
                &settings,
                &query,
                &corpus,
                limit,
                min_similarity,
                model,
                strategy,
            )
            .await
        }
    }
}

/// Load layered settings, then apply the CLI log level override.
pub fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_models(settings: &Settings, category: Option<ModelCategory>) -> Result<()> {
    let manager = EngineManager::from_settings(settings);
    print_json(&manager.list_models(category))
}

fn handle_detect(settings: &Settings) -> Result<()> {
    let manager = EngineManager::from_settings(settings);
    print_json(manager.capabilities())
}

fn handle_recommend(settings: &Settings, category: Option<ModelCategory>) -> Result<()> {
    let manager = EngineManager::from_settings(settings);
    let ranked: Vec<serde_json::Value> = manager
        .recommender()
        .rank(category, manager.capabilities())
        .into_iter()
        .map(|(model, score)| serde_json::json!({ "model": model, "score": score }))
        .collect();
    if ranked.is_empty() {
        info!("No compatible model for this device");
    }
    print_json(&ranked)
}

/// Engine config from settings, with optional CLI overrides.
pub fn engine_config(
    settings: &Settings,
    model: Option<String>,
    strategy: Option<LoaderStrategy>,
) -> EngineConfig {
    let mut config = EngineConfig::from_settings(&settings.engine);
    if model.is_some() {
        config.model_id = model;
    }
    if let Some(strategy) = strategy {
        config.strategy = strategy;
    }
    config
}

async fn handle_embed(
    settings: &Settings,
    text: &str,
    model: Option<String>,
    strategy: Option<LoaderStrategy>,
) -> Result<()> {
    let manager = EngineManager::from_settings(settings);
    let descriptor = manager
        .initialize(engine_config(settings, model, strategy))
        .await
        .context("Failed to initialize embedding engine")?;
    let embedding = manager
        .generate_embedding(text)
        .await
        .context("Failed to generate embedding")?;
    let status = manager.status().await;
    manager.dispose().await?;

    print_json(&serde_json::json!({
        "model": descriptor.id,
        "engine": status.engine,
        "dimension": embedding.dimension,
        "vector": embedding.vector,
    }))
}

/// Parse "0.1, 0.2, -0.3" into a vector. One trailing comma is allowed.
pub fn parse_vector(input: &str) -> Result<Vec<f32>> {
    let trimmed = input.trim();
    let body = trimmed.strip_suffix(',').unwrap_or(trimmed);
    body.split(',')
        .map(str::trim)
        .enumerate()
        .map(|(i, s)| {
            if s.is_empty() {
                bail!("Empty vector component at position {i}");
            }
            s.parse::<f32>()
                .with_context(|| format!("Invalid vector component: {s:?}"))
        })
        .collect()
}

fn handle_similarity(a: &str, b: &str) -> Result<()> {
    let a = parse_vector(a)?;
    let b = parse_vector(b)?;
    let similarity = cosine_similarity(&a, &b)?;
    print_json(&serde_json::json!({ "similarity": similarity }))
}

/// Read a JSON array of corpus records.
pub fn load_corpus(path: &Path) -> Result<Vec<CorpusRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus {}", path.display()))?;
    let records: Vec<CorpusRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse corpus {}", path.display()))?;
    if records.is_empty() {
        bail!("Corpus {} has no records", path.display());
    }
    Ok(records)
}

/// Embed every record and add it to the service's store.
pub async fn index_corpus(
    service: &EmbeddingService<InMemoryStore<CorpusRecord>>,
    records: Vec<CorpusRecord>,
) -> Result<()> {
    let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
    let embeddings = service
        .manager()
        .generate_batch(&texts)
        .await
        .context("Failed to embed corpus")?;

    let store = service.store();
    for (record, embedding) in records.into_iter().zip(embeddings) {
        store
            .add_embedding(StoredEmbedding::new(
                record.id.clone(),
                record.id.clone(),
                embedding.into_values(),
            ))
            .await;
        store.insert_record(record.id.clone(), record).await;
    }
    debug!(records = store.record_count().await, "Corpus indexed");
    Ok(())
}

/// Index `records`, then run a semantic search over them.
pub async fn search_corpus(
    service: &EmbeddingService<InMemoryStore<CorpusRecord>>,
    records: Vec<CorpusRecord>,
    query: &str,
    limit: usize,
    min_similarity: f32,
) -> Result<Vec<RecordMatch<CorpusRecord>>> {
    index_corpus(service, records).await?;
    let matches = service
        .semantic_search(query, limit, min_similarity)
        .await
        .context("Semantic search failed")?;
    Ok(matches)
}

async fn handle_search(
    settings: &Settings,
    query: &str,
    corpus: &Path,
    limit: Option<usize>,
    min_similarity: Option<f32>,
    model: Option<String>,
    strategy: Option<LoaderStrategy>,
) -> Result<()> {
    let records = load_corpus(corpus)?;
    info!(records = records.len(), corpus = ?corpus, "Loaded corpus");

    let service = EmbeddingService::from_settings(settings, Arc::new(InMemoryStore::new()));
    service
        .initialize_engine(engine_config(settings, model, strategy))
        .await
        .context("Failed to initialize embedding engine")?;

    let matches = search_corpus(
        &service,
        records,
        query,
        limit.unwrap_or(settings.search.default_limit),
        min_similarity.unwrap_or(settings.search.min_similarity),
    )
    .await?;
    service.dispose().await?;

    let out: Vec<serde_json::Value> = matches
        .into_iter()
        .map(|m| {
            serde_json::json!({
                "id": m.record.id,
                "text": m.record.text,
                "similarity": m.similarity,
            })
        })
        .collect();
    print_json(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedkit_embeddings::MockLoaderFactory;
    use tempfile::TempDir;

    fn record(id: &str, text: &str) -> CorpusRecord {
        CorpusRecord {
            id: id.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("0.5, -1,2").unwrap(), vec![0.5, -1.0, 2.0]);
        assert_eq!(parse_vector("1,").unwrap(), vec![1.0]);
        assert!(parse_vector("1,abc").is_err());
        assert!(parse_vector("1,,2").is_err());
        assert!(parse_vector(",1").is_err());
        assert!(parse_vector("1,,").is_err());
    }

    #[test]
    fn test_load_corpus() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corpus.json");
        std::fs::write(
            &path,
            r#"[{"id": "a", "text": "first"}, {"id": "b", "text": "second"}]"#,
        )
        .unwrap();
        let records = load_corpus(&path).unwrap();
        assert_eq!(records, vec![record("a", "first"), record("b", "second")]);

        std::fs::write(&path, "[]").unwrap();
        assert!(load_corpus(&path).is_err());
        assert!(load_corpus(&temp.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_engine_config_overrides() {
        let settings = Settings::default();
        let config = engine_config(
            &settings,
            Some("bge-small-en-v1.5".to_string()),
            Some(LoaderStrategy::PrimaryOnly),
        );
        assert_eq!(config.model_id.as_deref(), Some("bge-small-en-v1.5"));
        assert_eq!(config.strategy, LoaderStrategy::PrimaryOnly);

        let config = engine_config(&settings, None, None);
        assert_eq!(config.model_id, settings.engine.model_id);
        assert_eq!(config.strategy, settings.engine.strategy);
    }

    #[tokio::test]
    async fn test_search_corpus_with_mock_engine() {
        let manager = EngineManager::new(Arc::new(MockLoaderFactory::new()));
        let service = EmbeddingService::new(Arc::new(manager), Arc::new(InMemoryStore::new()));
        service
            .initialize_engine(EngineConfig::for_model("all-minilm-l6-v2"))
            .await
            .unwrap();

        let records = vec![
            record("borrow", "the borrow checker enforces ownership"),
            record("soup", "simmer the onion soup slowly"),
        ];
        let matches = search_corpus(&service, records, "borrow checker ownership", 5, 0.5)
            .await
            .unwrap();

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record.id, "borrow");
        assert_eq!(service.store().len().await, 2);
    }
}
