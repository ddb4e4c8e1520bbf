//! End-to-end tests of indexing and question answering with in-process providers

mod common;

use college_rag::error::Error;
use college_rag::generation::{PromptBuilder, NO_DOCUMENTS_MARKER};
use college_rag::ingestion::Indexer;
use college_rag::retrieval::VectorIndex;
use college_rag::{RagConfig, RagPipeline, RequestStage};
use common::{test_config, write_corpus, HashEmbedder, ScriptedLlm, DIMENSIONS};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

struct Harness {
    config: RagConfig,
    embedder: Arc<HashEmbedder>,
    llm: Arc<ScriptedLlm>,
    index: Arc<VectorIndex>,
    pipeline: RagPipeline,
}

impl Harness {
    fn new(root: &Path, llm: ScriptedLlm) -> Self {
        Self::with_config(test_config(root), llm)
    }

    fn with_config(config: RagConfig, llm: ScriptedLlm) -> Self {
        let embedder = Arc::new(HashEmbedder::new());
        let llm = Arc::new(llm);
        let index = Arc::new(
            VectorIndex::open(
                config.vector_db.index_path(),
                DIMENSIONS,
                config.embeddings.model.clone(),
            )
            .unwrap(),
        );
        let pipeline = RagPipeline::builder()
            .config(config.clone())
            .embedder(embedder.clone())
            .llm(llm.clone())
            .index(Arc::clone(&index))
            .prompts(PromptBuilder::new("You answer questions about the college."))
            .build()
            .unwrap();

        Self {
            config,
            embedder,
            llm,
            index,
            pipeline,
        }
    }

    fn indexer(&self) -> Indexer {
        Indexer::new(&self.config, self.embedder.clone(), Arc::clone(&self.index)).unwrap()
    }
}

#[tokio::test]
async fn test_btech_fee_question_cites_fee_document() {
    let temp = tempfile::tempdir().unwrap();
    write_corpus(temp.path());
    let harness = Harness::new(temp.path(), ScriptedLlm::replying("The B.Tech fee is 1,20,000 per year."));

    let report = harness.indexer().run().await.unwrap();
    assert_eq!(report.documents_loaded, 3);
    assert_eq!(report.unique_sources, 3);

    let answer = harness
        .pipeline
        .ask("What is the B.Tech fee?", Some("abc".to_string()))
        .await
        .unwrap();

    assert_eq!(answer.answer, "The B.Tech fee is 1,20,000 per year.");
    assert_eq!(answer.conversation_id.as_deref(), Some("abc"));
    assert_eq!(answer.sources[0].source, "data/admissions/fees.txt");
    assert!(answer.sources.len() <= 3);
    for pair in answer.sources.windows(2) {
        assert!(pair[0].relevance_score >= pair[1].relevance_score);
    }
    assert!(answer
        .sources
        .iter()
        .all(|s| (0.0..=1.0).contains(&s.relevance_score)));

    let prompt = harness.llm.last_prompt().unwrap();
    assert!(prompt.starts_with("You answer questions about the college."));
    assert!(prompt.contains("[Source 1: data/admissions/fees.txt]"));
    assert!(prompt.contains("USER QUESTION: What is the B.Tech fee?"));
    assert!(prompt.ends_with("ANSWER:"));
}

#[tokio::test]
async fn test_single_fee_document_is_the_only_source() {
    let temp = tempfile::tempdir().unwrap();
    let admissions = temp.path().join("data/admissions");
    std::fs::create_dir_all(&admissions).unwrap();
    std::fs::write(admissions.join("fees.txt"), "The fee for B.Tech is 150000.").unwrap();
    let harness = Harness::new(temp.path(), ScriptedLlm::replying("The B.Tech fee is 150000."));
    harness.indexer().run().await.unwrap();

    let answer = harness.pipeline.ask("What is the B.Tech fee?", None).await.unwrap();

    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].source, "data/admissions/fees.txt");
    assert!(answer.sources[0].relevance_score > 0.8);
    assert_eq!(answer.sources[0].content, "The fee for B.Tech is 150000.");
    assert!(harness
        .llm
        .last_prompt()
        .unwrap()
        .contains("The fee for B.Tech is 150000."));
}

#[tokio::test]
async fn test_successful_request_visits_every_stage() {
    let temp = tempfile::tempdir().unwrap();
    write_corpus(temp.path());
    let harness = Harness::new(temp.path(), ScriptedLlm::replying("Rooms cost 60,000."));
    harness.indexer().run().await.unwrap();

    let outcome = harness.pipeline.process("How much is the hostel?", None).await;

    assert!(outcome.result.is_ok());
    assert_eq!(
        outcome.stages,
        vec![
            RequestStage::Idle,
            RequestStage::Embedding,
            RequestStage::Retrieving,
            RequestStage::PromptBuilding,
            RequestStage::Generating,
            RequestStage::Answered,
        ]
    );
    assert!(outcome.failed_at().is_none());
}

#[tokio::test]
async fn test_question_before_indexing_is_not_initialized() {
    let temp = tempfile::tempdir().unwrap();
    let harness = Harness::new(temp.path(), ScriptedLlm::replying("unused"));

    let outcome = harness.pipeline.process("What courses are offered?", None).await;

    assert!(matches!(outcome.result, Err(Error::NotInitialized)));
    assert_eq!(outcome.failed_at(), Some(RequestStage::Idle));
    assert_eq!(harness.llm.calls(), 0);
    assert_eq!(harness.embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_model_fails_in_generating_stage() {
    let temp = tempfile::tempdir().unwrap();
    write_corpus(temp.path());
    let harness = Harness::new(temp.path(), ScriptedLlm::unreachable());
    harness.indexer().run().await.unwrap();

    let outcome = harness.pipeline.process("What is the B.Tech fee?", None).await;

    assert!(matches!(outcome.result, Err(Error::GenerationUnavailable(_))));
    assert_eq!(outcome.failed_at(), Some(RequestStage::Generating));
    assert_eq!(outcome.stages.last(), Some(&RequestStage::Failed));
    // One attempt plus one retry
    assert_eq!(harness.llm.calls(), 2);
}

#[tokio::test]
async fn test_embedding_outage_fails_in_embedding_stage() {
    let temp = tempfile::tempdir().unwrap();
    write_corpus(temp.path());
    let harness = Harness::new(temp.path(), ScriptedLlm::replying("unused"));
    harness.indexer().run().await.unwrap();

    harness.embedder.down.store(true, Ordering::SeqCst);
    let outcome = harness.pipeline.process("What is the B.Tech fee?", None).await;

    assert!(matches!(outcome.result, Err(Error::EmbeddingUnavailable(_))));
    assert_eq!(outcome.failed_at(), Some(RequestStage::Embedding));
    assert_eq!(harness.llm.calls(), 0);
}

#[tokio::test]
async fn test_invalid_questions_are_rejected_before_any_call() {
    let temp = tempfile::tempdir().unwrap();
    write_corpus(temp.path());
    let harness = Harness::new(temp.path(), ScriptedLlm::replying("unused"));
    harness.indexer().run().await.unwrap();
    let embed_calls = harness.embedder.calls.load(Ordering::SeqCst);

    let empty = harness.pipeline.process("   ", None).await;
    assert!(matches!(empty.result, Err(Error::InvalidRequest(_))));
    assert_eq!(empty.stages, vec![RequestStage::Idle, RequestStage::Failed]);

    let long = "why ".repeat(200);
    assert!(matches!(
        harness.pipeline.ask(&long, None).await,
        Err(Error::InvalidRequest(_))
    ));

    assert_eq!(harness.embedder.calls.load(Ordering::SeqCst), embed_calls);
    assert_eq!(harness.llm.calls(), 0);
}

#[tokio::test]
async fn test_empty_index_still_generates_with_marker() {
    let temp = tempfile::tempdir().unwrap();
    let harness = Harness::new(
        temp.path(),
        ScriptedLlm::replying("I don't have information about that in the college documents"),
    );
    harness.index.build(Vec::new()).unwrap();

    let answer = harness.pipeline.ask("Who is the principal?", None).await.unwrap();

    assert!(answer.sources.is_empty());
    assert_eq!(harness.llm.calls(), 1);
    assert!(harness.llm.last_prompt().unwrap().contains(NO_DOCUMENTS_MARKER));
}

#[tokio::test]
async fn test_answers_are_deterministic_for_a_fixed_index() {
    let temp = tempfile::tempdir().unwrap();
    write_corpus(temp.path());
    let harness = Harness::new(temp.path(), ScriptedLlm::replying("Fees are listed per year."));
    harness.indexer().run().await.unwrap();

    let first = harness.pipeline.ask("What is the B.Tech fee?", None).await.unwrap();
    let second = harness.pipeline.ask("What is the B.Tech fee?", None).await.unwrap();

    assert_eq!(first.sources, second.sources);
    let prompts = harness.llm.prompts.lock();
    assert_eq!(prompts[0], prompts[1]);
}

#[tokio::test]
async fn test_top_k_bounds_sources() {
    let temp = tempfile::tempdir().unwrap();
    write_corpus(temp.path());
    let mut config = test_config(temp.path());
    config.retrieval.top_k = 1;
    let harness = Harness::with_config(config, ScriptedLlm::replying("ok"));
    harness.indexer().run().await.unwrap();

    let answer = harness.pipeline.ask("What is the B.Tech fee?", None).await.unwrap();
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(harness.pipeline.top_k(), 1);
}

#[tokio::test]
async fn test_reindex_publishes_new_generation() {
    let temp = tempfile::tempdir().unwrap();
    write_corpus(temp.path());
    let harness = Harness::new(temp.path(), ScriptedLlm::replying("ok"));
    let indexer = harness.indexer();

    indexer.run().await.unwrap();
    std::fs::write(
        temp.path().join("data/admissions/scholarships.txt"),
        "Merit scholarships waive 50 percent of the B.Tech tuition fee.",
    )
    .unwrap();
    let report = indexer.run().await.unwrap();

    assert_eq!(report.generation, 2);
    assert_eq!(report.documents_loaded, 4);
    assert_eq!(harness.index.generation(), Some(2));

    let answer = harness
        .pipeline
        .ask("Do merit scholarships waive the tuition fee?", None).await.unwrap();
    assert!(answer
        .sources
        .iter()
        .any(|s| s.source == "data/admissions/scholarships.txt"));
}

#[tokio::test]
async fn test_index_survives_restart() {
    let temp = tempfile::tempdir().unwrap();
    write_corpus(temp.path());
    {
        let harness = Harness::new(temp.path(), ScriptedLlm::replying("ok"));
        harness.indexer().run().await.unwrap();
    }

    let restarted = Harness::new(temp.path(), ScriptedLlm::replying("ok"));
    assert!(restarted.index.is_initialized());
    let answer = restarted.pipeline.ask("What is the B.Tech fee?", None).await.unwrap();
    assert_eq!(answer.sources[0].source, "data/admissions/fees.txt");
}

#[test]
fn test_builder_rejects_mismatched_embedder() {
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config(temp.path());
    config.embeddings.dimensions = 768;

    let result = RagPipeline::builder()
        .config(config)
        .embedder(Arc::new(HashEmbedder::new()))
        .llm(Arc::new(ScriptedLlm::replying("ok")))
        .build();

    match result {
        Err(err) => assert!(matches!(err, Error::DimensionMismatch { expected: 768, actual: 64 })),
        Ok(_) => panic!("expected a dimension mismatch"),
    }
}
