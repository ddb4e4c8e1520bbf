//! Offline indexing binary
//!
//! Run with: cargo run -p college-rag --bin college-rag-index

use clap::Parser;
use college_rag::{
    config::RagConfig,
    ingestion::Indexer,
    providers::{EmbeddingProvider, OllamaProvider},
    retrieval::VectorIndex,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "college-rag-index")]
#[command(about = "Build the vector index from the college documents", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "college_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref())?;

    let (embedder, _llm) = OllamaProvider::new(&config)?.split();
    if !embedder.health_check().await? {
        anyhow::bail!(
            "Ollama is not reachable at {}. Start it with 'ollama serve' and pull {}",
            config.llm.base_url,
            config.embeddings.model
        );
    }

    let index = Arc::new(VectorIndex::open(
        config.vector_db.index_path(),
        config.embeddings.dimensions,
        config.embeddings.model.clone(),
    )?);
    let indexer = Indexer::new(&config, Arc::new(embedder), index)?;

    let report = indexer.run().await?;

    println!("\nIndexing complete");
    println!("  Documents loaded: {}", report.documents_loaded);
    println!("  Chunks indexed:   {}", report.chunks_indexed);
    println!("  Unique sources:   {}", report.unique_sources);
    println!("  Generation:       {}", report.generation);
    println!("  Duration:         {} ms", report.duration_ms);
    if !report.skipped.is_empty() {
        println!("\nSkipped files:");
        for skipped in &report.skipped {
            println!("  - {}: {}", skipped.path, skipped.reason);
        }
    }

    Ok(())
}
