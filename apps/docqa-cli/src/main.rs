use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use docqa_agent::{ChatCompletionsGenerator, DocumentQa};
use docqa_core::config::{Config, Settings};
use docqa_core::traits::{Embedder, Generator};
use docqa_core::Chunker;
use docqa_embed::get_default_embedder;
use docqa_vector::{FlatIndex, IndexFiles};

mod ingest;

/// Question answering over your own documents
#[derive(Parser)]
#[command(name = "docqa", version = env!("CARGO_PKG_VERSION"), about = "Index documents and ask questions about them")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed and persist one text file
    Index {
        #[arg(long)]
        doc_id: u64,
        #[arg(long)]
        owner: u64,
        file: PathBuf,
    },
    /// Index every `<doc_id>.txt` file under a directory
    Ingest {
        dir: PathBuf,
        #[arg(long)]
        owner: u64,
    },
    /// Nearest chunks for a query
    Search {
        query: String,
        /// Defaults to agent.top_k
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        #[arg(long)]
        owner: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// Answer a question, citing indexed chunks
    Ask {
        query: String,
        #[arg(long)]
        owner: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// Indexed chunk and document counts
    Status,
    /// Drop vector records left behind by an interrupted save
    Repair,
}

/// Stand-in for commands that never generate text.
struct NoGeneration;

impl Generator for NoGeneration {
    fn complete(&self, _prompt: &str) -> anyhow::Result<String> { anyhow::bail!("text generation is not available for this command") }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let settings = Config::load().and_then(|c| c.settings()).map_err(|e| { eprintln!("Error loading config: {}", e); e })?;

    match cli.command {
        Commands::Index { doc_id, owner, file } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let qa = build(&settings, Box::new(NoGeneration))?;
            let outcome = qa.index(doc_id, owner, &text)?;
            if outcome.indexed { println!("Indexed document {} ({} chunks)", doc_id, outcome.chunks); }
            else { println!("Document {} is empty; nothing indexed", doc_id); }
        }
        Commands::Ingest { dir, owner } => {
            let docs = ingest::collect_documents(&dir, owner)?;
            println!("Ingesting {} documents from {}", docs.len(), dir.display());
            let qa = build(&settings, Box::new(NoGeneration))?;
            let pb = ProgressBar::new(docs.len() as u64);
            pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs {msg}")?.progress_chars("#>-"));
            let report = qa.index_many_with(&docs, |d| { pb.set_message(format!("doc {}", d.doc_id)); pb.inc(1); })?;
            pb.finish_and_clear();
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Search { query, top_k, owner, json } => {
            let qa = build(&settings, Box::new(NoGeneration))?;
            let results = qa.search(&query, top_k.unwrap_or(settings.agent.top_k), owner)?;
            if json { println!("{}", serde_json::to_string_pretty(&results)?); return Ok(()); }
            println!("Found {} results for: \"{}\"", results.len(), query);
            for (i, r) in results.iter().enumerate() {
                println!("\n  {}. distance={:.4}  doc={}  chunk={}", i + 1, r.similarity_score, r.doc_id, r.chunk_id);
                println!("     {}", r.text.replace('\n', " "));
            }
        }
        Commands::Ask { query, owner, json } => {
            let generator = ChatCompletionsGenerator::from_settings(&settings.generation)?;
            let qa = build(&settings, Box::new(generator))?;
            let answer = qa.ask(&query, owner);
            if json { println!("{}", serde_json::to_string_pretty(&answer)?); return Ok(()); }
            println!("{}", answer.answer);
            if !answer.sources.is_empty() {
                println!("\nSources:");
                for s in &answer.sources { println!("  [Document {}, Chunk {}] distance={:.4}", s.doc_id, s.chunk_id, s.similarity_score); }
            }
        }
        Commands::Status => {
            let qa = build(&settings, Box::new(NoGeneration))?;
            let index = qa.index_handle();
            println!("Index: {} / {}", index.files().vectors.display(), index.files().metadata.display());
            println!("Chunks: {}  Documents: {}  Dimension: {}", index.len(), index.indexed_doc_ids().len(), index.dimension());
        }
        Commands::Repair => {
            let index = build_unloaded(&settings)?;
            let dropped = index.repair()?;
            println!("Dropped {} uncommitted vector records; index holds {} chunks", dropped, index.len());
        }
    }
    Ok(())
}

/// Index bound to the configured files without loading them.
fn build_unloaded(settings: &Settings) -> Result<FlatIndex> {
    let base = std::env::current_dir()?;
    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.embedding)?);
    Ok(FlatIndex::new(IndexFiles::from_settings(&settings.index, &base), embedder)?)
}

fn build(settings: &Settings, generator: Box<dyn Generator>) -> Result<DocumentQa<Box<dyn Generator>>> {
    let index = build_unloaded(settings)?;
    index.load()?;
    let chunker = Chunker::new(settings.chunking)?;
    Ok(DocumentQa::new(chunker, Arc::new(index), generator, settings.agent.clone()))
}
