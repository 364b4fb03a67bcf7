use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use sibyl_core::{Assistant, AssistantOptions, Config, ResolvedSecrets, Session, resolve_provider};
use sibyl_gateway::GatewayServer;
use sibyl_llm::{AnyProvider, OpenAiProvider};
use sibyl_memory::{
    InMemoryVectorStore, IndexMeta, IngestionPipeline, RetrievedPassage, SnapshotStore,
    SplitterConfig, TextSplitter, VectorStore,
};

#[derive(Parser)]
#[command(
    name = "sibyl",
    version,
    about = "Retrieval-augmented assistant over a local document corpus"
)]
struct Cli {
    /// Path to the TOML config file (also via SIBYL_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the vector index from the document corpus
    Index {
        /// Corpus directory, overriding corpus.dir
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Interactive question-answering loop (the default)
    Chat,
    /// Serve the web chat UI
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_subscriber();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());
    let config = Config::load(&config_path)?;
    let secrets = ResolvedSecrets::from_env();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Index { corpus } => run_index(&config, &secrets, corpus).await,
        Command::Chat => run_chat(&config, &secrets).await,
        Command::Serve => run_serve(&config, &secrets).await,
    }
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn resolve_config_path(flag: Option<&Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("SIBYL_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn open_index(config: &Config) -> anyhow::Result<Option<Arc<dyn VectorStore>>> {
    let store = SnapshotStore::open(Path::new(&config.index.dir))?;
    Ok(store.map(|s| Arc::new(s) as Arc<dyn VectorStore>))
}

/// Rebuild the index: walk the corpus, embed every passage, publish a new
/// snapshot. An empty corpus publishes nothing, so an existing index is
/// never clobbered by an empty rebuild.
async fn run_index(
    config: &Config,
    secrets: &ResolvedSecrets,
    corpus: Option<PathBuf>,
) -> anyhow::Result<()> {
    let Some(openai_key) = &secrets.openai_api_key else {
        bail!("OPENAI_API_KEY is required for creating embeddings");
    };
    let embedder = AnyProvider::OpenAi(OpenAiProvider::new(
        openai_key.expose().to_owned(),
        config.llm.openai_base_url.clone(),
        config.llm.openai_model.clone(),
        config.llm.max_tokens,
        config.llm.temperature,
        Some(config.llm.embedding_model.clone()),
    ));

    let corpus_dir = corpus.unwrap_or_else(|| PathBuf::from(&config.corpus.dir));
    let splitter = TextSplitter::new(SplitterConfig::new(
        config.index.chunk_size,
        config.index.chunk_overlap,
    )?);

    let staging = Arc::new(InMemoryVectorStore::new());
    let pipeline = IngestionPipeline::new(
        splitter,
        Arc::clone(&staging) as Arc<dyn VectorStore>,
        Box::new(embedder.embed_fn()),
    );
    let report = pipeline.ingest_dir(&corpus_dir).await?;

    println!(
        "Indexed {} of {} file(s) ({} skipped), {} passage(s) in {}ms",
        report.files_indexed,
        report.files_scanned,
        report.files_skipped,
        report.chunks_indexed,
        report.duration_ms
    );
    if !report.errors.is_empty() {
        println!(
            "{} file(s) failed; see the log for details",
            report.errors.len()
        );
    }

    if report.chunks_indexed == 0 {
        println!("No passages indexed; any existing index was left untouched.");
        return Ok(());
    }

    let points = staging.take_points()?;
    let dimension = points.first().map_or(0, |p| p.vector.len());
    let meta = IndexMeta::new(dimension, config.llm.embedding_model.clone(), points.len());
    let name = SnapshotStore::publish(Path::new(&config.index.dir), &points, &meta)?;
    println!("Published {} ({} passages)", name, points.len());
    Ok(())
}

async fn run_chat(config: &Config, secrets: &ResolvedSecrets) -> anyhow::Result<()> {
    let provider = resolve_provider(config, secrets)?;
    let store = open_index(config)?;
    let assistant = Assistant::new(provider, store, AssistantOptions::from_config(config));

    println!("sibyl v{}", env!("CARGO_PKG_VERSION"));
    println!("provider: {}", assistant.provider_name());
    if assistant.index_ready() {
        println!(
            "index: {} passage(s) loaded",
            assistant.passage_count().await
        );
    } else {
        println!("index: not built yet — run `sibyl index` first");
    }
    println!("Type 'help' for commands.\n");

    let mut session = Session::new();
    let mut last_sources: Vec<RetrievedPassage> = Vec::new();

    loop {
        print!("You: ");
        std::io::stdout().flush()?;
        let Some(line) = read_line().await? else {
            // ctrl-d
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input.to_lowercase().as_str() {
            "quit" | "exit" => break,
            "help" => {
                print_help();
                continue;
            }
            "sources" => {
                print_sources(&last_sources);
                continue;
            }
            _ => {}
        }

        match assistant.ask(&mut session, input).await {
            Ok(answer) => {
                println!("Sibyl: {}", answer.text);
                if !answer.sources.is_empty() {
                    println!(
                        "\u{1F4DA} Sources: {} document(s) referenced (type 'sources' to list them)",
                        answer.sources.len()
                    );
                }
                last_sources = answer.sources;
            }
            Err(err) => println!("Sibyl: {}", err.user_message()),
        }
        println!();
    }

    println!("Goodbye!");
    Ok(())
}

async fn run_serve(config: &Config, secrets: &ResolvedSecrets) -> anyhow::Result<()> {
    let provider = resolve_provider(config, secrets)?;
    let store = open_index(config)?;
    let assistant = Arc::new(Assistant::new(
        provider,
        store,
        AssistantOptions::from_config(config),
    ));
    if !assistant.index_ready() {
        tracing::warn!("no index found; chat will answer with the indexing notice");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e:#}");
            return;
        }
        tracing::info!("received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    GatewayServer::new(
        &config.gateway.bind,
        config.gateway.port,
        assistant,
        shutdown_rx,
    )
    .with_auth(
        secrets
            .gateway_token
            .as_ref()
            .map(|t| t.expose().to_owned()),
    )
    .with_rate_limit(config.gateway.rate_limit)
    .with_max_body_size(config.gateway.max_body_size)
    .serve()
    .await?;

    Ok(())
}

/// Blocking stdin read off the runtime. `None` on EOF.
async fn read_line() -> anyhow::Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line)),
            Err(e) => Err(e),
        }
    })
    .await??;
    Ok(line)
}

fn print_help() {
    println!("Ask anything covered by the indexed documents, for example:");
    println!("  - plans, pricing, and billing");
    println!("  - account setup and team management");
    println!("  - support, refunds, and data export");
    println!();
    println!("Commands:");
    println!("  help     show this guide");
    println!("  sources  list the sources behind the last answer");
    println!("  quit     leave the chat (also: exit, ctrl-d)");
}

fn print_sources(sources: &[RetrievedPassage]) {
    if sources.is_empty() {
        println!("No sources yet. Ask a question first.");
        return;
    }
    for (i, passage) in sources.iter().enumerate() {
        let preview: String = passage.content.chars().take(200).collect();
        println!(
            "{}. {} (passage {}, score {:.3})",
            i + 1,
            passage.source,
            passage.chunk_index,
            passage.score
        );
        println!("   {preview}");
    }
}
