// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use docvec::utils::logging::{format_error, format_info, format_success, format_warning};
use docvec::utils::{OperationTimer, system_health};
use docvec::{
    AppState, Config, DocumentProcessor, Embedder, ExcelLayout, HealthStatus,
    PipelineOrchestrator, RagPipeline, UploadRoute, Validator, VectorStore,
    build_embedder, build_generator, build_store,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "docvec")]
#[command(version)]
#[command(about = "Extract, vectorize and query PDF, DOCX, XLSX and TXT documents", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP upload and answer service
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the text extracted from a file
    Extract {
        file: PathBuf,

        /// Rendering of spreadsheets
        #[arg(long, value_parser = ["table", "columns", "records"])]
        layout: Option<String>,
    },

    /// Extract, embed and store a single file
    Vectorize {
        file: PathBuf,

        #[arg(long, default_value = "all", value_parser = ["excel", "pdf", "document", "all"])]
        route: String,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Vectorize every supported file under the given paths
    Ingest {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Split a file into chunks and store them for retrieval
    Index { file: PathBuf },

    /// Answer a question from the indexed chunks
    Ask {
        query: String,

        /// Index this file before answering
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show the stored chunks most similar to a query
    Search {
        query: String,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Show vector store statistics
    Stats,

    /// Check the store, the embedder and the generator
    Verify,

    /// Delete every stored vector
    Reset {
        #[arg(long)]
        confirm: bool,
    },
}

struct Services {
    processor: Arc<DocumentProcessor>,
    rag: Arc<RagPipeline>,
    store: Option<Arc<dyn VectorStore>>,
    embedder: Arc<dyn Embedder>,
}

impl Services {
    async fn build(config: &Config) -> Result<Self> {
        let embedder = build_embedder(&config.embedding).context("Failed to create embedder")?;
        let store = build_store(&config.storage)
            .await
            .context("Failed to open vector store")?;
        let generator = build_generator(&config.generation);

        let processor = Arc::new(DocumentProcessor::new(
            config,
            embedder.clone(),
            store.clone(),
        ));
        let rag = Arc::new(
            RagPipeline::new(config, embedder.clone(), store.clone(), generator)
                .context("Failed to create retrieval pipeline")?,
        );

        Ok(Self {
            processor,
            rag,
            store,
            embedder,
        })
    }

    fn require_store(&self) -> Result<&Arc<dyn VectorStore>> {
        match &self.store {
            Some(store) => Ok(store),
            None => bail!("Vector persistence is disabled (storage.backend = \"none\")"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    docvec::utils::logging::init_logger(cli.color, cli.verbose);

    let config = if cli.config.exists() {
        info!("Loading configuration from: {}", cli.config.display());
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).context("Failed to load configuration")?
    };

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(config, host, port).await?,
        Commands::Extract { file, layout } => cmd_extract(&config, &file, layout.as_deref()).await?,
        Commands::Vectorize { file, route, json } => {
            cmd_vectorize(&config, &file, &route, json).await?
        }
        Commands::Ingest { paths } => cmd_ingest(&config, &paths, cli.color).await?,
        Commands::Index { file } => cmd_index(&config, &file).await?,
        Commands::Ask {
            query,
            file,
            top_k,
        } => cmd_ask(&config, &query, file.as_deref(), top_k).await?,
        Commands::Search { query, limit } => cmd_search(&config, &query, limit).await?,
        Commands::Stats => cmd_stats(&config).await?,
        Commands::Verify => cmd_verify(&config).await?,
        Commands::Reset { confirm } => cmd_reset(&config, confirm).await?,
    }

    Ok(())
}

async fn cmd_serve(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let services = Services::build(&config).await?;
    let state = AppState::new(&config, services.processor, services.rag);

    docvec::server::run_server(&config, state)
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn cmd_extract(config: &Config, file: &Path, layout: Option<&str>) -> Result<()> {
    Validator::validate_file_path(file)?;

    let layout = match layout {
        Some("columns") => ExcelLayout::Columns,
        Some("records") => ExcelLayout::Records,
        Some(_) => ExcelLayout::Table,
        None => config.pipeline.excel_layout,
    };

    let extracted = docvec::extractor::extract_path(file, layout)
        .await
        .with_context(|| format!("Failed to extract {}", file.display()))?;

    if extracted.is_empty() {
        eprintln!("{}", format_warning("No text extracted"));
    }
    println!("{}", extracted.text);
    Ok(())
}

fn parse_route(route: &str) -> UploadRoute {
    match route {
        "excel" => UploadRoute::Excel,
        "pdf" => UploadRoute::Pdf,
        "document" => UploadRoute::Document,
        _ => UploadRoute::All,
    }
}

async fn cmd_vectorize(config: &Config, file: &Path, route: &str, json: bool) -> Result<()> {
    Validator::validate_file_path(file)?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("File name is not valid UTF-8")?;

    let services = Services::build(config).await?;
    let processed = services
        .processor
        .process_upload(parse_route(route), file_name, file)
        .await
        .with_context(|| format!("Failed to vectorize {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&processed)?);
        return Ok(());
    }

    println!(
        "{}",
        format_success(&format!(
            "{} -> {} ({} dimensions, {} characters)",
            processed.file_name,
            processed.document_id,
            processed.dimension,
            processed.text.chars().count()
        ))
    );
    let preview: Vec<String> = processed
        .vector
        .iter()
        .take(8)
        .map(|v| format!("{:.4}", v))
        .collect();
    println!("   Vector: [{}, ...]", preview.join(", "));
    if !processed.stored {
        println!("{}", format_info("Not stored: persistence is disabled"));
    }
    Ok(())
}

async fn cmd_ingest(config: &Config, paths: &[PathBuf], colored: bool) -> Result<()> {
    let services = Services::build(config).await?;
    let orchestrator =
        PipelineOrchestrator::new(config, services.processor.clone()).with_progress(colored);

    let timer = OperationTimer::new("ingest");
    let stats = orchestrator
        .run(paths)
        .await
        .context("Ingestion failed")?;
    let metrics = timer.finish_with_count(stats.files_processed);

    println!(
        "{}",
        format_success(&format!(
            "Ingested {} files ({} stored, {} failed)",
            stats.files_processed, stats.records_stored, stats.files_failed
        ))
    );
    println!("   {}", metrics.format());
    if stats.files_failed > 0 {
        println!(
            "{}",
            format_warning("Some files failed, rerun with --verbose for details")
        );
    }
    Ok(())
}

async fn cmd_index(config: &Config, file: &Path) -> Result<()> {
    let services = Services::build(config).await?;
    let timer = OperationTimer::new("index");
    let indexed = index_file(&services, file).await?;
    let elapsed = timer.finish();

    println!(
        "{}",
        format_success(&format!(
            "Indexed {} as {} chunks in {:.2}s",
            indexed.document_id,
            indexed.chunks,
            elapsed.as_secs_f64()
        ))
    );
    Ok(())
}

async fn index_file(services: &Services, file: &Path) -> Result<docvec::IndexedDocument> {
    Validator::validate_file_path(file)?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("File name is not valid UTF-8")?;

    services
        .rag
        .index_document(file_name, file)
        .await
        .with_context(|| format!("Failed to index {}", file.display()))
}

async fn cmd_ask(
    config: &Config,
    query: &str,
    file: Option<&Path>,
    top_k: Option<usize>,
) -> Result<()> {
    let services = Services::build(config).await?;

    if let Some(file) = file {
        let indexed = index_file(&services, file).await?;
        info!("Indexed {} as {} chunks", indexed.document_id, indexed.chunks);
    }

    let answer = services
        .rag
        .answer(query, top_k)
        .await
        .context("Failed to answer query")?;

    println!("\n{}\n", answer.answer);
    if !answer.sources.is_empty() {
        println!("{}", "Sources:".bold());
        for source in &answer.sources {
            println!(
                "  - {} #{} (score {:.4})",
                source.file_name, source.chunk_index, source.score
            );
        }
    }
    Ok(())
}

async fn cmd_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    let services = Services::build(config).await?;
    let results = services
        .rag
        .retrieve(query, Some(limit))
        .await
        .context("Vector search failed")?;

    if results.is_empty() {
        println!("\nNo results found for query: \"{}\"\n", query);
        println!("Check that documents have been indexed with `docvec index`.");
        return Ok(());
    }

    println!("\nSearch Results for: \"{}\"\n", query);
    println!("{}", "=".repeat(80));
    for (idx, result) in results.iter().enumerate() {
        println!("\n{}. {}", idx + 1, result.format_summary(300));
    }
    println!("\n{}", "=".repeat(80));
    Ok(())
}

async fn cmd_stats(config: &Config) -> Result<()> {
    let services = Services::build(config).await?;
    let store = services.require_store()?;
    let count = store.count().await.context("Failed to count records")?;

    println!("Backend:  {}", store.backend().as_str().cyan());
    println!("Records:  {}", count);
    println!(
        "Embedder: {} ({})",
        services.embedder.name(),
        services
            .embedder
            .dimension()
            .map(|d| format!("{} dimensions", d))
            .unwrap_or_else(|| "variable dimension".to_string())
    );
    Ok(())
}

async fn cmd_verify(config: &Config) -> Result<()> {
    let services = Services::build(config).await?;
    let report = system_health(
        services.store.as_ref(),
        &services.embedder,
        services.rag.generator_model(),
        true,
    )
    .await;

    println!("{}", report.format());
    if report.overall_status == HealthStatus::Unhealthy {
        bail!("Health check failed");
    }
    Ok(())
}

async fn cmd_reset(config: &Config, confirm: bool) -> Result<()> {
    if !confirm {
        eprintln!(
            "{}",
            format_error("This will delete all stored vectors. Use --confirm to proceed")
        );
        return Ok(());
    }

    let services = Services::build(config).await?;
    let store = services.require_store()?;
    warn!("Resetting {} store - all vectors will be lost", store.backend().as_str());
    store.clear().await.context("Failed to clear the vector store")?;

    println!("{}", format_success("Vector store cleared"));
    Ok(())
}
