use clap::{Parser, Subcommand};
use docqa_context::{MAX_CHARS_PER_PASSAGE, Passage, pack_context, truncate_text};
use docqa_retriever::{
    DocumentIndex, RetrieverConfig,
    retrieval::documents::{ExtractorRegistry, load_documents_from_dir, load_documents_from_paths},
    status,
    storage::GenerationStore,
};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Index documents and retrieve passages relevant to a question.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file; every key is optional
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Index directory, overriding the configuration
    #[arg(long)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rebuild the index from every .txt file in a directory
    Ingest {
        /// Directory holding the documents
        #[arg(long, default_value = "data/docs")]
        docs_dir: PathBuf,
    },
    /// Rebuild the index from individual uploaded files
    IngestFiles {
        /// Files to extract and index
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Retrieve passages for a question
    Query {
        /// The question
        question: String,
        /// Maximum number of passages
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Minimum similarity score
        #[arg(short, long, allow_negative_numbers = true)]
        threshold: Option<f32>,
        /// Print the source of each passage
        #[arg(long)]
        show_sources: bool,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show what is on disk for the index directory
    Status {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
    Context,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            "context" => Ok(OutputFormat::Context),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(args: &Args) -> anyhow::Result<RetrieverConfig> {
    let mut config = match &args.config {
        Some(path) => RetrieverConfig::from_toml_file(path)?,
        None => RetrieverConfig::default(),
    };
    if let Some(dir) = &args.index_dir {
        config.index.dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Commands::Ingest { docs_dir } => {
            let documents = load_documents_from_dir(&docs_dir)?;
            let index = DocumentIndex::new(config).await?;
            let report = index.ingest(documents).await?;
            println!(
                "Ingested {} chunks from {} documents into {}",
                report.chunks,
                report.documents,
                index.config().index.dir.display()
            );
            Ok(())
        }
        Commands::IngestFiles { paths } => {
            let documents = load_documents_from_paths(&paths, &ExtractorRegistry::default());
            let index = DocumentIndex::new(config).await?;
            let report = index.ingest(documents).await?;
            println!(
                "Ingested {} chunks from {} of {} files into {}",
                report.chunks,
                report.documents,
                paths.len(),
                index.config().index.dir.display()
            );
            Ok(())
        }
        Commands::Query {
            question,
            top_k,
            threshold,
            show_sources,
            format,
        } => {
            if question.trim().is_empty() {
                println!("Please provide a question.");
                return Ok(());
            }

            let top_k = top_k.unwrap_or(config.retrieval.top_k);
            let threshold = threshold.unwrap_or(config.retrieval.similarity_threshold);
            let index = DocumentIndex::new(config).await?;
            let results = index.retrieve(&question, top_k, threshold).await?;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&results)?);
                }
                _ if results.is_empty() => {
                    println!("No relevant context found.");
                }
                OutputFormat::Context => {
                    let passages: Vec<Passage<'_>> =
                        results.iter().map(|r| r.as_passage()).collect();
                    println!("{}", pack_context(&passages, MAX_CHARS_PER_PASSAGE));
                }
                OutputFormat::Summary => {
                    println!("Found {} passages:\n", results.len());
                    for (i, chunk) in results.iter().enumerate() {
                        println!("{}. [{:.3}] {}", i + 1, chunk.score, chunk.chunk_id);
                        if show_sources {
                            println!("   Source: {}", chunk.source);
                        }
                        println!("   {}", truncate_text(&chunk.text, 200).replace('\n', " "));
                        println!();
                    }
                }
            }
            Ok(())
        }
        Commands::Status { format } => {
            let store = GenerationStore::new(&config.index.dir);
            let status = tokio::task::spawn_blocking(move || status::collect(&store)).await??;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
                _ => println!("{}", status.summary()),
            }
            Ok(())
        }
    }
}
