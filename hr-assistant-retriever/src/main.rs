use clap::{Parser, Subcommand};
use hr_assistant_context::Chunk;
use hr_assistant_retriever::retrieval::index_db::{DB_FILE_NAME, IndexDb};
use hr_assistant_retriever::storage::{ChunkStore, sqlite_store::SqliteStore};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// A CLI tool to inspect the HR assistant's chunk index.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Index directory containing the .hr-assistant.db database file
    #[arg(short, long, default_value = ".hr-assistant-index")]
    index_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize an empty index database
    Init,
    /// List chunks in corpus order
    List {
        /// Limit number of results
        #[arg(short, long, default_value_t = 100)]
        limit: usize,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Get a specific chunk by its sequence number
    Get {
        /// Chunk sequence number
        sequence: usize,
        /// Output format
        #[arg(short, long, default_value = "full")]
        format: OutputFormat,
    },
    /// Show index statistics and build metadata
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Find chunks whose text contains a term
    TextSearch {
        /// Text to look for
        term: String,
        /// Match case exactly
        #[arg(short, long)]
        case_sensitive: bool,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Full,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "full" => Ok(OutputFormat::Full),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct IndexStats {
    total_chunks: usize,
    corpus_chars: usize,
    meta: Option<hr_assistant_retriever::IndexMeta>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_chunk(chunk: &Chunk, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(chunk)?),
        OutputFormat::Summary => {
            println!(
                "  #{} | Chars: {}-{} | {}",
                chunk.sequence,
                chunk.char_start,
                chunk.char_end,
                chunk.text.chars().take(80).collect::<String>().replace('\n', " ")
            );
        }
        OutputFormat::Full => {
            println!("Chunk: {}", chunk.sequence);
            println!("Chars: {}-{}", chunk.char_start, chunk.char_end);
            println!("Content:\n{}", chunk.text);
            println!("---");
        }
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let index_db = IndexDb::open(&args.index_dir).await?;
    let store = SqliteStore::new(index_db.clone());

    match args.command {
        Commands::Init => {
            println!("Initialized chunk index at {}", args.index_dir.display());
            println!(
                "Database location: {}",
                args.index_dir.join(DB_FILE_NAME).display()
            );
        }
        Commands::List { limit, format } => {
            let mut listed = store.list_chunks().await?;
            listed.truncate(limit);

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&listed)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} chunks:", listed.len());
                    for metadata in listed {
                        println!(
                            "  #{} | Chars: {}-{} | Dim: {} | {}",
                            metadata.sequence,
                            metadata.char_start,
                            metadata.char_end,
                            metadata.dimension,
                            metadata.preview.replace('\n', " ")
                        );
                    }
                }
                OutputFormat::Full => {
                    for metadata in listed {
                        if let Some(chunk) = store.get_chunk(metadata.sequence).await? {
                            print_chunk(&chunk, &format)?;
                        }
                    }
                }
            }
        }
        Commands::Get { sequence, format } => match store.get_chunk(sequence).await? {
            Some(chunk) => print_chunk(&chunk, &format)?,
            None => println!("Chunk {sequence} not found"),
        },
        Commands::Stats { format } => {
            let chunks = store.list_chunks().await?;
            let stats = IndexStats {
                total_chunks: chunks.len(),
                corpus_chars: chunks.last().map(|c| c.char_end).unwrap_or(0),
                meta: index_db.get_meta().await?,
            };

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Index Statistics:");
                println!("  Total chunks: {}", stats.total_chunks);
                println!("  Corpus length: {} chars", stats.corpus_chars);
                match &stats.meta {
                    Some(meta) => {
                        println!("  Embedding model: {} ({})", meta.model_name, meta.provider);
                        println!("  Dimension: {}", meta.dimension);
                        println!("  Fingerprint: {}", meta.fingerprint);
                        println!("  Built at: {}", meta.built_at.to_rfc3339());
                    }
                    None => println!("  No index has been built yet"),
                }
            }
        }
        Commands::TextSearch {
            term,
            case_sensitive,
            limit,
            format,
        } => {
            let mut chunks = store.search_text(&term, case_sensitive).await?;
            chunks.truncate(limit);

            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&chunks)?);
            } else {
                println!("Found {} matching chunks:", chunks.len());
                for chunk in &chunks {
                    print_chunk(chunk, &format)?;
                }
            }
        }
    }

    index_db.close().await;
    Ok(())
}
