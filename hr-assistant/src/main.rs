use anyhow::Result;
use clap::{Parser, Subcommand};
use hr_assistant::config::SheetsConfig;
use hr_assistant::context::{build_index, embedding_provider, sheet_backend};
use hr_assistant::{AppConfig, AppContext, LogStatus, Outcome};
use hr_assistant_retriever::IndexStore;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

const CLOSING_LINE: &str = "I hope that clarifies your query!";

/// Ask questions about HR policies, benefits and leave balances.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to ./hr-assistant.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of {Table}.csv files to use instead of Google Sheets
    #[arg(short, long)]
    workbook: Option<PathBuf>,

    /// Google spreadsheet URL or id
    #[arg(short, long)]
    spreadsheet: Option<String>,

    /// Number of chunks retrieved per question
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one question and exit
    Ask {
        /// The question
        question: String,
    },
    /// Interactive session; the default
    Chat,
    /// Build or refresh the index without answering anything
    BuildIndex,
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
        eprintln!("❌ {e}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(workbook) = args.workbook {
        config.sheets.workbook_dir = Some(workbook);
    }
    if let Some(spreadsheet) = args.spreadsheet {
        config.sheets.spreadsheet = Some(spreadsheet);
    }
    if let Some(top_k) = args.top_k {
        config.retrieval.top_k = top_k;
    }

    match args.command.unwrap_or(Commands::Chat) {
        Commands::BuildIndex => {
            let (source, _) = sheet_backend(&config.sheets)?;
            let provider = embedding_provider(&config.embedding).await?;
            let index = IndexStore::open(&config.index.dir, provider).await?;
            let report = build_index(&config, source.as_ref(), &index).await?;
            index.close().await;

            println!(
                "Indexed {} chunks (dimension {}) in {}",
                report.chunk_count,
                report.dimension,
                config.index.dir.display()
            );
            if report.reused {
                println!("Index was already up to date");
            }
        }
        Commands::Ask { question } => {
            let context = AppContext::init(config).await?;
            render(context.assistant().ask(&question).await, &context.config().sheets);
            context.shutdown().await;
        }
        Commands::Chat => {
            let context = AppContext::init(config).await?;
            chat(&context).await?;
            context.shutdown().await;
        }
    }

    Ok(())
}

/// Reads questions from stdin until EOF or `exit`.
async fn chat(context: &AppContext) -> Result<()> {
    println!("💼 HR assistant ready. Ask about policies, benefits or your leave balance.");
    println!("Type 'exit' to quit.");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }
        render(context.assistant().ask(question).await, &context.config().sheets);
    }
    Ok(())
}

fn render(outcome: Outcome, sheets: &SheetsConfig) {
    match outcome {
        Outcome::Answered { result, logged } => {
            println!("{}", result.answer.trim());
            println!("{CLOSING_LINE}");
            match logged {
                LogStatus::Logged(_) => {
                    println!("✅ Interaction logged to {}", sheets.log_target())
                }
                LogStatus::Failed(_) => {
                    println!("⚠️ Could not log interaction. {}", sheets.log_hint())
                }
            }
        }
        Outcome::Failed(err) => println!("❌ Failed to generate response: {err}"),
    }
}
