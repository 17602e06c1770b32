use clap::Parser;
use hr_assistant_context::{Chunk, ChunkingConfig, CorpusBuilder};
use std::fs;
use std::io::{self, Read};
use std::process;

/// A CLI tool to split a text corpus into overlapping chunks, printed as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Maximum length of each chunk, in characters.
    #[arg(short, long, default_value_t = 500)]
    max_chunk_size: usize,

    /// Characters shared by consecutive chunks.
    #[arg(short, long, default_value_t = 50)]
    overlap: usize,

    /// How far back from the hard cut to look for a paragraph or sentence boundary.
    #[arg(short, long, default_value_t = 100)]
    boundary_tolerance: usize,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let corpus = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let config = ChunkingConfig::new(args.max_chunk_size, args.overlap)
        .with_boundary_tolerance(args.boundary_tolerance);
    let builder = CorpusBuilder::new(config)?;

    let chunks: Vec<Chunk> = builder.split(&corpus);

    let json_output = serde_json::to_string_pretty(&chunks)?;
    println!("{json_output}");

    Ok(())
}
