//! Embeds a handful of HR document lines with a local model and ranks them
//! against a question.

use half::f16;
use hr_assistant_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};

fn dot(a: &[f16], b: &[f16]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x.to_f32() * y.to_f32()).sum()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let temp_dir = tempfile::tempdir()?;
    let config = EmbedConfig::fastembed(temp_dir.path())
        .with_batch_size(2)
        .with_normalize(true);

    println!("Model: {} (batch size {})", config.model_name, config.batch_size);
    let provider = FastEmbedProvider::create(config).await?;
    println!("Dimension: {}", provider.embedding_dimension());

    let lines = vec![
        "Policy: Remote Work (General) → Employees may work from home two days a week.".to_string(),
        "Benefit: Gym → Free membership | Eligibility: Full-time | Notes: Partner gyms only"
            .to_string(),
        "Leave balance for sam@example.com: Casual=4, Sick=9 (Last updated 2024-03-01)"
            .to_string(),
    ];
    let result = provider.embed_texts(&lines).await?;

    let question = "How many sick days does sam@example.com have?";
    let query = provider.embed_text(question).await?;

    let mut ranked: Vec<(f32, &String)> = result
        .embeddings
        .iter()
        .map(|embedding| dot(&query, embedding))
        .zip(lines.iter())
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    println!("\nQuestion: {question}");
    for (score, line) in ranked {
        println!("  {score:.3}  {line}");
    }
    Ok(())
}
