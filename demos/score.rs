//! Score a text file (or stdin) with a local or hub sentiment model.
//!
//! ```text
//! cargo run --example score -- models/sentiment-lstm review.txt
//! echo "What a film. Loved it!" | RUST_LOG=candle_sentiment=debug cargo run --example score -- user/repo
//! ```

use std::io::Read;
use std::path::Path;

use candle_sentiment::sentiment::{SentimentPipelineBuilder, WhitespaceTokenizer};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let model = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: score <model-dir|hub-repo> [file]"))?;

    let text = match args.next() {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let builder = if Path::new(&model).is_dir() {
        SentimentPipelineBuilder::from_dir(&model)
    } else {
        SentimentPipelineBuilder::from_hub(&model)
    };
    let pipeline = builder
        .tokenizer(WhitespaceTokenizer::new().lowercase(true))
        .build()?;

    let output = pipeline.score_document(&text)?;
    for sentence in &output.sentences {
        println!("{:.3}  {}", sentence.probability, sentence.text);
    }
    println!(
        "\nscore {:+.3} ({} sentences, {:.1} sentences/s)",
        output.score,
        output.sentences.len(),
        output.stats.items_per_second()
    );
    Ok(())
}
