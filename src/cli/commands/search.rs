//! Search and index info commands.

use console::style;

use crate::config::Config;
use crate::embedding::Embedder;

use crate::cli::helpers::{preview, truncate};

const PREVIEW_CHARS: usize = 300;

pub async fn cmd_search(
    config: &Config,
    query: &str,
    k: usize,
    threshold: Option<f32>,
    match_terms: bool,
) -> anyhow::Result<()> {
    let sink = config.vector_sink.open()?;
    if sink.items().is_empty() {
        anyhow::bail!("Index is empty (chunks=0); run `rag-ingest ingest` first");
    }

    let embedder = config.embedder.build()?;
    tracing::info!("embedding query with {}", embedder.model());
    let vectors = embedder.embed(&[query.to_string()]).await?;
    let Some(query_vector) = vectors.into_iter().next() else {
        anyhow::bail!("Embedder returned no vector for the query");
    };

    let hits = sink.search(&query_vector, k)?;
    let metric = sink.metric();
    let terms: Vec<&str> = query.split_whitespace().collect();

    println!("\n{}", style(format!("=== RESULTS (top-{}, {}) ===", k, metric)).bold());
    let mut shown = 0;
    for (rank, (idx, score)) in hits.iter().enumerate() {
        let Some(item) = sink.items().get(idx) else {
            continue;
        };
        if threshold.is_some_and(|t| !metric.passes(score, t)) {
            continue;
        }
        if match_terms && !terms.iter().any(|t| item.text.contains(t)) {
            continue;
        }
        println!(
            "[{}] score={:.4} pages={:?} heading={:?}",
            rank + 1,
            score,
            item.meta.pages,
            item.meta.heading_path
        );
        println!("{}", preview(&item.text, PREVIEW_CHARS));
        println!("{}", "-".repeat(80));
        shown += 1;
    }

    if shown == 0 {
        println!(
            "{} No matching results (below threshold or no query term present)",
            style("!").yellow()
        );
    }
    Ok(())
}

pub fn cmd_info(config: &Config) -> anyhow::Result<()> {
    let sink = config.vector_sink.open()?;

    println!("\n{}", style("=== INDEX INFO ===").bold());
    println!("sink   : {}", sink.name());
    println!("metric : {}", sink.metric());
    println!(
        "dim    : {}",
        sink.dim().map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!("items  : {}", sink.items().len());

    if let Some(vision) = config.vector_sink.open_vision()? {
        println!("vision : {} items", vision.items().len());
    }

    if let Some(item) = sink.items().first() {
        println!("\n{}", style("=== SAMPLE ITEM[0] ===").bold());
        println!("id   : {}", item.id);
        println!("text : {}", truncate(&item.text, 200));
        println!("meta : {}", serde_json::to_string(&item.meta)?);
    }
    Ok(())
}
