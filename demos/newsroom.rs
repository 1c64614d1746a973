//! Newsroom demo - streams a three-page paper to several readers
//!
//! Run with: cargo run --example newsroom
//!
//! This demo shows:
//! - Header suppression and page separators on a chunked token stream
//! - Readers attaching before, during and after generation
//! - Illustrations painted two at a time with a placeholder on failure
//!
//! Set `RUST_LOG=gazette_rs=trace` to see every fragment.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use gazette_rs::dispatch::{JobDispatcher, StubPainter};
use gazette_rs::pages::{parse_list_items, split_pages};
use gazette_rs::persist::MemoryStore;
use gazette_rs::registry::{Attachment, Delivery, Fragment, JobRegistry, RegistryConfig};
use gazette_rs::segment::ScriptedSource;

const MASTHEAD: &str = "*Fox Newroll Network*";

/// What a model might stream for one issue, split at awkward places
fn issue_chunks() -> Vec<&'static str> {
    vec![
        "# The Daily Den\n",
        "Morning edition, written by foxes for foxes.\n\n...",
        "*Fox Newroll Network*\n",
        "---\n# Page 1\nThe council voted to move the lectern to the ",
        "east meadow.\n-",
        "--\n\n# Page 2\nRain is forecast for the whole burrow district.\n",
        "---   \n",
        "# Page 3\nLetters to the editor: ",
        "more carrots, fewer hounds.\n",
    ]
}

fn illustration_prompts() -> &'static str {
    "1. a fox at a lectern in a meadow\n2. storm clouds over burrows\n- \n3. a pile of carrots\n"
}

/// Print every delivery a reader gets until the job closes
fn spawn_reader(name: &'static str) -> mpsc::UnboundedSender<Delivery> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Delivery>();

    tokio::spawn(async move {
        while let Some(delivery) = rx.recv().await {
            match delivery {
                Delivery::Fragment {
                    seq,
                    fragment: Fragment::Text(text),
                } => println!("[{}] #{} {:?}", name, seq, text),
                Delivery::Fragment {
                    seq,
                    fragment: Fragment::Separator,
                } => println!("[{}] #{} ---- page break ----", name, seq),
                Delivery::Completed => println!("[{}] completed", name),
                Delivery::Failed { reason } => println!("[{}] failed: {}", name, reason),
            }
        }
    });

    tx
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gazette_rs=info".parse()?)
                .add_directive("newsroom=info".parse()?),
        )
        .init();

    let config = RegistryConfig::default().header_anchor(MASTHEAD);
    let registry = Arc::new(JobRegistry::with_config(MemoryStore::new(), config));

    let source = ScriptedSource::new(issue_chunks()).with_delay(Duration::from_millis(150));
    let job = registry.start_segmented_stream(source).await;
    let id = job.id();
    println!("Generating {}", id);

    registry.attach(id, spawn_reader("early")).await?;

    tokio::time::sleep(Duration::from_millis(700)).await;
    registry.attach(id, spawn_reader("late")).await?;

    let content = job.wait().await?;

    match registry.attach(id, spawn_reader("archive")).await? {
        Attachment::Finished(stored) => println!("[archive] {} bytes from the store", stored.len()),
        Attachment::Live(_) | Attachment::Pruned { .. } => println!("[archive] job still open"),
    }

    let pages = split_pages(&content, &registry.config().segmenter.marker, 3)?;
    println!();
    for (n, page) in pages.iter().enumerate() {
        println!("=== Page {} ===\n{}\n", n + 1, page);
    }

    // Two illustrations at a time, blank placeholder when painting fails
    let prompts = parse_list_items(illustration_prompts(), pages.len())?;
    let painter = JobDispatcher::new(StubPainter::new(Duration::from_millis(500)));
    let tickets: Vec<_> = prompts
        .into_iter()
        .map(|prompt| painter.submit(prompt))
        .collect();

    for (n, ticket) in tickets.into_iter().enumerate() {
        let image = ticket.settle_or(Bytes::new()).await;
        println!("Illustration {}: {} bytes", n + 1, image.len());
    }

    let stats = painter.stats();
    println!(
        "Painter stats: completed={} failed={} peak_running={}",
        stats.completed, stats.failed, stats.peak_running
    );

    Ok(())
}
