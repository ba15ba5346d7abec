//! Refetch CLI
//!
//! Drives a TTL cache against a simulated source to show single-flight
//! fetching, sync broadcasts and error isolation.

mod simulated;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use futures::StreamExt;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use refetch_cache::TtlCache;
use refetch_core::{CacheConfig, CacheStats, SystemClock};

use crate::simulated::{SimulatedSource, Snapshot};

/// Refetch - single-value TTL cache harness
#[derive(Parser)]
#[command(name = "refetch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Expiry in milliseconds (overrides REFETCH_EXPIRY_MS)
    #[arg(long, global = true)]
    expiry_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fire concurrent reads at a cold cache, then force a sync
    Demo {
        /// Simulated fetch latency
        #[arg(short, long, default_value = "200")]
        latency_ms: u64,
        /// Number of concurrent callers
        #[arg(short, long, default_value = "16")]
        callers: usize,
    },

    /// Show how failures reach `get` callers but not update streams
    Flaky {
        /// Fail every Nth fetch
        #[arg(short, long, default_value = "2")]
        fail_every: u64,
        /// Number of sync rounds
        #[arg(short, long, default_value = "6")]
        rounds: usize,
    },

    /// Run a short scripted workload and print cache statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "refetch=debug,info"
    } else {
        "refetch=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let _ = dotenvy::dotenv();
    let mut config = CacheConfig::from_env();
    if let Some(ms) = cli.expiry_ms {
        config.expiry_ms = ms;
    }

    match cli.command {
        Commands::Demo { latency_ms, callers } => cmd_demo(&config, latency_ms, callers).await,
        Commands::Flaky { fail_every, rounds } => cmd_flaky(&config, fail_every, rounds).await,
        Commands::Stats { json } => cmd_stats(&config, json).await,
    }
}

fn build_cache(config: &CacheConfig, source: SimulatedSource) -> Result<TtlCache<Snapshot>> {
    TtlCache::from_config(config, Arc::new(SystemClock::new()), source).context("Invalid cache configuration")
}

/// Concurrent cold reads followed by a sync broadcast
async fn cmd_demo(config: &CacheConfig, latency_ms: u64, callers: usize) -> Result<()> {
    println!("{}", "⚡ Single-flight demo".cyan().bold());
    println!("   expiry:  {} ms", config.expiry_ms);
    println!("   latency: {} ms", latency_ms);
    println!("   callers: {}", callers);
    println!();

    let source = SimulatedSource::new(Duration::from_millis(latency_ms));
    let cache = build_cache(config, source.clone())?;

    let mut tasks = JoinSet::new();
    for _ in 0..callers {
        let cache = cache.clone();
        tasks.spawn(async move { cache.value().await });
    }

    let mut sequences = Vec::with_capacity(callers);
    while let Some(joined) = tasks.join_next().await {
        let snapshot = joined.context("Caller task panicked")??;
        sequences.push(snapshot.sequence);
    }
    sequences.sort_unstable();
    sequences.dedup();

    println!(
        "{} {} callers, {} fetch(es), sequence(s) seen: {:?}",
        "✓".green(),
        callers,
        source.calls().to_string().yellow().bold(),
        sequences
    );

    let mut subscription = cache.get();
    let first = subscription
        .next()
        .await
        .context("Subscription closed")??;
    println!("{} open subscription holds sequence {}", "→".blue(), first.sequence);

    cache.sync().await?;
    let second = subscription
        .next()
        .await
        .context("Subscription closed")??;
    println!(
        "{} sync broadcast delivered sequence {} to the open subscription",
        "✓".green(),
        second.sequence
    );

    print_stats(&cache.stats());
    Ok(())
}

/// Failures surface to `get` and `sync` callers only
async fn cmd_flaky(config: &CacheConfig, fail_every: u64, rounds: usize) -> Result<()> {
    println!("{}", "🎲 Flaky source demo".cyan().bold());
    println!("   failing every {} fetch(es)", fail_every);
    println!();

    let source = SimulatedSource::new(Duration::from_millis(20)).failing_every(fail_every);
    let cache = build_cache(config, source.clone())?;
    let mut feed = cache.updates();

    for round in 1..=rounds {
        match cache.sync().await {
            Ok(()) => {
                let snapshot = feed.next().await.context("Update stream closed")?;
                println!(
                    "{} round {}: sync ok, update stream saw sequence {}",
                    "✓".green(),
                    round,
                    snapshot.sequence
                );
            }
            Err(e) => {
                println!("{} round {}: sync failed ({}), update stream untouched", "✗".red(), round, e);
            }
        }
    }

    cache.invalidate();
    let mut retries = 0;
    let snapshot = loop {
        match cache.value().await {
            Ok(snapshot) => break snapshot,
            Err(e) if retries < rounds => {
                retries += 1;
                println!("{} get failed ({}), retrying", "✗".red(), e);
            }
            Err(e) => bail!("get still failing after {} retries: {}", retries, e),
        }
    };
    println!(
        "{} get after invalidate returned sequence {} after {} retr{}",
        "✓".green(),
        snapshot.sequence,
        retries,
        if retries == 1 { "y" } else { "ies" }
    );

    print_stats(&cache.stats());
    Ok(())
}

/// Scripted workload: cold read, warm reads, sync, invalidate, read
async fn cmd_stats(config: &CacheConfig, json: bool) -> Result<()> {
    let source = SimulatedSource::new(Duration::from_millis(10));
    let cache = build_cache(config, source)?;

    cache.value().await?;
    for _ in 0..5 {
        cache.value().await?;
    }
    cache.sync().await?;
    cache.invalidate();
    cache.value().await?;

    let stats = cache.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}

fn print_stats(stats: &CacheStats) {
    println!();
    println!("{}", "📊 Cache statistics".cyan().bold());
    println!("   state:       {}", stats.state.to_string().yellow());
    println!("   hits:        {}", stats.hits);
    println!("   misses:      {}", stats.misses);
    println!("   joins:       {}", stats.joins);
    println!("   fetches:     {}", stats.fetches);
    println!("   failures:    {}", stats.failures);
    println!("   broadcasts:  {}", stats.broadcasts);
    println!("   subscribers: {}", stats.subscribers);
    if let Some(ratio) = stats.hit_ratio() {
        println!("   hit ratio:   {:.1}%", ratio * 100.0);
    }
}
