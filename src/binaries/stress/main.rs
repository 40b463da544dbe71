use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use serde::Deserialize;
use serde::Serialize;
use telemetry_tsdb::{Dataset, StoreOptions};
use telemetry_utils::time::{millis_format, now_millis};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Parser)]
#[clap(about, version, author)]
struct Config {
    /// Optional file with store options (cache_dir, block_size, slot_size,
    /// loaded_slot_limit). TELEMETRY_* environment variables override it.
    #[clap(long)]
    pub config_file: Option<String>,

    #[clap(long)]
    pub cache_dir: Option<PathBuf>,

    #[clap(long)]
    pub block_size: Option<usize>,

    #[clap(long)]
    pub slot_size: Option<usize>,

    #[clap(long, default_value_t = 4)]
    pub channels: usize,

    #[clap(long, default_value_t = 4_000_000)]
    pub samples: usize,

    /// Sample period of the synthetic source in milliseconds.
    #[clap(long, default_value_t = 1)]
    pub period_ms: i64,

    /// Number of rows read back after ingestion.
    #[clap(long, default_value_t = 1000)]
    pub reads: usize,

    /// Leave the page files in place instead of disposing the dataset.
    #[clap(long)]
    pub keep: bool,
}

fn store_options(cfg: &Config) -> anyhow::Result<StoreOptions> {
    let mut builder = config::Config::builder();
    if let Some(path) = &cfg.config_file {
        builder = builder.add_source(config::File::with_name(path));
    }
    let mut options: StoreOptions = builder
        .add_source(config::Environment::with_prefix("TELEMETRY").try_parsing(true))
        .build()?
        .try_deserialize()?;

    if let Some(cache_dir) = &cfg.cache_dir {
        options.cache_dir = cache_dir.clone();
    }
    if let Some(block_size) = cfg.block_size {
        options.block_size = block_size;
    }
    if let Some(slot_size) = cfg.slot_size {
        options.slot_size = slot_size;
    }
    options.validate()?;
    Ok(options)
}

/// sample is a deterministic waveform, different per channel.
fn sample(channel: usize, i: usize) -> f32 {
    let phase = i as f32 * 0.001 * (channel + 1) as f32;
    phase.sin() * (10.0 * (channel + 1) as f32)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::parse();
    info!("config: {:?}", config);
    if config.channels == 0 || config.samples == 0 {
        println!("channels and samples MUST be positive!");
        return Ok(());
    }

    let options = store_options(&config)?;
    info!("store options: {:?}", options);

    let names: Vec<String> = (0..config.channels).map(|c| format!("ch{}", c)).collect();
    let dataset = Dataset::new("stress", &names, options)?;

    let start_ms = now_millis();
    let begin = Instant::now();
    let mut row = vec![0_f32; config.channels];
    for i in 0..config.samples {
        for (c, v) in row.iter_mut().enumerate() {
            *v = sample(c, i);
        }
        dataset
            .append(&row, start_ms + i as i64 * config.period_ms)
            .await?;
    }
    let elapsed = begin.elapsed();

    let total = config.samples * (config.channels + 1);
    println!(
        "appended {} rows x {} channels in {:.3}s ({:.0} samples/s)",
        config.samples,
        config.channels + 1,
        elapsed.as_secs_f64(),
        total as f64 / elapsed.as_secs_f64()
    );
    println!(
        "time span: {} .. {}",
        millis_format(dataset.first_timestamp().await?.unwrap_or(start_ms)),
        millis_format(dataset.last_timestamp().await?.unwrap_or(start_ms))
    );
    for (channel, stats) in dataset.stats().await {
        println!("| {:<16} | {:?} |", channel, stats);
    }

    // read back a spread of rows, oldest first so most reads page slots in
    let begin = Instant::now();
    let stride = (config.samples / config.reads.max(1)).max(1);
    let mut mismatches = 0;
    for i in (0..config.samples).step_by(stride) {
        let c = i % config.channels;
        if dataset.value(&names[c], i).await? != sample(c, i) {
            mismatches += 1;
        }
        let ts = dataset.timestamp(i).await?;
        if dataset.closest_at_or_before(ts, config.samples - 1).await? != Some(i)
            && config.period_ms > 0
        {
            mismatches += 1;
        }
    }
    println!(
        "read back {} rows in {:.3}s, {} mismatches",
        (config.samples + stride - 1) / stride,
        begin.elapsed().as_secs_f64(),
        mismatches
    );

    if !config.keep {
        dataset.dispose().await?;
    }

    Ok(())
}
