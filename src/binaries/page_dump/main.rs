use clap::Parser;
use serde::Deserialize;
use serde::Serialize;
use telemetry_tsdb::engine::read_page;
use telemetry_tsdb::sample::{page_type_name, PAGE_FLOAT32, PAGE_FLOAT64, PAGE_INTEGER};
use telemetry_utils::time::millis_format;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Parser)]
#[clap(about, version, author)]
struct Config {
    #[clap(long)]
    pub path: String,

    /// Number of samples to print, 0 prints all of them.
    #[clap(long, default_value_t = 32)]
    pub limit: usize,

    /// Print int64 samples as millisecond timestamps.
    #[clap(long)]
    pub timestamps: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let config = Config::parse();
    if config.path.is_empty() {
        println!("path MUST not be empty!");
        return Ok(());
    }

    let page = read_page(config.path.as_str()).await?;
    let header = page.header;
    println!("version:      {}", header.version);
    println!(
        "sample type:  {} ({})",
        page_type_name(header.sample_type).unwrap_or("unknown"),
        header.sample_type
    );
    println!("sample count: {}", header.sample_count);
    println!("payload:      {} bytes", page.payload.len());

    let limit = match config.limit {
        0 => header.sample_count as usize,
        n => n.min(header.sample_count as usize),
    };

    match header.sample_type {
        PAGE_FLOAT32 => {
            for (i, v) in page.samples::<f32>().into_iter().take(limit).enumerate() {
                println!("{:010}> {}", i, v);
            }
        }
        PAGE_FLOAT64 => {
            for (i, v) in page.samples::<f64>().into_iter().take(limit).enumerate() {
                println!("{:010}> {}", i, v);
            }
        }
        PAGE_INTEGER => {
            for (i, v) in page.samples::<i64>().into_iter().take(limit).enumerate() {
                if config.timestamps {
                    println!("{:010}> {} | {}", i, v, millis_format(v));
                } else {
                    println!("{:010}> {}", i, v);
                }
            }
        }
        other => anyhow::bail!("unsupported sample type {}", other),
    }

    Ok(())
}
