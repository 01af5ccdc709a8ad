use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use instafeed::storage::ArticleCache;
use instafeed::{Config, FeedGenerator};

/// Default config file location (~/.config/instafeed/config.toml).
fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("instafeed")
            .join("config.toml"),
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "instafeed",
    version,
    about = "Build an RSS feed of your unread Instapaper items"
)]
struct Args {
    /// Config file (defaults to ~/.config/instafeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the feed to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the document
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match args.config.or_else(default_config_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from '{}'", path.display()))?,
        None => {
            tracing::debug!("HOME not set and no --config given, using defaults");
            Config::default()
        }
    };
    config.apply_env();

    let generator = FeedGenerator::new(&config, ArticleCache::new())
        .context("Invalid configuration")?;
    let document = generator
        .generate()
        .await
        .context("Failed to generate feed")?;

    match args.output {
        Some(path) => std::fs::write(&path, &document)
            .with_context(|| format!("Failed to write feed to '{}'", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{document}").context("Failed to write feed to stdout")?;
        }
    }

    Ok(())
}
