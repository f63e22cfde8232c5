mod cache;
mod config;
mod github;
mod history;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cache::CacheStore;
use github::{FetchError, RepoContext};
use history::{Assembler, PullRequest};

/// PR History — fetches a repository's complete pull request history
/// (every PR, its commits, and each commit's changed files with patch
/// text) and caches it locally for downstream security review tooling.
#[derive(Parser, Debug)]
#[command(name = "pr-history", version, about)]
struct Cli {
    /// Repository owner (e.g., rust-lang)
    owner: String,

    /// Repository name (e.g., cargo)
    repo: String,

    /// Fetch a single pull request by number instead of the full history
    #[arg(short, long)]
    pr: Option<u64>,

    /// Write the assembled records as pretty-printed JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Cache directory (overrides .pr-history.toml; default ./cache)
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load()?;
    let token = config.github_token().ok_or(FetchError::MissingToken)?;
    let context = RepoContext::new(cli.owner, cli.repo, token)?;

    let cache_dir = cli.cache_dir.unwrap_or_else(|| config.cache_dir());
    debug!(cache_dir = %cache_dir.display(), "using cache directory");
    let assembler = Assembler::new(CacheStore::new(cache_dir));

    let records = match cli.pr {
        Some(number) => {
            info!(number, "fetching single pull request");
            vec![assembler.fetch_one(&context, number).await?]
        }
        None => {
            info!("fetching full pull request history");
            assembler.fetch_all(&context).await?
        }
    };

    match cli.output {
        Some(path) => {
            std::fs::write(&path, serde_json::to_string_pretty(&records)?)?;
            info!(path = %path.display(), count = records.len(), "records written");
        }
        None => print_summary(&records),
    }

    Ok(())
}

/// Print a one-line-per-PR overview of the assembled history.
fn print_summary(records: &[PullRequest]) {
    for pr in records {
        let files: usize = pr.commits.iter().map(|c| c.files.len()).sum();
        println!(
            "{} {} ({} commits, {} files)",
            format!("#{}", pr.number).cyan().bold(),
            pr.title,
            pr.commits.len(),
            files,
        );
    }
    println!();
    println!("{}", format!("{} pull request(s)", records.len()).green());
}
