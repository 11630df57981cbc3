use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use audience_finder::config::Config;
use audience_finder::{
    AudienceFinder, QuerySet, ScanError, ScanOutcome, ScanSession, SearchDepths, TracingProgress,
};
use reddit_client::{RedditClient, TokenGrant};

/// Find subreddits whose audience talks about your topics.
#[derive(Parser, Debug)]
#[command(name = "audience-finder", version)]
struct Cli {
    /// Search queries. Read from --queries-file or stdin when omitted.
    queries: Vec<String>,

    /// File with one query per line.
    #[arg(long, value_name = "FILE")]
    queries_file: Option<PathBuf>,

    /// Subreddits per direct search (default: DIRECT_SEARCH_DEPTH).
    #[arg(long)]
    direct: Option<u32>,

    /// Posts per post search (default: POST_SEARCH_DEPTH).
    #[arg(long)]
    posts: Option<u32>,

    /// Top-level comments scanned per post, 0 to disable (default: COMMENT_SEARCH_DEPTH).
    #[arg(long)]
    comments: Option<u32>,

    /// Also write the ranked table as JSON.
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("audience_finder=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let defaults = config.depths();
    let depths = SearchDepths {
        direct: cli.direct.unwrap_or(defaults.direct),
        post: cli.posts.unwrap_or(defaults.post),
        comment: cli.comments.unwrap_or(defaults.comment),
    };

    let raw = read_queries(&cli)?;
    let queries = match QuerySet::parse(&raw) {
        Ok(q) => q,
        Err(e) => {
            eprintln!("{e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let grant = config.grant();
    let client = RedditClient::authenticate(
        &config.reddit_client_id,
        &config.reddit_client_secret,
        &grant,
        &config.reddit_user_agent,
    )
    .await
    .context("Reddit token grant failed")?;

    let identity = match grant {
        TokenGrant::RefreshToken(_) => client.me().await.context("Identity lookup failed")?.name,
        TokenGrant::ClientCredentials => format!("app:{}", config.reddit_client_id),
    };
    info!(identity = identity.as_str(), "Authenticated with Reddit");

    let cancelled = Arc::new(AtomicBool::new(false));
    let session = ScanSession::new(identity, cancelled, Arc::new(TracingProgress));

    let ctrl_c = session.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, cancelling after the current request");
            ctrl_c.cancel();
        }
    });

    let finder = AudienceFinder::from_config(&config);
    let outcome = match finder.find_queries(&client, &queries, depths, &session).await {
        Ok(outcome) => outcome,
        Err(
            e @ (ScanError::WorkloadExceeded { .. }
            | ScanError::EmptyInput
            | ScanError::AlreadyRunning),
        ) => {
            eprintln!("Scan refused: {e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let table = match outcome {
        ScanOutcome::Completed(table) => table,
        ScanOutcome::Cancelled => {
            println!("Scan cancelled. No results were kept.");
            return Ok(ExitCode::from(130));
        }
    };

    if table.is_empty() {
        println!("No communities were found for these queries.");
    } else {
        println!("{table}");
    }

    if let Some(path) = &cli.json {
        std::fs::write(path, table.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), rows = table.len(), "Exported ranked table");
    }

    Ok(ExitCode::SUCCESS)
}

fn read_queries(cli: &Cli) -> Result<String> {
    if !cli.queries.is_empty() {
        return Ok(cli.queries.join("\n"));
    }
    if let Some(path) = &cli.queries_file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()));
    }
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .context("reading queries from stdin")?;
    Ok(raw)
}
