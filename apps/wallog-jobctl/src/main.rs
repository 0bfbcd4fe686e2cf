//! Operational CLI for the wallog reconciliation engine.
//!
//! `run-job` triggers one reconciliation run; `list` serves one page of
//! the merged shard listing; `dump` drains the whole merged scan as
//! JSON lines. All configuration comes from the environment.

mod config;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::error;

use wallog_core::SystemClock;
use wallog_engine::{EngineError, ListCriteria, ListOptions, Lister, ReconciliationJob};
use wallog_store::{CachedToken, ClientCredentials, StaticToken, WebApiConfig, WebApiStore};

use config::{AuthConfig, Config};

#[derive(Parser)]
#[command(
    name = "wallog-jobctl",
    about = "Reconciliation and listing operations for wallog record shards"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Trigger one reconciliation run and print its summary.
    RunJob,
    /// Serve one page of the merged shard listing.
    List {
        #[arg(long, default_value_t = 100)]
        page_size: u32,
        /// Cursor token from a previous page.
        #[arg(long)]
        cursor: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        shard: Option<String>,
        /// Substring match on the case id.
        #[arg(long)]
        search: Option<String>,
        /// Records created on or after this date (YYYY-MM-DD).
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Records created up to and including this date (YYYY-MM-DD).
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Also report the total filtered count.
        #[arg(long)]
        count: bool,
    },
    /// Drain the merged scan and print every record as one JSON line.
    Dump {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        shard: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            return ExitCode::from(2);
        }
    };

    logging::init_logging(&config.rust_log);

    let store = match build_store(&config) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("FATAL: {e}");
            return ExitCode::from(2);
        }
    };

    let result = match cli.command {
        Command::RunJob => run_job(store, &config).await,
        Command::List {
            page_size,
            cursor,
            owner,
            shard,
            search,
            from,
            to,
            count,
        } => {
            let options = ListOptions {
                criteria: ListCriteria {
                    from,
                    to,
                    search,
                    status: None,
                },
                owner,
                shard,
                page_size,
                cursor,
                include_count: count,
            };
            list(store, &config, options).await
        }
        Command::Dump {
            owner,
            shard,
            search,
            from,
            to,
        } => {
            let options = ListOptions {
                criteria: ListCriteria {
                    from,
                    to,
                    search,
                    status: None,
                },
                owner,
                shard,
                ..ListOptions::default()
            };
            dump(store, &config, options).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

fn build_store(config: &Config) -> Result<WebApiStore, wallog_store::StoreError> {
    let token = match &config.auth {
        AuthConfig::Static { token } => CachedToken::new(StaticToken(token.clone())),
        AuthConfig::ClientCredentials {
            token_url,
            client_id,
            client_secret,
            scope,
        } => CachedToken::new(ClientCredentials::new(
            token_url.as_str(),
            client_id.as_str(),
            client_secret.as_str(),
            scope.clone(),
        )),
    };

    WebApiStore::new(
        WebApiConfig::new(config.store_base_url.as_str())
            .with_timeout_secs(config.store_timeout_secs),
        token,
    )
}

async fn run_job(store: Arc<WebApiStore>, config: &Config) -> Result<(), EngineError> {
    let job = ReconciliationJob::new(store, config.shards.clone(), Arc::new(SystemClock));
    let summary = job.try_run().await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).expect("summary serializes")
    );
    Ok(())
}

async fn list(
    store: Arc<WebApiStore>,
    config: &Config,
    options: ListOptions,
) -> Result<(), EngineError> {
    let lister = Lister::new(store, config.shards.clone(), config.owners.clone());
    let page = lister.page(&options).await?;

    let out = serde_json::json!({
        "items": page.items,
        "nextCursor": page.next_cursor,
        "count": page.total_count,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).expect("page serializes")
    );
    Ok(())
}

async fn dump(
    store: Arc<WebApiStore>,
    config: &Config,
    options: ListOptions,
) -> Result<(), EngineError> {
    let lister = Lister::new(store, config.shards.clone(), config.owners.clone());
    let items = lister.dump(&options).await?;

    for item in &items {
        println!(
            "{}",
            serde_json::to_string(item).expect("item serializes")
        );
    }
    tracing::info!(records = items.len(), "Dump complete");
    Ok(())
}
