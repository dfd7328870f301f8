use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use feeder::datetime::{format_since, format_utc_datetime};
use feeder::{ArticleStore, Config, FeedUpdater, FetchResult, HttpAdapter, ReadState, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);

    let config = match Config::load_with_env(&path).and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = feeder::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        feeder::logging::init_console_only(&config.logging.level);
    }

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// One refresh cycle: fetch, expire, save once, report.
async fn run(config: &Config) -> Result<()> {
    let cache_path = config.cache_path();
    let state_path = config.state_path();

    let mut store = ArticleStore::load(&cache_path)?;
    let state = ReadState::load(&state_path)?;

    let adapter = HttpAdapter::new(&config.fetch, config.github_token().map(str::to_string))?;
    let updater = FeedUpdater::new(Arc::new(adapter))
        .with_retention(config.retention_resolver())
        .with_concurrency(config.fetch.max_concurrent);

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, waiting for in-flight fetches");
                cancel.cancel();
            }
        })
    };

    let results = updater
        .refresh_all_with_cancel(&config.feeds, &mut store, &cancel)
        .await;
    interrupt.abort();

    let expired = updater.expire_old(&config.feeds, &mut store);

    store.save(&cache_path)?;
    info!("Cache written to {}", cache_path.display());

    print_report(config, &store, &state, &results, expired);
    Ok(())
}

fn print_report(
    config: &Config,
    store: &ArticleStore,
    state: &ReadState,
    results: &[FetchResult],
    expired: usize,
) {
    let now = Utc::now();
    let width = results
        .iter()
        .map(|r| r.source.name.chars().count())
        .max()
        .unwrap_or(0);

    for result in results {
        let last = match store.last_fetched(result.source.key()) {
            Some(at) => format!("fetched {}", format_since(at, now)),
            None => "never fetched".to_string(),
        };
        match &result.error {
            None => println!(
                "ok   {:<width$}  {} new  ({})",
                result.source.name,
                result.fresh.len(),
                last
            ),
            Some(e) => println!("ERR  {:<width$}  {}  ({})", result.source.name, e, last),
        }
    }

    let cached = store.article_count();
    let unread = state.unread_count(store.all_articles());
    let fresh: usize = results.iter().map(|r| r.fresh.len()).sum();

    println!();
    println!(
        "{} feeds configured, {} articles cached, {} new, {} expired",
        config.feeds.len(),
        cached,
        fresh,
        expired
    );
    println!("{} read, {} unread", cached - unread, unread);
    println!("Bookmarks: {}", config.bookmark_path().display());
    println!(
        "Updated {} ({})",
        format_utc_datetime(&now, &config.settings.timezone, "%Y-%m-%d %H:%M"),
        config.settings.timezone
    );
}
