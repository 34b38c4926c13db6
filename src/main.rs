use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use forum_reposter::config::{self, Config};
use forum_reposter::driver::Reposter;
use forum_reposter::state::CursorState;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    let mut args = std::env::args().skip(1);
    if let Some(flag) = args.next() {
        if flag != "--init" {
            anyhow::bail!("Unknown argument '{flag}'. Usage: forum-reposter [--init [TID]]");
        }
        let tid = args
            .next()
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("TID must be an integer")?
            .unwrap_or(0);
        let state_path = config::state_path_from_env();
        CursorState::init(&state_path, tid)
            .await
            .context("Failed to create cursor state")?;
        info!(path = %state_path.display(), tid, "Cursor state created");
        return Ok(());
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        forum = %config.forum_base_url,
        state_path = %config.state_path.display(),
        dry_run = config.dry_run,
        "Configuration loaded"
    );

    let reposter = Reposter::from_config(config).await?;
    let report = reposter.run_once().await?;

    info!(
        discovered = report.discovered,
        published = report.published,
        suppressed = report.suppressed,
        failed = report.failed,
        rate_limited = report.rate_limited,
        cooldown = report.cooldown,
        tid = report.last_seen_topic_id,
        "Run complete"
    );

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,forum_reposter=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
