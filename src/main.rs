use clap::Parser;
use errand::{console, Config, JsonFileTaskStore, ModelSession, Router, SystemClock, TaskLog};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// On-device assistant that turns requests into phone actions
#[derive(Parser, Debug)]
#[command(name = "errand", version, about = "Route requests to alarms, calendar, calls, apps or answers")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "ERRAND_CONFIG", default_value = "errand.toml")]
    config: PathBuf,

    /// Handle a single utterance and exit
    #[arg(long, value_name = "UTTERANCE")]
    once: Option<String>,

    /// Print the task history and exit
    #[arg(long)]
    history: bool,

    /// Clear the task history and exit
    #[arg(long)]
    clear_history: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cfg = Config::load_or_default(&cli.config).await?;
    let log = TaskLog::new(Arc::new(JsonFileTaskStore::new(cfg.history.path.clone())));

    if cli.clear_history {
        log.clear().await?;
        println!("Task history cleared.");
        return Ok(());
    }
    if cli.history {
        for record in log.list().await? {
            println!(
                "{}  {:<11}  {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.category,
                record.input
            );
        }
        return Ok(());
    }

    let session = ModelSession::new(cfg.engine.build()?, cfg.engine.context_params());
    if let Err(e) = session.initialize(&cfg.model.local_path).await {
        warn!(error = %e, "model unavailable; only requests that need no model will succeed");
    }

    let router = Router::standard(
        &console::capabilities(&cfg),
        cfg.extractor(),
        cfg.apps.catalog(),
        Arc::new(SystemClock),
    );

    if let Some(text) = cli.once {
        println!("{}", router.route(&text, &session, Some(&log)).await);
        session.release().await;
        return Ok(());
    }

    info!("\u{1F680}  errand ready");
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let status = router.route(&line, &session, Some(&log)).await;
        stdout.write_all(format!("{status}\n").as_bytes()).await?;
    }

    session.release().await;
    Ok(())
}
