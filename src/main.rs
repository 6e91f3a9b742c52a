use clap::Parser;
use notify::{EventKind, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::{RwLock, mpsc};
use tracing::{error, info, warn};
use workflow_model_filter::config::Config;
use workflow_model_filter::host::{self, SharedResolver};
use workflow_model_filter::logging;

#[derive(Parser, Debug)]
#[command(name = "workflow-model-filter")]
#[command(about = "Filters the workflow models offered for a page by their appliesTo patterns")]
struct Args {
    /// Path to the repository config file
    #[arg(short, long, default_value = "repository.yaml")]
    config: String,

    /// Read requests from this file instead of stdin
    #[arg(short, long)]
    input: Option<String>,

    /// trace, debug, info, warn, error (overrides the config file)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Also write logs to this file (overrides the config file)
    #[arg(long)]
    log_file: Option<String>,

    /// Reload the repository when the config file changes
    #[arg(short, long)]
    watch: bool,
}

async fn watch_config_file(config_path: &str, resolver: &SharedResolver) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel(100);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            if let Err(e) = tx.blocking_send(event) {
                eprintln!("Failed to send event: {}", e);
            }
        }
    })?;

    watcher.watch(Path::new(config_path), RecursiveMode::NonRecursive)?;

    while let Some(event) = rx.recv().await {
        if let EventKind::Modify(_) = event.kind {
            info!("Config file modified, attempting to reload");
            match host::reload(resolver, config_path).await {
                Ok(nodes) => info!("Repository reloaded with {} nodes", nodes),
                Err(e) => error!("Failed to reload repository: {}", e),
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)?;

    let level_name = args
        .log_level
        .as_deref()
        .or(config.logging.level.as_deref())
        .unwrap_or("warn");
    let log_file = args.log_file.as_deref().or(config.logging.file.as_deref());
    logging::init_logging(logging::parse_level(level_name), log_file);

    let resolver: SharedResolver = Arc::new(RwLock::new(Arc::new(host::load_resolver(&config)?)));
    info!(
        "Repository loaded from {} with {} nodes",
        args.config,
        config.nodes.len()
    );

    if args.watch {
        let config_path = args.config.clone();
        let resolver = resolver.clone();
        tokio::spawn(async move {
            if let Err(e) = watch_config_file(&config_path, &resolver).await {
                warn!("Config file watcher error: {}", e);
            }
        });
    }

    let stdout = tokio::io::stdout();
    match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            host::run(BufReader::new(file), stdout, resolver).await?;
        }
        None => {
            host::run(BufReader::new(tokio::io::stdin()), stdout, resolver).await?;
        }
    }
    Ok(())
}
