mod cli;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vidq::config::{AppConfig, CONFIG_FILE_NAME};
use vidq::fetch::YtDlpFetcher;
use vidq::logging::{self, LOG_RETENTION_DAYS, LoggingOptions};
use vidq::panic_hook;
use vidq::pipeline::FetchPipeline;
use vidq::queue::{QueueEvent, QueueManager, QueueRunner, RunSummary, RunTarget};
use vidq::remux::FfmpegRemuxer;
use vidq::resolver::{LocatorExpander, LocatorKind, MetadataResolver, ResolveMode, YtDlpResolver};
use vidq::selector::StreamSelector;

use crate::cli::{Args, Commands};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .or_else(AppConfig::default_location)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    if let Commands::Config { reset: true, .. } = args.command {
        AppConfig::default().save(&config_path).await?;
        println!("Configuration reset to defaults: {}", config_path.display());
        return Ok(());
    }

    let mut config = AppConfig::load(&config_path)
        .await
        .with_context(|| format!("loading {}", config_path.display()))?;

    let _log_guard = logging::init_logging(&LoggingOptions {
        verbose: args.verbose,
        quiet: args.quiet,
        log_dir: config.log_dir.clone(),
    })?;
    panic_hook::install(config.log_dir.clone());
    if let Some(log_dir) = &config.log_dir
        && let Err(e) = logging::cleanup_old_logs(log_dir, LOG_RETENTION_DAYS).await
    {
        warn!(error = %e, "Failed to clean up old logs");
    }

    let resolver: Arc<dyn MetadataResolver> =
        Arc::new(YtDlpResolver::with_binary_path(config.ytdlp_binary()));
    let expander =
        LocatorExpander::with_item_template(resolver.clone(), config.item_locator_template.clone());

    match args.command {
        Commands::Download {
            locators,
            playlist,
            input,
            output,
            subfolders,
            no_subfolders,
            select,
        } => {
            let mut text = locators.join(" ");
            if let Some(input) = input {
                text.push(' ');
                text.push_str(&read_input(&input).await?);
            }
            if text.trim().is_empty() {
                bail!("no locators given");
            }

            let kind = if playlist {
                LocatorKind::Playlist
            } else {
                LocatorKind::Single
            };
            let mut manager = QueueManager::with_expander(resolver, expander);
            let report = manager.add_many(&text, kind).await;
            for (locator, e) in &report.failed {
                eprintln!("Skipped {}: {}", locator, e);
            }
            if manager.store().is_empty() {
                bail!("nothing to download");
            }

            println!("Queue:");
            for task in manager.store().iter() {
                println!("{}", task);
            }

            let destination = output.unwrap_or_else(|| config.default_path.clone());
            let use_subfolders = Commands::subfolder_override(subfolders, no_subfolders)
                .unwrap_or(config.use_subfolders);
            config.record_submission(&destination, use_subfolders);
            config.save(&config_path).await?;

            let summary =
                download(&config, &mut manager, &select, destination, use_subfolders).await;
            print_summary(&summary);
            if !summary.failed.is_empty() {
                bail!(
                    "{} of {} downloads failed",
                    summary.failed.len(),
                    summary.processed()
                );
            }
        }

        Commands::Inspect { locator } => {
            let metadata = resolver.resolve(&locator, ResolveMode::Full).await?;
            let selection = StreamSelector::new().select(&metadata);
            println!("Title:         {}", metadata.title.as_deref().unwrap_or("-"));
            println!("Uploader:      {}", metadata.uploader.as_deref().unwrap_or("-"));
            match selection.stream {
                Some(stream) => println!(
                    "Video stream:  {} ({})",
                    stream.format_id,
                    stream.vcodec.as_deref().unwrap_or("-")
                ),
                None => println!("Video stream:  none"),
            }
            println!("Dynamic range: {}", selection.dynamic_range);
        }

        Commands::Expand { playlist } => {
            for item in expander.expand(&playlist, LocatorKind::Playlist).await? {
                println!("{}", item);
            }
        }

        Commands::Config { show, .. } => {
            if show {
                println!("# {}", config_path.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Use --show to display the configuration or --reset to restore defaults");
            }
        }
    }

    Ok(())
}

/// Run the selected tasks, stopping between items on Ctrl-C.
async fn download(
    config: &AppConfig,
    manager: &mut QueueManager,
    select: &[usize],
    destination: String,
    use_subfolders: bool,
) -> RunSummary {
    let pipeline = Arc::new(FetchPipeline::with_options(
        Arc::new(YtDlpFetcher::with_binary_path(config.ytdlp_binary())),
        Arc::new(FfmpegRemuxer::with_ffmpeg_path(config.ffmpeg_binary())),
        config.pipeline_options(),
    ));

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop requested, finishing the current item");
            stop.cancel();
        }
    });

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(print_events(rx));

    let runner = QueueRunner::new(pipeline)
        .with_events(tx)
        .with_cancellation(cancel);
    let target = RunTarget::new(destination, use_subfolders);
    let summary = if select.is_empty() {
        runner.run_all(manager.store_mut(), &target).await
    } else {
        runner.run(manager.store_mut(), select, &target).await
    };

    // Closing the channel ends the printer.
    drop(runner);
    if let Err(e) = printer.await {
        warn!("Event printer failed: {}", e);
    }
    summary
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<QueueEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            QueueEvent::Started { locator, title, .. } => println!("==> {} ({})", title, locator),
            QueueEvent::Downloaded { path, .. } => println!("    downloaded {}", path.display()),
            QueueEvent::Merged { path, .. } => println!("    merged {}", path.display()),
            QueueEvent::Completed { dynamic_range, .. } => println!("    done [{}]", dynamic_range),
            QueueEvent::Failed { error, .. } => println!("    failed: {}", error),
            QueueEvent::Cancelled { remaining } => {
                println!("Stopped, {} task(s) not started", remaining)
            }
            QueueEvent::Finished { .. } => {}
        }
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "Completed: {}  Failed: {}  Not started: {}",
        summary.completed.len(),
        summary.failed.len(),
        summary.skipped
    );
    for item in &summary.failed {
        println!("  failed  {}  {}", item.locator, item.error);
    }
}

async fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buffer)
            .await
            .context("reading locators from stdin")?;
        Ok(buffer)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading locators from {}", path.display()))
    }
}
