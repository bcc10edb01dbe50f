//! Lexiclip - Vocabulary Flashcard Pipeline
//!
//! This is the main entry point for the Lexiclip application, which turns
//! vocabulary sources (e-reader CSV exports or movie word lists plus
//! subtitles) into Anki flashcards with dictionary data and media clips.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lexiclip::cli::{Args, Commands};
use lexiclip::config::Config;
use lexiclip::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.json from current directory first
            if std::path::Path::new("config.json").exists() {
                info!("Found config.json in current directory, loading...");
                Config::from_file("config.json")?
            } else {
                Config::default()
            }
        }
    };

    // Execute command
    match args.command {
        Commands::Import { source_dir } => {
            if let Some(source_dir) = source_dir {
                config.vocab.source_dir = source_dir;
            }
            info!(
                "Importing e-reader notes from {}",
                config.vocab.source_dir.display()
            );

            let workflow = Workflow::new(config);
            workflow.run_vocab_import().await?;
        }
        Commands::Movie { project } => {
            let workflow = Workflow::new(config);
            workflow.run_movie(project.as_deref()).await?;
        }
        Commands::Extract {
            words,
            subtitles,
            video,
            output_dir,
        } => {
            info!("Extracting clips for word list {}", words.display());

            let workflow = Workflow::new(config);
            workflow
                .run_extract(&words, &subtitles, &video, &output_dir)
                .await?;
        }
        Commands::Lookup { word } => {
            let workflow = Workflow::new(config);
            let entry = workflow.lookup_word(&word).await?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
    }

    info!("Lexiclip run completed");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".lexiclip").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "lexiclip.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer().with_target(false);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("lexiclip.log").display()
    );

    Ok(())
}
