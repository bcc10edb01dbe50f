use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import e-reader CSV note exports into the vocabulary deck
    Import {
        /// Override the configured CSV source directory
        #[arg(short, long)]
        source_dir: Option<PathBuf>,
    },

    /// Process a movie project: match words, cut clips, build cards
    Movie {
        /// Project name from the configuration (defaults to the configured
        /// default project)
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Match words against subtitles and extract clips, without Anki
    Extract {
        /// Word/example list file
        #[arg(short, long)]
        words: PathBuf,

        /// Subtitle file (.srt or .ass)
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Source video file
        #[arg(short = 'i', long)]
        video: PathBuf,

        /// Output directory for clips
        #[arg(short, long)]
        output_dir: PathBuf,
    },

    /// Look up a single word and print the scraped entry as JSON
    Lookup {
        /// Word or phrase to look up
        word: String,
    },
}
