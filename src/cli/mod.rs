//! CLI module for Glimt.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use crate::models::{Modality, VideoId};
use clap::{Parser, Subcommand};

/// Glimt - Ask questions about a video
///
/// Captions sampled frames, transcribes the speech, and answers questions from
/// whichever evidence fits: what was shown, what was said, or both.
#[derive(Parser, Debug)]
#[command(name = "glimt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a video file, replacing whatever was indexed before
    Ingest {
        /// Path to a local video file
        path: String,
    },

    /// Ask a question about the indexed video
    Ask {
        /// The question to ask
        question: String,

        /// Video to ask about (defaults to the most recent one)
        #[arg(long)]
        video: Option<VideoId>,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search highlights without generating an answer
    Search {
        /// Search query
        query: String,

        /// Evidence to search (visual, audio, both, summary); classified when omitted
        #[arg(short, long)]
        modality: Option<Modality>,

        /// Video to search (defaults to the most recent one)
        #[arg(long)]
        video: Option<VideoId>,
    },

    /// Show the stored summary of a video
    Summary {
        /// Video ID (defaults to the most recent one)
        video: Option<VideoId>,
    },

    /// List indexed videos
    List,

    /// Delete a video with its highlights and summary
    Delete {
        /// Video ID to delete
        video_id: VideoId,
    },

    /// Remove every video, highlight and summary
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "answer.model")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_video() {
        let cli = Cli::parse_from(["glimt", "ask", "what is on the table?", "--video", "3"]);
        match cli.command {
            Commands::Ask { question, video, json } => {
                assert_eq!(question, "what is on the table?");
                assert_eq!(video, Some(3));
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_search_modality() {
        let cli = Cli::parse_from(["glimt", "-v", "search", "budget", "-m", "audio"]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Search { modality, .. } => assert_eq!(modality, Some(Modality::Audio)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_invalid_modality_rejected() {
        assert!(Cli::try_parse_from(["glimt", "search", "q", "-m", "video"]).is_err());
    }
}
