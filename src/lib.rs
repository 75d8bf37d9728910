//! Glimt - Ask questions about a video
//!
//! Glimt samples a video once per second, captions each frame, transcribes
//! the speech with word timings, and indexes both as embedded highlights.
//! Questions are routed to the evidence that fits them: what was shown, what
//! was said, the two joined on time, or a whole-video summary.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `media` - ffmpeg/ffprobe probing and extraction
//! - `captioning` - Frame captions from a vision model
//! - `transcription` - Word-level speech recognition
//! - `chunking` - Speech segmentation
//! - `embedding` - Embedding generation
//! - `vector_store` - Highlight storage and nearest-neighbor search
//! - `retrieval` - Ranking, gap filtering and temporal fusion
//! - `routing` - Query classification
//! - `rag` - Evidence assembly and answer generation
//! - `orchestrator` - Ingestion pipeline and query entry point
//!
//! # Example
//!
//! ```rust,no_run
//! use glimt::config::Settings;
//! use glimt::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     orchestrator.ingest("lecture.mp4".as_ref()).await?;
//!     let response = orchestrator.ask("What is written on the whiteboard?", None).await?;
//!     println!("{}", response.response);
//!
//!     Ok(())
//! }
//! ```

pub mod captioning;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod media;
pub mod models;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod retrieval;
pub mod routing;
pub mod transcription;
pub mod vector_store;

pub use error::{GlimtError, Result};
